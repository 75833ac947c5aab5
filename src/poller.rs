//! Status poller.
//!
//! Queries the job at a fixed cadence until it reaches a terminal status.
//! There is no backoff, no jitter and no iteration cap; the execution
//! environment's wall-clock budget is the only bound.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::context::InvocationContext;
use crate::control::JobControl;
use crate::error::BridgeResult;
use crate::job::{JobHandle, JobStatus};

/// Default delay between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Fixed-interval status poller.
#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    interval: Duration,
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl StatusPoller {
    /// Create a poller that waits `interval` between queries.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Delay between queries.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `handle` until its status is terminal and return that status.
    ///
    /// Errors from the status query (including a missing record) end the
    /// loop immediately and are not retried.
    pub async fn await_terminal(
        &self,
        control: &dyn JobControl,
        handle: &JobHandle,
        context: &InvocationContext,
    ) -> BridgeResult<JobStatus> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let status = control.status(handle).await?;

            if status.is_terminal() {
                info!(job = %handle, %status, attempt, "Job reached terminal status");
                return Ok(status);
            }

            debug!(
                job = %handle,
                %status,
                attempt,
                remaining_ms = context.remaining_time().as_millis() as u64,
                "Job still running"
            );
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::time::Instant;

    use crate::control::tests::ScriptedControl;
    use crate::error::BridgeError;

    fn context() -> InvocationContext {
        InvocationContext::with_budget("stream-1", Duration::from_secs(300))
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_fixed_interval_until_success() {
        let control = ScriptedControl::new(
            "b-1",
            &[JobStatus::Pending, JobStatus::InProgress, JobStatus::Succeeded],
        );
        let poller = StatusPoller::default();

        let started = Instant::now();
        let status = poller
            .await_terminal(&control, &JobHandle::new("b-1"), &context())
            .await
            .unwrap();

        assert_eq!(status, JobStatus::Succeeded);
        assert_eq!(control.queries(), 3);
        // Two fixed five-second sleeps, no backoff.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(11), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_terminals_stop_polling() {
        for terminal in [
            JobStatus::Failed,
            JobStatus::Fault,
            JobStatus::Stopped,
            JobStatus::TimedOut,
        ] {
            let control = ScriptedControl::new("b-2", &[JobStatus::InProgress, terminal]);
            let status = StatusPoller::new(Duration::from_secs(1))
                .await_terminal(&control, &JobHandle::new("b-2"), &context())
                .await
                .unwrap();
            assert_eq!(status, terminal);
            assert_eq!(control.queries(), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_query_terminal_does_not_sleep() {
        let control = ScriptedControl::new("b-3", &[JobStatus::Failed]);
        let started = Instant::now();
        StatusPoller::default()
            .await_terminal(&control, &JobHandle::new("b-3"), &context())
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_record_is_not_retried() {
        let control = ScriptedControl::with_records(
            "b-4",
            vec![Some(JobStatus::InProgress), None, Some(JobStatus::Succeeded)],
        );
        let err = StatusPoller::default()
            .await_terminal(&control, &JobHandle::new("b-4"), &context())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Lookup { .. }));
        assert_eq!(control.queries(), 2);
    }
}
