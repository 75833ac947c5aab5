//! Invocation harness.
//!
//! Composes trigger, poller and reporter into one invocation:
//!
//! ```text
//!   START ──→ TRIGGERED ──→ POLLING ──→ SUCCEEDED_REPORTED
//!     │           │            │
//!     └───────────┴────────────┴──→ FAILED_REPORTED
//! ```
//!
//! Trigger and poll produce a single `BridgeResult`; [`ImageSyncBridge::invoke`]
//! hands it to one finalize step that sends the report. Every exit path
//! therefore makes exactly one delivery attempt. [`finalize`] is public so
//! setup failures that happen before a bridge exists are reported the same
//! way. An invocation cut off by its wall-clock budget
//! ([`ImageSyncBridge::invoke_within`]) before finalizing sends nothing.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, error, info, info_span, warn};

use crate::context::{InvocationContext, InvocationEvent, RequestType};
use crate::control::JobControl;
use crate::error::{BridgeError, BridgeResult};
use crate::job::{JobHandle, JobRequest, JobStatus};
use crate::poller::StatusPoller;
use crate::report::{CompletionReport, Outcome};
use crate::reporter::{CallbackTransport, CompletionReporter};

/// Where an invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// Nothing done yet.
    Start,
    /// Job started.
    Triggered,
    /// Waiting for a terminal status.
    Polling,
    /// SUCCESS report sent.
    SucceededReported,
    /// FAILED report sent.
    FailedReported,
}

/// Successful end of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The copy job succeeded.
    Copied {
        /// Handle of the finished job.
        handle: JobHandle,
    },
    /// Delete request: there was nothing to copy.
    Skipped,
}

impl Completion {
    fn message(&self) -> String {
        match self {
            Completion::Copied { handle } => {
                format!("Job {handle} finished with status {}", JobStatus::Succeeded)
            }
            Completion::Skipped => "Delete request: no image copy required".to_string(),
        }
    }
}

/// Synchronous-completion bridge around a job-control service.
pub struct ImageSyncBridge<T> {
    control: Arc<dyn JobControl>,
    poller: StatusPoller,
    reporter: CompletionReporter<T>,
    request: JobRequest,
}

impl<T: CallbackTransport> ImageSyncBridge<T> {
    /// Create a bridge that starts `request` on `control` and reports via
    /// `reporter`.
    pub fn new(
        control: Arc<dyn JobControl>,
        poller: StatusPoller,
        reporter: CompletionReporter<T>,
        request: JobRequest,
    ) -> Self {
        Self {
            control,
            poller,
            reporter,
            request,
        }
    }

    /// Reporter used by this bridge.
    pub fn reporter(&self) -> &CompletionReporter<T> {
        &self.reporter
    }

    /// Run one invocation end to end.
    ///
    /// The report has been sent (or its delivery failure logged) by the time
    /// this returns, whatever the result.
    pub async fn invoke(
        &self,
        event: &InvocationEvent,
        context: &InvocationContext,
    ) -> BridgeResult<Completion> {
        let span = info_span!(
            "invocation",
            request_id = %event.request_id,
            stack_id = %event.stack_id,
            logical_resource_id = %event.logical_resource_id,
        );

        async move {
            info!(request_type = ?event.request_type, "Invocation started");
            let result = match event.request_type {
                RequestType::Delete => Ok(Completion::Skipped),
                RequestType::Create | RequestType::Update => self.copy(context).await,
            };
            finalize(&self.reporter, event, context, result).await
        }
        .instrument(span)
        .await
    }

    /// Trigger the job and wait for it. Terminal failures become errors.
    async fn copy(&self, context: &InvocationContext) -> BridgeResult<Completion> {
        let mut state = InvocationState::Start;
        info!(?state, definition = %self.request.job_definition_id, "Starting copy job");

        let handle = self.control.start(&self.request).await?;
        state = InvocationState::Triggered;
        info!(?state, job = %handle);

        state = InvocationState::Polling;
        info!(?state, interval_ms = self.poller.interval().as_millis() as u64);
        let status = self
            .poller
            .await_terminal(self.control.as_ref(), &handle, context)
            .await?;

        if status.is_success() {
            Ok(Completion::Copied { handle })
        } else {
            Err(BridgeError::JobFailure { handle, status })
        }
    }

    /// Run one invocation under a wall-clock `budget`.
    ///
    /// If the budget expires before the report is sent, the invocation is
    /// dropped mid-flight, nothing is reported, and
    /// [`BridgeError::BudgetExhausted`] is returned.
    pub async fn invoke_within(
        &self,
        event: &InvocationEvent,
        context: &InvocationContext,
        budget: Duration,
    ) -> BridgeResult<Completion> {
        match tokio::time::timeout(budget, self.invoke(event, context)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    request_id = %event.request_id,
                    budget_secs = budget.as_secs(),
                    "Invocation budget exhausted before a report was sent"
                );
                Err(BridgeError::BudgetExhausted(budget))
            }
        }
    }
}

/// Build and send the one report for `result`, then return `result`.
///
/// Also used for failures that happen before an [`ImageSyncBridge`] exists,
/// such as a configuration error, so those still reach the callback.
pub async fn finalize<T: CallbackTransport>(
    reporter: &CompletionReporter<T>,
    event: &InvocationEvent,
    context: &InvocationContext,
    result: BridgeResult<Completion>,
) -> BridgeResult<Completion> {
    let (outcome, message) = match &result {
        Ok(completion) => (Outcome::Success, completion.message()),
        Err(e) => (Outcome::Failed, e.to_string()),
    };

    let mut report = CompletionReport::new(
        outcome,
        message,
        event.correlation_ids(),
        context.physical_resource_id(event.physical_resource_id.as_deref()),
    );
    if let Ok(Completion::Copied { handle }) = &result {
        report = report.with_data("JobId", handle.as_str());
    }
    reporter.report(&event.callback_target(), &report).await;

    match &result {
        Ok(_) => info!(state = ?InvocationState::SucceededReported, "Invocation finished"),
        Err(e) if e.is_job_level() => {
            error!(state = ?InvocationState::FailedReported, error = %e, "Invocation failed")
        }
        Err(e) => warn!(
            state = ?InvocationState::FailedReported,
            error = %e,
            "Invocation could not be set up"
        ),
    }
    result
}
