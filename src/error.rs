//! Bridge error types.
//!
//! Errors are split by who is allowed to see them:
//!
//! | Type | Variants | Surfaces to caller |
//! |------|----------|--------------------|
//! | [`BridgeError`] | `Trigger`, `Lookup`, `JobFailure` | Yes, after a FAILED report |
//! | [`BridgeError`] | `Configuration` | Yes, after a FAILED report |
//! | [`BridgeError`] | `InvalidEvent` | Yes, no callback URL to report to |
//! | [`BridgeError`] | `BudgetExhausted` | Yes, no report was sent |
//! | [`DeliveryError`] | `Transport`, `Rejected`, `Serialization` | Never, logged by the reporter |

use std::time::Duration;

use thiserror::Error;

use crate::job::{JobHandle, JobStatus};

/// Errors that end an invocation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    // ── Job-level errors (reported FAILED, then re-raised) ───────────
    /// The job-control service refused to start the job.
    #[error("Failed to start job: {0}")]
    Trigger(String),

    /// A status query produced no record for the handle.
    #[error("No status record for job {handle}: {detail}")]
    Lookup {
        /// Handle that was queried.
        handle: JobHandle,
        /// What the service returned instead.
        detail: String,
    },

    /// The job reached a terminal status other than `SUCCEEDED`.
    #[error("Job {handle} finished with status {status}")]
    JobFailure {
        /// Handle of the failed job.
        handle: JobHandle,
        /// Terminal status observed.
        status: JobStatus,
    },

    // ── Setup errors (before the job is started) ───────────────────────
    /// Configuration error (fix environment).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The invocation event could not be parsed.
    #[error("Invalid invocation event: {0}")]
    InvalidEvent(String),

    // ── Wall-clock (nothing reported) ────────────────────────────────
    /// The invocation's budget ran out before a report was sent.
    #[error("Invocation budget of {}s exhausted", .0.as_secs())]
    BudgetExhausted(Duration),
}

impl BridgeError {
    /// Returns `true` if the error came from the job or the job-control
    /// service rather than from the bridge's own setup.
    pub fn is_job_level(&self) -> bool {
        matches!(
            self,
            Self::Trigger(_) | Self::Lookup { .. } | Self::JobFailure { .. }
        )
    }

    /// Create a lookup error for `handle`.
    pub fn lookup(handle: &JobHandle, detail: impl Into<String>) -> Self {
        Self::Lookup {
            handle: handle.clone(),
            detail: detail.into(),
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while delivering a completion report.
///
/// Only the reporter handles these; they are logged and dropped.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request never produced a response.
    #[error("Callback request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status.
    #[error("Callback rejected (status {status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// The report could not be encoded.
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}
