//! Job lifecycle types.
//!
//! The copy job's state machine, as reported by the job-control service:
//!
//! ```text
//!   start_build() ──→ PENDING ──→ IN_PROGRESS ──→ SUCCEEDED
//!                        │             │
//!                        │             ├──→ FAILED
//!                        │             ├──→ FAULT
//!                        │             ├──→ TIMED_OUT
//!                        └─────────────┴──→ STOPPED
//! ```
//!
//! **Invariants:**
//! - `SUCCEEDED` is the only success terminal.
//! - Terminal states are permanent; the poller stops at the first one seen.

use serde::{Deserialize, Serialize};

/// Request to start one copy job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Identifier of the job definition (build project) to run.
    pub job_definition_id: String,
}

impl JobRequest {
    /// Create a request for the given job definition.
    pub fn new(job_definition_id: impl Into<String>) -> Self {
        Self {
            job_definition_id: job_definition_id.into(),
        }
    }
}

/// Handle of a started job. The only key used for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl JobHandle {
    /// Create a new job handle.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a copy job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Accepted, not yet running.
    Pending,
    /// Running.
    InProgress,
    /// Finished successfully.
    Succeeded,
    /// Finished with a build error.
    Failed,
    /// Finished with a service-side fault.
    Fault,
    /// Stopped before completion.
    Stopped,
    /// Exceeded the job's own timeout.
    TimedOut,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Succeeded,
        JobStatus::Failed,
        JobStatus::Fault,
        JobStatus::Stopped,
        JobStatus::TimedOut,
    ];

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Check if the job is still pending (queued or running).
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::InProgress)
    }

    /// Check if the job completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Fault => "FAULT",
            JobStatus::Stopped => "STOPPED",
            JobStatus::TimedOut => "TIMED_OUT",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a status query response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier.
    pub id: String,
    /// Current status.
    pub status: JobStatus,
}
