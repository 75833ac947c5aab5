//! Completion report model.
//!
//! The report is the single message the orchestrator receives per
//! invocation. Its wire form is a flat JSON object:
//!
//! ```text
//! {
//!   "Status": "SUCCESS" | "FAILED",
//!   "Reason": "...",
//!   "PhysicalResourceId": "...",
//!   "StackId": "...",
//!   "RequestId": "...",
//!   "LogicalResourceId": "...",
//!   "Data": { "Message": "..." } | { "Error": "..." }
//! }
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// Outcome reported to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Resource is ready.
    Success,
    /// Resource could not be provisioned.
    Failed,
}

impl Outcome {
    /// Key under which the message is placed in `Data`.
    pub fn data_key(&self) -> &'static str {
        match self {
            Outcome::Success => "Message",
            Outcome::Failed => "Error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "SUCCESS"),
            Outcome::Failed => write!(f, "FAILED"),
        }
    }
}

/// Identifiers that tie a report to the orchestrator's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorrelationIds {
    /// Stack the resource belongs to.
    pub stack_id: String,
    /// Provisioning request id.
    pub request_id: String,
    /// Resource name within the stack.
    pub logical_resource_id: String,
}

/// Completion report sent to the callback endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionReport {
    /// SUCCESS or FAILED.
    pub status: Outcome,
    /// Human-readable reason.
    pub reason: String,
    /// Stable id of the provisioned resource.
    pub physical_resource_id: String,
    /// Correlation identifiers, flattened into the top-level object.
    #[serde(flatten)]
    pub correlation_ids: CorrelationIds,
    /// Outcome-specific payload.
    pub data: FxHashMap<String, String>,
}

impl CompletionReport {
    /// Build a report. `message` becomes both the reason and the single
    /// `Data` entry (`Message` on success, `Error` on failure).
    pub fn new(
        outcome: Outcome,
        message: impl Into<String>,
        correlation_ids: CorrelationIds,
        physical_resource_id: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let mut data = FxHashMap::default();
        data.insert(outcome.data_key().to_string(), message.clone());
        Self {
            status: outcome,
            reason: message,
            physical_resource_id: physical_resource_id.into(),
            correlation_ids,
            data,
        }
    }

    /// Add an extra `Data` entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Outcome of the report.
    pub fn outcome(&self) -> Outcome {
        self.status
    }

    /// Serialize to the JSON body sent to the callback.
    pub fn to_body(&self) -> Result<String, DeliveryError> {
        Ok(serde_json::to_string(self)?)
    }
}
