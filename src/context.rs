//! Invocation inputs: the orchestrator's event and the execution context.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::report::CorrelationIds;

/// Kind of provisioning request the orchestrator is making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestType {
    /// Resource is being created.
    #[default]
    Create,
    /// Resource properties changed.
    Update,
    /// Resource is being removed.
    Delete,
}

/// Where the completion report goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackTarget {
    /// One-time callback URL.
    pub url: String,
}

impl CallbackTarget {
    /// Create a target for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Event delivered by the orchestrator at invocation start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationEvent {
    /// Create, Update or Delete.
    #[serde(default)]
    pub request_type: RequestType,
    /// Callback URL for the completion report.
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    /// Stack the resource belongs to.
    pub stack_id: String,
    /// Unique id of this provisioning request.
    pub request_id: String,
    /// Name of the resource within the stack.
    pub logical_resource_id: String,
    /// Declared resource type, if the orchestrator sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Identifier assigned on a previous invocation (Update/Delete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    /// Free-form resource properties.
    #[serde(default)]
    pub resource_properties: serde_json::Value,
}

impl InvocationEvent {
    /// Parse an event from its JSON text.
    pub fn from_json(text: &str) -> BridgeResult<Self> {
        serde_json::from_str(text).map_err(|e| BridgeError::InvalidEvent(e.to_string()))
    }

    /// Callback target carried by the event.
    pub fn callback_target(&self) -> CallbackTarget {
        CallbackTarget::new(self.response_url.clone())
    }

    /// Correlation identifiers echoed back in the report.
    pub fn correlation_ids(&self) -> CorrelationIds {
        CorrelationIds {
            stack_id: self.stack_id.clone(),
            request_id: self.request_id.clone(),
            logical_resource_id: self.logical_resource_id.clone(),
        }
    }
}

/// Execution environment of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Log stream of this invocation; the default physical resource id.
    pub log_stream_name: String,
    /// Wall-clock instant at which the environment ends the invocation.
    pub deadline: DateTime<Utc>,
}

impl InvocationContext {
    /// Create a context with an absolute deadline.
    pub fn new(log_stream_name: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            log_stream_name: log_stream_name.into(),
            deadline,
        }
    }

    /// Create a context whose deadline is `budget` from now.
    pub fn with_budget(log_stream_name: impl Into<String>, budget: Duration) -> Self {
        let budget = chrono::Duration::from_std(budget).unwrap_or(chrono::Duration::MAX);
        let deadline = Utc::now()
            .checked_add_signed(budget)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(log_stream_name, deadline)
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining_time(&self) -> Duration {
        (self.deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// `supplied` if present, otherwise the log stream name.
    pub fn physical_resource_id(&self, supplied: Option<&str>) -> String {
        supplied
            .map(str::to_string)
            .unwrap_or_else(|| self.log_stream_name.clone())
    }
}
