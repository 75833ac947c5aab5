//! Completion reporter.
//!
//! Delivers one [`CompletionReport`] per invocation with a single PUT.
//! Delivery is best effort: failures are logged and dropped, never retried
//! and never returned, so a broken callback cannot mask the job's outcome.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{error, info};

use crate::context::CallbackTarget;
use crate::error::DeliveryError;
use crate::report::CompletionReport;

/// Sends a serialized report to a callback URL.
#[async_trait]
pub trait CallbackTransport: Send + Sync {
    /// Issue one PUT of `body` to `url`. Non-2xx answers are errors.
    async fn put(&self, url: &str, body: String) -> Result<(), DeliveryError>;
}

/// `reqwest`-backed transport.
///
/// Sends an empty `content-type` and an explicit `content-length`; the
/// callback endpoint is a pre-signed URL that rejects other content types.
#[derive(Debug, Clone)]
pub struct HttpCallbackTransport {
    client: Client,
}

impl HttpCallbackTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create a transport with a preconfigured `reqwest::Client`.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallbackTransport for HttpCallbackTransport {
    async fn put(&self, url: &str, body: String) -> Result<(), DeliveryError> {
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Reporter that makes exactly one delivery attempt per call.
pub struct CompletionReporter<T> {
    transport: T,
}

impl<T: CallbackTransport> CompletionReporter<T> {
    /// Create a reporter over `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver `report` to `target`. Never fails.
    pub async fn report(&self, target: &CallbackTarget, report: &CompletionReport) {
        if let Err(e) = self.try_report(target, report).await {
            error!(
                outcome = %report.status,
                request_id = %report.correlation_ids.request_id,
                error = %e,
                "Failed to deliver completion report"
            );
        }
    }

    async fn try_report(
        &self,
        target: &CallbackTarget,
        report: &CompletionReport,
    ) -> Result<(), DeliveryError> {
        let body = report.to_body()?;
        let length = body.len();
        self.transport.put(&target.url, body).await?;
        info!(
            outcome = %report.status,
            physical_resource_id = %report.physical_resource_id,
            bytes = length,
            "Completion report delivered"
        );
        Ok(())
    }
}
