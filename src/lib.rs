//! Image Sync Bridge - synchronous completion for an asynchronous image copy
//!
//! A provisioning orchestrator that only understands synchronous resource
//! creation needs a container image copied into a private registry before
//! the function that uses it can be created. This crate bridges the gap: it
//! starts the copy job, waits for it to finish, and reports the outcome to the
//! orchestrator's one-time callback URL.
//!
//! # Overview
//!
//! - [`JobControl`]: the job-control service contract (start, query)
//! - [`StatusPoller`]: fixed-interval wait for a terminal [`JobStatus`]
//! - [`CompletionReporter`]: single best-effort delivery of a
//!   [`CompletionReport`]
//! - [`ImageSyncBridge`]: composes the three per [`InvocationEvent`]
//! - [`BridgeError`] / [`DeliveryError`]: what can go wrong, and who sees it
//!
//! # Lifecycle
//!
//! ```text
//!   start() ──→ await_terminal() ──→ report()
//!   (once)        (poll loop)         (once, on every path)
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use image_sync_bridge::*;
//!
//! let bridge = ImageSyncBridge::new(
//!     Arc::new(HttpJobControl::new("http://builds.internal", DEFAULT_JOB_CONTROL_TIMEOUT)?),
//!     StatusPoller::default(),
//!     CompletionReporter::new(HttpCallbackTransport::new(DEFAULT_CALLBACK_TIMEOUT)?),
//!     JobRequest::new("image-copy"),
//! );
//! bridge.invoke(&event, &context).await?;
//! ```

pub mod bridge;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod job;
pub mod poller;
pub mod report;
pub mod reporter;

pub use bridge::{Completion, ImageSyncBridge, InvocationState, finalize};
pub use config::{BridgeConfig, DEFAULT_CALLBACK_TIMEOUT, DEFAULT_JOB_CONTROL_TIMEOUT};
pub use context::{CallbackTarget, InvocationContext, InvocationEvent, RequestType};
pub use control::{HttpJobControl, JobControl};
pub use error::{BridgeError, BridgeResult, DeliveryError};
pub use job::{JobHandle, JobRecord, JobRequest, JobStatus};
pub use poller::{DEFAULT_POLL_INTERVAL, StatusPoller};
pub use report::{CompletionReport, CorrelationIds, Outcome};
pub use reporter::{CallbackTransport, CompletionReporter, HttpCallbackTransport};
