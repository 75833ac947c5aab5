//! Job-control service interface.
//!
//! The [`JobControl`] trait is the narrow contract the bridge consumes from
//! the external build service:
//!
//! ```text
//!   start_build() ──→ get_builds() ──→ get_builds() ──→ ...
//!     (once)            (poll)           (poll)
//! ```
//!
//! ## Method table
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `start_build()` | async | yes | `BridgeResult<JobHandle>` |
//! | `get_builds()` | async | yes | `BridgeResult<Vec<JobRecord>>` |
//! | `start()` | async | provided | `BridgeResult<JobHandle>` |
//! | `status()` | async | provided | `BridgeResult<JobStatus>` |
//!
//! [`HttpJobControl`] implements the trait over a JSON HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::job::{JobHandle, JobRecord, JobRequest, JobStatus};

/// Trait for job-control services.
///
/// # Contract
///
/// - `start_build()` creates exactly one job per call and MUST NOT retry.
/// - `get_builds()` returns one record per known id; unknown ids are
///   omitted rather than reported as errors.
#[async_trait]
pub trait JobControl: Send + Sync {
    /// Name of this service, for logs.
    fn name(&self) -> &str;

    /// Start one job for the request's definition.
    async fn start_build(&self, request: &JobRequest) -> BridgeResult<JobHandle>;

    /// Fetch status records for the given handles.
    async fn get_builds(&self, handles: &[JobHandle]) -> BridgeResult<Vec<JobRecord>>;

    /// Job Trigger: start the job and return its handle.
    ///
    /// Any failure is surfaced as [`BridgeError::Trigger`].
    async fn start(&self, request: &JobRequest) -> BridgeResult<JobHandle> {
        match self.start_build(request).await {
            Ok(handle) => {
                info!(
                    service = self.name(),
                    definition = %request.job_definition_id,
                    job = %handle,
                    "Job started"
                );
                Ok(handle)
            }
            Err(e) => {
                warn!(
                    service = self.name(),
                    definition = %request.job_definition_id,
                    error = %e,
                    "Job could not be started"
                );
                if matches!(e, BridgeError::Trigger(_)) {
                    Err(e)
                } else {
                    Err(BridgeError::Trigger(e.to_string()))
                }
            }
        }
    }

    /// Query the status of a single job.
    ///
    /// A response without a record for `handle` is a
    /// [`BridgeError::Lookup`].
    async fn status(&self, handle: &JobHandle) -> BridgeResult<JobStatus> {
        let records = self.get_builds(std::slice::from_ref(handle)).await?;
        records
            .into_iter()
            .find(|record| record.id == handle.0)
            .map(|record| record.status)
            .ok_or_else(|| BridgeError::lookup(handle, "no record returned"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartBuildRequest<'a> {
    project_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct StartBuildResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct BatchGetRequest<'a> {
    ids: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct BatchGetResponse {
    #[serde(default)]
    builds: Vec<BuildEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildEntry {
    id: String,
    build_status: JobStatus,
}

/// JSON-over-HTTP job-control client.
///
/// - `POST {base}/builds` with `{"projectName": ...}` returns `{"id": ...}`
/// - `POST {base}/builds/batch-get` with `{"ids": [...]}` returns
///   `{"builds": [{"id": ..., "buildStatus": ...}]}`
#[derive(Debug, Clone)]
pub struct HttpJobControl {
    base_url: String,
    client: Client,
}

impl HttpJobControl {
    /// Create a client for the service at `base_url` whose requests time
    /// out after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Configuration(format!("job-control client: {e}")))?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client with a preconfigured `reqwest::Client`.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Base URL of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl JobControl for HttpJobControl {
    fn name(&self) -> &str {
        "http"
    }

    async fn start_build(&self, request: &JobRequest) -> BridgeResult<JobHandle> {
        let url = format!("{}/builds", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&StartBuildRequest {
                project_name: &request.job_definition_id,
            })
            .send()
            .await
            .map_err(|e| BridgeError::Trigger(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Trigger(format!(
                "status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let started: StartBuildResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Trigger(format!("malformed start response: {e}")))?;
        Ok(JobHandle::new(started.id))
    }

    async fn get_builds(&self, handles: &[JobHandle]) -> BridgeResult<Vec<JobRecord>> {
        // Lookup errors name the first handle; the bridge only ever asks for one.
        let Some(first) = handles.first() else {
            return Ok(Vec::new());
        };

        let url = format!("{}/builds/batch-get", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&BatchGetRequest {
                ids: handles.iter().map(JobHandle::as_str).collect(),
            })
            .send()
            .await
            .map_err(|e| BridgeError::lookup(first, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::lookup(
                first,
                format!("status {}: {}", status.as_u16(), body),
            ));
        }

        let batch: BatchGetResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::lookup(first, format!("malformed status response: {e}")))?;
        debug!(requested = handles.len(), returned = batch.builds.len(), "Fetched job records");

        Ok(batch
            .builds
            .into_iter()
            .map(|entry| JobRecord {
                id: entry.id,
                status: entry.build_status,
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    /// Scripted job-control service: fixed start outcome, then one status
    /// response per query.
    pub(crate) struct ScriptedControl {
        start: Mutex<Option<BridgeResult<JobHandle>>>,
        statuses: Mutex<VecDeque<Option<JobStatus>>>,
        pub(crate) starts: AtomicUsize,
        pub(crate) queries: AtomicUsize,
    }

    impl ScriptedControl {
        pub(crate) fn new(handle: &str, statuses: &[JobStatus]) -> Self {
            Self::with_records(handle, statuses.iter().copied().map(Some).collect())
        }

        /// `None` entries answer with an empty record list.
        pub(crate) fn with_records(handle: &str, statuses: Vec<Option<JobStatus>>) -> Self {
            Self {
                start: Mutex::new(Some(Ok(JobHandle::new(handle)))),
                statuses: Mutex::new(statuses.into()),
                starts: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing_start(error: BridgeError) -> Self {
            Self {
                start: Mutex::new(Some(Err(error))),
                statuses: Mutex::new(VecDeque::new()),
                starts: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
            }
        }

        pub(crate) fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }

        pub(crate) fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobControl for ScriptedControl {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn start_build(&self, _request: &JobRequest) -> BridgeResult<JobHandle> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.start
                .lock()
                .unwrap()
                .take()
                .expect("start_build called more than once")
        }

        async fn get_builds(&self, handles: &[JobHandle]) -> BridgeResult<Vec<JobRecord>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let next = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .expect("status script exhausted");
            Ok(next
                .map(|status| JobRecord {
                    id: handles[0].0.clone(),
                    status,
                })
                .into_iter()
                .collect())
        }
    }

    pub(crate) async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub(crate) fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_start_maps_other_errors_to_trigger() {
        let control = ScriptedControl::failing_start(BridgeError::Configuration("x".into()));
        let err = control.start(&JobRequest::new("copy")).await.unwrap_err();
        assert!(matches!(err, BridgeError::Trigger(msg) if msg.contains("x")));
        assert_eq!(control.starts(), 1);
    }

    #[tokio::test]
    async fn test_status_missing_record_is_lookup_error() {
        let control = ScriptedControl::with_records("b-7", vec![None]);
        let err = control.status(&JobHandle::new("b-7")).await.unwrap_err();
        assert!(matches!(err, BridgeError::Lookup { ref handle, .. } if handle.as_str() == "b-7"));
    }

    #[tokio::test]
    async fn test_http_start_and_status() {
        let app = Router::new()
            .route(
                "/builds",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["projectName"], "image-copy");
                    Json(json!({ "id": "image-copy:42" }))
                }),
            )
            .route(
                "/builds/batch-get",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["ids"], json!(["image-copy:42"]));
                    Json(json!({
                        "builds": [{ "id": "image-copy:42", "buildStatus": "IN_PROGRESS" }]
                    }))
                }),
            );
        let base = serve(app).await;
        let control = HttpJobControl::with_client(format!("{base}/"), local_client());
        assert_eq!(control.base_url(), base);

        let handle = control.start(&JobRequest::new("image-copy")).await.unwrap();
        assert_eq!(handle.as_str(), "image-copy:42");
        assert_eq!(control.status(&handle).await.unwrap(), JobStatus::InProgress);
    }

    #[tokio::test]
    async fn test_http_start_rejected() {
        let app = Router::new().route(
            "/builds",
            post(|| async { (StatusCode::FORBIDDEN, "AccessDenied: not authorized") }),
        );
        let base = serve(app).await;
        let control = HttpJobControl::with_client(base, local_client());

        let err = control.start(&JobRequest::new("image-copy")).await.unwrap_err();
        match err {
            BridgeError::Trigger(msg) => {
                assert!(msg.contains("403"));
                assert!(msg.contains("AccessDenied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_status_query_times_out() {
        let app = Router::new().route(
            "/builds/batch-get",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Json(json!({ "builds": [] }))
            }),
        );
        let base = serve(app).await;
        let control = HttpJobControl::new(base, Duration::from_millis(200)).unwrap();

        let started = std::time::Instant::now();
        let err = control.status(&JobHandle::new("b-10")).await.unwrap_err();

        assert!(matches!(err, BridgeError::Lookup { ref handle, .. } if handle.as_str() == "b-10"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_http_status_empty_batch() {
        let app = Router::new().route(
            "/builds/batch-get",
            post(|| async { Json(json!({ "builds": [] })) }),
        );
        let base = serve(app).await;
        let control = HttpJobControl::with_client(base, local_client());

        let err = control.status(&JobHandle::new("b-3")).await.unwrap_err();
        assert!(err.to_string().contains("b-3"));
    }
}
