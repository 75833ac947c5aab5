//! Bridge configuration.
//!
//! Supplied out-of-band through the environment:
//! - `JOB_DEFINITION_ID` (required)
//! - `JOB_CONTROL_URL` (required)
//! - `POLL_INTERVAL_SECS` (optional, default: 5)
//! - `CALLBACK_TIMEOUT_SECS` (optional, default: 30)
//! - `JOB_CONTROL_TIMEOUT_SECS` (optional, default: 30)

use std::time::Duration;

use crate::error::{BridgeError, BridgeResult};
use crate::job::JobRequest;
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Default per-request timeout for the callback PUT.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-request timeout for job-control calls.
pub const DEFAULT_JOB_CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Job definition started on every Create/Update.
    pub job_definition_id: String,
    /// Base URL of the job-control service.
    pub job_control_url: String,
    /// Delay between status queries.
    pub poll_interval: Duration,
    /// Timeout of the callback request.
    pub callback_timeout: Duration,
    /// Timeout of each start or status request.
    pub job_control_timeout: Duration,
}

impl BridgeConfig {
    /// Creates a configuration with default timings.
    pub fn new(job_definition_id: impl Into<String>, job_control_url: impl Into<String>) -> Self {
        Self {
            job_definition_id: job_definition_id.into(),
            job_control_url: job_control_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            job_control_timeout: DEFAULT_JOB_CONTROL_TIMEOUT,
        }
    }

    /// Creates configuration from the process environment.
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BridgeResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| BridgeError::Configuration(format!("{key} is not set")))
        };
        let seconds = |key: &str, default: Duration| -> BridgeResult<Duration> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                    BridgeError::Configuration(format!("{key} must be whole seconds, got {raw:?}"))
                }),
            }
        };

        let mut config = Self::new(required("JOB_DEFINITION_ID")?, required("JOB_CONTROL_URL")?);
        config.poll_interval = seconds("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL)?;
        config.callback_timeout = seconds("CALLBACK_TIMEOUT_SECS", DEFAULT_CALLBACK_TIMEOUT)?;
        config.job_control_timeout =
            seconds("JOB_CONTROL_TIMEOUT_SECS", DEFAULT_JOB_CONTROL_TIMEOUT)?;

        if config.poll_interval.is_zero() {
            return Err(BridgeError::Configuration(
                "POLL_INTERVAL_SECS must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    /// Job request built from this configuration.
    pub fn job_request(&self) -> JobRequest {
        JobRequest::new(self.job_definition_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("JOB_DEFINITION_ID", "image-copy"),
            ("JOB_CONTROL_URL", "http://builds.internal"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.callback_timeout, Duration::from_secs(30));
        assert_eq!(config.job_control_timeout, Duration::from_secs(30));
        assert_eq!(config.job_request(), JobRequest::new("image-copy"));
    }

    #[test]
    fn test_overrides() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("JOB_DEFINITION_ID", "image-copy"),
            ("JOB_CONTROL_URL", "http://builds.internal"),
            ("POLL_INTERVAL_SECS", "10"),
            ("CALLBACK_TIMEOUT_SECS", " 5 "),
            ("JOB_CONTROL_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.callback_timeout, Duration::from_secs(5));
        assert_eq!(config.job_control_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_missing_required() {
        let err = BridgeConfig::from_lookup(lookup(&[("JOB_CONTROL_URL", "http://x")])).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(msg) if msg.contains("JOB_DEFINITION_ID")));

        let err = BridgeConfig::from_lookup(lookup(&[
            ("JOB_DEFINITION_ID", "  "),
            ("JOB_CONTROL_URL", "http://x"),
        ]))
        .unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        for value in ["fast", "0"] {
            let err = BridgeConfig::from_lookup(lookup(&[
                ("JOB_DEFINITION_ID", "image-copy"),
                ("JOB_CONTROL_URL", "http://x"),
                ("POLL_INTERVAL_SECS", value),
            ]))
            .unwrap_err();
            assert!(matches!(err, BridgeError::Configuration(msg) if msg.contains("POLL_INTERVAL_SECS")));
        }
    }
}
