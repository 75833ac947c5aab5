//! Image Sync Bridge entry point
//!
//! Runs one invocation: reads the orchestrator's event, starts the copy job,
//! waits for it, reports the outcome, and exits non-zero on any failure.
//! Configuration errors are reported FAILED to the event's callback.
//!
//! If the wall-clock budget expires mid-poll the process exits without
//! sending a report and the orchestrator falls back to its own timeout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_sync_bridge::{
    BridgeConfig, CompletionReporter, DEFAULT_CALLBACK_TIMEOUT, HttpCallbackTransport,
    HttpJobControl, ImageSyncBridge, InvocationContext, InvocationEvent, StatusPoller, finalize,
};

#[derive(Debug, Parser)]
#[command(name = "image-sync-bridge", version, about)]
struct Args {
    /// Path to the invocation event JSON (`-` reads stdin)
    #[arg(long, env = "INVOCATION_EVENT", default_value = "-")]
    event: PathBuf,

    /// Log stream of this invocation, used as the default physical resource id
    #[arg(long, env = "LOG_STREAM_NAME")]
    log_stream_name: String,

    /// Wall-clock budget of the invocation, in seconds
    #[arg(long, env = "INVOCATION_TIMEOUT_SECS", default_value_t = 300)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_sync_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let event = read_event(&args.event).await?;
    let budget = Duration::from_secs(args.timeout_secs);
    let context = InvocationContext::with_budget(args.log_stream_name, budget);

    // The reporter comes first so a broken configuration is still reported.
    let config = BridgeConfig::from_env();
    let callback_timeout = config
        .as_ref()
        .map_or(DEFAULT_CALLBACK_TIMEOUT, |config| config.callback_timeout);
    let reporter = CompletionReporter::new(
        HttpCallbackTransport::new(callback_timeout).context("Failed to build callback client")?,
    );

    let setup = config.and_then(|config| {
        let control = HttpJobControl::new(config.job_control_url.clone(), config.job_control_timeout)?;
        Ok((config, control))
    });
    let (config, control) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            return finalize(&reporter, &event, &context, Err(e))
                .await
                .map(|_| ())
                .context("Failed to load configuration");
        }
    };
    info!(
        "Loaded configuration: job_definition_id={}, job_control_url={}",
        config.job_definition_id,
        control.base_url()
    );

    let bridge = ImageSyncBridge::new(
        Arc::new(control),
        StatusPoller::new(config.poll_interval),
        reporter,
        config.job_request(),
    );

    let completion = bridge
        .invoke_within(&event, &context, budget)
        .await
        .context("Invocation failed")?;
    info!(?completion, "Invocation succeeded");
    Ok(())
}

async fn read_event(path: &Path) -> Result<InvocationEvent> {
    let text = if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read event from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event from {}", path.display()))?
    };
    Ok(InvocationEvent::from_json(&text)?)
}
