//! # DOP Worker
//!
//! `dop-worker [CONFIG]`. The configuration path comes from the first
//! argument or from `DOP_WORKER_CONFIG`.
//!
//! ## Startup Sequence
//!
//! 1. Resolve and parse the configuration
//! 2. Install the tracing subscriber (`RUST_LOG` wins over `loglevel`)
//! 3. Start the worker (providers, macros, pipelines)
//! 4. Receive until stdin closes or Ctrl+C
//! 5. Close every provider

use anyhow::{Context, Result};
use shared_types::ConfigMap;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use worker_runtime::container::{resolve_config_path, WorkerConfig};
use worker_runtime::WorkerRuntime;

/// Default directive for the `loglevel` of the logging provider.
fn level_directive(config: &WorkerConfig) -> &'static str {
    let settings = ConfigMap::parse(&config.logging_provider.configuration);
    match settings.get_int(&["loglevel", "ll"], 4) {
        i64::MIN..=0 => "off",
        1 | 2 => "error",
        3 => "warn",
        4 => "info",
        _ => "debug",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = resolve_config_path(std::env::args().nth(1)).context("No configuration file given")?;
    let config = WorkerConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(&config)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut runtime = WorkerRuntime::from_config(config).context("Worker start-up failed")?;

    let stop = runtime.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("[Worker] Ctrl+C received");
            if stop.send(true).is_err() {
                warn!("[Worker] Receive loop already stopped");
            }
        }
    });

    info!("Worker is running. Press Ctrl+C to stop.");
    let handled = runtime.run().await;
    info!(handled, "[Worker] Receive loop ended");

    let failures = runtime.shutdown();
    if !failures.is_empty() {
        warn!(failures = failures.len(), "[Worker] Some providers failed to close");
    }
    Ok(())
}
