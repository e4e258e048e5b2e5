//! cotrace agent binary.
//!
//! Loads configuration, opens the stores, and runs the scheduled cycles:
//! retention eviction, encounter batch upload, and state machine timer
//! ticks. Transient backend failures are logged and retried on the next
//! scheduled cycle; nothing is deleted until an upload is confirmed.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info};
use url::Url;

use cotrace_agent::{logging, LogNotifier, StatusOrchestrator, Uploader};
use cotrace_client::{ColocationApi, ReqwestTransport};
use cotrace_core::{CotraceConfig, EventStore, ExternalEvent, KeyStore, StateWindows, Storage};

/// Timer tick period for state re-evaluation.
const TIMER_TICK: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("COTRACE_ENV").as_deref() == Ok("production");
    logging::init(is_production)?;

    info!("starting cotrace-agent");

    let config_path = CotraceConfig::default_path()?;
    let config = CotraceConfig::load_or_default(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    let base_url = Url::parse(&config.base_url).context("parsing base_url")?;

    let storage = Storage::default_location()?;
    let events = EventStore::open(storage.clone()).context("opening event store")?;
    let keys = KeyStore::open(storage.clone()).context("opening key store")?;

    let windows = StateWindows::from_config(&config.windows);
    let orchestrator = StatusOrchestrator::load(storage, windows, LogNotifier, Utc::now())
        .context("loading persisted user state")?;

    let transport = ReqwestTransport::new()?;
    let colocation = ColocationApi::new(base_url, transport);
    let uploader = Uploader::new(&events, &keys, &colocation, config.encoding);

    let mut upload_timer = interval(Duration::from_secs(config.upload_interval_mins * 60));
    let mut eviction_timer = interval(Duration::from_secs(config.eviction_interval_mins * 60));
    let mut state_timer = interval(TIMER_TICK);

    info!(encoding = ?config.encoding, "agent running");

    loop {
        tokio::select! {
            _ = upload_timer.tick() => {
                match uploader.run_once().await {
                    Ok(outcome) => info!(?outcome, "upload cycle finished"),
                    // Transient by assumption; the next cycle is the retry.
                    Err(e) => error!(error = %e, "upload cycle failed"),
                }
            }
            _ = eviction_timer.tick() => {
                if let Err(e) = cotrace_agent::run_eviction(
                    &events,
                    config.retention_window(),
                    Utc::now(),
                ) {
                    error!(error = %e, "eviction cycle failed");
                }
            }
            _ = state_timer.tick() => {
                if let Err(e) = orchestrator.apply(&ExternalEvent::TimerElapsed, Utc::now()) {
                    error!(error = %e, "state re-evaluation failed");
                }
            }
        }
    }
}
