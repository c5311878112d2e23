//! AFRO Sentinel: binary entrypoint.
//! Loads the intel config, starts the background poller and serves the
//! dashboard API.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use afro_sentinel::config::IntelConfig;
use afro_sentinel::metrics::Metrics;
use afro_sentinel::scheduler::spawn_poller;
use afro_sentinel::{api, init_tracing, AppState, IntelService};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = IntelConfig::load_default().context("loading intel config")?;
    let pipeline = cfg.build_pipeline().context("building intel pipeline")?;
    let service = Arc::new(IntelService::new(pipeline));

    let metrics = Metrics::init(cfg.poll_interval_secs)?;

    // Runs for the life of the process.
    let _poller = spawn_poller(Arc::clone(&service), cfg.poll_interval());
    tracing::info!(
        target: "scheduler",
        every_secs = cfg.poll_interval().as_secs(),
        "poller started"
    );

    let router = api::router(AppState::new(service), Some(&metrics));
    Ok(router.into())
}
