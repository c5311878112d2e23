// src/lib.rs
// Public library surface for the server binary, the probe and integration tests.

pub mod api;
pub mod config;
pub mod filters;
pub mod intel;
pub mod metrics;
pub mod model;
pub mod reference;
pub mod scheduler;
pub mod service;
pub mod summary;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::filters::FilterSelection;
pub use crate::intel::{FetchError, FetchOutcome, IntelPipeline};
pub use crate::model::Event;
pub use crate::service::IntelService;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "afro_sentinel=info,warn";

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter; `LOG_FORMAT=json` switches to JSON lines. A second call is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
