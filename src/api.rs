use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::filters::FilterSelection;
use crate::metrics::Metrics;
use crate::model::{AlertLevel, EventKind, Grade, WorkflowStatus};
use crate::service::{IntelService, Snapshot, Trigger};
use crate::summary::DashboardSummary;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IntelService>,
}

impl AppState {
    pub fn new(service: Arc<IntelService>) -> Self {
        Self { service }
    }
}

/// Build the dashboard API. `/metrics` is mounted only when a handle is given.
pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let api = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/events", get(events))
        .route("/api/summary", get(summary))
        .route("/api/filters", get(get_filters).put(put_filters))
        .route("/api/refresh", post(refresh))
        .route("/api/reference", get(reference))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => api.merge(m.router()),
        None => api,
    }
}

async fn events(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.service.snapshot())
}

async fn summary(State(state): State<AppState>) -> Json<DashboardSummary> {
    let snap = state.service.snapshot();
    Json(DashboardSummary::from_events(&snap.events))
}

async fn get_filters(State(state): State<AppState>) -> Json<FilterSelection> {
    Json(state.service.filters())
}

/// Replace the filter value and kick off a refresh in the background.
async fn put_filters(
    State(state): State<AppState>,
    Json(body): Json<FilterSelection>,
) -> Json<FilterSelection> {
    state.service.set_filters(body);
    let svc = Arc::clone(&state.service);
    tokio::spawn(async move {
        svc.refresh(Trigger::FilterChange).await;
    });
    Json(state.service.filters())
}

async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.try_begin() {
        Some(guard) => {
            let svc = Arc::clone(&state.service);
            tokio::spawn(async move {
                svc.run_with(guard, Trigger::User).await;
            });
            (StatusCode::ACCEPTED, Json(json!({ "status": "started" })))
        }
        None => {
            counter!("intel_refresh_skipped_total").increment(1);
            tracing::info!(target: "api", "manual refresh rejected: fetch in flight");
            (StatusCode::CONFLICT, Json(json!({ "status": "in_flight" })))
        }
    }
}

async fn reference(State(state): State<AppState>) -> Json<serde_json::Value> {
    let refs = state.service.pipeline().reference();
    let grades: Vec<_> = Grade::ALL
        .iter()
        .map(|g| json!({ "value": g.as_str(), "label": g.label() }))
        .collect();
    Json(json!({
        "countries": refs.countries,
        "diseases": refs.diseases,
        "syndromes": refs.syndromes,
        "source_platforms": refs.source_platforms,
        "languages": refs.languages,
        "grades": grades,
        "event_types": EventKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
        "alert_levels": AlertLevel::ALL.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
        "statuses": WorkflowStatus::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
    }))
}
