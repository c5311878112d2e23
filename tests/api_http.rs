// tests/api_http.rs
//
// HTTP-level tests for the dashboard Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt as _; // for `oneshot`

use afro_sentinel::intel::client::MockClient;
use afro_sentinel::{api, AppState, IntelPipeline, IntelService};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_service() -> Arc<IntelService> {
    Arc::new(IntelService::new(IntelPipeline::new(Arc::new(
        MockClient::sample(),
    ))))
}

fn test_router(service: &Arc<IntelService>) -> Router {
    api::router(AppState::new(Arc::clone(service)), None)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

/// Poll until the background refresh spawned by a handler has finished.
async fn wait_idle(service: &IntelService) {
    for _ in 0..200 {
        if !service.is_in_flight() && service.snapshot().fetched_at.is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("refresh did not complete");
}

#[tokio::test]
async fn health_returns_ok() {
    let svc = test_service();
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, bytes) = send(test_router(&svc), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap(), "ok");
}

#[tokio::test]
async fn events_are_empty_before_first_fetch() {
    let svc = test_service();
    let (status, v) = get_json(test_router(&svc), "/api/events").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["events"], json!([]));
    assert!(v.get("error").is_none());
    assert!(v["fetched_at"].is_null());
    assert_eq!(v["schema_version"], "2");
}

#[tokio::test]
async fn manual_refresh_populates_snapshot_and_summary() {
    let svc = test_service();
    let req = Request::post("/api/refresh").body(Body::empty()).unwrap();
    let (status, bytes) = send(test_router(&svc), req).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], "started");

    wait_idle(&svc).await;

    let (_, events) = get_json(test_router(&svc), "/api/events").await;
    let list = events["events"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["type"], "ALERT");
    assert_eq!(list[0]["country_iso3"], "COD");

    let (status, summary) = get_json(test_router(&svc), "/api/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_events"], 2);
    assert_eq!(summary["alerts"], 1);
    assert_eq!(summary["signals"], 1);
    assert_eq!(summary["coverage_label"], "2/50");
    assert_eq!(summary["high_risk"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn refresh_while_in_flight_is_rejected() {
    let svc = test_service();
    let guard = svc.try_begin().expect("slot free");

    let req = Request::post("/api/refresh").body(Body::empty()).unwrap();
    let (status, bytes) = send(test_router(&svc), req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], "in_flight");

    drop(guard);
    let req = Request::post("/api/refresh").body(Body::empty()).unwrap();
    let (status, _) = send(test_router(&svc), req).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn put_filters_replaces_value_and_refreshes() {
    let svc = test_service();
    let body = json!({ "diseases": ["a00"], "countries": ["cod", "COD"], "grades": ["GRADE_2"] });
    let req = Request::put("/api/filters")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(test_router(&svc), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v, json!({ "diseases": ["A00"], "countries": ["COD"], "grades": ["GRADE_2"] }));

    let (_, current) = get_json(test_router(&svc), "/api/filters").await;
    assert_eq!(current, v);

    wait_idle(&svc).await;
    let (_, events) = get_json(test_router(&svc), "/api/events").await;
    assert_eq!(events["filters"], v);
}

#[tokio::test]
async fn reference_lists_filter_options() {
    let svc = test_service();
    let (status, v) = get_json(test_router(&svc), "/api/reference").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["countries"].as_array().unwrap().len(), 50);
    assert_eq!(v["diseases"].as_array().unwrap().len(), 23);
    assert_eq!(v["syndromes"].as_array().unwrap().len(), 10);
    assert!(v["syndromes"].as_array().unwrap().contains(&json!("AWD")));
    assert_eq!(v["source_platforms"].as_array().unwrap().len(), 10);
    assert_eq!(v["languages"].as_array().unwrap().len(), 10);
    assert_eq!(v["grades"][0], json!({ "value": "GRADE_1", "label": "Grade 1" }));
    assert_eq!(v["event_types"], json!(["ALERT", "SIGNAL"]));
}

#[tokio::test]
async fn metrics_route_absent_without_handle() {
    let svc = test_service();
    let req = Request::get("/metrics").body(Body::empty()).unwrap();
    let (status, _) = send(test_router(&svc), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
