//! Intelligence fetch pipeline: request building, resilient remote call,
//! sanitization. [`IntelPipeline::fetch_intelligence`] is the one operation
//! the rest of the application depends on; it never returns an error.

pub mod client;
pub mod request;
pub mod retry;
pub mod sanitize;

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::filters::FilterSelection;
use crate::model::Event;
use crate::reference::ReferenceData;

use self::client::{DynIntelClient, RemoteError};
use self::request::build_request;
use self::retry::{call_with_retry, RetryPolicy};
use self::sanitize::{sanitize_payload, DEFAULT_GROUNDING_URL_CAP};

pub const QUOTA_EXHAUSTED: &str = "QUOTA_EXHAUSTED";

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("intel_fetch_total", "Fetch cycles run against the model.");
        describe_counter!(
            "intel_fetch_errors_total",
            "Fetch cycles that ended with an error, by kind."
        );
        describe_counter!("intel_retry_total", "Backoff retries after rate limiting.");
        describe_counter!(
            "intel_malformed_payload_total",
            "Model payloads that did not parse as an event array."
        );
        describe_counter!(
            "intel_refresh_skipped_total",
            "Refresh triggers dropped because a fetch was already in flight."
        );
        describe_counter!("intel_poll_ticks_total", "Poller timer ticks.");
        describe_gauge!("intel_events_returned", "Events returned by the last fetch.");
        describe_gauge!("intel_last_fetch_ts", "Unix ts of the last completed fetch.");
        describe_histogram!("intel_fetch_duration_ms", "Fetch duration incl. retries, in ms.");
    });
}

/// Categorized pipeline failure. Serializes as `"QUOTA_EXHAUSTED"` or as the
/// plain error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    QuotaExhausted,
    Other(String),
}

impl FetchError {
    pub fn from_remote(e: &RemoteError) -> Self {
        if e.is_rate_limited() {
            FetchError::QuotaExhausted
        } else {
            FetchError::Other(e.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FetchError::QuotaExhausted => QUOTA_EXHAUSTED,
            FetchError::Other(msg) => msg,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FetchError::QuotaExhausted => "quota",
            FetchError::Other(_) => "other",
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FetchError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn failed(error: FetchError) -> Self {
        Self {
            events: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The remote client is injected so tests can substitute a fake.
pub struct IntelPipeline {
    client: DynIntelClient,
    refs: ReferenceData,
    policy: RetryPolicy,
    grounding_cap: usize,
    web_search: bool,
}

impl IntelPipeline {
    pub fn new(client: DynIntelClient) -> Self {
        Self {
            client,
            refs: ReferenceData::afro(),
            policy: RetryPolicy::default(),
            grounding_cap: DEFAULT_GROUNDING_URL_CAP,
            web_search: true,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reference(mut self, refs: ReferenceData) -> Self {
        self.refs = refs;
        self
    }

    pub fn with_grounding_cap(mut self, cap: usize) -> Self {
        self.grounding_cap = cap.max(1);
        self
    }

    pub fn without_web_search(mut self) -> Self {
        self.web_search = false;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.refs
    }

    pub async fn fetch_intelligence(&self, filters: &FilterSelection) -> FetchOutcome {
        ensure_metrics_described();
        counter!("intel_fetch_total").increment(1);
        let t0 = Instant::now();

        let mut request = build_request(filters, &self.refs);
        request.web_search = self.web_search;
        let client = &self.client;
        let req = &request;
        let result = call_with_retry(&self.policy, move |_| client.generate(req)).await;

        histogram!("intel_fetch_duration_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("intel_last_fetch_ts").set(chrono::Utc::now().timestamp() as f64);

        let outcome = match result {
            Ok(resp) => {
                let sanitized = sanitize_payload(
                    &resp.text,
                    &resp.grounding_urls,
                    &self.refs,
                    self.grounding_cap,
                );
                if sanitized.malformed {
                    counter!("intel_malformed_payload_total").increment(1);
                }
                info!(
                    target: "intel",
                    provider = self.client.provider_name(),
                    events = sanitized.events.len(),
                    dropped = sanitized.dropped,
                    grounding = resp.grounding_urls.len(),
                    "fetch complete"
                );
                FetchOutcome {
                    events: sanitized.events,
                    error: None,
                }
            }
            Err(e) => {
                let err = FetchError::from_remote(&e);
                warn!(
                    target: "intel",
                    provider = self.client.provider_name(),
                    error = %e,
                    category = err.kind(),
                    "fetch failed"
                );
                counter!("intel_fetch_errors_total", "kind" => err.kind()).increment(1);
                FetchOutcome::failed(err)
            }
        };

        gauge!("intel_events_returned").set(outcome.events.len() as f64);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_serializes_as_plain_string() {
        let quota = FetchOutcome::failed(FetchError::QuotaExhausted);
        let v = serde_json::to_value(&quota).unwrap();
        assert_eq!(v["error"], "QUOTA_EXHAUSTED");
        assert_eq!(v["events"], serde_json::json!([]));

        let other = FetchOutcome::failed(FetchError::Other("boom".into()));
        assert_eq!(serde_json::to_value(&other).unwrap()["error"], "boom");

        let ok = FetchOutcome::default();
        assert!(serde_json::to_value(&ok).unwrap().get("error").is_none());
    }

    #[test]
    fn remote_errors_map_to_categories() {
        let q = RemoteError::Status {
            status: 429,
            message: "RESOURCE_EXHAUSTED".into(),
        };
        assert_eq!(FetchError::from_remote(&q), FetchError::QuotaExhausted);
        let other = FetchError::from_remote(&RemoteError::MissingCredential);
        assert!(matches!(other, FetchError::Other(ref m) if m.contains("credential")));
    }
}
