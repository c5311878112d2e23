//! Remote model clients: the trait the pipeline depends on, the Gemini
//! `generateContent` client, and the disabled/mock/scripted stand-ins used
//! when AI is switched off and in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intel::request::IntelRequest;

/// Raw model answer: the text payload plus any grounding citations the
/// service attached from its own web search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteResponse {
    pub text: String,
    pub grounding_urls: Vec<String>,
}

impl RemoteResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounding_urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("missing API credential (set API_KEY)")]
    MissingCredential,
    #[error("remote returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("undecodable response: {0}")]
    Decode(String),
    #[error("intel client is disabled")]
    Disabled,
}

#[async_trait]
pub trait IntelClient: Send + Sync {
    async fn generate(&self, request: &IntelRequest) -> Result<RemoteResponse, RemoteError>;
    /// Provider name for diagnostics/logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynIntelClient = Arc<dyn IntelClient>;

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent("afro-sentinel/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            timeout,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReq<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a serde_json::Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}

#[derive(Deserialize, Default)]
struct RespPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Default)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Deserialize, Default)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Build a status error; the service's status string (e.g. RESOURCE_EXHAUSTED)
/// is kept in the message so classification can see it.
fn status_error(status: u16, body: &str) -> RemoteError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.status.is_empty() => {
            format!("{}: {}", env.error.status, env.error.message)
        }
        Ok(env) => env.error.message,
        Err(_) => body.chars().take(300).collect(),
    };
    RemoteError::Status { status, message }
}

fn into_remote_response(body: GenerateResp) -> RemoteResponse {
    let Some(first) = body.candidates.into_iter().next() else {
        return RemoteResponse::default();
    };
    let text = first
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    let grounding_urls = first
        .grounding_metadata
        .map(|g| {
            g.grounding_chunks
                .into_iter()
                .filter_map(|c| c.web.and_then(|w| w.uri))
                .collect()
        })
        .unwrap_or_default();
    RemoteResponse {
        text,
        grounding_urls,
    }
}

#[async_trait]
impl IntelClient for GeminiClient {
    async fn generate(&self, request: &IntelRequest) -> Result<RemoteResponse, RemoteError> {
        if self.api_key.trim().is_empty() {
            return Err(RemoteError::MissingCredential);
        }

        let tools = if request.web_search {
            vec![serde_json::json!({ "google_search": {} })]
        } else {
            Vec::new()
        };
        let req = GenerateReq {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.instruction,
                }],
            }],
            tools,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.schema,
            },
        };

        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout(self.timeout)
                } else {
                    RemoteError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }

        let parsed: GenerateResp =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(into_remote_response(parsed))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Stand-ins
// ------------------------------------------------------------

/// Fails every call; used when intel is disabled in config.
pub struct DisabledClient;

#[async_trait]
impl IntelClient for DisabledClient {
    async fn generate(&self, _request: &IntelRequest) -> Result<RemoteResponse, RemoteError> {
        Err(RemoteError::Disabled)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic client returning a fixed payload.
#[derive(Clone)]
pub struct MockClient {
    pub fixed: RemoteResponse,
}

impl MockClient {
    /// Two plausible events, enough to drive the dashboard locally.
    pub fn sample() -> Self {
        let text = serde_json::json!([
            {
                "id": "mock-001",
                "type": "ALERT",
                "country_iso3": "COD",
                "country_name": "Democratic Republic of the Congo",
                "admin1": "Equateur",
                "disease": { "code": "A00", "name": "Cholera", "syndrome": "AWD" },
                "title": "Cholera cases rising in Mbandaka",
                "summary": "Health zone reports a sharp rise in acute watery diarrhoea admissions.",
                "alert_level": "HIGH",
                "grade": "GRADE_2",
                "status": "VALIDATED",
                "confidence": 0.82,
                "epidemiology": { "cases": 340, "deaths": 12, "cfr": "3.5%", "severity": "HIGH" },
                "community_pulse": {
                    "informal_signal_volume": "high",
                    "sentiment": "concern",
                    "vernacular_terms": ["kosuba mai"],
                    "vernacular_mapping": [{ "term": "kosuba mai", "symptom": "watery diarrhoea" }],
                    "signal_timeline": [
                        { "timestamp": "2025-03-01T00:00:00Z", "volume": 20 },
                        { "timestamp": "2025-03-02T00:00:00Z", "volume": 65 }
                    ]
                },
                "evidence": {
                    "signal_count": 14,
                    "source_types": ["Local radio transcripts", "WHO Disease Outbreak News"],
                    "top_urls": ["https://www.who.int/emergencies/disease-outbreak-news"]
                },
                "field_readiness": ["Pre-position cholera kits", "Activate ORPs in affected health zones"],
                "created_at": "2025-03-02T08:00:00Z"
            },
            {
                "id": "mock-002",
                "type": "SIGNAL",
                "country_iso3": "NGA",
                "country_name": "Nigeria",
                "title": "Unverified reports of fever deaths in Edo",
                "summary": "Social media posts describe fever with bleeding; Lassa fever suspected.",
                "alert_level": "WATCH",
                "grade": "UNGRADED",
                "status": "TRIAGE",
                "confidence": 0.41
            }
        ]);
        Self {
            fixed: RemoteResponse::text(text.to_string()),
        }
    }
}

#[async_trait]
impl IntelClient for MockClient {
    async fn generate(&self, _request: &IntelRequest) -> Result<RemoteResponse, RemoteError> {
        Ok(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Replays a queue of results and counts calls. Once the queue is drained
/// the last result repeats.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<RemoteResponse, RemoteError>>>,
    last: Mutex<Option<Result<RemoteResponse, RemoteError>>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<RemoteResponse, RemoteError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(result: Result<RemoteResponse, RemoteError>) -> Self {
        Self::new(vec![result])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntelClient for ScriptedClient {
    async fn generate(&self, _request: &IntelRequest) -> Result<RemoteResponse, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match next {
            Some(r) => {
                *last = Some(r.clone());
                r
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(RemoteError::Transport("script exhausted".into()))),
        }
    }
    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
