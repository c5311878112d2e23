// src/config/intel.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs, path::Path};
use tracing::{info, warn};

use crate::intel::client::{
    DisabledClient, DynIntelClient, GeminiClient, MockClient, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
use crate::intel::retry::{
    RetryPolicy, DEFAULT_INITIAL_DELAY_MS, DEFAULT_JITTER_FACTOR, DEFAULT_MAX_DELAY_MS,
    DEFAULT_MAX_RETRIES,
};
use crate::intel::sanitize::DEFAULT_GROUNDING_URL_CAP;
use crate::intel::IntelPipeline;

pub const DEFAULT_CONFIG_PATH: &str = "config/intel.toml";
pub const ENV_CONFIG_PATH: &str = "INTEL_CONFIG_PATH";

fn default_true() -> bool {
    true
}
fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_initial_delay_ms() -> u64 {
    DEFAULT_INITIAL_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
fn default_jitter() -> f64 {
    DEFAULT_JITTER_FACTOR
}
fn default_poll_interval_secs() -> u64 {
    600
}
fn default_request_timeout_secs() -> u64 {
    90
}
fn default_grounding_cap() -> usize {
    DEFAULT_GROUNDING_URL_CAP
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// "gemini" | "mock" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// "ENV" means: read from API_KEY (or GEMINI_API_KEY)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter_factor: f64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_grounding_cap")]
    pub grounding_url_cap: usize,
    #[serde(default = "default_true")]
    pub web_search: bool,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: default_api_key(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            grounding_url_cap: DEFAULT_GROUNDING_URL_CAP,
            web_search: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl IntelConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: IntelConfig = toml::from_str(s).context("parsing intel config")?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading intel config from {}", path.display()))?;
        let cfg = Self::from_toml_str(&data)?;
        Ok(cfg.finish())
    }

    /// Load using env var + fallbacks:
    /// 1) $INTEL_CONFIG_PATH (must exist)
    /// 2) config/intel.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let path = Path::new(&p);
            if !path.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(path);
        }
        let default = Path::new(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(default);
        }
        Ok(Self::default().finish())
    }

    /// Apply env overrides, resolve the credential and sanitize ranges.
    pub fn finish(mut self) -> Self {
        if let Ok(p) = env::var("INTEL_PROVIDER") {
            self.provider = p;
        }
        if let Ok(m) = env::var("INTEL_MODEL") {
            self.model = m;
        }
        if let Some(v) = env_parse("INTEL_MAX_RETRIES") {
            self.max_retries = v;
        }
        if let Some(v) = env_parse("INTEL_INITIAL_DELAY_MS") {
            self.initial_delay_ms = v;
        }
        if let Some(v) = env_parse("INTEL_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = v;
        }

        self.provider = self.provider.trim().to_lowercase();

        // A missing key is not fatal: every remote call will fail instead.
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("API_KEY")
                .or_else(|_| env::var("GEMINI_API_KEY"))
                .unwrap_or_default();
        }

        if !self.jitter_factor.is_finite() {
            self.jitter_factor = DEFAULT_JITTER_FACTOR;
        }
        self.jitter_factor = self.jitter_factor.clamp(0.0, 1.0);
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.grounding_url_cap = self.grounding_url_cap.max(1);
        if self.max_delay_ms < self.initial_delay_ms {
            self.max_delay_ms = self.initial_delay_ms;
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter_factor: self.jitter_factor,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Build the remote client.
    ///
    /// * If `INTEL_TEST_MODE=mock`, returns the deterministic mock client.
    /// * Else if disabled, returns a client that fails every call.
    /// * Else builds the configured provider.
    pub fn build_client(&self) -> Result<DynIntelClient> {
        if env::var("INTEL_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
            return Ok(Arc::new(MockClient::sample()));
        }
        if !self.enabled {
            return Ok(Arc::new(DisabledClient));
        }
        match self.provider.as_str() {
            "gemini" => {
                let client = GeminiClient::new(
                    &self.endpoint,
                    &self.model,
                    self.api_key.clone(),
                    Duration::from_secs(self.request_timeout_secs),
                )
                .context("building gemini client")?;
                Ok(Arc::new(client))
            }
            "mock" => Ok(Arc::new(MockClient::sample())),
            "disabled" => Ok(Arc::new(DisabledClient)),
            other => anyhow::bail!("Unsupported provider in config: {other}"),
        }
    }

    pub fn build_pipeline(&self) -> Result<IntelPipeline> {
        // Safe diagnostics: never log the key itself.
        info!(
            provider = %self.provider,
            model = %self.model,
            enabled = self.enabled,
            key_len = self.api_key.len(),
            "intel config loaded"
        );
        if self.enabled && self.provider == "gemini" && self.api_key.is_empty() {
            warn!("API_KEY is not set; every remote call will fail");
        }
        let client = self.build_client()?;
        let mut pipeline = IntelPipeline::new(client)
            .with_policy(self.retry_policy())
            .with_grounding_cap(self.grounding_url_cap);
        if !self.web_search {
            pipeline = pipeline.without_web_search();
        }
        Ok(pipeline)
    }
}
