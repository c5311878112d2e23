//! Domain model for surveillance events (alerts and signals).
//!
//! This is the union of every schema revision the dashboard has shipped;
//! [`SCHEMA_VERSION`] is published with each snapshot so consumers can tell
//! which shape they are reading.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "2";

/// Parses an enum from model output: case-insensitive, tolerant of spaces
/// and dashes in place of underscores.
fn loose_key(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Alert,
    Signal,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Alert, EventKind::Signal];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Alert => "ALERT",
            EventKind::Signal => "SIGNAL",
        }
    }

    pub fn parse_loose(s: &str) -> Option<Self> {
        match loose_key(s).as_str() {
            "ALERT" => Some(EventKind::Alert),
            "SIGNAL" => Some(EventKind::Signal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Watch,
    Warning,
    High,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 3] = [AlertLevel::Watch, AlertLevel::Warning, AlertLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Watch => "WATCH",
            AlertLevel::Warning => "WARNING",
            AlertLevel::High => "HIGH",
        }
    }

    pub fn parse_loose(s: &str) -> Option<Self> {
        match loose_key(s).as_str() {
            "WATCH" => Some(AlertLevel::Watch),
            "WARNING" => Some(AlertLevel::Warning),
            "HIGH" => Some(AlertLevel::High),
            _ => None,
        }
    }
}

/// WHO grading. Grade 1 is a limited single-country event, Grade 3 a
/// regional/global emergency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    #[serde(rename = "GRADE_1", alias = "Grade 1")]
    Grade1,
    #[serde(rename = "GRADE_2", alias = "Grade 2")]
    Grade2,
    #[serde(rename = "GRADE_3", alias = "Grade 3")]
    Grade3,
    #[serde(rename = "UNGRADED", alias = "Ungraded")]
    Ungraded,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Grade1, Grade::Grade2, Grade::Grade3, Grade::Ungraded];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Grade1 => "GRADE_1",
            Grade::Grade2 => "GRADE_2",
            Grade::Grade3 => "GRADE_3",
            Grade::Ungraded => "UNGRADED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::Grade1 => "Grade 1",
            Grade::Grade2 => "Grade 2",
            Grade::Grade3 => "Grade 3",
            Grade::Ungraded => "Ungraded",
        }
    }

    pub fn parse_loose(s: &str) -> Option<Self> {
        match loose_key(s).as_str() {
            "GRADE_1" | "GRADE1" | "1" => Some(Grade::Grade1),
            "GRADE_2" | "GRADE2" | "2" => Some(Grade::Grade2),
            "GRADE_3" | "GRADE3" | "3" => Some(Grade::Grade3),
            "UNGRADED" => Some(Grade::Ungraded),
            _ => None,
        }
    }
}

/// Workflow position. Declared in workflow order; nothing enforces transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    New,
    Triage,
    UnderVerification,
    Validated,
    Published,
    Suppressed,
    Closed,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 7] = [
        WorkflowStatus::New,
        WorkflowStatus::Triage,
        WorkflowStatus::UnderVerification,
        WorkflowStatus::Validated,
        WorkflowStatus::Published,
        WorkflowStatus::Suppressed,
        WorkflowStatus::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::New => "NEW",
            WorkflowStatus::Triage => "TRIAGE",
            WorkflowStatus::UnderVerification => "UNDER_VERIFICATION",
            WorkflowStatus::Validated => "VALIDATED",
            WorkflowStatus::Published => "PUBLISHED",
            WorkflowStatus::Suppressed => "SUPPRESSED",
            WorkflowStatus::Closed => "CLOSED",
        }
    }

    pub fn parse_loose(s: &str) -> Option<Self> {
        // Older revisions used signal/triaged/validated.
        match loose_key(s).as_str() {
            "NEW" | "SIGNAL" => Some(WorkflowStatus::New),
            "TRIAGE" | "TRIAGED" => Some(WorkflowStatus::Triage),
            "UNDER_VERIFICATION" => Some(WorkflowStatus::UnderVerification),
            "VALIDATED" => Some(WorkflowStatus::Validated),
            "PUBLISHED" => Some(WorkflowStatus::Published),
            "SUPPRESSED" => Some(WorkflowStatus::Suppressed),
            "CLOSED" => Some(WorkflowStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Moderate,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Moderate => "MODERATE",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn parse_loose(s: &str) -> Option<Self> {
        match loose_key(s).as_str() {
            "LOW" => Some(Severity::Low),
            "MODERATE" | "MEDIUM" => Some(Severity::Moderate),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalVolume {
    #[default]
    Low,
    #[serde(alias = "medium")]
    Moderate,
    High,
}

impl SignalVolume {
    pub const ALL: [SignalVolume; 3] = [SignalVolume::Low, SignalVolume::Moderate, SignalVolume::High];

    pub fn as_str(self) -> &'static str {
        match self {
            SignalVolume::Low => "low",
            SignalVolume::Moderate => "moderate",
            SignalVolume::High => "high",
        }
    }

    pub fn parse_loose(s: &str) -> Option<Self> {
        match loose_key(s).as_str() {
            "LOW" => Some(SignalVolume::Low),
            "MODERATE" | "MEDIUM" => Some(SignalVolume::Moderate),
            "HIGH" => Some(SignalVolume::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiseaseInfo {
    pub code: String,
    pub name: String,
    pub syndrome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Epidemiology {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cases: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deaths: Option<u64>,
    /// Case-fatality ratio as reported, e.g. "2.1%".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl Epidemiology {
    pub fn is_empty(&self) -> bool {
        self.cases.is_none() && self.deaths.is_none() && self.cfr.is_none() && self.severity.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelinePoint {
    pub timestamp: String,
    /// Relative volume, 0..=100.
    pub volume: u8,
}

pub const DEFAULT_SENTIMENT: &str = "neutral";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityPulse {
    #[serde(default)]
    pub informal_signal_volume: SignalVolume,
    #[serde(default = "default_sentiment")]
    pub sentiment: String,
    #[serde(default)]
    pub vernacular_terms: Vec<String>,
    /// Vernacular term -> clinical symptom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vernacular_mapping: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anecdote: Option<String>,
    #[serde(default)]
    pub signal_timeline: Vec<TimelinePoint>,
}

fn default_sentiment() -> String {
    DEFAULT_SENTIMENT.to_string()
}

impl Default for CommunityPulse {
    fn default() -> Self {
        Self {
            informal_signal_volume: SignalVolume::Low,
            sentiment: default_sentiment(),
            vernacular_terms: Vec::new(),
            vernacular_mapping: None,
            anecdote: None,
            signal_timeline: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Evidence {
    #[serde(default)]
    pub signal_count: u64,
    /// Originating platforms, e.g. "ProMED", "Local radio transcripts".
    #[serde(default, alias = "source_ids")]
    pub source_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_note: Option<String>,
    #[serde(default)]
    pub top_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub country_iso3: String,
    pub country_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,
    #[serde(default)]
    pub disease: Option<DiseaseInfo>,
    pub title: String,
    pub summary: String,
    pub alert_level: AlertLevel,
    pub grade: Grade,
    pub status: WorkflowStatus,
    /// Always within 0.0..=1.0 once sanitized.
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epidemiology: Option<Epidemiology>,
    #[serde(default)]
    pub community_pulse: CommunityPulse,
    #[serde(default)]
    pub evidence: Evidence,
    #[serde(default)]
    pub field_readiness: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn is_alert(&self) -> bool {
        self.kind == EventKind::Alert
    }
}

/// Accepts RFC 3339 timestamps, ISO-8601 local datetimes (read as UTC) and
/// bare dates (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
