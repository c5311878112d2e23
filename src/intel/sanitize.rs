//! Response validator / sanitizer.
//!
//! The model gives no hard guarantee about its output, so the payload is read
//! as loose JSON and every element is normalized into a well-formed [`Event`].
//! A payload that is not an array of objects degrades to an empty list.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{
    parse_timestamp, AlertLevel, CommunityPulse, DiseaseInfo, Epidemiology, Event, EventKind,
    Evidence, Grade, Severity, SignalVolume, TimelinePoint, WorkflowStatus, DEFAULT_SENTIMENT,
};
use crate::reference::ReferenceData;

pub const DEFAULT_GROUNDING_URL_CAP: usize = 10;
const MAX_TEXT_CHARS: usize = 2_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sanitized {
    pub events: Vec<Event>,
    /// Payload did not parse as an event array.
    pub malformed: bool,
    /// Elements skipped (not objects, or outside the AFRO country set).
    pub dropped: usize,
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[a-z][^>]*>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Decode HTML entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = RE_TAGS.replace_all(&decoded, "");
    let collapsed = RE_WS.replace_all(&stripped, " ");
    let out = collapsed.trim();
    if out.chars().count() > MAX_TEXT_CHARS {
        out.chars().take(MAX_TEXT_CHARS).collect()
    } else {
        out.to_string()
    }
}

/// Strip a Markdown code fence (```json ... ```) if the model wrapped its answer.
fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn parse_elements(text: &str) -> Option<Vec<Value>> {
    let body = strip_fences(text);
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        // Prose around the JSON: try the outermost array.
        Err(_) => {
            let start = body.find('[')?;
            let end = body.rfind(']')?;
            if end <= start {
                return None;
            }
            serde_json::from_str(&body[start..=end]).ok()?
        }
    };
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut obj) => ["events", "alerts", "signals"]
            .iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

// ------------------------------------------------------------
// Loose field readers
// ------------------------------------------------------------

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn value_str(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => normalize_text(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn get_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find_map(value_str)
}

fn value_f64(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().replace(',', "").parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn get_f64(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    first(obj, keys).and_then(value_f64)
}

/// Non-negative count; negatives become 0.
fn get_count(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    get_f64(obj, keys).map(|f| f.max(0.0).round() as u64)
}

fn get_str_list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match first(obj, keys) {
        Some(Value::Array(items)) => items.iter().filter_map(value_str).collect(),
        Some(other) => value_str(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn get_obj<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    first(obj, keys).and_then(Value::as_object)
}

fn is_http_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://")) && !s.contains(char::is_whitespace)
}

/// Keep http(s) URLs only, deduplicated in first-seen order.
fn clean_urls<I: IntoIterator<Item = String>>(urls: I) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| is_http_url(u) && seen.insert(u.clone()))
        .collect()
}

fn clamp_confidence(raw: Option<f64>) -> f32 {
    raw.map(|v| v.clamp(0.0, 1.0) as f32).unwrap_or(0.0)
}

/// Confidence as a 0..=1 ratio. Percent strings ("45%") are scaled down.
fn read_confidence(obj: &Map<String, Value>) -> f32 {
    let raw = first(obj, &["confidence"]).and_then(|v| match v {
        Value::String(s) if s.trim().ends_with('%') => value_f64(v).map(|pct| pct / 100.0),
        other => value_f64(other),
    });
    clamp_confidence(raw)
}

// ------------------------------------------------------------
// Nested structures
// ------------------------------------------------------------

fn read_disease(obj: &Map<String, Value>, refs: &ReferenceData) -> Option<DiseaseInfo> {
    match first(obj, &["disease"])? {
        Value::Object(d) => {
            let code = get_str(d, &["code", "icd10", "icd_10"]).map(|c| c.to_ascii_uppercase());
            let known = code.as_deref().and_then(|c| refs.disease(c));
            let name = get_str(d, &["name"]).or_else(|| known.map(|k| k.name.to_string()));
            let syndrome =
                get_str(d, &["syndrome"]).or_else(|| known.map(|k| k.syndrome.to_string()));
            if code.is_none() && name.is_none() {
                return None;
            }
            Some(DiseaseInfo {
                code: code.unwrap_or_default(),
                name: name.unwrap_or_default(),
                syndrome: syndrome.unwrap_or_default(),
            })
        }
        // Bare disease name: resolve through the reference table when possible.
        other => {
            let name = value_str(other)?;
            let known = refs
                .diseases
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(&name) || d.code.eq_ignore_ascii_case(&name));
            Some(match known {
                Some(k) => DiseaseInfo {
                    code: k.code.to_string(),
                    name: k.name.to_string(),
                    syndrome: k.syndrome.to_string(),
                },
                None => DiseaseInfo {
                    code: String::new(),
                    name,
                    syndrome: String::new(),
                },
            })
        }
    }
}

fn read_epidemiology(obj: &Map<String, Value>) -> Option<Epidemiology> {
    let nested = get_obj(obj, &["epidemiology", "epi"]);
    let mut epi = match nested {
        Some(e) => Epidemiology {
            cases: get_count(e, &["cases", "case_count"]),
            deaths: get_count(e, &["deaths", "death_count"]),
            cfr: first(e, &["cfr", "case_fatality_ratio"]).and_then(|v| match v {
                Value::Number(n) => Some(format!("{n}%")),
                other => value_str(other),
            }),
            severity: get_str(e, &["severity"]).and_then(|s| Severity::parse_loose(&s)),
        },
        None => Epidemiology::default(),
    };
    // Older revisions carried severity at the top level.
    if epi.severity.is_none() {
        epi.severity = get_str(obj, &["severity"]).and_then(|s| Severity::parse_loose(&s));
    }
    (!epi.is_empty()).then_some(epi)
}

fn read_vernacular_mapping(pulse: &Map<String, Value>) -> Option<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    match first(pulse, &["vernacular_mapping"])? {
        Value::Object(map) => {
            for (term, symptom) in map {
                let term = normalize_text(term);
                if let (false, Some(symptom)) = (term.is_empty(), value_str(symptom)) {
                    out.insert(term, symptom);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter_map(Value::as_object) {
                if let (Some(term), Some(symptom)) = (
                    get_str(item, &["term", "vernacular"]),
                    get_str(item, &["symptom", "clinical"]),
                ) {
                    out.insert(term, symptom);
                }
            }
        }
        _ => {}
    }
    (!out.is_empty()).then_some(out)
}

fn read_timeline(pulse: &Map<String, Value>) -> Vec<TimelinePoint> {
    let Some(Value::Array(items)) = first(pulse, &["signal_timeline", "timeline"]) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|p| {
            let timestamp = get_str(p, &["timestamp", "time", "date"])?;
            let volume = get_f64(p, &["volume", "value"]).unwrap_or(0.0);
            Some(TimelinePoint {
                timestamp,
                volume: volume.clamp(0.0, 100.0).round() as u8,
            })
        })
        .collect()
}

fn read_pulse(obj: &Map<String, Value>) -> CommunityPulse {
    let Some(p) = get_obj(obj, &["community_pulse"]) else {
        return CommunityPulse::default();
    };
    CommunityPulse {
        informal_signal_volume: get_str(p, &["informal_signal_volume", "volume"])
            .and_then(|s| SignalVolume::parse_loose(&s))
            .unwrap_or_default(),
        sentiment: get_str(p, &["sentiment"]).unwrap_or_else(|| DEFAULT_SENTIMENT.to_string()),
        vernacular_terms: get_str_list(p, &["vernacular_terms"]),
        vernacular_mapping: read_vernacular_mapping(p),
        anecdote: get_str(p, &["anecdote", "anecdote_snippet"]),
        signal_timeline: read_timeline(p),
    }
}

fn read_evidence(obj: &Map<String, Value>) -> Evidence {
    let Some(e) = get_obj(obj, &["evidence"]) else {
        return Evidence::default();
    };
    Evidence {
        signal_count: get_count(e, &["signal_count"]).unwrap_or(0),
        source_types: get_str_list(e, &["source_types", "source_ids", "sources", "source_platform"]),
        reliability_note: get_str(e, &["reliability_note", "reliability"]),
        top_urls: clean_urls(get_str_list(e, &["top_urls", "urls"])),
    }
}

// ------------------------------------------------------------
// Event
// ------------------------------------------------------------

/// Normalize one element. `None` when it cannot belong to the AFRO set.
fn read_event(obj: &Map<String, Value>, refs: &ReferenceData) -> Option<Event> {
    let iso3 = get_str(obj, &["country_iso3", "iso3", "country_code"])?.to_ascii_uppercase();
    let Some(country) = refs.country(&iso3) else {
        debug!(target: "intel", country = %iso3, "dropping event outside AFRO set");
        return None;
    };

    let summary = get_str(obj, &["summary", "description"]).unwrap_or_default();
    let title = get_str(obj, &["title", "headline"]).unwrap_or_else(|| {
        if summary.is_empty() {
            "Untitled event".to_string()
        } else {
            summary.chars().take(80).collect()
        }
    });

    Some(Event {
        id: get_str(obj, &["id", "alert_id", "event_id"]).unwrap_or_default(),
        kind: get_str(obj, &["type", "alert_type", "event_type"])
            .and_then(|s| EventKind::parse_loose(&s))
            .unwrap_or(EventKind::Signal),
        country_iso3: country.iso3.to_string(),
        country_name: country.name.to_string(),
        admin1: get_str(obj, &["admin1", "admin_1", "region"]),
        disease: read_disease(obj, refs),
        title,
        summary,
        alert_level: get_str(obj, &["alert_level", "level"])
            .and_then(|s| AlertLevel::parse_loose(&s))
            .unwrap_or(AlertLevel::Watch),
        grade: get_str(obj, &["grade"])
            .and_then(|s| Grade::parse_loose(&s))
            .unwrap_or(Grade::Ungraded),
        status: get_str(obj, &["status"])
            .and_then(|s| WorkflowStatus::parse_loose(&s))
            .unwrap_or(WorkflowStatus::New),
        confidence: read_confidence(obj),
        epidemiology: read_epidemiology(obj),
        community_pulse: read_pulse(obj),
        evidence: read_evidence(obj),
        field_readiness: get_str_list(
            obj,
            &["field_readiness", "recommended_afro_actions", "recommended_actions"],
        ),
        created_at: get_str(obj, &["created_at", "timestamp"]).and_then(|s| parse_timestamp(&s)),
    })
}

/// Fill missing ids and make every id unique within the batch.
fn assign_ids(events: &mut [Event]) {
    let mut seen = HashSet::new();
    for (idx, ev) in events.iter_mut().enumerate() {
        let base = if ev.id.is_empty() {
            format!("evt-{:03}", idx + 1)
        } else {
            ev.id.clone()
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}-{n}");
            n += 1;
        }
        ev.id = candidate;
    }
}

/// Merge grounding citations into the first event's evidence, capped at `cap` URLs.
fn merge_grounding(events: &mut [Event], grounding: &[String], cap: usize) {
    let Some(first) = events.first_mut() else {
        return;
    };
    if grounding.is_empty() {
        return;
    }
    let merged = first
        .evidence
        .top_urls
        .drain(..)
        .chain(grounding.iter().cloned());
    let mut urls = clean_urls(merged);
    urls.truncate(cap);
    first.evidence.top_urls = urls;
}

pub fn sanitize_payload(
    text: &str,
    grounding: &[String],
    refs: &ReferenceData,
    grounding_cap: usize,
) -> Sanitized {
    let Some(elements) = parse_elements(text) else {
        warn!(
            target: "intel",
            payload_len = text.len(),
            "model payload is not an event array; treating as empty"
        );
        return Sanitized {
            malformed: true,
            ..Sanitized::default()
        };
    };

    let total = elements.len();
    let mut events: Vec<Event> = elements
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| read_event(obj, refs))
        .collect();

    assign_ids(&mut events);
    merge_grounding(&mut events, grounding, grounding_cap);

    Sanitized {
        dropped: total - events.len(),
        events,
        malformed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(v: Value) -> Sanitized {
        sanitize_payload(&v.to_string(), &[], &ReferenceData::afro(), DEFAULT_GROUNDING_URL_CAP)
    }

    fn minimal(id: &str, iso3: &str) -> Value {
        json!({ "id": id, "type": "ALERT", "country_iso3": iso3, "title": "t", "summary": "s",
                "alert_level": "HIGH", "grade": "GRADE_1", "status": "NEW", "confidence": 0.5 })
    }

    #[test]
    fn missing_pulse_and_evidence_get_defaults() {
        let out = run(json!([minimal("a", "NGA")]));
        assert_eq!(out.events.len(), 1);
        let ev = &out.events[0];
        assert_eq!(ev.community_pulse, CommunityPulse::default());
        assert_eq!(ev.evidence, Evidence::default());

        let v = serde_json::to_value(ev).unwrap();
        assert!(v["community_pulse"]["vernacular_terms"].is_array());
        assert!(v["evidence"]["top_urls"].is_array());
        assert_eq!(v["community_pulse"]["sentiment"], "neutral");
        assert_eq!(v["community_pulse"]["informal_signal_volume"], "low");
    }

    #[test]
    fn malformed_payloads_degrade_to_empty() {
        for raw in ["not json", "{\"foo\": 1}", "42", "", "[1, 2"] {
            let out = sanitize_payload(raw, &[], &ReferenceData::afro(), 10);
            assert!(out.events.is_empty(), "{raw}");
            assert!(out.malformed, "{raw}");
        }
        let out = run(json!([]));
        assert!(out.events.is_empty());
        assert!(!out.malformed);
    }

    #[test]
    fn fenced_and_wrapped_payloads_parse() {
        let fenced = format!("```json\n{}\n```", json!([minimal("a", "KEN")]));
        let out = sanitize_payload(&fenced, &[], &ReferenceData::afro(), 10);
        assert_eq!(out.events.len(), 1);

        let prose = format!("Here you go: {} Hope it helps.", json!([minimal("a", "KEN")]));
        assert_eq!(sanitize_payload(&prose, &[], &ReferenceData::afro(), 10).events.len(), 1);

        let wrapped = json!({ "alerts": [minimal("a", "KEN"), minimal("b", "UGA")] });
        assert_eq!(run(wrapped).events.len(), 2);
    }

    #[test]
    fn non_afro_and_non_object_elements_are_dropped() {
        let out = run(json!([minimal("a", "FRA"), 7, "x", minimal("b", " gha ")]));
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.dropped, 3);
        assert_eq!(out.events[0].country_iso3, "GHA");
        assert_eq!(out.events[0].country_name, "Ghana");
    }

    #[test]
    fn confidence_is_bounded() {
        let mut items = Vec::new();
        for (i, c) in [json!(1.7), json!(-0.2), json!(85), json!("0.3"), json!("NaN"), Value::Null]
            .into_iter()
            .enumerate()
        {
            let mut e = minimal(&format!("e{i}"), "NGA");
            e["confidence"] = c;
            items.push(e);
        }
        let got: Vec<f32> = run(Value::Array(items)).events.iter().map(|e| e.confidence).collect();
        assert_eq!(got, vec![1.0, 0.0, 1.0, 0.3, 0.0, 0.0]);
    }

    #[test]
    fn percent_confidence_is_scaled() {
        let mut items = Vec::new();
        for (i, c) in ["45%", " 80 % ", "250%", "-5%"].into_iter().enumerate() {
            let mut e = minimal(&format!("p{i}"), "NGA");
            e["confidence"] = json!(c);
            items.push(e);
        }
        let got: Vec<f32> = run(Value::Array(items)).events.iter().map(|e| e.confidence).collect();
        assert!((got[0] - 0.45).abs() < 1e-6, "{got:?}");
        assert!((got[1] - 0.80).abs() < 1e-6, "{got:?}");
        assert_eq!(&got[2..], &[1.0, 0.0]);
    }

    #[test]
    fn naive_iso_created_at_is_read_as_utc() {
        let mut a = minimal("a", "NGA");
        a["created_at"] = json!("2025-03-02T08:00:00");
        let mut b = minimal("b", "NGA");
        b["created_at"] = json!("2025-03-02T08:00:00.000");
        let out = run(json!([a, b]));
        let expected = parse_timestamp("2025-03-02T08:00:00Z");
        assert!(expected.is_some());
        assert_eq!(out.events[0].created_at, expected);
        assert_eq!(out.events[1].created_at, expected);
    }

    #[test]
    fn bare_disease_name_resolves_to_first_listed_code() {
        let mut a = minimal("a", "NGA");
        a["disease"] = json!("yellow fever");
        let mut b = minimal("b", "NGA");
        b["disease"] = json!("a95");
        let out = run(json!([a, b]));
        let codes: Vec<_> = out
            .events
            .iter()
            .map(|e| e.disease.as_ref().map(|d| d.code.as_str()))
            .collect();
        assert_eq!(codes, vec![Some("A92"), Some("A95")]);
        assert_eq!(out.events[0].disease.as_ref().unwrap().name, "Yellow fever");
    }

    #[test]
    fn unknown_enums_fall_back() {
        let out = run(json!([{ "country_iso3": "MLI", "type": "RUMOUR", "alert_level": "ORANGE",
                               "grade": "G9", "status": "PENDING", "title": "x" }]));
        let ev = &out.events[0];
        assert_eq!(ev.kind, EventKind::Signal);
        assert_eq!(ev.alert_level, AlertLevel::Watch);
        assert_eq!(ev.grade, Grade::Ungraded);
        assert_eq!(ev.status, WorkflowStatus::New);
        assert!(ev.created_at.is_none());
    }

    #[test]
    fn legacy_field_names_are_understood() {
        let out = run(json!([{
            "alert_id": "old-1",
            "alert_type": "alert",
            "country_iso3": "SEN",
            "title": "Measles",
            "alert_level": "WARNING",
            "severity": "CRITICAL",
            "status": "triaged",
            "grade": "Grade 2",
            "disease": { "code": "b05" },
            "evidence": { "signal_count": 4, "source_ids": ["GDELT"], "top_urls": ["https://x.org/a", "ftp://nope", "https://x.org/a"] },
            "recommended_afro_actions": ["Vaccinate"],
            "community_pulse": { "informal_signal_volume": "medium" },
            "created_at": "2025-02-11"
        }]));
        let ev = &out.events[0];
        assert_eq!(ev.id, "old-1");
        assert_eq!(ev.kind, EventKind::Alert);
        assert_eq!(ev.status, WorkflowStatus::Triage);
        assert_eq!(ev.grade, Grade::Grade2);
        assert_eq!(ev.epidemiology.as_ref().and_then(|e| e.severity), Some(Severity::Critical));
        let disease = ev.disease.as_ref().unwrap();
        assert_eq!((disease.code.as_str(), disease.name.as_str(), disease.syndrome.as_str()), ("B05", "Measles", "Rash"));
        assert_eq!(ev.evidence.source_types, vec!["GDELT"]);
        assert_eq!(ev.evidence.top_urls, vec!["https://x.org/a"]);
        assert_eq!(ev.field_readiness, vec!["Vaccinate"]);
        assert_eq!(ev.community_pulse.informal_signal_volume, SignalVolume::Moderate);
        assert!(ev.created_at.is_some());
    }

    #[test]
    fn pulse_details_are_normalized() {
        let out = run(json!([{
            "country_iso3": "ETH",
            "title": "AWD &amp; <b>deaths</b>",
            "community_pulse": {
                "informal_signal_volume": "HIGH",
                "sentiment": "panic",
                "vernacular_terms": ["teqmat", 3, null],
                "vernacular_mapping": [{ "term": "teqmat", "symptom": "diarrhoea" }, { "term": "x" }],
                "anecdote": "  market   closed ",
                "signal_timeline": [
                    { "timestamp": "D1", "volume": 140 },
                    { "timestamp": "D2", "volume": -3 },
                    { "volume": 50 }
                ]
            },
            "epidemiology": { "cases": "1,200", "deaths": -1, "cfr": 2.5 }
        }]));
        let ev = &out.events[0];
        assert_eq!(ev.title, "AWD & deaths");
        let p = &ev.community_pulse;
        assert_eq!(p.informal_signal_volume, SignalVolume::High);
        assert_eq!(p.sentiment, "panic");
        assert_eq!(p.vernacular_terms, vec!["teqmat", "3"]);
        assert_eq!(
            p.vernacular_mapping.as_ref().and_then(|m| m.get("teqmat")).map(String::as_str),
            Some("diarrhoea")
        );
        assert_eq!(p.anecdote.as_deref(), Some("market closed"));
        let vols: Vec<u8> = p.signal_timeline.iter().map(|t| t.volume).collect();
        assert_eq!(vols, vec![100, 0]);
        let epi = ev.epidemiology.as_ref().unwrap();
        assert_eq!(epi.cases, Some(1_200));
        assert_eq!(epi.deaths, Some(0));
        assert_eq!(epi.cfr.as_deref(), Some("2.5%"));
    }

    #[test]
    fn ids_are_filled_and_unique() {
        let out = run(json!([minimal("dup", "NGA"), minimal("dup", "NGA"), { "country_iso3": "NGA" }]));
        let ids: Vec<&str> = out.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["dup", "dup-2", "evt-003"]);
    }

    #[test]
    fn grounding_merges_into_first_event_with_cap() {
        let mut first = minimal("a", "NGA");
        first["evidence"] = json!({ "top_urls": ["https://own.example/1"] });
        let payload = json!([first, minimal("b", "KEN")]).to_string();
        let grounding: Vec<String> = (0..15)
            .map(|i| format!("https://ground.example/{i}"))
            .chain(["https://own.example/1".to_string(), "not a url".to_string()])
            .collect();

        let out = sanitize_payload(&payload, &grounding, &ReferenceData::afro(), 10);
        let urls = &out.events[0].evidence.top_urls;
        assert_eq!(urls.len(), 10);
        assert_eq!(urls[0], "https://own.example/1");
        assert_eq!(urls[1], "https://ground.example/0");
        assert!(out.events[1].evidence.top_urls.is_empty());
    }

    #[test]
    fn order_is_preserved() {
        let out = run(json!([minimal("z", "NGA"), minimal("a", "KEN"), minimal("m", "UGA")]));
        let ids: Vec<&str> = out.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
