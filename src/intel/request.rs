//! Request builder: turns a filter selection plus the reference tables into
//! the instruction text and the structured output schema sent to the model.
//!
//! The schema is the authority on shape. The instruction repeats the same
//! enum value sets so the two never drift apart.

use serde::Serialize;
use serde_json::{json, Value};

use crate::filters::FilterSelection;
use crate::model::{AlertLevel, EventKind, Grade, Severity, SignalVolume, WorkflowStatus};
use crate::reference::ReferenceData;

const ALL_DISEASES: &str = "Diseases: all AFRO priority diseases";
const ALL_COUNTRIES: &str = "Countries: all AFRO member states";
const ALL_GRADES: &str = "Grades: all grades";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IntelRequest {
    pub instruction: String,
    pub schema: Value,
    /// Let the remote service ground its answer with its own web search.
    pub web_search: bool,
}

pub fn build_request(filters: &FilterSelection, refs: &ReferenceData) -> IntelRequest {
    IntelRequest {
        instruction: build_instruction(filters, refs),
        schema: output_schema(),
        web_search: true,
    }
}

fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn disease_scope(filters: &FilterSelection, refs: &ReferenceData) -> String {
    if filters.diseases.is_empty() {
        let names = refs.diseases.iter().map(|d| format!("{} {}", d.code, d.name));
        return format!("{ALL_DISEASES} ({}).", join(names));
    }
    let listed = filters.diseases.iter().map(|code| match refs.disease(code) {
        Some(d) => format!("{} ({})", code, d.name),
        None => code.clone(),
    });
    format!("Diseases: only the following codes: {}.", join(listed))
}

fn country_scope(filters: &FilterSelection, refs: &ReferenceData) -> String {
    if filters.countries.is_empty() {
        return format!("{ALL_COUNTRIES} ({} countries).", refs.countries.len());
    }
    let listed = filters.countries.iter().map(|code| match refs.country(code) {
        Some(c) => format!("{} ({})", code, c.name),
        None => code.clone(),
    });
    format!("Countries: only the following codes: {}.", join(listed))
}

fn grade_scope(filters: &FilterSelection) -> String {
    if filters.grades.is_empty() {
        return format!(
            "{ALL_GRADES} ({}).",
            join(Grade::ALL.iter().map(|g| g.as_str()))
        );
    }
    format!(
        "Grades: only the following grades: {}.",
        join(filters.grades.iter().map(|g| g.as_str()))
    )
}

fn build_instruction(filters: &FilterSelection, refs: &ReferenceData) -> String {
    let keywords = refs.keywords_for(&filters.diseases);
    let keywords = if keywords.is_empty() {
        refs.keywords_for(&[])
    } else {
        keywords
    };

    let mut out = String::with_capacity(4096);
    out.push_str(
        "You are an epidemic intelligence analyst for the WHO AFRO region. \
         Search the web for current disease signals and alerts and return them as structured events.\n\n",
    );
    out.push_str("Scope:\n");
    out.push_str(&format!("- {}\n", disease_scope(filters, refs)));
    out.push_str(&format!("- {}\n", country_scope(filters, refs)));
    out.push_str(&format!("- {}\n\n", grade_scope(filters)));

    out.push_str(&format!("Verification keywords: {}.\n", join(&keywords)));
    out.push_str(&format!(
        "Informal source platforms to scan: {}.\n",
        join(refs.source_platforms)
    ));
    out.push_str(&format!(
        "Languages to monitor (include vernacular terms): {}.\n\n",
        join(refs.languages)
    ));

    out.push_str("Rules:\n");
    out.push_str(&format!(
        "1. country_iso3 must be one of: {}.\n",
        join(refs.countries.iter().map(|c| c.iso3))
    ));
    out.push_str(&format!(
        "2. type is one of {}; ALERT only for signals cross-referenced with an official or credible source.\n",
        join(EventKind::ALL.iter().map(|k| k.as_str()))
    ));
    out.push_str(&format!(
        "3. alert_level is one of {}; grade is one of {}; status is one of {}.\n",
        join(AlertLevel::ALL.iter().map(|v| v.as_str())),
        join(Grade::ALL.iter().map(|v| v.as_str())),
        join(WorkflowStatus::ALL.iter().map(|v| v.as_str())),
    ));
    out.push_str(&format!(
        "4. epidemiology.severity is one of {}; community_pulse.informal_signal_volume is one of {}.\n",
        join(Severity::ALL.iter().map(|v| v.as_str())),
        join(SignalVolume::ALL.iter().map(|v| v.as_str())),
    ));
    out.push_str(
        "5. disease.code uses the ICD-10 codes of the priority disease list; syndrome uses the WHO taxonomy.\n",
    );
    out.push_str("6. confidence is a number between 0 and 1.\n");
    out.push_str(
        "7. evidence lists the signal count, the originating platforms, a reliability note and source URLs.\n",
    );
    out.push_str(
        "8. community_pulse captures sentiment, vernacular terms mapped to clinical symptoms, an anecdote \
         and a signal_timeline of (timestamp, volume 0-100) points in time order.\n",
    );
    out.push_str("9. field_readiness lists recommended AFRO response actions.\n");
    out.push_str("10. created_at is an ISO-8601 timestamp.\n\n");
    out.push_str("Return a JSON array of 5-8 events matching the response schema. Return only JSON.");
    out
}

fn string_enum<I, S>(values: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let values: Vec<String> = values.into_iter().map(|s| s.as_ref().to_string()).collect();
    json!({ "type": "STRING", "enum": values })
}

fn string_array() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

/// Response schema in the model service's OpenAPI subset.
pub fn output_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "type": string_enum(EventKind::ALL.iter().map(|v| v.as_str())),
                "country_iso3": { "type": "STRING" },
                "country_name": { "type": "STRING" },
                "admin1": { "type": "STRING" },
                "disease": {
                    "type": "OBJECT",
                    "properties": {
                        "code": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "syndrome": { "type": "STRING" }
                    },
                    "required": ["code", "name", "syndrome"]
                },
                "title": { "type": "STRING" },
                "summary": { "type": "STRING" },
                "alert_level": string_enum(AlertLevel::ALL.iter().map(|v| v.as_str())),
                "grade": string_enum(Grade::ALL.iter().map(|v| v.as_str())),
                "status": string_enum(WorkflowStatus::ALL.iter().map(|v| v.as_str())),
                "confidence": { "type": "NUMBER" },
                "epidemiology": {
                    "type": "OBJECT",
                    "properties": {
                        "cases": { "type": "INTEGER" },
                        "deaths": { "type": "INTEGER" },
                        "cfr": { "type": "STRING" },
                        "severity": string_enum(Severity::ALL.iter().map(|v| v.as_str()))
                    }
                },
                "community_pulse": {
                    "type": "OBJECT",
                    "properties": {
                        "informal_signal_volume": string_enum(SignalVolume::ALL.iter().map(|v| v.as_str())),
                        "sentiment": { "type": "STRING" },
                        "vernacular_terms": string_array(),
                        "vernacular_mapping": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "term": { "type": "STRING" },
                                    "symptom": { "type": "STRING" }
                                },
                                "required": ["term", "symptom"]
                            }
                        },
                        "anecdote": { "type": "STRING" },
                        "signal_timeline": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "timestamp": { "type": "STRING" },
                                    "volume": { "type": "NUMBER" }
                                },
                                "required": ["timestamp", "volume"]
                            }
                        }
                    },
                    "required": ["informal_signal_volume", "sentiment", "vernacular_terms"]
                },
                "evidence": {
                    "type": "OBJECT",
                    "properties": {
                        "signal_count": { "type": "INTEGER" },
                        "source_types": string_array(),
                        "reliability_note": { "type": "STRING" },
                        "top_urls": string_array()
                    },
                    "required": ["signal_count", "source_types", "top_urls"]
                },
                "field_readiness": string_array(),
                "created_at": { "type": "STRING" }
            },
            "required": [
                "id", "type", "country_iso3", "country_name", "title", "summary",
                "alert_level", "grade", "status", "confidence", "community_pulse", "evidence"
            ]
        }
    })
}
