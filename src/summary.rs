// src/summary.rs
//
// Aggregates behind the dashboard tiles and charts. Pure over a slice of
// events; recomputed on every request.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{AlertLevel, Event};
use crate::reference::AFRO_COUNTRIES;

pub const UNKNOWN_DISEASE: &str = "Unknown";
const HIGH_RISK_LIMIT: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HighRiskItem {
    pub id: String,
    pub title: String,
    pub country_name: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total_events: usize,
    pub alerts: usize,
    pub signals: usize,
    pub high_level: usize,
    pub countries_covered: usize,
    /// e.g. "7/50"
    pub coverage_label: String,
    pub total_signals: u64,
    pub by_disease: BTreeMap<String, usize>,
    pub by_country: BTreeMap<String, usize>,
    pub by_grade: BTreeMap<String, usize>,
    pub high_risk: Vec<HighRiskItem>,
}

impl DashboardSummary {
    pub fn from_events(events: &[Event]) -> Self {
        let mut s = DashboardSummary {
            total_events: events.len(),
            ..Default::default()
        };
        let mut countries = BTreeSet::new();

        for e in events {
            if e.is_alert() {
                s.alerts += 1;
            } else {
                s.signals += 1;
            }
            countries.insert(e.country_iso3.as_str());
            s.total_signals = s.total_signals.saturating_add(e.evidence.signal_count);

            let disease = e
                .disease
                .as_ref()
                .map(|d| d.name.as_str())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(UNKNOWN_DISEASE);
            *s.by_disease.entry(disease.to_string()).or_default() += 1;
            *s.by_country.entry(e.country_name.clone()).or_default() += 1;
            *s.by_grade.entry(e.grade.label().to_string()).or_default() += 1;

            if e.alert_level == AlertLevel::High {
                s.high_level += 1;
                if s.high_risk.len() < HIGH_RISK_LIMIT {
                    s.high_risk.push(HighRiskItem {
                        id: e.id.clone(),
                        title: e.title.clone(),
                        country_name: e.country_name.clone(),
                    });
                }
            }
        }

        s.countries_covered = countries.len();
        s.coverage_label = format!("{}/{}", s.countries_covered, AFRO_COUNTRIES.len());
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CommunityPulse, DiseaseInfo, EventKind, Evidence, Grade, WorkflowStatus,
    };

    fn ev(id: &str, iso3: &str, name: &str, kind: EventKind, level: AlertLevel) -> Event {
        Event {
            id: id.into(),
            kind,
            country_iso3: iso3.into(),
            country_name: name.into(),
            admin1: None,
            disease: None,
            title: format!("title {id}"),
            summary: String::new(),
            alert_level: level,
            grade: Grade::Ungraded,
            status: WorkflowStatus::New,
            confidence: 0.5,
            epidemiology: None,
            community_pulse: CommunityPulse::default(),
            evidence: Evidence::default(),
            field_readiness: vec![],
            created_at: None,
        }
    }

    #[test]
    fn empty_input() {
        let s = DashboardSummary::from_events(&[]);
        assert_eq!(s.total_events, 0);
        assert_eq!(s.coverage_label, "0/50");
        assert!(s.high_risk.is_empty());
    }

    #[test]
    fn counts_and_breakdowns() {
        let mut a = ev("a", "NGA", "Nigeria", EventKind::Alert, AlertLevel::High);
        a.disease = Some(DiseaseInfo {
            code: "A96.2".into(),
            name: "Lassa fever".into(),
            syndrome: "VHF".into(),
        });
        a.grade = Grade::Grade2;
        a.evidence.signal_count = 10;
        let mut b = ev("b", "NGA", "Nigeria", EventKind::Signal, AlertLevel::High);
        b.evidence.signal_count = 5;
        let c = ev("c", "KEN", "Kenya", EventKind::Signal, AlertLevel::High);
        let d = ev("d", "UGA", "Uganda", EventKind::Alert, AlertLevel::Watch);

        let s = DashboardSummary::from_events(&[a, b, c, d]);
        assert_eq!(s.total_events, 4);
        assert_eq!((s.alerts, s.signals), (2, 2));
        assert_eq!(s.high_level, 3);
        assert_eq!(s.countries_covered, 3);
        assert_eq!(s.coverage_label, "3/50");
        assert_eq!(s.total_signals, 15);
        assert_eq!(s.by_disease["Lassa fever"], 1);
        assert_eq!(s.by_disease[UNKNOWN_DISEASE], 3);
        assert_eq!(s.by_country["Nigeria"], 2);
        assert_eq!(s.by_grade["Grade 2"], 1);
        assert_eq!(s.by_grade["Ungraded"], 3);

        let ids: Vec<_> = s.high_risk.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
