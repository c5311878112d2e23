// src/filters.rs
use serde::{Deserialize, Serialize};

use crate::model::Grade;

/// Complete filter value chosen on the dashboard. Each dimension is a subset;
/// an empty subset means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub diseases: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl FilterSelection {
    pub fn new(diseases: Vec<String>, countries: Vec<String>, grades: Vec<Grade>) -> Self {
        Self {
            diseases,
            countries,
            grades,
        }
        .normalized()
    }

    pub fn all() -> Self {
        Self::default()
    }

    /// Uppercase + trim codes, drop blanks, sort and dedup every dimension.
    pub fn normalized(mut self) -> Self {
        self.diseases = clean_codes(self.diseases);
        self.countries = clean_codes(self.countries);
        self.grades.sort();
        self.grades.dedup();
        self
    }
}

fn clean_codes(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    items
        .into_iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Parse a comma-separated code list, e.g. `"nga, ken,,"`.
pub fn parse_code_list(s: &str) -> Vec<String> {
    clean_codes(s.split(',').map(str::to_string).collect())
}
