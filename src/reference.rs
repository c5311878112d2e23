//! Static reference tables for the WHO AFRO region: member states, priority
//! diseases, the keyword lexicon used to steer the model's web search, and
//! the informal source platforms / languages it should look at.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Country {
    pub iso3: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PriorityDisease {
    pub code: &'static str,
    pub name: &'static str,
    pub syndrome: &'static str,
}

const fn c(iso3: &'static str, name: &'static str) -> Country {
    Country { iso3, name }
}

const fn d(code: &'static str, name: &'static str, syndrome: &'static str) -> PriorityDisease {
    PriorityDisease {
        code,
        name,
        syndrome,
    }
}

pub const AFRO_COUNTRIES: [Country; 50] = [
    c("AGO", "Angola"),
    c("BEN", "Benin"),
    c("BWA", "Botswana"),
    c("BFA", "Burkina Faso"),
    c("BDI", "Burundi"),
    c("CPV", "Cabo Verde"),
    c("CMR", "Cameroon"),
    c("CAF", "Central African Republic"),
    c("TCD", "Chad"),
    c("COM", "Comoros"),
    c("COG", "Congo"),
    c("CIV", "Côte d'Ivoire"),
    c("COD", "Democratic Republic of the Congo"),
    c("GNQ", "Equatorial Guinea"),
    c("ERI", "Eritrea"),
    c("ETH", "Ethiopia"),
    c("GAB", "Gabon"),
    c("GMB", "Gambia"),
    c("GHA", "Ghana"),
    c("GIN", "Guinea"),
    c("GNB", "Guinea-Bissau"),
    c("KEN", "Kenya"),
    c("LSO", "Lesotho"),
    c("LBR", "Liberia"),
    c("MDG", "Madagascar"),
    c("MWI", "Malawi"),
    c("MLI", "Mali"),
    c("MRT", "Mauritania"),
    c("MUS", "Mauritius"),
    c("MOZ", "Mozambique"),
    c("NAM", "Namibia"),
    c("NER", "Niger"),
    c("NGA", "Nigeria"),
    c("RWA", "Rwanda"),
    c("STP", "Sao Tome and Principe"),
    c("SEN", "Senegal"),
    c("SYC", "Seychelles"),
    c("SLE", "Sierra Leone"),
    c("ZAF", "South Africa"),
    c("SSD", "South Sudan"),
    c("TZA", "United Republic of Tanzania"),
    c("TGO", "Togo"),
    c("UGA", "Uganda"),
    c("ZMB", "Zambia"),
    c("ZWE", "Zimbabwe"),
    c("DZA", "Algeria"),
    c("TUN", "Tunisia"),
    c("LBY", "Libya"),
    c("MAR", "Morocco"),
    c("SWZ", "Eswatini"),
];

// Codes are unique; the yellow fever name appears under both A92 and A95.
pub const AFRO_DISEASES: [PriorityDisease; 23] = [
    d("A00", "Cholera", "AWD"),
    d("A01", "Typhoid fever", "Febrile"),
    d("A20", "Plague", "Febrile"),
    d("A80", "Polio", "AFP"),
    d("A90", "Dengue", "Febrile"),
    d("A92", "Yellow fever", "Febrile"),
    d("A95", "Yellow fever", "Febrile"),
    d("B50", "Malaria", "Febrile"),
    d("B05", "Measles", "Rash"),
    d("B20", "HIV", "Chronic"),
    d("A16", "Tuberculosis", "Respiratory"),
    d("A98", "Viral hemorrhagic fevers", "Hemorrhagic"),
    d("A99", "Ebola/Marburg", "Hemorrhagic"),
    d("U07", "COVID-19", "Respiratory"),
    d("A82", "Rabies", "Neurological"),
    d("A37", "Pertussis", "Respiratory"),
    d("A33", "Neonatal tetanus", "Neurological"),
    d("A39", "Meningococcal disease", "Neurological"),
    d("B55", "Leishmaniasis", "Febrile"),
    d("A27", "Leptospirosis", "Febrile"),
    d("A96", "Lassa fever", "Hemorrhagic"),
    d("A78", "Q fever", "Febrile"),
    d("A75", "Typhus", "Febrile"),
];

pub const DISEASE_KEYWORDS: &[(&str, &[&str])] = &[
    ("A00", &["cholera", "diarrhea", "watery stool", "AWD", "acute watery"]),
    ("A01", &["typhoid", "enteric fever"]),
    ("A20", &["plague", "bubonic", "pneumonic plague"]),
    ("A80", &["polio", "paralysis", "AFP", "acute flaccid"]),
    ("A90", &["dengue", "dengue fever", "breakbone"]),
    ("A92", &["yellow fever", "jaundice fever"]),
    ("B50", &["malaria", "plasmodium", "febrile illness"]),
    ("B05", &["measles", "rubeola", "rash fever"]),
    ("A99", &["ebola", "marburg", "EVD", "filovirus"]),
    ("U07", &["covid", "coronavirus", "SARS-CoV-2"]),
    ("A39", &["meningitis", "meningococcal", "CSM"]),
    ("A82", &["rabies", "hydrophobia", "dog bite"]),
];

pub const SYNDROMES: [&str; 10] = [
    "AWD",
    "AFP",
    "ILI",
    "SARI",
    "Febrile",
    "Hemorrhagic",
    "Rash",
    "Neurological",
    "Chronic",
    "Respiratory",
];

pub const SOURCE_PLATFORMS: [&str; 10] = [
    "X/Twitter",
    "Facebook",
    "WhatsApp channels",
    "TikTok",
    "Local radio transcripts",
    "Local news media",
    "ProMED",
    "GDELT",
    "WHO Disease Outbreak News",
    "ReliefWeb",
];

pub const LANGUAGES: [&str; 10] = [
    "English",
    "French",
    "Portuguese",
    "Arabic",
    "Swahili",
    "Hausa",
    "Amharic",
    "Yoruba",
    "Lingala",
    "Zulu",
];

/// Bundle of reference tables handed to the request builder. Tests can build
/// a narrower bundle; production uses [`ReferenceData::afro`].
#[derive(Debug, Clone, Copy)]
pub struct ReferenceData {
    pub countries: &'static [Country],
    pub diseases: &'static [PriorityDisease],
    pub keywords: &'static [(&'static str, &'static [&'static str])],
    pub syndromes: &'static [&'static str],
    pub source_platforms: &'static [&'static str],
    pub languages: &'static [&'static str],
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::afro()
    }
}

impl ReferenceData {
    pub const fn afro() -> Self {
        Self {
            countries: &AFRO_COUNTRIES,
            diseases: &AFRO_DISEASES,
            keywords: DISEASE_KEYWORDS,
            syndromes: &SYNDROMES,
            source_platforms: &SOURCE_PLATFORMS,
            languages: &LANGUAGES,
        }
    }

    pub fn country(&self, iso3: &str) -> Option<&'static Country> {
        self.countries
            .iter()
            .find(|c| c.iso3.eq_ignore_ascii_case(iso3.trim()))
    }

    pub fn disease(&self, code: &str) -> Option<&'static PriorityDisease> {
        self.diseases
            .iter()
            .find(|d| d.code.eq_ignore_ascii_case(code.trim()))
    }

    /// Keywords for the given disease codes, in lexicon order.
    /// An empty selection yields the whole lexicon.
    pub fn keywords_for(&self, codes: &[String]) -> Vec<&'static str> {
        self.keywords
            .iter()
            .filter(|(code, _)| {
                codes.is_empty() || codes.iter().any(|c| c.eq_ignore_ascii_case(code))
            })
            .flat_map(|(_, words)| words.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fifty_unique_member_states() {
        let codes: HashSet<_> = AFRO_COUNTRIES.iter().map(|c| c.iso3).collect();
        assert_eq!(codes.len(), 50);
        assert!(AFRO_COUNTRIES.iter().all(|c| c.iso3.len() == 3));
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let refs = ReferenceData::afro();
        assert_eq!(refs.country("nga").map(|c| c.iso3), Some("NGA"));
        assert!(refs.country(" KEN ").is_some());
        assert!(refs.country("FRA").is_none());
        assert_eq!(
            refs.country("cod").map(|c| c.name),
            Some("Democratic Republic of the Congo")
        );
    }

    #[test]
    fn disease_codes_are_unique_and_yellow_fever_name_is_shared() {
        let codes: HashSet<_> = AFRO_DISEASES.iter().map(|d| d.code).collect();
        assert_eq!(codes.len(), AFRO_DISEASES.len());

        let refs = ReferenceData::afro();
        assert_eq!(refs.disease("a92").map(|d| d.name), Some("Yellow fever"));
        assert_eq!(refs.disease("A95").map(|d| d.name), Some("Yellow fever"));
        assert_eq!(refs.disease("A00").map(|d| d.syndrome), Some("AWD"));
        assert!(refs.disease("Z99").is_none());
    }

    #[test]
    fn every_disease_syndrome_is_listed() {
        for d in AFRO_DISEASES {
            assert!(
                SYNDROMES.contains(&d.syndrome),
                "{} has unlisted syndrome {}",
                d.code,
                d.syndrome
            );
        }
    }

    #[test]
    fn keyword_selection() {
        let refs = ReferenceData::afro();
        let all = refs.keywords_for(&[]);
        assert!(all.contains(&"cholera") && all.contains(&"rabies"));

        let some = refs.keywords_for(&["b05".to_string()]);
        assert_eq!(some, vec!["measles", "rubeola", "rash fever"]);

        // Codes without lexicon entries contribute nothing.
        assert!(refs.keywords_for(&["A33".to_string()]).is_empty());
    }
}
