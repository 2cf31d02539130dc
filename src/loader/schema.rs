//! Explicit per-source schemas.
//!
//! Source tables name the same field differently (the health board is `HB`
//! in the practice registry and `HBT` in the prescribing extracts), so
//! headers are first mapped onto canonical column names. Each record type
//! then declares the canonical columns it needs and a row-level check that
//! runs after type coercion.

use crate::models::{DeprivationRecord, PracticeRecord, PrescriptionRecord};
use csv::StringRecord;
use serde::de::DeserializeOwned;

/// Drug names an extract row must contain to count as an inhaler item.
pub const INHALER_DRUGS: [&str; 5] = [
    "SALBUTAMOL",
    "BECLOMETASONE",
    "BUDESONIDE",
    "FLUTICASONE",
    "TIOTROPIUM",
];

/// Normalised header spelling mapped to canonical column name.
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("zoneid", "zone_id"),
    ("datazone", "zone_id"),
    ("datazone2011", "zone_id"),
    ("dz", "zone_id"),
    ("decile", "decile"),
    ("simddecile", "decile"),
    ("simd2020decile", "decile"),
    ("simd2020v2decile", "decile"),
    ("practiceid", "practice_id"),
    ("practicecode", "practice_id"),
    ("gppractice", "practice_id"),
    ("healthboard", "health_board"),
    ("hb", "health_board"),
    ("hbt", "health_board"),
    ("hbcode", "health_board"),
    ("population", "population"),
    ("listsize", "population"),
    ("practicelistsize", "population"),
    ("practicename", "practice_name"),
    ("gppracticename", "practice_name"),
    ("clusterid", "cluster_id"),
    ("cluster", "cluster_id"),
    ("gpcluster", "cluster_id"),
    ("postcode", "postcode"),
    ("pc", "postcode"),
    ("drugdescription", "drug_description"),
    ("bnfitemdescription", "drug_description"),
    ("itemcount", "item_count"),
    ("paiditems", "item_count"),
    ("numberofpaiditems", "item_count"),
];

/// Map a raw header (or GeoJSON property name) to its canonical name.
///
/// Matching ignores case and punctuation. Unknown names come back trimmed
/// but otherwise unchanged.
pub fn normalize_column(raw: &str) -> String {
    let key: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Normalise a whole header row. Only the first column mapping to a given
/// canonical name takes it; later ones keep their raw spelling.
pub fn normalize_headers(raw: &StringRecord) -> StringRecord {
    let mut seen: Vec<String> = Vec::new();
    let mut out = StringRecord::new();

    for field in raw.iter() {
        let canonical = normalize_column(field);
        if seen.contains(&canonical) {
            out.push_field(field.trim());
        } else {
            out.push_field(&canonical);
            seen.push(canonical);
        }
    }

    out
}

/// Whether a drug description names one of the inhaler drugs.
pub fn is_inhaler(description: &str) -> bool {
    INHALER_DRUGS.iter().any(|drug| description.contains(drug))
}

/// A record type read from one tabular source.
pub trait SourceRecord: DeserializeOwned {
    /// Source name used in logs and the data-quality section.
    const SOURCE: &'static str;

    /// Canonical columns that must be present in the header.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Row-level checks beyond type coercion.
    fn validate(&self) -> Result<(), String>;

    /// Whether a valid row belongs in the output. Rows returning `false`
    /// are counted as filtered, not malformed.
    fn keep(&self) -> bool {
        true
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is empty", field))
    } else {
        Ok(())
    }
}

impl SourceRecord for DeprivationRecord {
    const SOURCE: &'static str = "deprivation";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["zone_id", "decile"];

    fn validate(&self) -> Result<(), String> {
        require_non_empty("zone_id", &self.zone_id)
    }
}

impl SourceRecord for PracticeRecord {
    const SOURCE: &'static str = "practices";
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "practice_id",
        "zone_id",
        "health_board",
        "population",
        "practice_name",
        "cluster_id",
        "postcode",
    ];

    fn validate(&self) -> Result<(), String> {
        require_non_empty("practice_id", &self.practice_id)?;
        require_non_empty("practice_name", &self.practice_name)
    }
}

impl SourceRecord for PrescriptionRecord {
    const SOURCE: &'static str = "prescriptions";
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["practice_id", "drug_description", "item_count"];

    fn validate(&self) -> Result<(), String> {
        require_non_empty("practice_id", &self.practice_id)
    }

    fn keep(&self) -> bool {
        is_inhaler(&self.drug_description)
    }
}
