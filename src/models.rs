//! Data models for the deprivation and prescribing report.
//!
//! This module contains the records loaded from the input tables, the
//! denormalised join output, the derived rate collections and the report
//! envelope that the presenter renders.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// SIMD decile of a data zone: 1 is the most deprived tenth of Scotland,
/// 10 the least deprived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub struct Decile(u8);

impl Decile {
    /// Most deprived decile.
    pub const MOST_DEPRIVED: Decile = Decile(1);
    /// Least deprived decile.
    pub const LEAST_DEPRIVED: Decile = Decile(10);

    /// Create a decile, returning `None` outside `1..=10`.
    pub fn new(value: u8) -> Option<Self> {
        (1..=10).contains(&value).then_some(Self(value))
    }

    /// Numeric value of the decile.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position, handy for indexing per-decile arrays.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// All ten deciles in ascending order.
    pub fn all() -> impl Iterator<Item = Decile> {
        (1..=10).map(Decile)
    }
}

impl TryFrom<u8> for Decile {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Decile::new(value).ok_or_else(|| format!("decile {} is outside 1..=10", value))
    }
}

impl From<Decile> for u8 {
    fn from(decile: Decile) -> Self {
        decile.0
    }
}

impl fmt::Display for Decile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the SIMD lookup: a data zone and its decile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeprivationRecord {
    pub zone_id: String,
    pub decile: Decile,
}

/// One GP practice from the practice registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PracticeRecord {
    pub practice_id: String,
    pub zone_id: String,
    pub health_board: String,
    /// Registered list size.
    pub population: u32,
    pub practice_name: String,
    pub cluster_id: String,
    pub postcode: String,
}

/// One dispensed-drug line of a monthly prescribing extract.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrescriptionRecord {
    pub practice_id: String,
    pub drug_description: String,
    pub item_count: u64,
}

/// A prescription line joined to its practice and, where known, the
/// deprivation decile of the practice's data zone.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedLine {
    pub practice_id: String,
    pub practice_name: String,
    pub cluster_id: String,
    pub health_board: String,
    pub postcode: String,
    pub zone_id: String,
    pub population: u32,
    pub drug_description: String,
    pub item_count: u64,
    pub decile: Option<Decile>,
}

/// Inhaler items per registered patient for one practice.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeRate {
    pub practice_id: String,
    pub practice_name: String,
    pub cluster_id: String,
    pub health_board: String,
    pub postcode: String,
    pub population: u32,
    /// Items summed over every joined line of the practice.
    pub total_items: u64,
    /// `None` when the decile is unresolved or the list size is zero.
    pub rate: Option<f64>,
    pub decile: Option<Decile>,
}

impl PracticeRate {
    /// Whether this practice can appear in any chart or table.
    pub fn is_presentable(&self) -> bool {
        self.rate.is_some() && self.decile.is_some()
    }
}

/// Mean practice rate across one health board.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthBoardRate {
    pub health_board: String,
    /// Unweighted mean of the non-null member practice rates.
    pub mean_rate: Option<f64>,
    /// First decile observed among member practices. An approximation:
    /// boards span many data zones.
    pub representative_decile: Option<Decile>,
    /// Lowest and highest member decile.
    pub decile_range: Option<(Decile, Decile)>,
    /// Number of member practices.
    pub practice_count: usize,
    /// Number of member practices with a non-null rate.
    pub rated_practice_count: usize,
}

impl HealthBoardRate {
    /// Whether every member practice shares one decile.
    pub fn has_uniform_decile(&self) -> bool {
        match self.decile_range {
            Some((low, high)) => low == high,
            None => true,
        }
    }
}

/// Row accounting for one input source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStats {
    /// Human-readable source name.
    pub source: String,
    /// Number of files read for this source.
    pub files: usize,
    /// Data rows encountered.
    pub rows_read: usize,
    /// Rows that passed schema validation and filtering.
    pub rows_kept: usize,
    /// Rows skipped for failing the schema.
    pub rows_malformed: usize,
    /// Rows skipped by the drug allow-list.
    pub rows_filtered: usize,
    /// Rows skipped as repeats of an already-seen key.
    pub rows_duplicate: usize,
}

impl LoadStats {
    /// Create empty stats for a named source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Fold another file's counts into this one.
    pub fn absorb(&mut self, other: &LoadStats) {
        self.files += other.files;
        self.rows_read += other.rows_read;
        self.rows_kept += other.rows_kept;
        self.rows_malformed += other.rows_malformed;
        self.rows_filtered += other.rows_filtered;
        self.rows_duplicate += other.rows_duplicate;
    }

    /// Rows dropped for any reason.
    pub fn rows_skipped(&self) -> usize {
        self.rows_malformed + self.rows_filtered + self.rows_duplicate
    }
}

/// Row accounting for the two joins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinStats {
    /// Prescription lines offered to the join.
    pub lines_in: usize,
    /// Lines that found their practice.
    pub lines_joined: usize,
    /// Lines dropped because the practice is not in the registry.
    pub lines_dropped: usize,
    /// Distinct practice ids that were not in the registry.
    pub unknown_practices: Vec<String>,
    /// Distinct joined practices whose data zone has no decile.
    pub practices_without_decile: Vec<String>,
}

/// Metadata about one report build.
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    /// Time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Input files, in the order they were read.
    pub inputs: Vec<String>,
    /// Number of monthly extracts concatenated.
    pub extract_count: usize,
    /// Wall-clock duration of the build in seconds.
    pub duration_seconds: f64,
}

/// Everything the presenter needs to render the document.
#[derive(Debug, Clone)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub load_stats: Vec<LoadStats>,
    pub join_stats: JoinStats,
    pub practice_rates: Vec<PracticeRate>,
    pub board_rates: Vec<HealthBoardRate>,
    /// Pre-rendered SVG of the decile boxplot.
    pub boxplot_svg: String,
    /// Pre-rendered SVG of the choropleth map.
    pub map_svg: String,
    /// Practices named here are left out of the boxplot.
    pub boxplot_exclude: Vec<String>,
    /// Practices named here are highlighted in the ranked table.
    pub highlight: Vec<String>,
    /// Length of the ranked table.
    pub top_n: usize,
}
