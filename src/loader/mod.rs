//! Input loading.
//!
//! Reads the SIMD lookup, the practice registry, the monthly prescribing
//! extracts and the two boundary files into typed records.

pub mod boundaries;
pub mod extracts;
pub mod schema;
pub mod tables;

pub use boundaries::{load_boundaries, BoundaryGeometry};
pub use extracts::{discover_extracts, load_extracts};
pub use schema::INHALER_DRUGS;
pub use tables::{load_deprivation, load_practices};

use crate::error::LoadResult;
use crate::models::{DeprivationRecord, LoadStats, PracticeRecord, PrescriptionRecord};
use std::path::PathBuf;

/// Locations of every input of one report build.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPaths {
    pub deprivation: PathBuf,
    pub practices: PathBuf,
    pub extracts_dir: PathBuf,
    pub practice_locations: PathBuf,
    pub health_boards: PathBuf,
}

/// Everything read from disk for one build.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub deprivation: Vec<DeprivationRecord>,
    pub practices: Vec<PracticeRecord>,
    pub prescriptions: Vec<PrescriptionRecord>,
    pub boundaries: BoundaryGeometry,
    /// Extract files in the order they were concatenated.
    pub extract_files: Vec<PathBuf>,
    pub stats: Vec<LoadStats>,
}

/// Load all inputs. Any missing file aborts the whole load.
pub fn load_all(paths: &InputPaths, show_progress: bool) -> LoadResult<LoadedData> {
    let deprivation = load_deprivation(&paths.deprivation)?;
    let practices = load_practices(&paths.practices)?;
    let extract_files = discover_extracts(&paths.extracts_dir)?;
    let prescriptions = load_extracts(&extract_files, show_progress)?;
    let (boundaries, boundary_stats) =
        load_boundaries(&paths.practice_locations, &paths.health_boards)?;

    let mut stats = vec![deprivation.stats, practices.stats, prescriptions.stats];
    stats.extend(boundary_stats);

    Ok(LoadedData {
        deprivation: deprivation.rows,
        practices: practices.rows,
        prescriptions: prescriptions.rows,
        boundaries,
        extract_files,
        stats,
    })
}
