//! Orchestration of the load, join and aggregate stages.
//!
//! Nothing here writes files or touches the CLI, so a whole build can be
//! exercised against fixture data.

use crate::analysis::{board_rates, join, practice_rates};
use crate::error::PipelineError;
use crate::loader::{load_all, BoundaryGeometry, InputPaths, LoadedData};
use crate::models::{HealthBoardRate, JoinStats, LoadStats, PracticeRate};
use std::path::PathBuf;
use tracing::info;

/// Result of one pipeline run, ready for presentation.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub load_stats: Vec<LoadStats>,
    pub join_stats: JoinStats,
    pub practice_rates: Vec<PracticeRate>,
    pub board_rates: Vec<HealthBoardRate>,
    pub boundaries: BoundaryGeometry,
    pub extract_files: Vec<PathBuf>,
}

/// Load every input and compute the rate tables.
pub fn run(paths: &InputPaths, show_progress: bool) -> Result<PipelineOutput, PipelineError> {
    let data = load_all(paths, show_progress)?;
    analyse(data)
}

/// Join and aggregate already-loaded data.
pub fn analyse(data: LoadedData) -> Result<PipelineOutput, PipelineError> {
    let (lines, join_stats) = join(&data.prescriptions, &data.practices, &data.deprivation);

    let practice_rates = practice_rates(&lines)?;
    let board_rates = board_rates(&practice_rates);

    info!("Aggregated {} health boards", board_rates.len());

    Ok(PipelineOutput {
        load_stats: data.stats,
        join_stats,
        practice_rates,
        board_rates,
        boundaries: data.boundaries,
        extract_files: data.extract_files,
    })
}
