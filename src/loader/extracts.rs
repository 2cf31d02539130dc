//! Monthly prescribing extracts.
//!
//! Extracts are every `*.csv` file directly inside one directory, read in
//! file-name order and concatenated. Rows are never de-duplicated across
//! months: the same practice and drug in two months are two rows.

use super::tables::{read_table, Table};
use crate::error::{LoadError, LoadResult};
use crate::models::{LoadStats, PrescriptionRecord};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Number of monthly files a full year of prescribing should have.
pub const EXPECTED_MONTHS: usize = 12;

/// List the extract files in a directory, sorted by file name.
pub fn discover_extracts(dir: &Path) -> LoadResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(LoadError::MissingFile {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if entry.file_type().is_file() && is_csv {
            files.push(path.to_path_buf());
        } else {
            debug!("Ignoring {}", path.display());
        }
    }

    if files.is_empty() {
        return Err(LoadError::NoExtracts {
            dir: dir.to_path_buf(),
        });
    }

    files.sort();

    if files.len() != EXPECTED_MONTHS {
        warn!(
            "Expected {} monthly extracts in {}, found {}",
            EXPECTED_MONTHS,
            dir.display(),
            files.len()
        );
    }

    Ok(files)
}

/// Read and concatenate extract files in the given order.
pub fn load_extracts(files: &[PathBuf], show_progress: bool) -> LoadResult<Table<PrescriptionRecord>> {
    let progress_bar = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let mut rows = Vec::new();
    let mut stats = LoadStats::new("prescriptions");

    for path in files {
        if let Some(ref pb) = progress_bar {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            pb.set_message(name);
        }

        let month = read_table::<PrescriptionRecord>(path)?;
        debug!(
            "{}: {} inhaler rows of {}",
            path.display(),
            month.stats.rows_kept,
            month.stats.rows_read
        );
        stats.absorb(&month.stats);
        rows.extend(month.rows);

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message("extracts loaded");
    }

    info!(
        "Loaded {} inhaler rows from {} extracts ({} other drugs filtered)",
        rows.len(),
        files.len(),
        stats.rows_filtered
    );

    Ok(Table { rows, stats })
}
