//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// inhaler-report - SIMD deprivation vs inhaler prescribing
///
/// Joins the SIMD lookup, the GP practice registry and a year of monthly
/// prescribing extracts, then writes a report with a decile boxplot, a
/// health board map and a ranked practice table.
///
/// Examples:
///   inhaler-report --data-dir data
///   inhaler-report --data-dir data --format html --output report.html
///   inhaler-report --data-dir data --top-n 20 --dry-run
///   inhaler-report --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the input files
    ///
    /// Individual inputs are resolved relative to this directory unless
    /// overridden below. Can also be set in .inhaler-report.toml.
    #[arg(short, long, value_name = "DIR", env = "INHALER_REPORT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// SIMD lookup CSV (data zone to decile)
    #[arg(long, value_name = "FILE")]
    pub simd: Option<PathBuf>,

    /// GP practice registry CSV
    #[arg(long, value_name = "FILE")]
    pub practices: Option<PathBuf>,

    /// Directory of monthly prescribing extracts (*.csv)
    #[arg(long, value_name = "DIR")]
    pub prescriptions: Option<PathBuf>,

    /// Practice locations GeoJSON (points with a postcode property)
    #[arg(long, value_name = "FILE")]
    pub practice_locations: Option<PathBuf>,

    /// Health board outlines GeoJSON (polygons with a board code property)
    #[arg(long, value_name = "FILE")]
    pub health_boards: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, html)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Number of practices in the ranked table
    #[arg(long, value_name = "COUNT")]
    pub top_n: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .inhaler-report.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list the inputs that would be read and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .inhaler-report.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown with the charts as sibling SVG files (default)
    #[default]
    Markdown,
    /// Single HTML page with the charts inlined
    Html,
}

impl OutputFormat {
    /// Conventional file extension for the format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top_n == Some(0) {
            return Err("Top N must be at least 1".to_string());
        }

        // Validate data directory if provided
        if let Some(ref data_dir) = self.data_dir {
            if !data_dir.exists() {
                return Err(format!(
                    "Data directory does not exist: {}",
                    data_dir.display()
                ));
            }
            if !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
            }
        }

        Ok(())
    }
}
