//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.inhaler-report.toml` files.

use crate::cli::OutputFormat;
use crate::loader::InputPaths;
use crate::report::ReportOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".inhaler-report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input locations.
    #[serde(default)]
    pub inputs: InputsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path; the extension follows the format when left at
    /// the default.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "inhaler_report.md".to_string()
}

/// Input file locations. Relative names resolve against `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// SIMD lookup CSV.
    #[serde(default = "default_simd")]
    pub simd: String,

    /// GP practice registry CSV.
    #[serde(default = "default_practices")]
    pub practices: String,

    /// Directory of monthly prescribing extracts.
    #[serde(default = "default_prescriptions")]
    pub prescriptions: String,

    #[serde(default = "default_practice_locations")]
    pub practice_locations: String,

    #[serde(default = "default_health_boards")]
    pub health_boards: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            simd: default_simd(),
            practices: default_practices(),
            prescriptions: default_prescriptions(),
            practice_locations: default_practice_locations(),
            health_boards: default_health_boards(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_simd() -> String {
    "simd.csv".to_string()
}

fn default_practices() -> String {
    "practices.csv".to_string()
}

fn default_prescriptions() -> String {
    "prescriptions".to_string()
}

fn default_practice_locations() -> String {
    "practice_locations.geojson".to_string()
}

fn default_health_boards() -> String {
    "health_boards.geojson".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Document format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Number of practices in the ranked table.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Practice names left out of the decile boxplot.
    #[serde(default = "default_atypical_practices")]
    pub boxplot_exclude: Vec<String>,

    /// Practice names highlighted in the ranked table.
    #[serde(default = "default_atypical_practices")]
    pub highlight: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            top_n: default_top_n(),
            boxplot_exclude: default_atypical_practices(),
            highlight: default_atypical_practices(),
        }
    }
}

fn default_top_n() -> usize {
    12
}

// Serves homeless patients; its list size understates the people it treats.
fn default_atypical_practices() -> Vec<String> {
    vec!["EDINBURGH ACCESS PRACTICE".to_string()]
}

/// Resolve `name` against `base` unless it is already absolute.
fn resolve(base: &Path, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        let path_string = |p: &PathBuf| p.to_string_lossy().to_string();

        if let Some(ref data_dir) = args.data_dir {
            self.inputs.data_dir = path_string(data_dir);
        }
        if let Some(ref simd) = args.simd {
            self.inputs.simd = path_string(simd);
        }
        if let Some(ref practices) = args.practices {
            self.inputs.practices = path_string(practices);
        }
        if let Some(ref prescriptions) = args.prescriptions {
            self.inputs.prescriptions = path_string(prescriptions);
        }
        if let Some(ref locations) = args.practice_locations {
            self.inputs.practice_locations = path_string(locations);
        }
        if let Some(ref boards) = args.health_boards {
            self.inputs.health_boards = path_string(boards);
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(top_n) = args.top_n {
            self.report.top_n = top_n;
        }

        match args.output {
            Some(ref output) => self.general.output = path_string(output),
            None if self.general.output == default_output() => {
                // Keep the default name in step with the chosen format
                let path = PathBuf::from(default_output())
                    .with_extension(self.report.format.extension());
                self.general.output = path_string(&path);
            }
            None => {}
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check settings that may have come from the config file.
    pub fn validate(&self) -> Result<(), String> {
        if self.report.top_n == 0 {
            return Err("report.top_n must be at least 1".to_string());
        }
        Ok(())
    }

    /// Log level after merging; `quiet` wins over a configured `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Input locations with every relative name resolved.
    pub fn input_paths(&self) -> InputPaths {
        let base = Path::new(&self.inputs.data_dir);
        InputPaths {
            deprivation: resolve(base, &self.inputs.simd),
            practices: resolve(base, &self.inputs.practices),
            extracts_dir: resolve(base, &self.inputs.prescriptions),
            practice_locations: resolve(base, &self.inputs.practice_locations),
            health_boards: resolve(base, &self.inputs.health_boards),
        }
    }

    /// Presentation settings for the report builder.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            top_n: self.report.top_n,
            boxplot_exclude: self.report.boxplot_exclude.clone(),
            highlight: self.report.highlight.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
