//! inhaler-report - SIMD deprivation vs inhaler prescribing in Scotland
//!
//! A CLI tool that joins the SIMD lookup, the GP practice registry and a
//! year of monthly prescribing extracts, computes inhaler items per
//! registered patient and writes an exploratory report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any fatal error (missing input, bad config, inconsistent data)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use loader::{discover_extracts, InputPaths};
use models::ReportMetadata;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration; logging depends on it
    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("inhaler-report v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_report(args, config) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .inhaler-report.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set input locations, format and highlighted practices.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete report workflow.
fn run_report(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let paths = config.input_paths();
    let output_path = PathBuf::from(&config.general.output);

    // Handle --dry-run: list inputs and exit
    if args.dry_run {
        return handle_dry_run(&paths, &output_path, config.report.format);
    }

    // Step 1-3: load, join, aggregate
    println!("📥 Loading inputs from {}", config.inputs.data_dir);
    let output = pipeline::run(&paths, !args.quiet)?;

    let metadata = ReportMetadata {
        generated_at: Utc::now(),
        inputs: input_list(&paths, &output.extract_files),
        extract_count: output.extract_files.len(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let join_stats = output.join_stats.clone();
    let practice_count = output.practice_rates.len();
    let presentable = output
        .practice_rates
        .iter()
        .filter(|p| p.is_presentable())
        .count();
    let board_count = output.board_rates.len();

    // Step 4: present
    println!("\n📝 Generating report...");
    let report = report::build_report(output, &config.report_options(), metadata);

    let written = match config.report.format {
        OutputFormat::Markdown => report::write_markdown_report(&report, &output_path)?,
        OutputFormat::Html => report::write_html_report(&report, &output_path)?,
    };
    for path in &written {
        debug!("Wrote {}", path.display());
    }

    // Print summary
    println!("\n📊 Report Summary:");
    println!("   Monthly extracts: {}", report.metadata.extract_count);
    println!(
        "   Practices: {} ({} with a rate and decile)",
        practice_count, presentable
    );
    println!("   Health boards: {}", board_count);
    if join_stats.lines_dropped > 0 {
        println!(
            "   Dropped lines: {} from {} unknown practices",
            join_stats.lines_dropped,
            join_stats.unknown_practices.len()
        );
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report saved to: {}", output_path.display());

    Ok(())
}

/// Every input file in read order, for the metadata section.
fn input_list(paths: &InputPaths, extracts: &[PathBuf]) -> Vec<String> {
    let mut inputs = vec![
        paths.deprivation.display().to_string(),
        paths.practices.display().to_string(),
    ];
    inputs.extend(extracts.iter().map(|p| p.display().to_string()));
    inputs.push(paths.practice_locations.display().to_string());
    inputs.push(paths.health_boards.display().to_string());
    inputs
}

/// Handle --dry-run: list the inputs that would be read, exit.
fn handle_dry_run(paths: &InputPaths, output: &Path, format: OutputFormat) -> Result<()> {
    println!("\n🔍 Dry run: resolving inputs (nothing is loaded)...\n");

    let files = [
        ("SIMD lookup", &paths.deprivation),
        ("Practice registry", &paths.practices),
        ("Practice locations", &paths.practice_locations),
        ("Health boards", &paths.health_boards),
    ];
    for (label, path) in files {
        let marker = if path.is_file() { "📄" } else { "❓" };
        println!("   {} {}: {}", marker, label, path.display());
    }

    match discover_extracts(&paths.extracts_dir) {
        Ok(extracts) => {
            println!(
                "\n   Found {} monthly extracts in {}:\n",
                extracts.len(),
                paths.extracts_dir.display()
            );
            for extract in &extracts {
                println!("     📄 {}", extract.display());
            }
        }
        Err(e) => {
            warn!("{}", e);
            println!("\n   ❓ {}", e);
        }
    }

    println!("\n   Report would be written to {} ({:?})", output.display(), format);
    println!("\n✅ Dry run complete. No report was written.");
    Ok(())
}

/// Load the configuration, apply CLI overrides and validate the result.
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
