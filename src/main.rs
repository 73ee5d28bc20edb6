//! pfplot - PFP phrase size distribution plotter
//!
//! Reads phrase length histograms produced by a prefix-free parsing
//! analysis, normalizes them per parameter and window, and draws them
//! next to the geometric distribution they are expected to follow.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad arguments, malformed input, rendering failure)

mod analysis;
mod chart;
mod cli;
mod config;
mod input;
mod models;

use anyhow::{Context, Result};
use chart::{FigureSettings, OutputTarget};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use input::InputSource;
use models::TableSummary;
use std::path::{Path, PathBuf};
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

    // Configuration decides the log level, so it is loaded first
    let loaded = load_config(&args);
    let verbose = matches!(&loaded, Ok((config, _)) if config.general.verbose);

    init_logging(&args, verbose);

    info!("pfplot v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = loaded.and_then(|(mut config, origin)| {
        origin.log();
        config.merge_with_args(&args);
        config.validate().map_err(anyhow::Error::msg)?;
        run(&args, &config)
    });

    if let Err(e) = result {
        error!("Plotting failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .pfplot.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the chart layout, reference curve and duplicate handling.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = if config_verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Where the configuration came from, reported once logging is up.
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    DefaultFileUnreadable(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => info!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
            ConfigOrigin::Builtin => debug!("No config file found, using defaults"),
            ConfigOrigin::DefaultFileUnreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Builtin)),
        Err(e) => Ok((
            Config::default(),
            ConfigOrigin::DefaultFileUnreadable(format!("{:#}", e)),
        )),
    }
}

/// Read, aggregate, plan, render and export.
fn run(args: &Args, config: &Config) -> Result<()> {
    let source = InputSource::from_arg(args.input.as_deref());
    let target = OutputTarget::from_args(args.output.as_deref(), args.no_open);

    // Step 1: Load records
    if !args.quiet {
        println!("📥 Reading histograms from {}", source);
    }
    let records = source.read_records()?;
    info!("Read {} records", records.len());

    if records.is_empty() {
        anyhow::bail!("Input from {} contains no records", source);
    }

    // Step 2: Aggregate
    let policy = config.aggregation.duplicate_policy;
    let table = analysis::aggregate(&records, policy)?;
    let summary = TableSummary::from_table(&records, &table);
    if summary.duplicates > 0 {
        info!(
            "{} records repeated an earlier (p, w) pair ({} policy)",
            summary.duplicates, policy
        );
    }

    // Step 3: Lay out the figure
    let dpi = if target.is_preview() {
        config.chart.preview_dpi
    } else {
        config.chart.export_dpi
    };
    let settings = FigureSettings::from_config(config, dpi);
    let plan = chart::plan_figure(&table, &settings);

    // Step 4: Render
    let path = target.resolve_path()?;
    if !args.quiet {
        println!(
            "📈 Drawing {} panels ({}x{} px, {} dpi)...",
            plan.panels.len(),
            plan.size.0,
            plan.size.1,
            plan.dpi
        );
    }
    chart::render_figure(&plan, &path)
        .with_context(|| format!("Failed to render figure to {}", path.display()))?;

    target.finish(&path);

    if !args.quiet {
        print_summary(&summary, &path);
    }

    Ok(())
}

fn print_summary(summary: &TableSummary, path: &Path) {
    println!("\n📊 Summary:");
    println!("   Records: {}", summary.records);
    println!("   Parameters: {}", summary.parameters);
    println!("   Series: {}", summary.series);
    if summary.duplicates > 0 {
        println!("   Duplicate records: {}", summary.duplicates);
    }
    println!("   Longest histogram: {}", summary.longest);
    println!("\n✅ Figure saved to: {}", path.display());
}
