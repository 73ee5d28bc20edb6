//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::chart::render::FigureFormat;
use crate::models::{DuplicatePolicy, LegendPlacement, Parameterization};
use clap::Parser;
use std::path::PathBuf;

/// pfplot - plot PFP phrase size distributions
///
/// Reads a JSON array of phrase length histograms, normalizes them and
/// draws one bar chart panel per parameter, overlaid with the matching
/// geometric distribution.
///
/// Examples:
///   pfplot stats.json --output phrases.png
///   pfplot < stats.json
///   pfplot stats.json --parameterization mean --policy merge -o out.svg
///   pfplot --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON file to read histograms from
    ///
    /// Omit or pass `-` to read from standard input.
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Image file to write the figure to
    ///
    /// The extension picks the format: svg, png, jpg, jpeg or bmp.
    /// Without this flag the figure is written to a temporary file and
    /// opened in the system image viewer.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Resolution in dots per inch
    ///
    /// Defaults to 300 for --output and 100 for previews.
    #[arg(long, value_name = "DPI")]
    pub dpi: Option<u32>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pfplot.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How to combine records with the same p and w
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<DuplicatePolicy>,

    /// Meaning of the p field in the input
    #[arg(long, value_name = "KIND", env = "PFPLOT_PARAMETERIZATION")]
    pub parameterization: Option<Parameterization>,

    /// Which panels get a legend
    #[arg(long, value_name = "WHERE")]
    pub legend: Option<LegendPlacement>,

    /// Figure title
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Write the preview image but do not open a viewer
    #[arg(long, conflicts_with = "output")]
    pub no_open: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .pfplot.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.dpi == Some(0) {
            return Err("DPI must be at least 1".to_string());
        }

        if let Some(ref input) = self.input {
            if input.as_os_str() != "-" && !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        if let (Some(input), Some(output)) = (&self.input, &self.output) {
            if input == output {
                return Err("Input and output must be different files".to_string());
            }
        }

        if let Some(ref output) = self.output {
            FigureFormat::from_path(output).map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
