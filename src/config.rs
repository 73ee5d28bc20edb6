//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pfplot.toml` files.

use crate::models::{DuplicatePolicy, LegendPlacement, Parameterization};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".pfplot.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Reference curve settings.
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Chart layout settings.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// How records are combined into the table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// What to do with repeated `(p, w)` pairs.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Geometric reference settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Meaning of the `p` field.
    #[serde(default)]
    pub parameterization: Parameterization,
}

/// Figure layout and export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Figure title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Figure width in inches.
    #[serde(default = "default_width")]
    pub width_inches: f64,

    /// Figure height before panels are added, in inches.
    #[serde(default = "default_base_height")]
    pub base_height_inches: f64,

    /// Extra height per panel, in inches.
    #[serde(default = "default_panel_height")]
    pub panel_height_inches: f64,

    /// Resolution used when writing to `--output`.
    #[serde(default = "default_export_dpi")]
    pub export_dpi: u32,

    /// Resolution used for preview images.
    #[serde(default = "default_preview_dpi")]
    pub preview_dpi: u32,

    /// Y-axis ceiling as a multiple of the success probability.
    #[serde(default = "default_y_limit_factor")]
    pub y_limit_factor: f64,

    /// Which panels carry a legend.
    #[serde(default)]
    pub legend: LegendPlacement,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width_inches: default_width(),
            base_height_inches: default_base_height(),
            panel_height_inches: default_panel_height(),
            export_dpi: default_export_dpi(),
            preview_dpi: default_preview_dpi(),
            y_limit_factor: default_y_limit_factor(),
            legend: LegendPlacement::default(),
        }
    }
}

fn default_title() -> String {
    "PFP phrase size distribution".to_string()
}

fn default_width() -> f64 {
    7.0
}

fn default_base_height() -> f64 {
    3.0
}

fn default_panel_height() -> f64 {
    1.0
}

fn default_export_dpi() -> u32 {
    300
}

fn default_preview_dpi() -> u32 {
    100
}

fn default_y_limit_factor() -> f64 {
    1.25
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.pfplot.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(policy) = args.policy {
            self.aggregation.duplicate_policy = policy;
        }
        if let Some(parameterization) = args.parameterization {
            self.reference.parameterization = parameterization;
        }
        if let Some(legend) = args.legend {
            self.chart.legend = legend;
        }
        if let Some(ref title) = args.title {
            self.chart.title = title.clone();
        }

        // --dpi applies to whichever mode this run uses
        if let Some(dpi) = args.dpi {
            self.chart.export_dpi = dpi;
            self.chart.preview_dpi = dpi;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that would produce an unusable figure.
    pub fn validate(&self) -> Result<(), String> {
        if self.chart.width_inches <= 0.0 {
            return Err("chart.width_inches must be positive".to_string());
        }
        if self.chart.base_height_inches < 0.0 || self.chart.panel_height_inches < 0.0 {
            return Err("chart heights must not be negative".to_string());
        }
        if self.chart.export_dpi == 0 || self.chart.preview_dpi == 0 {
            return Err("DPI must be at least 1".to_string());
        }
        if self.chart.y_limit_factor <= 0.0 {
            return Err("chart.y_limit_factor must be positive".to_string());
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
