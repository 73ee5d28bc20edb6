//! Figure layout.
//!
//! Turns an [`AggregationTable`] into a [`FigurePlan`]: every rectangle,
//! line point, axis bound and legend decision the renderer needs. Nothing
//! here touches a drawing surface.

use crate::analysis::geometric_reference;
use crate::config::Config;
use crate::models::{AggregationTable, LegendPlacement, Parameterization, WindowGroup};

/// Label of the reference curve in legends.
pub const REFERENCE_LABEL: &str = "geometric";

/// Settings that shape a figure.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureSettings {
    pub title: String,
    pub width_inches: f64,
    pub base_height_inches: f64,
    pub panel_height_inches: f64,
    pub dpi: u32,
    pub y_limit_factor: f64,
    pub legend: LegendPlacement,
    pub parameterization: Parameterization,
}

impl FigureSettings {
    /// Settings from the merged configuration at the given resolution.
    pub fn from_config(config: &Config, dpi: u32) -> Self {
        Self {
            title: config.chart.title.clone(),
            width_inches: config.chart.width_inches,
            base_height_inches: config.chart.base_height_inches,
            panel_height_inches: config.chart.panel_height_inches,
            dpi,
            y_limit_factor: config.chart.y_limit_factor,
            legend: config.chart.legend,
            parameterization: config.reference.parameterization,
        }
    }
}

/// One filled rectangle, from `x0` to `x1` and from zero to `height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x0: f64,
    pub x1: f64,
    pub height: f64,
}

/// All bars drawn for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub label: String,
    /// Position of the window inside its panel, used to pick a color.
    pub color_index: usize,
    pub opacity: f64,
    pub bars: Vec<Bar>,
}

/// A single chart panel for one value of `p`.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub p: f64,
    pub title: String,
    pub x_max: f64,
    pub y_top: f64,
    pub series: Vec<BarSeries>,
    pub reference: Vec<(f64, f64)>,
    pub show_legend: bool,
}

/// Everything needed to draw a figure.
#[derive(Debug, Clone, PartialEq)]
pub struct FigurePlan {
    pub title: String,
    /// Pixel dimensions `(width, height)`.
    pub size: (u32, u32),
    pub dpi: u32,
    pub panels: Vec<Panel>,
}

/// Horizontal span of the bar for histogram index `index` of the
/// `window_index`-th of `window_count` windows.
///
/// Index `i` counts phrases of length `k = i + 1`. Each bar is
/// `1 / window_count` wide and centered on `k + window_index / window_count`,
/// so a lone window's bar sits centered on the reference point at `k`.
pub fn bar_span(index: usize, window_index: usize, window_count: usize) -> (f64, f64) {
    let n = window_count.max(1) as f64;
    let center = (index + 1) as f64 + window_index as f64 / n;
    let half = 0.5 / n;
    (center - half, center + half)
}

/// Pixel dimensions of a figure measured in inches.
pub fn pixel_size(width_inches: f64, height_inches: f64, dpi: u32) -> (u32, u32) {
    let dpi = dpi as f64;
    let to_px = |inches: f64| ((inches * dpi).round() as u32).max(1);
    (to_px(width_inches), to_px(height_inches))
}

/// Lay out the whole figure, one panel per parameter group.
pub fn plan_figure(table: &AggregationTable, settings: &FigureSettings) -> FigurePlan {
    let panels: Vec<Panel> = table
        .groups()
        .iter()
        .enumerate()
        .map(|(index, group)| plan_panel(group, settings, settings.legend.shows_on(index)))
        .collect();

    let height =
        settings.base_height_inches + settings.panel_height_inches * panels.len() as f64;

    FigurePlan {
        title: settings.title.clone(),
        size: pixel_size(settings.width_inches, height, settings.dpi),
        dpi: settings.dpi,
        panels,
    }
}

fn plan_panel(group: &WindowGroup, settings: &FigureSettings, show_legend: bool) -> Panel {
    let window_count = group.len();
    let opacity = if window_count > 1 { 0.8 } else { 1.0 };

    let series: Vec<BarSeries> = group
        .windows()
        .enumerate()
        .map(|(window_index, (w, dist))| BarSeries {
            label: format!("w={}", w),
            color_index: window_index,
            opacity,
            bars: dist
                .iter()
                .enumerate()
                .map(|(i, &height)| {
                    let (x0, x1) = bar_span(i, window_index, window_count);
                    Bar { x0, x1, height }
                })
                .collect(),
        })
        .collect();

    let max_len = group.max_len();
    let q = settings.parameterization.success_probability(group.p());
    let reference: Vec<(f64, f64)> = geometric_reference(q, max_len)
        .into_iter()
        .map(|(k, y)| (k as f64, y))
        .collect();

    Panel {
        p: group.p(),
        title: format!("p={}", group.p()),
        x_max: (max_len + 1) as f64,
        y_top: y_ceiling(q, settings.y_limit_factor, &series),
        series,
        reference,
        show_legend,
    }
}

/// `factor · q`, or the tallest bar plus headroom when that is not a
/// usable axis bound.
fn y_ceiling(q: f64, factor: f64, series: &[BarSeries]) -> f64 {
    let top = factor * q;
    if top.is_finite() && top > 0.0 {
        return top;
    }

    let tallest = series
        .iter()
        .flat_map(|s| s.bars.iter().map(|b| b.height))
        .fold(0.0f64, f64::max);
    if tallest > 0.0 {
        tallest * 1.1
    } else {
        1.0
    }
}
