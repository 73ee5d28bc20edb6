//! Drawing a [`FigurePlan`] with [`plotters`].
//!
//! Panels are stacked vertically on one figure. The output file extension
//! picks the backend: `.svg` is drawn as a vector image, the bitmap
//! extensions go through the image encoder.

use super::plan::{FigurePlan, Panel, REFERENCE_LABEL};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during figure rendering
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Failed to save figure to {path}: {reason}")]
    Save { path: String, reason: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported figure format '{0}' (expected svg, png, jpg, jpeg or bmp)")]
    UnsupportedFormat(String),
}

type Result<T> = core::result::Result<T, RenderError>;

const FONT: &str = "sans-serif";

/// Font and spacing sizes are given at 100 DPI and scaled from there.
struct Scale(f64);

impl Scale {
    fn of(dpi: u32) -> Self {
        Self(dpi as f64 / 100.0)
    }

    fn font(&self, points: f64) -> f64 {
        (points * self.0).max(1.0)
    }

    fn px(&self, pixels: f64) -> u32 {
        ((pixels * self.0).round() as u32).max(1)
    }
}

/// Figure file formats, keyed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureFormat {
    Svg,
    Bitmap,
}

impl FigureFormat {
    /// Format for `path`, from its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "svg" => Ok(FigureFormat::Svg),
            "png" | "jpg" | "jpeg" | "bmp" => Ok(FigureFormat::Bitmap),
            "" => Err(RenderError::UnsupportedFormat(path.display().to_string())),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FigureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FigureFormat::Svg => write!(f, "svg"),
            FigureFormat::Bitmap => write!(f, "bitmap"),
        }
    }
}

/// Render `plan` and write it to `output_path`.
///
/// The format is checked before anything is drawn or written.
pub fn render_figure(plan: &FigurePlan, output_path: &Path) -> Result<()> {
    if plan.panels.is_empty() {
        return Err(RenderError::InvalidData("No histograms to plot".to_string()));
    }

    let format = FigureFormat::from_path(output_path)?;
    debug!(
        "Rendering {} panels at {}x{} px ({} dpi, {})",
        plan.panels.len(),
        plan.size.0,
        plan.size.1,
        plan.dpi,
        format
    );

    match format {
        FigureFormat::Svg => {
            let root = SVGBackend::new(output_path, plan.size).into_drawing_area();
            draw_figure(root, plan, output_path)
        }
        FigureFormat::Bitmap => {
            let root = BitMapBackend::new(output_path, plan.size).into_drawing_area();
            draw_figure(root, plan, output_path)
        }
    }
}

fn draw_figure<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    plan: &FigurePlan,
    output_path: &Path,
) -> Result<()> {
    let scale = Scale::of(plan.dpi);

    root.fill(&WHITE)
        .map_err(|e| RenderError::DrawingArea(e.to_string()))?;

    let body = root
        .titled(&plan.title, (FONT, scale.font(16.0)))
        .map_err(|e| RenderError::DrawingArea(e.to_string()))?;

    let areas = body.split_evenly((plan.panels.len(), 1));
    for (area, panel) in areas.iter().zip(&plan.panels) {
        draw_panel(area, panel, &scale)?;
    }

    root.present().map_err(|e| RenderError::Save {
        path: output_path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    scale: &Scale,
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, scale.font(12.0)))
        .margin(scale.px(6.0))
        .x_label_area_size(scale.px(28.0))
        .y_label_area_size(scale.px(42.0))
        .build_cartesian_2d(0.0..panel.x_max, 0.0..panel.y_top)
        .map_err(|e| RenderError::ChartConfig(e.to_string()))?;

    debug!("Panel p={} with {} series", panel.p, panel.series.len());

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("phrase length")
        .y_desc("frequency")
        .label_style((FONT, scale.font(9.0)))
        .axis_desc_style((FONT, scale.font(10.0)))
        .draw()
        .map_err(|e| RenderError::Drawing(e.to_string()))?;

    for series in &panel.series {
        let color = Palette99::pick(series.color_index).mix(series.opacity);
        let drawn = chart
            .draw_series(series.bars.iter().map(|bar| {
                Rectangle::new([(bar.x0, 0.0), (bar.x1, bar.height)], color.filled())
            }))
            .map_err(|e| RenderError::Drawing(e.to_string()))?;

        if panel.show_legend {
            drawn.label(series.label.as_str()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
        }
    }

    if !panel.reference.is_empty() {
        let stroke = RED.stroke_width(scale.px(1.5));
        let drawn = chart
            .draw_series(LineSeries::new(panel.reference.iter().copied(), stroke))
            .map_err(|e| RenderError::Drawing(e.to_string()))?;

        if panel.show_legend {
            drawn
                .label(REFERENCE_LABEL)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], stroke));
        }
    }

    if panel.show_legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font((FONT, scale.font(9.0)))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| RenderError::Drawing(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::chart::plan::{plan_figure, FigureSettings};
    use crate::config::Config;
    use crate::input::parse_records;
    use crate::models::DuplicatePolicy;

    fn fixture_plan() -> FigurePlan {
        let json = include_str!("../../fixtures/phrases.json");
        let records = parse_records(json.as_bytes(), "phrases.json").unwrap();
        let table = aggregate(&records, DuplicatePolicy::Replace).unwrap();
        let settings = FigureSettings::from_config(&Config::default(), 100);
        plan_figure(&table, &settings)
    }

    fn assert_written(path: &Path) {
        let meta = std::fs::metadata(path).unwrap();
        assert!(meta.len() > 0, "{} is empty", path.display());
    }

    #[test]
    fn test_render_fixture() {
        let plan = fixture_plan();
        assert_eq!(plan.panels.len(), 2);
        assert!(plan.panels[0].show_legend);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.png");
        render_figure(&plan, &path).unwrap();
        assert_written(&path);
    }

    #[test]
    fn test_render_svg() {
        let plan = fixture_plan();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.SVG");
        render_figure(&plan, &path).unwrap();
        assert_written(&path);

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<rect"));
        assert!(svg.contains("<polyline"));
    }

    #[test]
    fn test_render_unwritable_path() {
        let plan = fixture_plan();
        let dir = tempfile::tempdir().unwrap();

        for name in ["fig.png", "fig.svg"] {
            let path = dir.path().join("missing").join(name);
            let err = render_figure(&plan, &path).unwrap_err();
            assert!(matches!(err, RenderError::Save { .. }), "{}: {}", name, err);
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_render_rejects_unsupported_format() {
        let plan = fixture_plan();
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("fig.pdf");
        let err = render_figure(&plan, &path).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFormat(ref ext) if ext == "pdf"));
        assert!(err.to_string().contains("svg"));
        assert!(!path.exists());

        let bare = dir.path().join("figure");
        let err = render_figure(&plan, &bare).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFormat(_)));
        assert!(!bare.exists());
    }

    #[test]
    fn test_figure_format_from_path() {
        assert_eq!(
            FigureFormat::from_path(Path::new("a/b.svg")).unwrap(),
            FigureFormat::Svg
        );
        for name in ["x.png", "x.JPG", "x.jpeg", "x.bmp"] {
            assert_eq!(
                FigureFormat::from_path(Path::new(name)).unwrap(),
                FigureFormat::Bitmap
            );
        }
        assert!(FigureFormat::from_path(Path::new("x.eps")).is_err());
    }

    #[test]
    fn test_render_rejects_empty_plan() {
        let plan = FigurePlan {
            title: "empty".to_string(),
            size: (100, 100),
            dpi: 100,
            panels: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        let err = render_figure(&plan, &dir.path().join("empty.png")).unwrap_err();
        assert!(matches!(err, RenderError::InvalidData(_)));
    }

    #[test]
    fn test_scale() {
        let scale = Scale::of(300);
        assert_eq!(scale.font(10.0), 30.0);
        assert_eq!(scale.px(6.0), 18);

        let tiny = Scale::of(1);
        assert_eq!(tiny.font(10.0), 1.0);
        assert_eq!(tiny.px(6.0), 1);
    }
}
