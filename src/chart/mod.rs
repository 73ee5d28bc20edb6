//! Chart planning, rendering and export.
//!
//! Planning is pure and works on the aggregated table; rendering draws
//! the plan with plotters; output decides where the image goes.

pub mod output;
pub mod plan;
pub mod render;

pub use output::OutputTarget;
pub use plan::{plan_figure, FigureSettings};
pub use render::render_figure;
