//! PNG rendering of maps and diagnostic figures
//!
//! Everything is drawn with the primitives in `canvas` onto an
//! `image::RgbImage` and returned as encoded PNG bytes. An empty input is a
//! `ForageError::Render`; callers omit that artifact and continue.

pub mod canvas;
pub mod colormap;
pub mod figures;
pub mod maps;

pub use figures::{render_correlation_figure, render_regression_figure};
pub use maps::{render_productivity_map, render_residency_map, render_surface_map};
