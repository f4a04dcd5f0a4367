//! Utilities for plot views

pub mod colors;
pub mod labels;
pub mod scale;

// Re-export commonly used items
pub use colors::{categorical_palette, resolve_chart_colors};
pub use labels::{truncate_category, truncate_line};
pub use scale::{LegendEntry, QuantizeScale};
