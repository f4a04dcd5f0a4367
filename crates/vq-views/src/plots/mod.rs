//! Chart and map view implementations

// Charts
pub mod chart;
pub mod layout;
pub mod sort;

// Geographic plots
pub mod geo;

// Utilities
pub mod utils;

// Re-exports
pub use chart::{build_chart_config, ChartConfig, ChartOptions, ChartView};
pub use geo::{build_map_config, MapConfig, MapOptions, MapView};
pub use layout::{AxisConfig, ChartLayout, OverlayConfig, Series};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::plots::layout::{ArcLayout, ColumnLayout, StackedLayout, TornadoLayout};

/// Chart kinds a chart view can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Line,
    Spline,
    Area,
    AreaSpline,
    Bar,
    Hbar,
    Scatter,
    Bscatter,
    Donut,
    Pie,
    Sbar,
    Shbar,
    Buttchart,
}

impl ChartKind {
    pub const ALL: [ChartKind; 13] = [
        ChartKind::Line,
        ChartKind::Spline,
        ChartKind::Area,
        ChartKind::AreaSpline,
        ChartKind::Bar,
        ChartKind::Hbar,
        ChartKind::Scatter,
        ChartKind::Bscatter,
        ChartKind::Donut,
        ChartKind::Pie,
        ChartKind::Sbar,
        ChartKind::Shbar,
        ChartKind::Buttchart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Spline => "spline",
            ChartKind::Area => "area",
            ChartKind::AreaSpline => "area-spline",
            ChartKind::Bar => "bar",
            ChartKind::Hbar => "hbar",
            ChartKind::Scatter => "scatter",
            ChartKind::Bscatter => "bscatter",
            ChartKind::Donut => "donut",
            ChartKind::Pie => "pie",
            ChartKind::Sbar => "sbar",
            ChartKind::Shbar => "shbar",
            ChartKind::Buttchart => "buttchart",
        }
    }

    /// Layout that builds this kind's series and axes
    pub fn layout(&self) -> &'static dyn ChartLayout {
        match self {
            ChartKind::Donut | ChartKind::Pie => &ArcLayout,
            ChartKind::Sbar | ChartKind::Shbar => &StackedLayout,
            ChartKind::Buttchart => &TornadoLayout,
            _ => &ColumnLayout,
        }
    }

    /// Series type understood by the drawing widget
    pub fn render_type(&self) -> &'static str {
        match self {
            ChartKind::Hbar | ChartKind::Sbar | ChartKind::Shbar => "bar",
            ChartKind::Bscatter => "scatter",
            other => other.as_str(),
        }
    }

    /// Whether the value axis runs horizontally
    pub fn is_rotated(&self) -> bool {
        matches!(self, ChartKind::Hbar | ChartKind::Shbar)
    }

    /// Whether dynamic reference lines are drawn
    pub fn draws_reference(&self) -> bool {
        !matches!(
            self,
            ChartKind::Sbar | ChartKind::Shbar | ChartKind::Donut | ChartKind::Pie
        )
    }

    /// Whether `y_from_zero` applies
    pub fn can_start_at_zero(&self) -> bool {
        matches!(
            self,
            ChartKind::Line
                | ChartKind::Area
                | ChartKind::AreaSpline
                | ChartKind::Spline
                | ChartKind::Scatter
                | ChartKind::Bscatter
        )
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown chart type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChartKind(pub String);

impl fmt::Display for UnknownChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown chart type '{}'", self.0)
    }
}

impl std::error::Error for UnknownChartKind {}

impl FromStr for ChartKind {
    type Err = UnknownChartKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| UnknownChartKind(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_kind() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.as_str().parse::<ChartKind>(), Ok(kind));
        }
        assert!("radar".parse::<ChartKind>().is_err());
        assert_eq!(
            serde_json::to_value(ChartKind::AreaSpline).unwrap(),
            serde_json::json!("area-spline")
        );
    }

    #[test]
    fn test_kind_traits() {
        assert_eq!(ChartKind::Hbar.render_type(), "bar");
        assert_eq!(ChartKind::Bscatter.render_type(), "scatter");
        assert!(ChartKind::Shbar.is_rotated());
        assert!(!ChartKind::Pie.draws_reference());
        assert!(ChartKind::Bar.draws_reference());
        assert!(ChartKind::Spline.can_start_at_zero());
        assert!(!ChartKind::Bar.can_start_at_zero());
    }
}
