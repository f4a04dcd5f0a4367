//! Chart layouts
//!
//! Every chart kind is drawn by one of four layouts sharing the
//! [`ChartLayout`] contract: column (bar, line, area and scatter family), arc
//! (donut, pie), stacked (sbar, shbar) and tornado (buttchart).

use serde::Serialize;
use serde_json::Value;

use vq_data::dataset::{coerce_number, field, field_text, Records};
use vq_data::{Dataset, NullConfig};

use super::chart::ChartOptions;
use super::sort::{parse_int, tornado_order};
use super::utils::labels::truncate_category;
use super::ChartKind;
use crate::format::format_measure;

/// Everything a layout reads
pub struct LayoutInput<'a> {
    pub kind: ChartKind,
    pub options: &'a ChartOptions,

    /// Rows already in display order
    pub dataset: &'a Dataset,

    pub nulls: &'a NullConfig,

    /// Resolved dynamic reference value, when one is drawn
    pub reference: Option<f64>,
}

/// Series data handed to the drawing widget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Series {
    Columns(ColumnSeries),
    Tornado(TornadoSeries),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSeries {
    /// Widget series type, e.g. `bar` for horizontal bars
    pub render_type: &'static str,

    /// Name of the column holding dimension values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// `[name, v1, v2, ...]` columns
    pub columns: Vec<Vec<Value>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    /// Value label format, when labels are shown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<PointRadius>,
}

/// Point radius of line and scatter series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointRadius {
    Fixed { r: f64 },

    /// Logarithmic bubble radius for large values
    Log {
        base: f64,
        domain: [f64; 2],
        range: [f64; 2],
    },
}

impl PointRadius {
    pub const BUBBLE: PointRadius = PointRadius::Log {
        base: 10.0,
        domain: [1.0, 1000.0],
        range: [0.0, 10.0],
    };

    /// Radius for a value; non-positive values get no bubble
    pub fn radius(&self, value: f64) -> f64 {
        match *self {
            PointRadius::Fixed { r } => r,
            PointRadius::Log {
                base,
                domain,
                range,
            } => {
                if value <= 0.0 {
                    return range[0];
                }
                let t = (value.log(base) - domain[0].log(base))
                    / (domain[1].log(base) - domain[0].log(base));
                range[0] + t * (range[1] - range[0])
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TornadoSeries {
    pub bars: Vec<TornadoBar>,

    /// Extent of the bar values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TornadoBar {
    pub label: String,
    pub extra: String,
    pub value: Option<i64>,

    /// `positive` or `negative`
    pub class: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub multiline: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiline_max: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisPadding {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct XAxis {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    pub tick: TickConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YAxis {
    pub tick: TickConfig,
    pub padding: AxisPadding,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisConfig {
    pub rotated: bool,
    pub x: XAxis,
    pub y: YAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub text: String,

    /// `base` is always shown, `active` on hover
    pub class: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_lines: Vec<ReferenceLine>,
}

/// Shared contract of the chart layouts
pub trait ChartLayout: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_series(&self, input: &LayoutInput<'_>) -> Series;

    /// Axes, or `None` for charts without any
    fn axis_config(&self, input: &LayoutInput<'_>) -> Option<AxisConfig>;

    fn overlay_config(&self, input: &LayoutInput<'_>) -> OverlayConfig {
        reference_overlay(input)
    }
}

/// Base and active reference lines
pub fn reference_overlay(input: &LayoutInput<'_>) -> OverlayConfig {
    let value = match input.reference {
        Some(value) if input.kind.draws_reference() => value,
        _ => return OverlayConfig::default(),
    };

    let label = &input.options.dynamic_reference_label;
    let formatted = format_measure(&input.options.data_format, value);
    OverlayConfig {
        reference_lines: vec![
            ReferenceLine {
                value,
                text: label.clone(),
                class: "base",
            },
            ReferenceLine {
                value,
                text: format!("{} ({})", label, formatted),
                class: "active",
            },
        ],
    }
}

fn number_value(value: Option<&Value>, nulls: &NullConfig) -> Value {
    value
        .and_then(|v| coerce_number(v, nulls))
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// `[dimension, value]` pairs, or the category columns without `x`
fn pair_columns(input: &LayoutInput<'_>) -> Vec<Vec<Value>> {
    match &input.dataset.records {
        Records::Categories(columns) => columns
            .series()
            .into_iter()
            .map(|(_, column)| column.clone())
            .collect(),
        Records::Rows(rows) => rows
            .iter()
            .map(|row| {
                vec![
                    Value::String(field_text(row, &input.options.x_axis)),
                    number_value(field(row, &input.options.y_axis), input.nulls),
                ]
            })
            .collect(),
    }
}

fn value_tick(input: &LayoutInput<'_>, rotate: Option<f64>) -> TickConfig {
    let options = input.options;
    TickConfig {
        count: options.tick_count,
        format: Some(options.y_tick_format.clone()).filter(|f| !f.is_empty()),
        rotate,
        ..TickConfig::default()
    }
}

fn y_label(options: &ChartOptions) -> Option<String> {
    Some(options.y_label.clone()).filter(|l| !l.is_empty())
}

/// Bar, line, area and scatter charts
pub struct ColumnLayout;

impl ChartLayout for ColumnLayout {
    fn name(&self) -> &'static str {
        "column"
    }

    fn build_series(&self, input: &LayoutInput<'_>) -> Series {
        let options = input.options;
        let (x, columns) = match &input.dataset.records {
            Records::Categories(columns) => {
                let x = columns.x().map(|_| vq_data::dataset::CATEGORY_X_KEY.to_string());
                let sorted = columns
                    .sorted()
                    .into_iter()
                    .map(|(_, column)| column.clone())
                    .collect();
                (x, sorted)
            }
            Records::Rows(rows) => {
                let mut column = Vec::with_capacity(rows.len() + 1);
                column.push(Value::String(options.x_axis.clone()));
                column.extend(
                    rows.iter()
                        .map(|row| number_value(field(row, &options.y_axis), input.nulls)),
                );
                (None, vec![column])
            }
        };

        let point = if input.kind == ChartKind::Bscatter {
            PointRadius::BUBBLE
        } else {
            PointRadius::Fixed { r: 3.0 }
        };

        Series::Columns(ColumnSeries {
            render_type: input.kind.render_type(),
            x,
            columns,
            groups: Vec::new(),
            order: None,
            labels: options.show_labels.then(|| options.data_format.clone()),
            point: Some(point),
        })
    }

    fn axis_config(&self, input: &LayoutInput<'_>) -> Option<AxisConfig> {
        let options = input.options;
        let is_line = input.kind == ChartKind::Line;

        let categories = input
            .dataset
            .records
            .rows()
            .map(|rows| {
                rows.iter()
                    .map(|row| truncate_category(&field_text(row, &options.x_axis)))
                    .collect()
            })
            .unwrap_or_default();

        // on horizontal bars the value axis takes the dimension's rotation
        let y_rotate = if input.kind.is_rotated() {
            options.x_text_rotate
        } else {
            Some(0.0)
        };

        Some(AxisConfig {
            rotated: input.kind.is_rotated(),
            x: XAxis {
                kind: Some("category"),
                categories,
                tick: TickConfig {
                    count: if is_line { options.tick_count } else { None },
                    rotate: options.x_text_rotate,
                    multiline: options.x_text_multiline,
                    multiline_max: Some(3),
                    ..TickConfig::default()
                },
            },
            y: YAxis {
                tick: value_tick(input, y_rotate),
                padding: AxisPadding {
                    top: 50.0,
                    bottom: if is_line { 50.0 } else { 40.0 },
                },
                label: y_label(options),
                min: None,
                max: None,
            },
        })
    }
}

/// Donut and pie charts
pub struct ArcLayout;

impl ChartLayout for ArcLayout {
    fn name(&self) -> &'static str {
        "arc"
    }

    fn build_series(&self, input: &LayoutInput<'_>) -> Series {
        Series::Columns(ColumnSeries {
            render_type: input.kind.render_type(),
            x: None,
            columns: pair_columns(input),
            groups: Vec::new(),
            order: None,
            labels: None,
            point: None,
        })
    }

    fn axis_config(&self, _input: &LayoutInput<'_>) -> Option<AxisConfig> {
        None
    }
}

/// Stacked bars, every series in one group
pub struct StackedLayout;

impl ChartLayout for StackedLayout {
    fn name(&self) -> &'static str {
        "stacked"
    }

    fn build_series(&self, input: &LayoutInput<'_>) -> Series {
        let columns = pair_columns(input);
        let group: Vec<String> = columns
            .iter()
            .filter_map(|column| column.first())
            .map(vq_data::dataset::value_text)
            .collect();

        Series::Columns(ColumnSeries {
            render_type: input.kind.render_type(),
            x: None,
            columns,
            groups: vec![group],
            order: Some(input.options.data_sort.clone()).filter(|s| !s.is_empty()),
            labels: None,
            point: None,
        })
    }

    fn axis_config(&self, input: &LayoutInput<'_>) -> Option<AxisConfig> {
        let options = input.options;
        let y_rotate = if input.kind.is_rotated() {
            options.x_text_rotate
        } else {
            Some(0.0)
        };

        Some(AxisConfig {
            rotated: input.kind.is_rotated(),
            x: XAxis {
                kind: None,
                categories: Vec::new(),
                tick: TickConfig {
                    rotate: options.x_text_rotate,
                    multiline: options.x_text_multiline,
                    multiline_max: Some(3),
                    ..TickConfig::default()
                },
            },
            y: YAxis {
                tick: value_tick(input, y_rotate),
                padding: AxisPadding {
                    top: 50.0,
                    bottom: 50.0,
                },
                label: None,
                min: None,
                max: None,
            },
        })
    }
}

/// Diverging bars around zero
pub struct TornadoLayout;

impl ChartLayout for TornadoLayout {
    fn name(&self) -> &'static str {
        "tornado"
    }

    fn build_series(&self, input: &LayoutInput<'_>) -> Series {
        let options = input.options;
        let mut bars: Vec<TornadoBar> = input
            .dataset
            .rows()
            .iter()
            .map(|row| {
                let value = field(row, &options.x_axis).and_then(parse_int);
                TornadoBar {
                    label: field_text(row, &options.y_axis),
                    extra: field_text(row, &options.additional_tornado_value),
                    value,
                    class: if value.map_or(false, |v| v < 0) {
                        "negative"
                    } else {
                        "positive"
                    },
                }
            })
            .collect();
        tornado_order(&mut bars, |bar| bar.value);

        let domain = bars
            .iter()
            .filter_map(|bar| bar.value)
            .fold(None, |extent: Option<[f64; 2]>, v| {
                let v = v as f64;
                Some(match extent {
                    Some([lo, hi]) => [lo.min(v), hi.max(v)],
                    None => [v, v],
                })
            });

        Series::Tornado(TornadoSeries { bars, domain })
    }

    fn axis_config(&self, _input: &LayoutInput<'_>) -> Option<AxisConfig> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubble_radius() {
        let bubble = PointRadius::BUBBLE;
        assert!((bubble.radius(1.0) - 0.0).abs() < 1e-9);
        assert!((bubble.radius(1000.0) - 10.0).abs() < 1e-9);
        assert!((bubble.radius(100.0) - 20.0 / 3.0).abs() < 1e-9);
        assert_eq!(bubble.radius(0.0), 0.0);
        assert_eq!(PointRadius::Fixed { r: 3.0 }.radius(500.0), 3.0);
    }
}
