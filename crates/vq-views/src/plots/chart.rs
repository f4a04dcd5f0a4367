//! Chart view
//!
//! Builds the aggregation query for the configured axes, fetches it and
//! turns the dataset into a [`ChartConfig`] through the layout of the chart
//! kind. Configuration problems become placeholder texts instead of errors.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use vq_core::options::{lenient_bool, lenient_opt_f64, lenient_string};
use vq_core::{Aggregation, QuerySpec, QueryState, ViewId};
use vq_data::dataset::Records;
use vq_data::sources::ChartDataRequest;
use vq_data::{Dataset, DynamicReference, NullConfig, Statistics};

use super::layout::{AxisConfig, AxisPadding, LayoutInput, OverlayConfig, Series};
use super::sort::{sort_rows, SortOrder};
use super::utils::{resolve_chart_colors, truncate_line};
use super::ChartKind;
use crate::space_view::{merge_options, ViewConfig, ViewOutcome, VizView};
use crate::template::{render_title, TitleContext};
use crate::ViewerContext;

pub const MISSING_AXES: &str = "Please choose X and Y axis dimensions and press Update!";
pub const SAME_AXES: &str =
    "X axis dimension cannot be same as Y axis dimension, please choose different one!";
pub const CHART_FAILED: &str = "Chart could not be created!";

/// Saved options of a chart view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    #[serde(deserialize_with = "lenient_string")]
    pub chart_type: String,

    #[serde(deserialize_with = "lenient_string")]
    pub x_axis: String,

    #[serde(deserialize_with = "lenient_string")]
    pub y_axis: String,

    /// `SUM` unless `MAX`
    #[serde(deserialize_with = "lenient_string")]
    pub y_operation: String,

    #[serde(deserialize_with = "lenient_string")]
    pub category_name: String,

    #[serde(deserialize_with = "lenient_string")]
    pub additional_tornado_value: String,

    #[serde(deserialize_with = "lenient_string")]
    pub title: String,

    #[serde(deserialize_with = "lenient_string")]
    pub chart_subtitle: String,

    #[serde(deserialize_with = "lenient_string")]
    pub chart_description: String,

    /// Field whose filter value fills `{optional_filter}`
    #[serde(deserialize_with = "lenient_string")]
    pub optional_filter: String,

    /// Comma separated series colors
    #[serde(deserialize_with = "lenient_string")]
    pub colors: String,

    #[serde(deserialize_with = "lenient_bool")]
    pub show_legend: bool,

    #[serde(deserialize_with = "lenient_bool")]
    pub show_labels: bool,

    #[serde(deserialize_with = "lenient_opt_f64")]
    pub x_text_rotate: Option<f64>,

    #[serde(deserialize_with = "lenient_bool")]
    pub x_text_multiline: bool,

    #[serde(deserialize_with = "lenient_string")]
    pub tooltip_name: String,

    /// Number format of values and labels
    #[serde(deserialize_with = "lenient_string")]
    pub data_format: String,

    #[serde(deserialize_with = "lenient_string")]
    pub y_tick_format: String,

    #[serde(deserialize_with = "lenient_opt_f64")]
    pub tick_count: Option<f64>,

    #[serde(deserialize_with = "lenient_string")]
    pub y_label: String,

    #[serde(deserialize_with = "lenient_bool")]
    pub y_from_zero: bool,

    /// `asc`, `desc`, or empty for dimension order
    #[serde(deserialize_with = "lenient_string")]
    pub data_sort: String,

    /// `Maximum`, `Average` or `Minimum`
    #[serde(deserialize_with = "lenient_string")]
    pub dynamic_reference_type: String,

    #[serde(deserialize_with = "lenient_opt_f64")]
    pub dynamic_reference_factor: Option<f64>,

    #[serde(deserialize_with = "lenient_string")]
    pub dynamic_reference_label: String,

    /// Display name of the measure in titles
    #[serde(deserialize_with = "lenient_string")]
    pub measure_label: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            chart_type: "line".to_string(),
            x_axis: String::new(),
            y_axis: String::new(),
            y_operation: "SUM".to_string(),
            category_name: String::new(),
            additional_tornado_value: String::new(),
            title: String::new(),
            chart_subtitle: String::new(),
            chart_description: String::new(),
            optional_filter: String::new(),
            colors: String::new(),
            show_legend: true,
            show_labels: false,
            x_text_rotate: None,
            x_text_multiline: false,
            tooltip_name: String::new(),
            data_format: String::new(),
            y_tick_format: String::new(),
            tick_count: None,
            y_label: String::new(),
            y_from_zero: false,
            data_sort: String::new(),
            dynamic_reference_type: String::new(),
            dynamic_reference_factor: None,
            dynamic_reference_label: String::new(),
            measure_label: String::new(),
        }
    }
}

impl ChartOptions {
    pub fn category(&self) -> Option<&str> {
        Some(self.category_name.as_str()).filter(|c| !c.trim().is_empty())
    }

    /// Chart kind, or the placeholder text explaining why there is none
    pub fn validate(&self) -> Result<ChartKind, String> {
        if self.x_axis.is_empty() || self.y_axis.is_empty() {
            return Err(MISSING_AXES.to_string());
        }
        if self.x_axis == self.y_axis {
            return Err(SAME_AXES.to_string());
        }
        self.chart_type.parse().map_err(|e| {
            warn!("{}", e);
            CHART_FAILED.to_string()
        })
    }

    /// Aggregation query for the current filters
    pub fn query(&self, kind: ChartKind, state: &QueryState) -> QuerySpec {
        if kind == ChartKind::Buttchart {
            QuerySpec::tornado(
                state.resource_id.clone(),
                &self.y_axis,
                &self.additional_tornado_value,
                &self.x_axis,
                state.where_fragment(),
            )
        } else {
            QuerySpec::aggregate(
                state.resource_id.clone(),
                &self.x_axis,
                &self.y_axis,
                Aggregation::from_operation(&self.y_operation),
                state.where_fragment(),
            )
        }
    }

    /// Request for the chart data endpoint
    pub fn chart_request(&self, kind: ChartKind, state: &QueryState) -> ChartDataRequest {
        ChartDataRequest {
            sql_string: self.query(kind, state).to_sql(),
            category: self.category_name.clone(),
            x_axis: self.x_axis.clone(),
            y_axis: self.y_axis.clone(),
            additional_tornado_value: self.additional_tornado_value.clone(),
            resource_id: state.resource_id.clone(),
            filters: state.filters.to_persisted(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Padding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleConfig {
    pub text: String,

    /// Subtitle and description lines under the title
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,

    pub padding: Padding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipConfig {
    /// Fixed tooltip title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether the hovered dimension value titles the tooltip
    pub title_from_dimension: bool,

    pub value_format: String,
}

/// Finished chart configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    pub chart_type: ChartKind,
    pub x_field: String,
    pub y_field: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,

    pub sort: SortOrder,
    pub colors: Vec<String>,
    pub label_format: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_reference: Option<DynamicReference>,

    pub title: TitleConfig,
    pub show_legend: bool,
    pub tooltip: TooltipConfig,
    pub padding: Padding,
    pub series: Series,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<AxisConfig>,

    pub overlay: OverlayConfig,
    pub statistics: Statistics,
}

/// Build a chart configuration from fetched data
///
/// Pure: rows are sorted on a copy, statistics come with the dataset.
pub fn build_chart_config(
    options: &ChartOptions,
    kind: ChartKind,
    dataset: &Dataset,
    state: &QueryState,
    default_colors: &[String],
    nulls: &NullConfig,
) -> ChartConfig {
    let category = options.category().map(str::to_string);
    let sort = SortOrder::from_option(&options.data_sort);

    let sorted;
    let dataset = match &dataset.records {
        Records::Rows(rows) if category.is_none() && kind != ChartKind::Buttchart => {
            let mut rows = rows.clone();
            sort_rows(&mut rows, sort, &options.x_axis, &options.y_axis, nulls);
            sorted = Dataset::new(dataset.measure.clone(), Records::Rows(rows), dataset.statistics);
            &sorted
        }
        _ => dataset,
    };

    let dynamic_reference = DynamicReference::from_options(
        Some(options.dynamic_reference_type.as_str()),
        options.dynamic_reference_factor,
    );
    let reference = dynamic_reference
        .and_then(|r| r.resolve(&dataset.statistics))
        .filter(|value| {
            let drawn = *value != 0.0 && !value.is_nan();
            if !drawn {
                debug!("Dynamic reference resolved to {}, not drawn", value);
            }
            drawn
        });

    let input = LayoutInput {
        kind,
        options,
        dataset,
        nulls,
        reference,
    };
    let layout = kind.layout();
    let series = layout.build_series(&input);
    let mut axis = layout.axis_config(&input);
    let overlay = layout.overlay_config(&input);

    if let Some(axis) = axis.as_mut() {
        if let Some(value) = reference.filter(|_| kind.draws_reference()) {
            let range = dataset.statistics.extend_range(value);
            axis.y.min = range.min;
            axis.y.max = range.max;
            axis.y.padding = AxisPadding {
                top: 50.0,
                bottom: if matches!(kind, ChartKind::Bar | ChartKind::Hbar) {
                    0.0
                } else {
                    50.0
                },
            };
        }
        if options.y_from_zero && kind.can_start_at_zero() {
            axis.y.min = Some(0.0);
            axis.y.padding.bottom = 0.0;
        }
    }

    // Only a two-row hbar gets the wide left margin; category columns never do
    let two_rows = matches!(&dataset.records, Records::Rows(rows) if rows.len() == 2);
    let padding = if kind == ChartKind::Hbar && two_rows {
        Padding {
            left: Some(110.0),
            ..Padding::default()
        }
    } else {
        Padding {
            right: Some(50.0),
            bottom: Some(14.0),
            ..Padding::default()
        }
    };

    let tooltip_name = Some(options.tooltip_name.clone()).filter(|n| !n.is_empty());
    let is_arc = matches!(kind, ChartKind::Donut | ChartKind::Pie);

    ChartConfig {
        chart_type: kind,
        x_field: options.x_axis.clone(),
        y_field: options.y_axis.clone(),
        category_field: category,
        sort,
        colors: resolve_chart_colors(&options.colors, default_colors),
        label_format: options.data_format.clone(),
        dynamic_reference,
        title: chart_title(options, kind, state),
        show_legend: options.show_legend,
        tooltip: TooltipConfig {
            title_from_dimension: tooltip_name.is_some() && !is_arc,
            name: tooltip_name.filter(|_| is_arc),
            value_format: options.data_format.clone(),
        },
        padding,
        series,
        axis,
        overlay,
        statistics: dataset.statistics,
    }
}

fn chart_title(options: &ChartOptions, kind: ChartKind, state: &QueryState) -> TitleConfig {
    let measure = if options.measure_label.is_empty() {
        options.y_axis.as_str()
    } else {
        options.measure_label.as_str()
    };
    let mut context = TitleContext::new(measure).with_filters(&state.filters);
    if !options.optional_filter.is_empty() {
        context = context.with_optional_filter(&state.filters, &options.optional_filter);
    }

    let lines = if kind == ChartKind::Buttchart {
        Vec::new()
    } else {
        [&options.chart_subtitle, &options.chart_description]
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(|line| truncate_line(line))
            .collect()
    };

    TitleConfig {
        text: render_title(&options.title, &context),
        lines,
        padding: Padding {
            top: Some(15.0),
            right: Some(150.0),
            bottom: Some(15.0),
            left: Some(0.0),
        },
    }
}

/// A chart on the dashboard
pub struct ChartView {
    id: ViewId,
    options: RwLock<ChartOptions>,
}

impl ChartView {
    pub fn new(id: ViewId, options: ChartOptions) -> Self {
        Self {
            id,
            options: RwLock::new(options),
        }
    }

    pub fn options(&self) -> ChartOptions {
        self.options.read().clone()
    }
}

#[async_trait]
impl VizView for ChartView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn view_type(&self) -> &'static str {
        "ChartView"
    }

    fn title(&self) -> String {
        self.options.read().title.clone()
    }

    fn save_config(&self) -> Value {
        serde_json::to_value(&*self.options.read()).unwrap_or(Value::Null)
    }

    fn load_config(&self, config: Value) {
        let merged = merge_options(self.save_config(), config);
        match serde_json::from_value::<ChartOptions>(merged) {
            Ok(options) => *self.options.write() = options,
            Err(e) => warn!("Ignoring chart options for {}: {}", self.id, e),
        }
    }

    async fn refresh(&self, ctx: &ViewerContext, state: &QueryState) -> ViewOutcome {
        let options = self.options();
        let kind = match options.validate() {
            Ok(kind) => kind,
            Err(message) => return ViewOutcome::Placeholder(message),
        };

        let request = options.chart_request(kind, state);
        match ctx.fetcher.fetch_chart(&request).await {
            Ok(dataset) => ViewOutcome::Render(ViewConfig::Chart(build_chart_config(
                &options,
                kind,
                &dataset,
                state,
                &ctx.config.chart_colors,
                ctx.fetcher.statistics().nulls(),
            ))),
            Err(e) => {
                error!("Chart {} could not be created: {}", self.id, e);
                ViewOutcome::Placeholder(CHART_FAILED.to_string())
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use vq_core::{Connector, FilterChain};
    use vq_data::dataset::CategoryColumns;
    use vq_data::sources::actions;
    use vq_data::sources::memory_source::{CannedResponse, Fixture};
    use vq_data::{MemoryBackend, Row, StatisticsComputer};

    use crate::plots::layout::{ColumnSeries, PointRadius, TornadoSeries};
    use crate::test_support::context;

    fn rows(values: Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    fn dataset(measure: &str, values: Value) -> Dataset {
        let rows = rows(values);
        let statistics = StatisticsComputer::default().compute_rows(&rows, measure);
        Dataset::new(measure, Records::Rows(rows), statistics)
    }

    fn options(chart_type: &str) -> ChartOptions {
        ChartOptions {
            chart_type: chart_type.to_string(),
            x_axis: "region".to_string(),
            y_axis: "total".to_string(),
            ..ChartOptions::default()
        }
    }

    fn build(options: &ChartOptions, dataset: &Dataset) -> ChartConfig {
        let kind = options.validate().unwrap();
        build_chart_config(
            options,
            kind,
            dataset,
            &QueryState::empty("res-1"),
            &[],
            &NullConfig::default(),
        )
    }

    fn columns(config: &ChartConfig) -> &ColumnSeries {
        match &config.series {
            Series::Columns(series) => series,
            other => panic!("expected columns, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_placeholders() {
        let mut opts = options("bar");
        opts.y_axis.clear();
        assert_eq!(opts.validate(), Err(MISSING_AXES.to_string()));

        let mut opts = options("bar");
        opts.y_axis = "region".to_string();
        assert_eq!(opts.validate(), Err(SAME_AXES.to_string()));

        assert_eq!(options("radar").validate(), Err(CHART_FAILED.to_string()));
        assert_eq!(options("hbar").validate(), Ok(ChartKind::Hbar));
    }

    #[test]
    fn test_lenient_options() {
        let opts: ChartOptions = serde_json::from_value(json!({
            "chart_type": "bar",
            "x_axis": "region",
            "y_axis": true,
            "show_labels": "true",
            "tick_count": "5",
            "dynamic_reference_factor": "1.5"
        }))
        .unwrap();
        assert_eq!(opts.y_axis, "");
        assert!(opts.show_labels);
        assert!(opts.show_legend);
        assert_eq!(opts.tick_count, Some(5.0));
        assert_eq!(opts.dynamic_reference_factor, Some(1.5));
    }

    #[test]
    fn test_query_shapes() {
        let mut chain = FilterChain::new();
        chain.push("country", "Kenya", Connector::And);
        let state = QueryState::new("res-1", chain, 1);

        let opts = options("bar");
        assert_eq!(
            opts.query(ChartKind::Bar, &state).to_sql(),
            r#"SELECT "region", SUM("total") as "total" FROM "res-1" WHERE ("country" = 'Kenya') GROUP BY "region""#
        );

        let mut tornado = options("buttchart");
        tornado.additional_tornado_value = "gender".to_string();
        let request = tornado.chart_request(ChartKind::Buttchart, &state);
        assert!(request.sql_string.starts_with(r#"SELECT "total", "gender", "region""#));
        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.resource_id, "res-1");
    }

    #[test]
    fn test_bar_with_average_reference() {
        let mut opts = options("bar");
        opts.dynamic_reference_type = "Average".to_string();
        opts.dynamic_reference_factor = Some(1.5);
        opts.dynamic_reference_label = "Target".to_string();

        let data = dataset(
            "total",
            json!([
                {"region": "North", "total": "10"},
                {"region": "South", "total": "20"},
                {"region": "East", "total": "30"}
            ]),
        );
        let config = build(&opts, &data);

        let lines = &config.overlay.reference_lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].value, 30.0);
        assert_eq!(lines[0].text, "Target");
        assert_eq!(lines[0].class, "base");
        assert_eq!(lines[1].text, "Target (30)");
        assert_eq!(lines[1].class, "active");

        let axis = config.axis.unwrap();
        assert_eq!(axis.y.min, Some(10.0));
        assert_eq!(axis.y.max, Some(30.0));
        assert_eq!(axis.y.padding.bottom, 0.0);
        assert_eq!(axis.y.padding.top, 50.0);
    }

    #[test]
    fn test_reference_skipped_for_stacked() {
        let mut opts = options("sbar");
        opts.dynamic_reference_type = "Maximum".to_string();
        let data = dataset("total", json!([{"region": "A", "total": 4}]));
        let config = build(&opts, &data);
        assert!(config.overlay.reference_lines.is_empty());
        assert_eq!(config.axis.unwrap().y.max, None);
    }

    #[test]
    fn test_sort_and_truncated_categories() {
        let mut opts = options("bar");
        opts.data_sort = "asc".to_string();
        let data = dataset(
            "total",
            json!([
                {"region": "A very long region name", "total": 3},
                {"region": "B", "total": 1},
                {"region": "C", "total": 3}
            ]),
        );
        let config = build(&opts, &data);

        assert_eq!(
            columns(&config).columns,
            vec![vec![json!("region"), json!(1.0), json!(3.0), json!(3.0)]]
        );
        assert_eq!(
            config.axis.unwrap().x.categories,
            ["B", "A very long...", "C"]
        );
        assert_eq!(config.sort, SortOrder::Asc);
    }

    #[test]
    fn test_category_columns_sorted_by_key() {
        let mut payload = CategoryColumns::default();
        payload.columns.insert("x".into(), vec![json!("x"), json!("2019"), json!("2020")]);
        payload.columns.insert("Male".into(), vec![json!("Male"), json!(3), json!(4)]);
        payload.columns.insert("Female".into(), vec![json!("Female"), json!(5), json!(6)]);
        let data = Dataset::new("total", Records::Categories(payload), Statistics::default());

        let mut opts = options("line");
        opts.category_name = "gender".to_string();
        let config = build(&opts, &data);

        let series = columns(&config);
        assert_eq!(series.x.as_deref(), Some("x"));
        let names: Vec<&Value> = series.columns.iter().map(|c| &c[0]).collect();
        assert_eq!(names, [&json!("Female"), &json!("Male"), &json!("x")]);
        assert_eq!(config.category_field.as_deref(), Some("gender"));

        let mut opts = options("pie");
        opts.category_name = "gender".to_string();
        let config = build(&opts, &data);
        assert_eq!(columns(&config).columns.len(), 2);
        assert!(config.axis.is_none());
    }

    #[test]
    fn test_category_hbar_keeps_default_padding() {
        let mut payload = CategoryColumns::default();
        payload.columns.insert("x".into(), vec![json!("x"), json!("2019"), json!("2020")]);
        payload.columns.insert("Male".into(), vec![json!("Male"), json!(3), json!(4)]);
        let data = Dataset::new("total", Records::Categories(payload), Statistics::default());

        let mut opts = options("hbar");
        opts.category_name = "gender".to_string();
        let config = build(&opts, &data);

        assert_eq!(config.padding.left, None);
        assert_eq!(config.padding.right, Some(50.0));
    }

    #[test]
    fn test_sorting_leaves_input_rows_alone() {
        let data = dataset(
            "total",
            json!([
                {"region": "A", "total": 1},
                {"region": "B", "total": 3},
                {"region": "C", "total": 2}
            ]),
        );
        let mut opts = options("bar");
        opts.data_sort = "desc".to_string();
        let config = build(&opts, &data);

        assert_eq!(
            config.axis.unwrap().x.categories,
            ["B", "C", "A"]
        );
        let order: Vec<String> = data
            .rows()
            .iter()
            .map(|row| vq_data::dataset::field_text(row, "region"))
            .collect();
        assert_eq!(order, ["A", "B", "C"]);
        assert_eq!(config.statistics, data.statistics);
    }

    #[test]
    fn test_stacked_without_category() {
        let mut opts = options("shbar");
        opts.data_sort = "desc".to_string();
        let data = dataset(
            "total",
            json!([{"region": "A", "total": 1}, {"region": "B", "total": 2}]),
        );
        let config = build(&opts, &data);
        let series = columns(&config);

        assert_eq!(series.render_type, "bar");
        assert_eq!(
            series.columns,
            vec![vec![json!("B"), json!(2.0)], vec![json!("A"), json!(1.0)]]
        );
        assert_eq!(series.groups, vec![vec!["B".to_string(), "A".to_string()]]);
        assert_eq!(series.order.as_deref(), Some("desc"));
        assert!(config.axis.unwrap().rotated);
    }

    #[test]
    fn test_tornado_bars() {
        let mut opts = options("buttchart");
        opts.x_axis = "change".to_string();
        opts.y_axis = "age_group".to_string();
        opts.additional_tornado_value = "gender".to_string();
        let data = dataset(
            "age_group",
            json!([
                {"change": "3", "age_group": "0-14", "gender": "F"},
                {"change": "-5", "age_group": "15-24", "gender": "M"},
                {"change": "5", "age_group": "25-54", "gender": "F"}
            ]),
        );
        let config = build(&opts, &data);

        let Series::Tornado(TornadoSeries { bars, domain }) = &config.series else {
            panic!("expected tornado series");
        };
        let values: Vec<Option<i64>> = bars.iter().map(|b| b.value).collect();
        assert_eq!(values, [Some(5), Some(-5), Some(3)]);
        assert_eq!(bars[1].class, "negative");
        assert_eq!(bars[1].label, "15-24");
        assert_eq!(bars[0].class, "positive");
        assert_eq!(*domain, Some([-5.0, 5.0]));
        assert!(config.axis.is_none());
        assert!(config.title.lines.is_empty());
    }

    #[test]
    fn test_y_from_zero_and_bubbles() {
        let mut opts = options("bscatter");
        opts.y_from_zero = true;
        let data = dataset("total", json!([{"region": "A", "total": 40}]));
        let config = build(&opts, &data);

        let axis = config.axis.clone().unwrap();
        assert_eq!(axis.y.min, Some(0.0));
        assert_eq!(axis.y.padding.bottom, 0.0);
        assert_eq!(columns(&config).point, Some(PointRadius::BUBBLE));
        assert_eq!(columns(&config).render_type, "scatter");

        // bars ignore the option
        let mut opts = options("bar");
        opts.y_from_zero = true;
        assert_eq!(build(&opts, &data).axis.unwrap().y.min, None);
    }

    #[test]
    fn test_title_padding_and_colors() {
        let mut opts = options("hbar");
        opts.title = "{measure} in { country }".to_string();
        opts.measure_label = "Population".to_string();
        opts.chart_subtitle = "Source: national statistics office, 2020".to_string();
        opts.colors = "#111111,#222222".to_string();

        let mut chain = FilterChain::new();
        chain.push("Country", "Kenya", Connector::And);
        let state = QueryState::new("res-1", chain, 1);
        let data = dataset(
            "total",
            json!([{"region": "A", "total": 1}, {"region": "B", "total": 2}]),
        );
        let config = build_chart_config(
            &opts,
            ChartKind::Hbar,
            &data,
            &state,
            &[],
            &NullConfig::default(),
        );

        assert_eq!(config.title.text, "Population in Kenya");
        assert_eq!(config.title.lines, ["Source: national statistics of..."]);
        assert_eq!(config.padding.left, Some(110.0));
        assert_eq!(config.padding.right, None);
        assert_eq!(config.colors, ["#111111", "#222222"]);
    }

    #[tokio::test]
    async fn test_refresh_outcomes() {
        let backend = Arc::new(MemoryBackend::new(Fixture {
            chart_data: vec![CannedResponse::always(json!([
                {"region": "North", "total": "12"},
                {"region": "South", "total": "8"}
            ]))],
            ..Fixture::default()
        }));
        let ctx = context(backend.clone());
        let state = QueryState::empty("res-1");

        let view = ChartView::new(uuid::Uuid::new_v4(), options("bar"));
        match view.refresh(&ctx, &state).await {
            ViewOutcome::Render(ViewConfig::Chart(config)) => {
                assert_eq!(config.statistics.max, Some(12.0));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        view.load_config(json!({"y_axis": ""}));
        assert_eq!(
            view.refresh(&ctx, &state).await,
            ViewOutcome::Placeholder(MISSING_AXES.to_string())
        );
        assert_eq!(view.options().x_axis, "region");

        view.load_config(json!({"y_axis": "total"}));
        backend.fail_action(actions::CHART_DATA);
        assert_eq!(
            view.refresh(&ctx, &state).await,
            ViewOutcome::Placeholder(CHART_FAILED.to_string())
        );
    }
}
