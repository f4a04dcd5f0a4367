//! Table view implementation

pub mod pivot;

pub use pivot::{category_grid, qualitative_grid, simple_grid, TableGrid};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use vq_core::options::lenient_string;
use vq_core::{Aggregation, QuerySpec, QueryState, ViewId};

use crate::space_view::{merge_options, ViewConfig, ViewOutcome, VizView};
use crate::ViewerContext;

pub const MISSING_AXES: &str = "Please choose X and Y axis dimensions and press Update!";
pub const TABLE_FAILED: &str = "Table could not be created!";

/// Whether the table shows measures or only distinct dimension values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    #[default]
    Quantitative,
    Qualitative,
}

/// Anything but `qualitative` is quantitative
fn lenient_data_kind<'de, D>(deserializer: D) -> Result<DataKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_string(deserializer)?;
    Ok(if raw.trim().eq_ignore_ascii_case("qualitative") {
        DataKind::Qualitative
    } else {
        DataKind::Quantitative
    })
}

/// Saved options of a table view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Measure
    #[serde(deserialize_with = "lenient_string")]
    pub y_axis: String,

    /// Dimension
    #[serde(deserialize_with = "lenient_string")]
    pub main_value: String,

    #[serde(deserialize_with = "lenient_string")]
    pub category_name: String,

    #[serde(deserialize_with = "lenient_data_kind")]
    pub data_type: DataKind,

    #[serde(deserialize_with = "lenient_string")]
    pub data_format: String,

    #[serde(deserialize_with = "lenient_string")]
    pub table_title: String,

    /// Name of the underlying resource, used for untitled exports
    #[serde(deserialize_with = "lenient_string")]
    pub resource_name: String,
}

impl TableOptions {
    pub fn category(&self) -> Option<&str> {
        Some(self.category_name.as_str()).filter(|c| !c.trim().is_empty())
    }

    /// The dimension is always needed, the measure unless qualitative
    pub fn is_complete(&self) -> bool {
        !self.main_value.is_empty()
            && (self.data_type == DataKind::Qualitative || !self.y_axis.is_empty())
    }

    /// Projection for the current filters
    pub fn query(&self, state: &QueryState) -> QuerySpec {
        let resource = state.resource_id.clone();
        let where_clause = state.where_fragment();

        match (self.data_type, self.category()) {
            (DataKind::Qualitative, _) => QuerySpec::distinct(resource, &self.main_value, where_clause),
            (DataKind::Quantitative, Some(category)) => QuerySpec::category_aggregate(
                resource,
                category,
                &self.main_value,
                &self.y_axis,
                Aggregation::Sum,
                where_clause,
            ),
            (DataKind::Quantitative, None) => QuerySpec::aggregate(
                resource,
                &self.main_value,
                &self.y_axis,
                Aggregation::Sum,
                where_clause,
            ),
        }
    }

    /// Title, or the resource name when untitled, cut at the first `.`
    pub fn export_filename(&self) -> String {
        let name = if self.table_title.is_empty() {
            &self.resource_name
        } else {
            &self.table_title
        };
        name.split('.').next().unwrap_or_default().to_string()
    }
}

/// Finished table configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableConfig {
    pub dimension_field: String,
    pub measure_field: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,

    pub data_kind: DataKind,
    pub title: String,
    pub export_filename: String,
    pub grid: TableGrid,
}

/// Build a table configuration from fetched rows
pub fn build_table_config(options: &TableOptions, rows: &[vq_data::Row]) -> TableConfig {
    let grid = match (options.data_type, options.category()) {
        (DataKind::Qualitative, _) => qualitative_grid(rows, &options.main_value),
        (DataKind::Quantitative, Some(category)) => category_grid(
            rows,
            category,
            &options.main_value,
            &options.y_axis,
            &options.data_format,
        ),
        (DataKind::Quantitative, None) => {
            simple_grid(rows, &options.main_value, &options.y_axis, &options.data_format)
        }
    };

    TableConfig {
        dimension_field: options.main_value.clone(),
        measure_field: options.y_axis.clone(),
        category_field: options.category().map(str::to_string),
        data_kind: options.data_type,
        title: options.table_title.clone(),
        export_filename: options.export_filename(),
        grid,
    }
}

/// Table view that displays query results in a tabular format
pub struct TableView {
    id: ViewId,
    options: RwLock<TableOptions>,
}

impl TableView {
    pub fn new(id: ViewId, options: TableOptions) -> Self {
        Self {
            id,
            options: RwLock::new(options),
        }
    }

    pub fn options(&self) -> TableOptions {
        self.options.read().clone()
    }
}

#[async_trait]
impl VizView for TableView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn view_type(&self) -> &'static str {
        "TableView"
    }

    fn title(&self) -> String {
        self.options.read().table_title.clone()
    }

    fn save_config(&self) -> Value {
        serde_json::to_value(&*self.options.read()).unwrap_or(Value::Null)
    }

    fn load_config(&self, config: Value) {
        let merged = merge_options(self.save_config(), config);
        match serde_json::from_value::<TableOptions>(merged) {
            Ok(options) => *self.options.write() = options,
            Err(e) => warn!("Ignoring table options for {}: {}", self.id, e),
        }
    }

    async fn refresh(&self, ctx: &ViewerContext, state: &QueryState) -> ViewOutcome {
        let options = self.options();
        if !options.is_complete() {
            return ViewOutcome::Placeholder(MISSING_AXES.to_string());
        }

        let query = options.query(state);
        let measure = match options.data_type {
            DataKind::Quantitative => Some(options.y_axis.as_str()),
            DataKind::Qualitative => None,
        };

        match ctx.fetcher.fetch(&query, measure).await {
            Ok(dataset) => {
                ViewOutcome::Render(ViewConfig::Table(build_table_config(&options, dataset.rows())))
            }
            Err(e) => {
                error!("Table {} could not be refreshed: {}", self.id, e);
                ViewOutcome::KeepPrevious(TABLE_FAILED.to_string())
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
    use vq_data::sources::actions;
    use vq_data::sources::memory_source::{CannedResponse, Fixture};
    use vq_data::MemoryBackend;

    use crate::test_support::context;

    fn options() -> TableOptions {
        TableOptions {
            y_axis: "total".to_string(),
            main_value: "region".to_string(),
            ..TableOptions::default()
        }
    }

    #[test]
    fn test_lenient_table_options() {
        let opts: TableOptions = serde_json::from_value(json!({
            "y_axis": "total",
            "main_value": "region",
            "category_name": true,
            "data_type": true,
            "table_title": "Population.csv"
        }))
        .unwrap();
        assert_eq!(opts.category(), None);
        assert_eq!(opts.data_type, DataKind::Quantitative);
        assert_eq!(opts.export_filename(), "Population");

        let opts: TableOptions = serde_json::from_value(json!({"data_type": "qualitative"})).unwrap();
        assert_eq!(opts.data_type, DataKind::Qualitative);
    }

    #[test]
    fn test_export_filename_falls_back_to_resource() {
        let opts = TableOptions {
            resource_name: "census.2020.xlsx".to_string(),
            ..options()
        };
        assert_eq!(opts.export_filename(), "census");
    }

    #[test]
    fn test_query_modes() {
        let state = QueryState::empty("res-1");

        assert_eq!(
            options().query(&state).to_sql(),
            r#"SELECT "region", SUM("total") as "total" FROM "res-1" GROUP BY "region""#
        );

        let pivot = TableOptions {
            category_name: "gender".to_string(),
            ..options()
        };
        assert_eq!(
            pivot.query(&state).to_sql(),
            r#"SELECT "gender", "region", SUM("total") as "total" FROM "res-1" GROUP BY "gender", "region""#
        );

        let distinct = TableOptions {
            data_type: DataKind::Qualitative,
            ..options()
        };
        assert_eq!(
            distinct.query(&state).to_sql(),
            r#"SELECT DISTINCT "region" FROM "res-1" GROUP BY "region""#
        );
    }

    #[tokio::test]
    async fn test_refresh_renders_and_keeps_previous() {
        let backend = Arc::new(MemoryBackend::new(Fixture {
            resource_data: vec![CannedResponse::always(json!([
                {"region": "North", "total": "1500"},
                {"region": "South", "total": "250"}
            ]))],
            ..Fixture::default()
        }));
        let ctx = context(backend.clone());
        let state = QueryState::empty("res-1");
        let view = TableView::new(uuid::Uuid::new_v4(), TableOptions::default());

        assert_eq!(
            view.refresh(&ctx, &state).await,
            ViewOutcome::Placeholder(MISSING_AXES.to_string())
        );

        view.load_config(json!({"y_axis": "total", "main_value": "region", "data_format": ","}));
        match view.refresh(&ctx, &state).await {
            ViewOutcome::Render(ViewConfig::Table(config)) => {
                assert_eq!(config.grid.headers, ["Region", "Total"]);
                assert_eq!(config.grid.rows[0], ["North", "1,500"]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        backend.fail_action(actions::RESOURCE_DATA);
        assert_eq!(
            view.refresh(&ctx, &state).await,
            ViewOutcome::KeepPrevious(TABLE_FAILED.to_string())
        );
    }
}
