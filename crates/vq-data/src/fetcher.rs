//! Data fetcher - runs queries against a backend and builds datasets

use std::sync::Arc;

use geojson::FeatureCollection;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error};

use vq_core::QuerySpec;

use crate::cache::GeoCache;
use crate::config::EngineConfig;
use crate::dataset::{field, value_text, Dataset, Records, Row};
use crate::sources::{
    actions, AggregationBackend, ChartDataRequest, FeatureValue, FieldValue, FieldValuesPage,
    FieldValuesRequest, GeoJsonProperty, MapDataRequest,
};
use crate::stats::StatisticsComputer;
use crate::DataError;

/// Geometry and values for one map refresh
#[derive(Debug, Clone)]
pub struct MapPayload {
    pub collection: Arc<FeatureCollection>,
    pub values: IndexMap<String, FeatureValue>,
}

/// Issues queries and turns responses into [`Dataset`]s
#[derive(Clone)]
pub struct DataFetcher {
    backend: Arc<dyn AggregationBackend>,
    computer: StatisticsComputer,
    geo_cache: Arc<GeoCache>,
    page_size: usize,
}

impl DataFetcher {
    pub fn new(backend: Arc<dyn AggregationBackend>, config: &EngineConfig) -> Self {
        Self {
            backend,
            computer: StatisticsComputer::new(config.null_config.clone()),
            geo_cache: Arc::new(GeoCache::new(config.geo_cache_capacity)),
            page_size: config.field_values_page_size,
        }
    }

    pub fn backend(&self) -> &Arc<dyn AggregationBackend> {
        &self.backend
    }

    pub fn statistics(&self) -> &StatisticsComputer {
        &self.computer
    }

    pub fn geo_cache(&self) -> &Arc<GeoCache> {
        &self.geo_cache
    }

    /// Run a projection query; statistics are computed when `measure` is set
    pub async fn fetch(&self, query: &QuerySpec, measure: Option<&str>) -> Result<Dataset, DataError> {
        let sql = query.to_sql();
        debug!("Fetching rows: {}", sql);

        let rows = self.backend.resource_data(&sql).await.map_err(|e| {
            error!("Query against {} failed: {}", query.resource_id, e);
            e
        })?;

        let statistics = match measure {
            Some(measure) => self.computer.compute_rows(&rows, measure),
            None => Default::default(),
        };

        Ok(Dataset::new(
            measure.unwrap_or_default(),
            Records::Rows(rows),
            statistics,
        ))
    }

    /// Fetch chart data; category payloads keep the server's statistics
    pub async fn fetch_chart(&self, request: &ChartDataRequest) -> Result<Dataset, DataError> {
        debug!("Fetching chart data: {}", request.sql_string);

        let payload = self.backend.chart_data(request).await.map_err(|e| {
            error!("Chart data for {} failed: {}", request.resource_id, e);
            e
        })?;

        if request.has_category() {
            let (columns, statistics) = self.computer.split_category_payload(payload)?;
            return Ok(Dataset::new(
                request.y_axis.clone(),
                Records::Categories(columns),
                statistics,
            ));
        }

        let rows = rows_from_payload(actions::CHART_DATA, payload)?;
        let statistics = self.computer.compute_rows(&rows, &request.y_axis);
        Ok(Dataset::new(request.y_axis.clone(), Records::Rows(rows), statistics))
    }

    /// Fetch map values and the (cached) geometry they join onto
    pub async fn fetch_map(&self, request: &MapDataRequest) -> Result<MapPayload, DataError> {
        debug!(
            "Fetching map data for {} ({})",
            request.geojson_url, request.from_where_clause
        );

        let data = self.backend.map_data(request).await.map_err(|e| {
            error!("Map data for {} failed: {}", request.geojson_url, e);
            e
        })?;
        let collection = self
            .geo_cache
            .get_or_parse(&request.geojson_url, &data.geojson_data)?;

        Ok(MapPayload {
            collection,
            values: data.features_values,
        })
    }

    /// One page of distinct values of `field`, for filter autocompletion
    pub async fn field_values(
        &self,
        resource_id: &str,
        field_name: &str,
        term: &str,
        page: usize,
    ) -> Result<FieldValuesPage, DataError> {
        let request = FieldValuesRequest {
            page: page.max(1),
            limit: self.page_size,
            ..FieldValuesRequest::new(resource_id, field_name, term)
        };
        let records = self.backend.field_values(&request).await?;
        let has_more = records.len() == request.limit;

        let values = records
            .iter()
            .filter_map(|record| field(record, field_name))
            .map(|value| FieldValue {
                id: value.clone(),
                text: value_text(value),
            })
            .collect();

        Ok(FieldValuesPage { values, has_more })
    }

    /// Property names offered as map join keys
    pub async fn geojson_properties(&self, map_resource: &str) -> Result<Vec<GeoJsonProperty>, DataError> {
        self.backend.geojson_properties(map_resource).await
    }
}

fn rows_from_payload(action: &'static str, payload: Value) -> Result<Vec<Row>, DataError> {
    match payload {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(DataError::payload(action, format!("expected a row, got {}", other))),
            })
            .collect(),
        other => Err(DataError::payload(
            action,
            format!("expected a list of rows, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::memory_source::{CannedResponse, Fixture};
    use crate::sources::MemoryBackend;
    use serde_json::json;
    use vq_core::WhereFragment;

    fn fetcher(fixture: Fixture) -> (Arc<MemoryBackend>, DataFetcher) {
        let backend = Arc::new(MemoryBackend::new(fixture));
        let fetcher = DataFetcher::new(backend.clone(), &EngineConfig::default());
        (backend, fetcher)
    }

    fn chart_request(category: &str) -> ChartDataRequest {
        ChartDataRequest {
            sql_string: "SELECT \"region\", SUM(\"total\") as \"total\" FROM \"r\" GROUP BY \"region\"".to_string(),
            category: category.to_string(),
            x_axis: "Region".to_string(),
            y_axis: "Total".to_string(),
            additional_tornado_value: String::new(),
            resource_id: "r".to_string(),
            filters: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_chart_rows_get_statistics() {
        let (_, fetcher) = fetcher(Fixture {
            chart_data: vec![CannedResponse::always(json!([
                {"region": "a", "total": "1"},
                {"region": "b", "total": "2"},
                {"region": "c", "total": "3"},
                {"region": "d", "total": "4"}
            ]))],
            ..Fixture::default()
        });

        let dataset = fetcher.fetch_chart(&chart_request("")).await.unwrap();
        assert_eq!(dataset.rows().len(), 4);
        assert_eq!(dataset.statistics.max, Some(4.0));
        assert_eq!(dataset.statistics.min, Some(1.0));
        assert_eq!(dataset.statistics.avg, Some(2.5));
    }

    #[tokio::test]
    async fn test_chart_categories() {
        let (_, fetcher) = fetcher(Fixture {
            chart_data: vec![CannedResponse::always(json!({
                "x": ["x", "a"],
                "F": ["F", 2],
                "y_axis_max": 2, "y_axis_avg": 2, "y_axis_min": 2
            }))],
            ..Fixture::default()
        });

        let dataset = fetcher.fetch_chart(&chart_request("sex")).await.unwrap();
        let columns = dataset.records.categories().unwrap();
        assert_eq!(columns.columns.len(), 2);
        assert_eq!(dataset.statistics.max, Some(2.0));
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let (backend, fetcher) = fetcher(Fixture::default());
        backend.fail_action(actions::RESOURCE_DATA);

        let query = QuerySpec::distinct("r", "region", WhereFragment::default());
        assert!(fetcher.fetch(&query, None).await.is_err());
    }

    #[tokio::test]
    async fn test_field_values_paging() {
        let records: Vec<Value> = (0..20).map(|i| json!({"country": format!("C{}", i)})).collect();
        let (backend, fetcher) = fetcher(Fixture {
            field_values: vec![CannedResponse::always(json!({"records": records}))],
            ..Fixture::default()
        });

        let page = fetcher.field_values("r", "country", "C", 2).await.unwrap();
        assert!(page.has_more);
        assert_eq!(page.values.len(), 20);
        assert_eq!(page.values[3].text, "C3");
        assert_eq!(backend.requests()[0].text, "country C");
    }

    #[tokio::test]
    async fn test_map_geometry_cached() {
        let (_, fetcher) = fetcher(Fixture {
            map_data: vec![CannedResponse::always(json!({
                "geojson_data": {"type": "FeatureCollection", "features": []},
                "features_values": {"KE": {"value": 3}}
            }))],
            ..Fixture::default()
        });

        let request = MapDataRequest {
            geojson_url: "geo".to_string(),
            map_key_field: "iso".to_string(),
            data_key_field: "country".to_string(),
            data_value_field: "total".to_string(),
            from_where_clause: "FROM \"r\"".to_string(),
        };
        let first = fetcher.fetch_map(&request).await.unwrap();
        let second = fetcher.fetch_map(&request).await.unwrap();

        assert!(Arc::ptr_eq(&first.collection, &second.collection));
        assert_eq!(first.values["KE"].value, Some(3.0));
    }
}
