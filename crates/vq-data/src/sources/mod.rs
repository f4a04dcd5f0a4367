//! Aggregation backends and their wire types
//!
//! Every action answers with the envelope `{success, result, error?}`.
//! Backends unwrap it and return the `result` payload or a [`DataError`].

pub mod http_source;
pub mod memory_source;

pub use http_source::HttpBackend;
pub use memory_source::{MemoryBackend, RecordedRequest};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vq_core::options::lenient_opt_f64;
use vq_core::PersistedFilter;

use crate::dataset::Row;
use crate::DataError;

/// Action names of the portal API
pub mod actions {
    pub const CHART_DATA: &str = "get_chart_data";
    pub const RESOURCE_DATA: &str = "get_resource_data";
    pub const MAP_DATA: &str = "knowledgehub_get_map_data";
    pub const FIELD_VALUES: &str = "datastore_search";
    pub const GEOJSON_PROPERTIES: &str = "knowledgehub_get_geojson_properties";
}

/// Response envelope shared by all actions
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,

    #[serde(default = "Option::default")]
    pub result: Option<T>,

    #[serde(default)]
    pub error: Option<Value>,
}

impl<T> ActionResponse<T> {
    /// Unwrap the result, turning `success: false` into an error
    pub fn into_result(self, action: &'static str) -> Result<T, DataError> {
        if !self.success {
            let message = self
                .error
                .map(|e| match e {
                    Value::Object(map) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| Value::Object(map).to_string()),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(DataError::backend(action, message));
        }
        self.result
            .ok_or_else(|| DataError::payload(action, "missing result"))
    }
}

/// Decode an envelope from a raw JSON value
pub fn decode_envelope<T: DeserializeOwned>(
    action: &'static str,
    body: Value,
) -> Result<T, DataError> {
    let envelope: ActionResponse<T> = serde_json::from_value(body)
        .map_err(|e| DataError::payload(action, e.to_string()))?;
    envelope.into_result(action)
}

/// Parameters of `get_chart_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataRequest {
    pub sql_string: String,

    /// Empty when the chart has no category
    pub category: String,

    pub x_axis: String,
    pub y_axis: String,

    /// Empty unless the chart is a tornado
    pub additional_tornado_value: String,

    pub resource_id: String,

    pub filters: Vec<PersistedFilter>,
}

impl ChartDataRequest {
    pub fn has_category(&self) -> bool {
        !self.category.is_empty()
    }

    /// Form body; filters travel as a JSON string
    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>, DataError> {
        Ok(vec![
            ("sql_string", self.sql_string.clone()),
            ("category", self.category.clone()),
            ("x_axis", self.x_axis.clone()),
            ("y_axis", self.y_axis.clone()),
            ("additional_tornado_value", self.additional_tornado_value.clone()),
            ("resource_id", self.resource_id.clone()),
            ("filters", serde_json::to_string(&self.filters)?),
        ])
    }
}

/// Parameters of `knowledgehub_get_map_data`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapDataRequest {
    pub geojson_url: String,
    pub map_key_field: String,
    pub data_key_field: String,
    pub data_value_field: String,

    /// `FROM "<resource>" <where>` tail of the base query
    pub from_where_clause: String,
}

/// Value joined onto one feature
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureValue {
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub value: Option<f64>,
}

/// Result of `knowledgehub_get_map_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    /// Raw GeoJSON document
    pub geojson_data: Value,

    /// Join key to value
    #[serde(default)]
    pub features_values: IndexMap<String, FeatureValue>,
}

/// A `datastore_search` lookup of distinct values of one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValuesRequest {
    pub resource_id: String,
    pub field: String,

    /// What the user typed so far, possibly empty
    pub term: String,

    /// 1-based page number
    pub page: usize,

    pub limit: usize,
}

impl FieldValuesRequest {
    pub fn new(resource_id: impl Into<String>, field: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            field: field.into(),
            term: term.into(),
            page: 1,
            limit: 20,
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.limit
    }

    /// Query string parameters
    ///
    /// A term without spaces becomes a prefix search (`term:*`) with plain
    /// text parsing turned off.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("resource_id", self.resource_id.clone()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset().to_string()),
            ("fields", self.field.clone()),
            ("distinct", "true".to_string()),
            ("sort", self.field.clone()),
            ("include_total", "false".to_string()),
        ];

        if !self.term.is_empty() {
            let mut term = self.term.clone();
            if !term.contains(' ') {
                term.push_str(":*");
                params.push(("plain", "false".to_string()));
            }
            let mut q = serde_json::Map::new();
            q.insert(self.field.clone(), Value::String(term));
            params.push(("q", Value::Object(q).to_string()));
        }

        params
    }
}

/// `result` of `datastore_search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatastoreSearchResult {
    #[serde(default)]
    pub records: Vec<Row>,
}

/// One autocompletion entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub id: Value,
    pub text: String,
}

/// One page of autocompletion entries
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldValuesPage {
    pub values: Vec<FieldValue>,
    pub has_more: bool,
}

/// A property offered as map join key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoJsonProperty {
    pub value: String,
    pub text: String,
}

/// Trait for the remote aggregation endpoint
#[async_trait]
pub trait AggregationBackend: Send + Sync {
    /// Aggregated chart rows, or category columns with summary keys
    async fn chart_data(&self, request: &ChartDataRequest) -> Result<Value, DataError>;

    /// Rows of an arbitrary projection query
    async fn resource_data(&self, sql_string: &str) -> Result<Vec<Row>, DataError>;

    /// GeoJSON plus the values joined onto its features
    async fn map_data(&self, request: &MapDataRequest) -> Result<MapData, DataError>;

    /// Raw records of a distinct-values search
    async fn field_values(&self, request: &FieldValuesRequest) -> Result<Vec<Row>, DataError>;

    /// Property names of a geography resource
    async fn geojson_properties(&self, map_resource: &str) -> Result<Vec<GeoJsonProperty>, DataError>;

    /// Get the backend name
    fn name(&self) -> &str;
}
