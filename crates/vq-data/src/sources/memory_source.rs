//! In-memory backend serving canned responses
//!
//! Used by tests and by the `--fixture` mode of the binary. Responses are
//! matched per action: the first canned entry whose `when` text occurs in the
//! request wins, an entry without `when` matches everything.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use ahash::AHashSet;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    actions, AggregationBackend, ChartDataRequest, FieldValuesRequest, GeoJsonProperty, MapData,
    MapDataRequest,
};
use crate::dataset::Row;
use crate::DataError;

/// One canned `result` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannedResponse {
    /// Text that must occur in the request to match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    pub result: Value,
}

impl CannedResponse {
    pub fn always(result: Value) -> Self {
        Self { when: None, result }
    }

    pub fn when(text: impl Into<String>, result: Value) -> Self {
        Self {
            when: Some(text.into()),
            result,
        }
    }

    fn matches(&self, request_text: &str) -> bool {
        self.when
            .as_deref()
            .map(|needle| request_text.contains(needle))
            .unwrap_or(true)
    }
}

/// Canned responses for every action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub chart_data: Vec<CannedResponse>,
    pub resource_data: Vec<CannedResponse>,
    pub map_data: Vec<CannedResponse>,
    pub field_values: Vec<CannedResponse>,
    pub geojson_properties: Vec<CannedResponse>,
}

/// A request the backend received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub action: &'static str,

    /// The text canned responses are matched against
    pub text: String,
}

/// Backend answering from a [`Fixture`]
pub struct MemoryBackend {
    name: String,
    fixture: RwLock<Fixture>,
    failing: RwLock<AHashSet<&'static str>>,
    delays: Mutex<VecDeque<Duration>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MemoryBackend {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            name: "memory".to_string(),
            fixture: RwLock::new(fixture),
            failing: RwLock::new(AHashSet::new()),
            delays: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Load a fixture file
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        tracing::info!("Loaded fixture backend from {}", path.display());

        let mut backend = Self::new(fixture);
        backend.name = path.display().to_string();
        Ok(backend)
    }

    /// Replace the fixture, e.g. to simulate changed data
    pub fn set_fixture(&self, fixture: Fixture) {
        *self.fixture.write() = fixture;
    }

    /// Make every call to `action` fail until [`recover`](Self::recover)
    pub fn fail_action(&self, action: &'static str) {
        self.failing.write().insert(action);
    }

    pub fn recover(&self, action: &'static str) {
        self.failing.write().remove(action);
    }

    /// Delay the next call by `delay`; queued delays apply in call order
    pub fn push_delay(&self, delay: Duration) {
        self.delays.lock().push_back(delay);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, action: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.action == action)
            .count()
    }

    async fn respond<T, F>(&self, action: &'static str, text: String, pick: F) -> Result<T, DataError>
    where
        T: DeserializeOwned,
        F: Fn(&Fixture) -> &Vec<CannedResponse>,
    {
        self.requests.lock().push(RecordedRequest {
            action,
            text: text.clone(),
        });

        let delay = self.delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().contains(action) {
            return Err(DataError::backend(action, "simulated failure"));
        }

        let result = {
            let fixture = self.fixture.read();
            pick(&fixture)
                .iter()
                .find(|canned| canned.matches(&text))
                .map(|canned| canned.result.clone())
        };

        match result {
            Some(result) => {
                serde_json::from_value(result).map_err(|e| DataError::payload(action, e.to_string()))
            }
            None => Err(DataError::NoFixture(format!("{} ({})", action, text))),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Fixture::default())
    }
}

#[async_trait]
impl AggregationBackend for MemoryBackend {
    async fn chart_data(&self, request: &ChartDataRequest) -> Result<Value, DataError> {
        self.respond(actions::CHART_DATA, request.sql_string.clone(), |f| &f.chart_data)
            .await
    }

    async fn resource_data(&self, sql_string: &str) -> Result<Vec<Row>, DataError> {
        self.respond(actions::RESOURCE_DATA, sql_string.to_string(), |f| &f.resource_data)
            .await
    }

    async fn map_data(&self, request: &MapDataRequest) -> Result<MapData, DataError> {
        let text = format!(
            "{} {} {}",
            request.geojson_url, request.data_value_field, request.from_where_clause
        );
        self.respond(actions::MAP_DATA, text, |f| &f.map_data).await
    }

    async fn field_values(&self, request: &FieldValuesRequest) -> Result<Vec<Row>, DataError> {
        let text = format!("{} {}", request.field, request.term);
        self.respond(actions::FIELD_VALUES, text, |f| &f.field_values)
            .await
    }

    async fn geojson_properties(&self, map_resource: &str) -> Result<Vec<GeoJsonProperty>, DataError> {
        self.respond(actions::GEOJSON_PROPERTIES, map_resource.to_string(), |f| {
            &f.geojson_properties
        })
        .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_first_matching_response_wins() {
        let backend = MemoryBackend::new(Fixture {
            resource_data: vec![
                CannedResponse::when("DISTINCT", json!([{"region": "East"}])),
                CannedResponse::always(json!([{"region": "East", "total": "3"}])),
            ],
            ..Fixture::default()
        });

        let distinct = backend
            .resource_data("SELECT DISTINCT \"region\" FROM \"r\"")
            .await
            .unwrap();
        assert_eq!(distinct[0].len(), 1);

        let rows = backend.resource_data("SELECT * FROM \"r\"").await.unwrap();
        assert_eq!(rows[0].len(), 2);
        assert_eq!(backend.request_count(actions::RESOURCE_DATA), 2);
    }

    #[tokio::test]
    async fn test_missing_fixture_and_failure() {
        let backend = MemoryBackend::default();
        assert!(matches!(
            backend.resource_data("SELECT 1").await,
            Err(DataError::NoFixture(_))
        ));

        backend.set_fixture(Fixture {
            geojson_properties: vec![CannedResponse::always(
                json!([{"value": "ISO", "text": "ISO"}]),
            )],
            ..Fixture::default()
        });
        backend.fail_action(actions::GEOJSON_PROPERTIES);
        assert!(backend.geojson_properties("geo").await.is_err());

        backend.recover(actions::GEOJSON_PROPERTIES);
        let properties = backend.geojson_properties("geo").await.unwrap();
        assert_eq!(properties[0].value, "ISO");
    }

    #[test]
    fn test_fixture_file_shape() {
        let fixture: Fixture = serde_json::from_value(json!({
            "chart_data": [{"when": "SUM", "result": []}]
        }))
        .unwrap();
        assert_eq!(fixture.chart_data.len(), 1);
        assert!(fixture.map_data.is_empty());
    }
}
