//! Portal action API over HTTP

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{
    actions, decode_envelope, AggregationBackend, ChartDataRequest, DatastoreSearchResult,
    FieldValuesRequest, GeoJsonProperty, MapData, MapDataRequest,
};
use crate::config::EndpointConfig;
use crate::dataset::Row;
use crate::DataError;

/// Backend talking to `{base}/api/{version}/action/{name}`
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: EndpointConfig,
}

impl HttpBackend {
    /// Create a backend for the given endpoint
    pub fn new(endpoint: EndpointConfig) -> Result<Self, DataError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = endpoint.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DataError::Config(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            api_url = %endpoint.api_url,
            api_version = endpoint.api_version,
            "HTTP aggregation backend initialized"
        );
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    async fn get<T, Q>(&self, action: &'static str, query: &Q) -> Result<T, DataError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint.action_url(action);
        let resp = self.client.get(&url).query(query).send().await?;
        Self::decode(action, resp).await
    }

    async fn post_form<T, F>(&self, action: &'static str, form: &F) -> Result<T, DataError>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let url = self.endpoint.action_url(action);
        let resp = self.client.post(&url).form(form).send().await?;
        Self::decode(action, resp).await
    }

    async fn post_json<T, B>(&self, action: &'static str, body: &B) -> Result<T, DataError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint.action_url(action);
        let resp = self.client.post(&url).json(body).send().await?;
        Self::decode(action, resp).await
    }

    async fn decode<T: DeserializeOwned>(
        action: &'static str,
        resp: reqwest::Response,
    ) -> Result<T, DataError> {
        let status = resp.status();
        // CKAN reports action failures with a 4xx status and a normal envelope
        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(e) if !status.is_success() => {
                return Err(DataError::backend(action, format!("returned {}: {}", status, e)))
            }
            Err(e) => return Err(e.into()),
        };
        decode_envelope(action, body)
    }
}

#[async_trait]
impl AggregationBackend for HttpBackend {
    async fn chart_data(&self, request: &ChartDataRequest) -> Result<Value, DataError> {
        self.post_form(actions::CHART_DATA, &request.form_fields()?)
            .await
    }

    async fn resource_data(&self, sql_string: &str) -> Result<Vec<Row>, DataError> {
        self.get(actions::RESOURCE_DATA, &[("sql_string", sql_string)])
            .await
    }

    async fn map_data(&self, request: &MapDataRequest) -> Result<MapData, DataError> {
        self.post_json(actions::MAP_DATA, request).await
    }

    async fn field_values(&self, request: &FieldValuesRequest) -> Result<Vec<Row>, DataError> {
        let result: DatastoreSearchResult = self
            .get(actions::FIELD_VALUES, &request.query_params())
            .await?;
        Ok(result.records)
    }

    async fn geojson_properties(&self, map_resource: &str) -> Result<Vec<GeoJsonProperty>, DataError> {
        self.get(actions::GEOJSON_PROPERTIES, &[("map_resource", map_resource)])
            .await
    }

    fn name(&self) -> &str {
        &self.endpoint.api_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_timeout() {
        let backend = HttpBackend::new(EndpointConfig {
            api_url: "http://localhost:5000/".to_string(),
            api_version: 3,
            timeout_secs: Some(5),
        })
        .unwrap();

        assert_eq!(backend.name(), "http://localhost:5000/");
        assert_eq!(
            backend.endpoint().action_url(actions::MAP_DATA),
            "http://localhost:5000/api/3/action/knowledgehub_get_map_data"
        );
    }
}
