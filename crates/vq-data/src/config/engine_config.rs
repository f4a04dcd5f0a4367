//! Engine configuration: endpoint, paging and style defaults

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::null_handling::NullConfig;
use crate::DataError;

/// Environment variable overriding [`EndpointConfig::api_url`]
pub const ENV_API_URL: &str = "VIZQ_API_URL";

/// Environment variable overriding [`EndpointConfig::timeout_secs`]
pub const ENV_TIMEOUT_SECS: &str = "VIZQ_TIMEOUT_SECS";

/// Choropleth palette, lightest to darkest
pub const DEFAULT_MAP_PALETTE: [&str; 5] = ["#FCDBDF", "#F9B7BF", "#F592A0", "#F26E80", "#EF4A60"];

/// Fill for features without a value
pub const DEFAULT_NO_DATA_COLOR: &str = "#E5E5E5";

/// Where the action API lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Portal base URL, e.g. `https://portal.example.org`
    pub api_url: String,

    pub api_version: u32,

    /// Request timeout; unset means no timeout
    pub timeout_secs: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            api_version: 3,
            timeout_secs: None,
        }
    }
}

impl EndpointConfig {
    /// `{base}/api/{version}/action/{name}`
    pub fn action_url(&self, action: &str) -> String {
        format!(
            "{}/api/{}/action/{}",
            self.api_url.trim_end_matches('/'),
            self.api_version,
            action
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Colors used by the map view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapStyleConfig {
    pub palette: Vec<String>,
    pub no_data_color: String,
}

impl Default for MapStyleConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_MAP_PALETTE.iter().map(|c| c.to_string()).collect(),
            no_data_color: DEFAULT_NO_DATA_COLOR.to_string(),
        }
    }
}

/// Top-level configuration of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub endpoint: EndpointConfig,

    /// Page size of filter value autocompletion
    pub field_values_page_size: usize,

    /// Parsed GeoJSON documents kept in memory
    pub geo_cache_capacity: usize,

    pub map: MapStyleConfig,

    /// Series colors when a chart does not set its own
    pub chart_colors: Vec<String>,

    pub null_config: NullConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            field_values_page_size: 20,
            geo_cache_capacity: 16,
            map: MapStyleConfig::default(),
            chart_colors: Vec::new(),
            null_config: NullConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document
    pub fn from_json_str(raw: &str) -> Result<Self, DataError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file and apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&raw)?;
        config.apply_env_overrides()?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Apply `VIZQ_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), DataError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), DataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            tracing::debug!("{} overrides api_url", ENV_API_URL);
            self.endpoint.api_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                DataError::Config(format!("{} must be whole seconds: {}", ENV_TIMEOUT_SECS, e))
            })?;
            self.endpoint.timeout_secs = Some(secs);
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.endpoint.api_url.trim().is_empty() {
            return Err(DataError::Config("endpoint.api_url is empty".to_string()));
        }
        if self.field_values_page_size == 0 {
            return Err(DataError::Config(
                "field_values_page_size must be positive".to_string(),
            ));
        }
        if self.map.palette.is_empty() {
            return Err(DataError::Config("map.palette is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.field_values_page_size, 20);
        assert_eq!(config.map.palette.len(), 5);
        assert_eq!(config.map.palette[4], "#EF4A60");
        assert_eq!(config.endpoint.timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_action_url() {
        let endpoint = EndpointConfig {
            api_url: "https://portal.example.org/".to_string(),
            ..EndpointConfig::default()
        };
        assert_eq!(
            endpoint.action_url("get_chart_data"),
            "https://portal.example.org/api/3/action/get_chart_data"
        );
    }

    #[test]
    fn test_partial_json() {
        let config =
            EngineConfig::from_json_str(r#"{"endpoint": {"api_url": "http://kh"}}"#).unwrap();
        assert_eq!(config.endpoint.api_url, "http://kh");
        assert_eq!(config.endpoint.api_version, 3);
        assert_eq!(config.field_values_page_size, 20);

        assert!(EngineConfig::from_json_str(r#"{"map": {"palette": []}}"#).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_API_URL => Some(" http://override ".to_string()),
                ENV_TIMEOUT_SECS => Some("15".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.endpoint.api_url, "http://override");
        assert_eq!(config.endpoint.timeout(), Some(Duration::from_secs(15)));

        let bad = config.apply_overrides(|key| (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string()));
        assert!(bad.is_err());
    }
}
