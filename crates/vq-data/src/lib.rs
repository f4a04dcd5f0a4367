//! Data fetching and statistics for the visualization query engine

pub mod cache;
pub mod config;
pub mod dataset;
pub mod fetcher;
pub mod sources;
pub mod stats;

use thiserror::Error;

// Re-exports
pub use cache::GeoCache;
pub use config::{EndpointConfig, EngineConfig, MapStyleConfig, NullConfig};
pub use dataset::{CategoryColumns, Dataset, Records, Row};
pub use fetcher::{DataFetcher, MapPayload};
pub use sources::{AggregationBackend, HttpBackend, MemoryBackend};
pub use stats::{AxisRange, DynamicReference, ReferenceKind, Statistics, StatisticsComputer};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error ({action}): {message}")]
    Backend {
        action: &'static str,
        message: String,
    },

    #[error("Unexpected payload from {action}: {message}")]
    Payload {
        action: &'static str,
        message: String,
    },

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No canned response for {0}")]
    NoFixture(String),
}

impl DataError {
    pub fn backend(action: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            action,
            message: message.into(),
        }
    }

    pub fn payload(action: &'static str, message: impl Into<String>) -> Self {
        Self::Payload {
            action,
            message: message.into(),
        }
    }
}

impl From<geojson::Error> for DataError {
    fn from(error: geojson::Error) -> Self {
        DataError::GeoJson(error.to_string())
    }
}
