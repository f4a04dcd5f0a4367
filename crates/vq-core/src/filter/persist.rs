//! Persisted filter representation
//!
//! Saved visualization options keep filters either as a JSON array or as a
//! JSON string holding that array. Both shapes are accepted on load.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Connector, FilterChain, FilterError};
use crate::options::lenient_string;

/// One filter as stored in visualization options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedFilter {
    /// 1-based position in the chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_connector"
    )]
    pub operator: Option<Connector>,
}

fn lenient_connector<'de, D>(deserializer: D) -> Result<Option<Connector>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl FilterChain {
    /// Load a chain from the `filters` entry of visualization options
    ///
    /// `null`, empty strings and bare `true` (an empty HTML data attribute)
    /// all mean "no filters".
    pub fn from_options_value(value: &Value) -> Result<Self, FilterError> {
        let filters: Vec<PersistedFilter> = match value {
            Value::Null | Value::Bool(_) => Vec::new(),
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            Value::String(s) => serde_json::from_str(s)
                .map_err(|e| FilterError::InvalidPersisted(e.to_string()))?,
            Value::Array(_) => serde_json::from_value(value.clone())
                .map_err(|e| FilterError::InvalidPersisted(e.to_string()))?,
            other => {
                return Err(FilterError::InvalidPersisted(format!(
                    "expected a list of filters, got {}",
                    other
                )))
            }
        };

        Ok(Self::from_persisted(filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_from_json_string() {
        let raw = json!("[{\"order\": 1, \"name\": \"sex\", \"value\": \"F\"}]");
        let chain = FilterChain::from_options_value(&raw).unwrap();
        assert_eq!(chain.build_where(), "WHERE (\"sex\" = 'F')");
    }

    #[test]
    fn test_load_lenient_values() {
        let raw = json!([
            {"name": "year", "value": 2019},
            {"name": "region", "value": "East", "operator": "or"},
            {"name": "empty", "value": null, "operator": ""}
        ]);
        let chain = FilterChain::from_options_value(&raw).unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.get(0).unwrap().value, "2019");
        assert_eq!(chain.get(1).unwrap().connector, Some(Connector::Or));
        assert_eq!(chain.get(2).unwrap().connector, Some(Connector::And));
        assert_eq!(
            chain.build_where(),
            "WHERE (\"year\" = '2019') OR (\"region\" = 'East')"
        );
    }

    #[test]
    fn test_load_unset_attribute() {
        assert!(FilterChain::from_options_value(&json!(true)).unwrap().is_empty());
        assert!(FilterChain::from_options_value(&json!("")).unwrap().is_empty());
        assert!(FilterChain::from_options_value(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut chain = FilterChain::new();
        chain.push("a", "1", Connector::And);
        chain.push("b", "2", Connector::Or);

        let encoded = serde_json::to_value(&chain).unwrap();
        let decoded: FilterChain = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.build_where(), chain.build_where());
    }
}
