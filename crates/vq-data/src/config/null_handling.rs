//! Reading datastore cells as numbers
//!
//! The datastore returns aggregates as text and empty groups as `null`, an
//! empty string or a marker such as `N/A`. Charts, statistics and sorting all
//! read measures through [`NullConfig::cell_number`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rules deciding which cells carry a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Cell texts meaning "no value", compared trimmed and ignoring ASCII case
    pub missing_markers: Vec<String>,

    /// Read `true`/`false` cells as 1 and 0
    pub booleans_as_numbers: bool,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self {
            missing_markers: ["-", "N/A", "null", "None", "NaN"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            booleans_as_numbers: true,
        }
    }
}

impl NullConfig {
    /// Blank text is always missing
    pub fn is_missing_text(&self, text: &str) -> bool {
        let text = text.trim();
        text.is_empty()
            || self
                .missing_markers
                .iter()
                .any(|marker| text.eq_ignore_ascii_case(marker.trim()))
    }

    /// Finite number held by a cell, `None` for missing or non-numeric cells
    pub fn cell_number(&self, cell: &Value) -> Option<f64> {
        match cell {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            Value::String(s) if self.is_missing_text(s) => None,
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Bool(b) if self.booleans_as_numbers => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_markers() {
        let nulls = NullConfig::default();
        assert!(nulls.is_missing_text(""));
        assert!(nulls.is_missing_text("   "));
        assert!(nulls.is_missing_text("  n/a "));
        assert!(nulls.is_missing_text("NULL"));
        assert!(!nulls.is_missing_text("0"));
    }

    #[test]
    fn test_cell_number() {
        let nulls = NullConfig::default();
        assert_eq!(nulls.cell_number(&json!("1500")), Some(1500.0));
        assert_eq!(nulls.cell_number(&json!(" -2.5 ")), Some(-2.5));
        assert_eq!(nulls.cell_number(&json!(0)), Some(0.0));
        assert_eq!(nulls.cell_number(&json!("nan")), None);
        assert_eq!(nulls.cell_number(&json!("inf")), None);
        assert_eq!(nulls.cell_number(&json!("-")), None);
        assert_eq!(nulls.cell_number(&json!(null)), None);
        assert_eq!(nulls.cell_number(&json!([1])), None);
        assert_eq!(nulls.cell_number(&json!(true)), Some(1.0));
    }

    #[test]
    fn test_configured_rules() {
        let nulls: NullConfig = serde_json::from_value(json!({
            "missing_markers": ["suppressed"],
            "booleans_as_numbers": false
        }))
        .unwrap();

        assert_eq!(nulls.cell_number(&json!(" Suppressed ")), None);
        assert_eq!(nulls.cell_number(&json!(false)), None);
        assert_eq!(nulls.cell_number(&json!("N/A")), None);
        assert_eq!(nulls.cell_number(&json!("12")), Some(12.0));
    }
}
