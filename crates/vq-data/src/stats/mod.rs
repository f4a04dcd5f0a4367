//! Measure statistics and dynamic reference values

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::NullConfig;
use crate::dataset::{coerce_number, field, CategoryColumns, Row};
use crate::DataError;

/// Summary keys the server adds to category payloads
pub const SUMMARY_KEYS: [&str; 3] = ["y_axis_max", "y_axis_avg", "y_axis_min"];

/// Max/avg/min of a measure; `None` when no value was numeric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub min: Option<f64>,
}

/// Value axis bounds after folding in a reference value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Statistics {
    /// Single pass over the values; the average is the arithmetic mean
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            max: Some(max),
            avg: Some(sum / count as f64),
            min: Some(min),
        }
    }

    pub fn get(&self, kind: ReferenceKind) -> Option<f64> {
        match kind {
            ReferenceKind::Maximum => self.max,
            ReferenceKind::Average => self.avg,
            ReferenceKind::Minimum => self.min,
        }
    }

    /// Axis bounds wide enough to show both the data and `reference`
    ///
    /// NaN and missing bounds are ignored on either side.
    pub fn extend_range(&self, reference: f64) -> AxisRange {
        let candidates = |bound: Option<f64>| {
            [Some(reference), bound]
                .into_iter()
                .flatten()
                .filter(|v| !v.is_nan())
                .collect::<Vec<f64>>()
        };

        AxisRange {
            min: candidates(self.min).into_iter().reduce(f64::min),
            max: candidates(self.max).into_iter().reduce(f64::max),
        }
    }
}

/// Which statistic a dynamic reference follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Maximum,
    Average,
    Minimum,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Maximum => "Maximum",
            ReferenceKind::Average => "Average",
            ReferenceKind::Minimum => "Minimum",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Maximum" => Ok(ReferenceKind::Maximum),
            "Average" => Ok(ReferenceKind::Average),
            "Minimum" => Ok(ReferenceKind::Minimum),
            other => Err(DataError::Config(format!(
                "unknown dynamic reference type '{}'",
                other
            ))),
        }
    }
}

/// A threshold derived from the dataset statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicReference {
    pub kind: ReferenceKind,

    /// Multiplier applied to the chosen statistic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
}

impl DynamicReference {
    pub fn new(kind: ReferenceKind, factor: Option<f64>) -> Self {
        Self { kind, factor }
    }

    /// Build from the raw chart options; unknown types disable the reference
    pub fn from_options(kind: Option<&str>, factor: Option<f64>) -> Option<Self> {
        let kind = kind.filter(|k| !k.trim().is_empty())?;
        match kind.parse() {
            Ok(kind) => Some(Self::new(kind, factor)),
            Err(e) => {
                tracing::warn!("Ignoring dynamic reference: {}", e);
                None
            }
        }
    }

    /// Resolve against a dataset's statistics
    pub fn resolve(&self, statistics: &Statistics) -> Option<f64> {
        let base = statistics.get(self.kind)?;
        Some(match self.factor {
            Some(factor) => base * factor,
            None => base,
        })
    }
}

/// Derives [`Statistics`] from fetched payloads
#[derive(Debug, Clone, Default)]
pub struct StatisticsComputer {
    nulls: NullConfig,
}

impl StatisticsComputer {
    pub fn new(nulls: NullConfig) -> Self {
        Self { nulls }
    }

    pub fn nulls(&self) -> &NullConfig {
        &self.nulls
    }

    /// Statistics of `measure` over plain rows
    ///
    /// Cells that are missing, null-like or not numeric are skipped.
    pub fn compute_rows(&self, rows: &[Row], measure: &str) -> Statistics {
        let mut skipped = 0usize;
        let values = rows.iter().filter_map(|row| {
            let value = field(row, measure).and_then(|v| coerce_number(v, &self.nulls));
            if value.is_none() {
                skipped += 1;
            }
            value
        });
        let statistics = Statistics::from_values(values);

        if skipped > 0 {
            tracing::debug!("Skipped {} non-numeric '{}' value(s)", skipped, measure);
        }
        statistics
    }

    /// Split a category payload into its columns and server-side statistics
    ///
    /// The three summary keys are removed so they are never treated as data
    /// columns. Entries that are not arrays are dropped.
    pub fn split_category_payload(
        &self,
        payload: Value,
    ) -> Result<(CategoryColumns, Statistics), DataError> {
        let Value::Object(mut object) = payload else {
            return Err(DataError::payload(
                "get_chart_data",
                "expected an object keyed by category",
            ));
        };

        let mut take = |key: &str| {
            object
                .remove(key)
                .and_then(|v| coerce_number(&v, &self.nulls))
        };
        let statistics = Statistics {
            max: take(SUMMARY_KEYS[0]),
            avg: take(SUMMARY_KEYS[1]),
            min: take(SUMMARY_KEYS[2]),
        };

        let mut columns = IndexMap::with_capacity(object.len());
        for (key, value) in object {
            match value {
                Value::Array(column) => {
                    columns.insert(key, column);
                }
                other => {
                    tracing::warn!("Dropping non-column entry '{}': {}", key, other);
                }
            }
        }

        Ok((CategoryColumns { columns }, statistics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: &[Value]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert("m".to_string(), v.clone());
                row
            })
            .collect()
    }

    #[test]
    fn test_basic_statistics() {
        let computer = StatisticsComputer::default();
        let stats = computer.compute_rows(
            &rows(&[json!(1), json!("2"), json!(3.0), json!("4")]),
            "m",
        );

        assert_eq!(stats.max, Some(4.0));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.avg, Some(2.5));
    }

    #[test]
    fn test_skips_non_numeric() {
        let computer = StatisticsComputer::default();
        let stats = computer.compute_rows(&rows(&[json!("n/a"), json!(6), json!(null)]), "M");
        assert_eq!(stats.avg, Some(6.0));

        let empty = computer.compute_rows(&[], "m");
        assert_eq!(empty, Statistics::default());
    }

    #[test]
    fn test_category_payload_strips_summary() {
        let computer = StatisticsComputer::default();
        let payload = json!({
            "x": ["x", "a", "b"],
            "F": ["F", 1, 2],
            "y_axis_max": "9",
            "y_axis_avg": 4.5,
            "y_axis_min": 1,
            "bogus": 3
        });

        let (columns, stats) = computer.split_category_payload(payload).unwrap();
        assert_eq!(stats.max, Some(9.0));
        assert_eq!(stats.avg, Some(4.5));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(columns.columns.len(), 2);
        assert!(SUMMARY_KEYS.iter().all(|k| !columns.columns.contains_key(*k)));
    }

    #[test]
    fn test_average_reference_with_factor() {
        let stats = Statistics {
            max: Some(12.0),
            avg: Some(10.0),
            min: Some(2.0),
        };
        let reference = DynamicReference::from_options(Some("Average"), Some(1.5)).unwrap();
        let value = reference.resolve(&stats).unwrap();
        assert_eq!(value, 15.0);

        let range = stats.extend_range(value);
        assert_eq!(range.max, Some(15.0));
        assert_eq!(range.min, Some(2.0));
    }

    #[test]
    fn test_range_ignores_nan() {
        let stats = Statistics {
            max: Some(f64::NAN),
            avg: None,
            min: None,
        };
        let range = stats.extend_range(3.0);
        assert_eq!(range.max, Some(3.0));
        assert_eq!(range.min, Some(3.0));
    }

    #[test]
    fn test_unknown_reference_type() {
        assert!(DynamicReference::from_options(Some("Median"), None).is_none());
        assert!(DynamicReference::from_options(Some(""), None).is_none());
        assert!(DynamicReference::from_options(None, Some(2.0)).is_none());
    }
}
