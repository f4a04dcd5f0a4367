//! Fetched records and the helpers views use to read them
//!
//! The backend lower-cases column names in the rows it returns, so field
//! lookups try the configured name first and fall back to its lower-case
//! form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::NullConfig;
use crate::stats::Statistics;

/// One record as returned by the aggregation endpoint
pub type Row = Map<String, Value>;

/// Key of the dimension column in category payloads
pub const CATEGORY_X_KEY: &str = "x";

/// Look up a field, falling back to its lower-case spelling
pub fn field<'a>(row: &'a Row, name: &str) -> Option<&'a Value> {
    row.get(name)
        .or_else(|| row.get(name.to_lowercase().as_str()))
}

/// Display text of a cell: strings verbatim, `null` as empty
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text of a field, empty when missing
pub fn field_text(row: &Row, name: &str) -> String {
    field(row, name).map(value_text).unwrap_or_default()
}

/// Coerce a cell to a number under the configured null rules
pub fn coerce_number(value: &Value, nulls: &NullConfig) -> Option<f64> {
    nulls.cell_number(value)
}

/// Server-shaped columns for charts with a category
///
/// Each column is `[name, v1, v2, ...]`; the dimension column is keyed `x`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryColumns {
    pub columns: IndexMap<String, Vec<Value>>,
}

impl CategoryColumns {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The dimension column, if the server sent one
    pub fn x(&self) -> Option<&Vec<Value>> {
        self.columns.get(CATEGORY_X_KEY)
    }

    /// All columns ordered by key, the dimension column included
    pub fn sorted(&self) -> Vec<(&String, &Vec<Value>)> {
        let mut columns: Vec<_> = self.columns.iter().collect();
        columns.sort_by(|a, b| a.0.cmp(b.0));
        columns
    }

    /// Series columns ordered by key, without the dimension column
    pub fn series(&self) -> Vec<(&String, &Vec<Value>)> {
        self.sorted()
            .into_iter()
            .filter(|(key, _)| key.as_str() != CATEGORY_X_KEY)
            .collect()
    }

    /// Numeric values of every series, skipping the leading name cell
    pub fn values<'a>(&'a self, nulls: &'a NullConfig) -> impl Iterator<Item = f64> + 'a {
        self.columns
            .iter()
            .filter(|(key, _)| key.as_str() != CATEGORY_X_KEY)
            .flat_map(move |(_, column)| {
                column
                    .iter()
                    .skip(1)
                    .filter_map(move |v| coerce_number(v, nulls))
            })
    }
}

/// Fetched records in server order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Records {
    Rows(Vec<Row>),
    Categories(CategoryColumns),
}

impl Records {
    pub fn len(&self) -> usize {
        match self {
            Records::Rows(rows) => rows.len(),
            Records::Categories(columns) => columns.columns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Records::Rows(rows) => Some(rows),
            Records::Categories(_) => None,
        }
    }

    pub fn categories(&self) -> Option<&CategoryColumns> {
        match self {
            Records::Categories(columns) => Some(columns),
            Records::Rows(_) => None,
        }
    }
}

/// Records plus the statistics of their measure
///
/// Statistics are computed once when the dataset is built and travel with
/// it; renderers never recompute them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub measure: String,
    pub records: Records,
    pub statistics: Statistics,
}

impl Dataset {
    pub fn new(measure: impl Into<String>, records: Records, statistics: Statistics) -> Self {
        Self {
            measure: measure.into(),
            records,
            statistics,
        }
    }

    /// Dataset with no records and no statistics
    pub fn empty(measure: impl Into<String>) -> Self {
        Self::new(measure, Records::Rows(Vec::new()), Statistics::default())
    }

    pub fn rows(&self) -> &[Row] {
        self.records.rows().unwrap_or(&[])
    }
}
