//! Predicate rendering
//!
//! The literal renderer reproduces the query strings the aggregation endpoint
//! has always received: values are pasted into the SQL text as quoted
//! strings without escaping. Backends that bind parameters should use
//! [`ParameterizedPredicates`] instead.

use serde::{Deserialize, Serialize};

use crate::filter::FilterChain;

/// A rendered WHERE clause together with its bound parameters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WhereFragment {
    /// `WHERE ...` text, empty when no clause contributes
    pub sql: String,

    /// Positional parameters referenced as `$1`, `$2`, ...
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl WhereFragment {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Strategy for turning a filter chain into a WHERE fragment
pub trait PredicateRenderer: Send + Sync {
    /// Render one `field = value` comparison, recording any bound parameter
    fn predicate(&self, field: &str, value: &str, params: &mut Vec<String>) -> String;

    /// Render the whole chain
    ///
    /// Malformed clauses are skipped wherever they sit. The first clause that
    /// is emitted opens the `WHERE`; its connector is never printed.
    fn render(&self, chain: &FilterChain) -> WhereFragment {
        let mut sql = String::new();
        let mut params = Vec::new();

        for clause in chain.well_formed() {
            let predicate = self.predicate(&clause.field, &clause.value, &mut params);
            if sql.is_empty() {
                sql.push_str("WHERE ");
            } else {
                let connector = clause.connector.unwrap_or_default();
                sql.push(' ');
                sql.push_str(connector.as_str());
                sql.push(' ');
            }
            sql.push_str(&predicate);
        }

        WhereFragment { sql, params }
    }
}

/// Values interpolated directly into the SQL text
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralPredicates;

impl PredicateRenderer for LiteralPredicates {
    fn predicate(&self, field: &str, value: &str, _params: &mut Vec<String>) -> String {
        format!("(\"{}\" = '{}')", field, value)
    }
}

/// Values bound as `$n` placeholders
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterizedPredicates;

impl PredicateRenderer for ParameterizedPredicates {
    fn predicate(&self, field: &str, value: &str, params: &mut Vec<String>) -> String {
        params.push(value.to_string());
        format!("(\"{}\" = ${})", field.replace('"', "\"\""), params.len())
    }
}
