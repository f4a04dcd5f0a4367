//! Query building - WHERE fragments and projection queries

mod predicate;

pub use predicate::{LiteralPredicates, ParameterizedPredicates, PredicateRenderer, WhereFragment};

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::filter::FilterChain;

/// Render the literal WHERE fragment of a chain
///
/// Returns an empty string when no clause is well formed.
pub fn build_where(chain: &FilterChain) -> String {
    LiteralPredicates.render(chain).sql
}

/// Aggregation applied to the projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    Sum,
    Max,
    Distinct,
}

impl Aggregation {
    /// Map the chart "y operation" option; anything but `MAX` sums
    pub fn from_operation(operation: &str) -> Self {
        if operation.trim().eq_ignore_ascii_case("max") {
            Aggregation::Max
        } else {
            Aggregation::Sum
        }
    }

    fn function(&self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Max => "MAX",
            Aggregation::Distinct => "DISTINCT",
        }
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::Sum
    }
}

/// Projection query over one resource
///
/// Derived from the filter chain and the view's axis selection; rebuilt on
/// every change rather than stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub resource_id: String,

    /// Plain columns selected before the measure
    pub projection_columns: Vec<String>,

    /// Column passed through the aggregate function, if any
    pub measure: Option<String>,

    pub aggregation: Option<Aggregation>,

    pub group_by: Vec<String>,

    pub where_clause: WhereFragment,
}

impl QuerySpec {
    /// `SELECT * FROM "<resource>" <where>`
    pub fn select_all(resource_id: impl Into<String>, where_clause: WhereFragment) -> Self {
        Self {
            resource_id: resource_id.into(),
            projection_columns: Vec::new(),
            measure: None,
            aggregation: None,
            group_by: Vec::new(),
            where_clause,
        }
    }

    /// Measure aggregated per dimension value
    pub fn aggregate(
        resource_id: impl Into<String>,
        dimension: &str,
        measure: &str,
        aggregation: Aggregation,
        where_clause: WhereFragment,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            projection_columns: vec![dimension.to_string()],
            measure: Some(measure.to_string()),
            aggregation: Some(aggregation),
            group_by: vec![dimension.to_string()],
            where_clause,
        }
    }

    /// Measure aggregated per (category, dimension) pair, pivoted later
    pub fn category_aggregate(
        resource_id: impl Into<String>,
        category: &str,
        dimension: &str,
        measure: &str,
        aggregation: Aggregation,
        where_clause: WhereFragment,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            projection_columns: vec![category.to_string(), dimension.to_string()],
            measure: Some(measure.to_string()),
            aggregation: Some(aggregation),
            group_by: vec![category.to_string(), dimension.to_string()],
            where_clause,
        }
    }

    /// Distinct listing of one dimension, no measure
    pub fn distinct(
        resource_id: impl Into<String>,
        dimension: &str,
        where_clause: WhereFragment,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            projection_columns: vec![dimension.to_string()],
            measure: None,
            aggregation: Some(Aggregation::Distinct),
            group_by: vec![dimension.to_string()],
            where_clause,
        }
    }

    /// Raw (label, extra, value) triples for diverging bar charts
    pub fn tornado(
        resource_id: impl Into<String>,
        label: &str,
        extra: &str,
        value: &str,
        where_clause: WhereFragment,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            projection_columns: vec![label.to_string(), extra.to_string(), value.to_string()],
            measure: None,
            aggregation: None,
            group_by: vec![label.to_string(), value.to_string(), extra.to_string()],
            where_clause,
        }
    }

    /// The `FROM "<resource>" <where>` tail shared by every projection
    pub fn from_where(&self) -> String {
        let mut sql = format!("FROM \"{}\"", self.resource_id);
        if !self.where_clause.is_empty() {
            sql.push(' ');
            sql.push_str(&self.where_clause.sql);
        }
        sql
    }

    /// Parameters bound by the WHERE fragment
    pub fn params(&self) -> &[String] {
        &self.where_clause.params
    }

    /// Render the full SQL text
    pub fn to_sql(&self) -> String {
        let select = self.select_list();
        let mut sql = format!("SELECT {} {}", select, self.from_where());
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.iter().map(|c| quote(c)).join(", "));
        }
        sql
    }

    fn select_list(&self) -> String {
        let mut columns: Vec<String> = self.projection_columns.iter().map(|c| quote(c)).collect();

        if self.aggregation == Some(Aggregation::Distinct) {
            return format!("DISTINCT {}", columns.join(", "));
        }

        if let Some(measure) = &self.measure {
            let function = self.aggregation.unwrap_or_default().function();
            columns.push(format!("{}({}) as {}", function, quote(measure), quote(measure)));
        }

        if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        }
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Connector, FilterClause};

    fn literal(chain: &FilterChain) -> WhereFragment {
        LiteralPredicates.render(chain)
    }

    #[test]
    fn test_empty_chain_has_no_where() {
        assert_eq!(build_where(&FilterChain::new()), "");
    }

    #[test]
    fn test_single_clause() {
        let mut chain = FilterChain::new();
        chain.push("f", "v", Connector::And);
        assert_eq!(build_where(&chain), "WHERE (\"f\" = 'v')");
    }

    #[test]
    fn test_two_clauses_with_or() {
        let mut chain = FilterChain::new();
        chain.push("f1", "v1", Connector::And);
        chain.push("f2", "v2", Connector::Or);
        assert_eq!(
            build_where(&chain),
            "WHERE (\"f1\" = 'v1') OR (\"f2\" = 'v2')"
        );
    }

    #[test]
    fn test_malformed_clauses_skipped_anywhere() {
        let chain = FilterChain::from_clauses(vec![
            FilterClause::new("", "x"),
            FilterClause::new("a", "1").with_connector(Connector::Or),
            FilterClause::new("b", "").with_connector(Connector::And),
            FilterClause::new("c", "3").with_connector(Connector::And),
        ]);

        assert_eq!(
            build_where(&chain),
            "WHERE (\"a\" = '1') AND (\"c\" = '3')"
        );
    }

    #[test]
    fn test_only_malformed_clauses() {
        let mut chain = FilterChain::new();
        chain.add_clause();
        chain.add_clause();
        assert_eq!(build_where(&chain), "");
    }

    #[test]
    fn test_build_where_idempotent() {
        let mut chain = FilterChain::new();
        chain.push("a", "1", Connector::And);
        chain.push("b", "2", Connector::Or);
        assert_eq!(chain.build_where(), chain.build_where());
    }

    #[test]
    fn test_aggregate_sql() {
        let mut chain = FilterChain::new();
        chain.push("year", "2020", Connector::And);

        let spec = QuerySpec::aggregate("res-1", "region", "total", Aggregation::Sum, literal(&chain));
        assert_eq!(
            spec.to_sql(),
            "SELECT \"region\", SUM(\"total\") as \"total\" FROM \"res-1\" WHERE (\"year\" = '2020') GROUP BY \"region\""
        );

        let spec = QuerySpec::aggregate("res-1", "region", "total", Aggregation::Max, WhereFragment::default());
        assert_eq!(
            spec.to_sql(),
            "SELECT \"region\", MAX(\"total\") as \"total\" FROM \"res-1\" GROUP BY \"region\""
        );
    }

    #[test]
    fn test_category_and_distinct_sql() {
        let spec = QuerySpec::category_aggregate(
            "r",
            "sex",
            "region",
            "total",
            Aggregation::Sum,
            WhereFragment::default(),
        );
        assert_eq!(
            spec.to_sql(),
            "SELECT \"sex\", \"region\", SUM(\"total\") as \"total\" FROM \"r\" GROUP BY \"sex\", \"region\""
        );

        let spec = QuerySpec::distinct("r", "region", WhereFragment::default());
        assert_eq!(
            spec.to_sql(),
            "SELECT DISTINCT \"region\" FROM \"r\" GROUP BY \"region\""
        );
    }

    #[test]
    fn test_select_all_and_tail() {
        let mut chain = FilterChain::new();
        chain.push("a", "1", Connector::And);
        let spec = QuerySpec::select_all("r", literal(&chain));

        assert_eq!(spec.to_sql(), "SELECT * FROM \"r\" WHERE (\"a\" = '1')");
        assert_eq!(spec.from_where(), "FROM \"r\" WHERE (\"a\" = '1')");
    }

    #[test]
    fn test_tornado_sql() {
        let spec = QuerySpec::tornado("r", "age", "sex", "count", WhereFragment::default());
        assert_eq!(
            spec.to_sql(),
            "SELECT \"age\", \"sex\", \"count\" FROM \"r\" GROUP BY \"age\", \"count\", \"sex\""
        );
    }

    #[test]
    fn test_operation_parsing() {
        assert_eq!(Aggregation::from_operation("MAX"), Aggregation::Max);
        assert_eq!(Aggregation::from_operation("sum"), Aggregation::Sum);
        assert_eq!(Aggregation::from_operation(""), Aggregation::Sum);
    }
}
