//! Filter chain - the ordered, boolean-connected predicates behind a query
//!
//! Clauses are evaluated strictly left to right. There is no precedence
//! grouping: `a AND b OR c` is emitted exactly in that order.

mod persist;

pub use persist::PersistedFilter;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while editing or loading a filter chain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Filter index {index} out of bounds (len: {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Unknown filter connector '{0}'")]
    UnknownConnector(String),

    #[error("Invalid persisted filters: {0}")]
    InvalidPersisted(String),
}

/// Boolean connector joining a clause to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connector {
    #[serde(rename = "AND", alias = "and", alias = "And")]
    And,
    #[serde(rename = "OR", alias = "or", alias = "Or")]
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

impl Default for Connector {
    fn default() -> Self {
        Connector::And
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Connector {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("and") => Ok(Connector::And),
            v if v.eq_ignore_ascii_case("or") => Ok(Connector::Or),
            other => Err(FilterError::UnknownConnector(other.to_string())),
        }
    }
}

/// A single `"field" = 'value'` predicate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterClause {
    /// Column the predicate applies to
    pub field: String,

    /// Connector to the previous clause, always `None` for the first clause
    pub connector: Option<Connector>,

    /// Literal value compared against
    pub value: String,
}

impl FilterClause {
    /// Create a clause without a connector
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            connector: None,
            value: value.into(),
        }
    }

    /// Builder-style connector assignment
    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Whether the clause contributes a predicate to generated queries
    pub fn is_well_formed(&self) -> bool {
        !self.field.is_empty() && !self.value.is_empty()
    }
}

/// Ordered list of filter clauses
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PersistedFilter>", into = "Vec<PersistedFilter>")]
pub struct FilterChain {
    clauses: Vec<FilterClause>,
}

impl FilterChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from clauses, fixing up connectors
    pub fn from_clauses(clauses: Vec<FilterClause>) -> Self {
        let mut chain = Self { clauses };
        chain.normalize_connectors();
        chain
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FilterClause> {
        self.clauses.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterClause> {
        self.clauses.iter()
    }

    /// Clauses that take part in query generation
    pub fn well_formed(&self) -> impl Iterator<Item = &FilterClause> {
        self.clauses.iter().filter(|c| c.is_well_formed())
    }

    /// Clauses paired with their 1-based position
    ///
    /// Positions are recomputed from the current order, so removing a clause
    /// renumbers everything after it.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &FilterClause)> {
        self.clauses.iter().enumerate().map(|(i, c)| (i + 1, c))
    }

    /// Append an empty clause and return its index
    pub fn add_clause(&mut self) -> usize {
        let connector = if self.clauses.is_empty() {
            None
        } else {
            Some(Connector::default())
        };
        self.clauses.push(FilterClause {
            connector,
            ..FilterClause::default()
        });
        self.clauses.len() - 1
    }

    /// Append a filled-in clause and return its index
    pub fn push(
        &mut self,
        field: impl Into<String>,
        value: impl Into<String>,
        connector: Connector,
    ) -> usize {
        let index = self.add_clause();
        let clause = &mut self.clauses[index];
        clause.field = field.into();
        clause.value = value.into();
        if index > 0 {
            clause.connector = Some(connector);
        }
        index
    }

    /// Remove the clause at `index`
    pub fn remove_clause(&mut self, index: usize) -> Result<FilterClause, FilterError> {
        self.check_index(index)?;
        let removed = self.clauses.remove(index);
        self.normalize_connectors();
        Ok(removed)
    }

    /// Edit the clause at `index`
    ///
    /// The connector of the first clause is always dropped. For later clauses
    /// a `None` connector keeps whatever connector the clause already had.
    pub fn set_clause(
        &mut self,
        index: usize,
        field: impl Into<String>,
        value: impl Into<String>,
        connector: Option<Connector>,
    ) -> Result<(), FilterError> {
        self.check_index(index)?;
        let clause = &mut self.clauses[index];
        clause.field = field.into();
        clause.value = value.into();
        if index == 0 {
            clause.connector = None;
        } else if let Some(connector) = connector {
            clause.connector = Some(connector);
        }
        Ok(())
    }

    /// Render the literal WHERE fragment for this chain
    pub fn build_where(&self) -> String {
        crate::query::build_where(self)
    }

    /// Rebuild a chain from persisted visualization options
    pub fn from_persisted(mut filters: Vec<PersistedFilter>) -> Self {
        if filters.iter().any(|f| f.order.is_some()) {
            filters.sort_by_key(|f| f.order.unwrap_or(u32::MAX));
        }

        let clauses = filters
            .into_iter()
            .map(|f| FilterClause {
                field: f.name,
                connector: f.operator,
                value: f.value,
            })
            .collect();

        Self::from_clauses(clauses)
    }

    /// Persisted form, with 1-based order numbers
    pub fn to_persisted(&self) -> Vec<PersistedFilter> {
        self.numbered()
            .map(|(order, clause)| PersistedFilter {
                order: Some(order as u32),
                name: clause.field.clone(),
                value: clause.value.clone(),
                operator: clause.connector,
            })
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), FilterError> {
        if index < self.clauses.len() {
            Ok(())
        } else {
            Err(FilterError::IndexOutOfBounds {
                index,
                len: self.clauses.len(),
            })
        }
    }

    /// First clause carries no connector, every later clause carries one
    fn normalize_connectors(&mut self) {
        for (i, clause) in self.clauses.iter_mut().enumerate() {
            if i == 0 {
                clause.connector = None;
            } else if clause.connector.is_none() {
                clause.connector = Some(Connector::default());
            }
        }
    }
}

impl From<Vec<PersistedFilter>> for FilterChain {
    fn from(filters: Vec<PersistedFilter>) -> Self {
        Self::from_persisted(filters)
    }
}

impl From<FilterChain> for Vec<PersistedFilter> {
    fn from(chain: FilterChain) -> Self {
        chain.to_persisted()
    }
}

impl<'a> IntoIterator for &'a FilterChain {
    type Item = &'a FilterClause;
    type IntoIter = std::slice::Iter<'a, FilterClause>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.iter()
    }
}
