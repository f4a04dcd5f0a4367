//! Core functionality for the visualization query engine
//!
//! This crate provides the filter chain, query generation and the state
//! synchronization shared by every view of a dashboard.

pub mod events;
pub mod filter;
pub mod options;
pub mod query;
pub mod state;
pub mod sync;

// Re-export commonly used types
pub use events::{Event, SubscriptionId, SyncBus};
pub use filter::{Connector, FilterChain, FilterClause, FilterError, PersistedFilter};
pub use query::{
    build_where, Aggregation, LiteralPredicates, ParameterizedPredicates, PredicateRenderer,
    QuerySpec, WhereFragment,
};
pub use state::QueryController;
pub use sync::{QueryState, RequestGeneration, RequestToken, SyncManager, ViewId, ViewSyncSettings};
