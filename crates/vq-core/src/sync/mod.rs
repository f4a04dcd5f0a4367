use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::filter::FilterChain;
use crate::query::{QuerySpec, WhereFragment};

/// View identifier type
pub type ViewId = uuid::Uuid;

/// Immutable snapshot of the filter state views query against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    pub resource_id: String,

    pub filters: FilterChain,

    /// Literal `WHERE ...` fragment, empty when unfiltered
    pub where_clause: String,

    /// `SELECT * FROM "<resource>" <where>`
    pub sql_string: String,

    /// Incremented on every change published by the controller
    pub revision: u64,

    pub issued_at: DateTime<Utc>,
}

impl QueryState {
    /// Snapshot a chain at the given revision
    pub fn new(resource_id: impl Into<String>, filters: FilterChain, revision: u64) -> Self {
        let resource_id = resource_id.into();
        let where_clause = filters.build_where();
        let sql_string = QuerySpec::select_all(
            resource_id.clone(),
            WhereFragment {
                sql: where_clause.clone(),
                params: Vec::new(),
            },
        )
        .to_sql();

        Self {
            resource_id,
            filters,
            where_clause,
            sql_string,
            revision,
            issued_at: Utc::now(),
        }
    }

    /// Unfiltered state for a resource
    pub fn empty(resource_id: impl Into<String>) -> Self {
        Self::new(resource_id, FilterChain::new(), 0)
    }

    pub fn where_fragment(&self) -> WhereFragment {
        WhereFragment {
            sql: self.where_clause.clone(),
            params: Vec::new(),
        }
    }
}

/// Monotonic request counter owned by one view
///
/// Every refresh takes a token; a response is applied only while its token
/// is still the latest one issued.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

/// Token identifying one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding all earlier ones
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }

    /// Supersede any in-flight request without starting a new one
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synchronization settings for a specific view
#[derive(Debug, Clone)]
pub struct ViewSyncSettings {
    /// Whether this view refreshes on filter changes
    pub sync_filters: bool,
}

impl Default for ViewSyncSettings {
    fn default() -> Self {
        Self { sync_filters: true }
    }
}

/// Synchronization manager for coordinating query state across views
pub struct SyncManager {
    /// Latest published query state
    state: Arc<RwLock<QueryState>>,

    /// Per-view request generations
    generations: Arc<RwLock<AHashMap<ViewId, Arc<RequestGeneration>>>>,

    /// View-specific sync settings
    view_settings: Arc<RwLock<AHashMap<ViewId, ViewSyncSettings>>>,
}

impl SyncManager {
    /// Create a new synchronization manager
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(QueryState::empty(resource_id))),
            generations: Arc::new(RwLock::new(AHashMap::new())),
            view_settings: Arc::new(RwLock::new(AHashMap::new())),
        }
    }

    /// Get the current query state
    pub fn current_state(&self) -> QueryState {
        self.state.read().clone()
    }

    /// Replace the current query state
    pub fn set_state(&self, state: QueryState) {
        *self.state.write() = state;
    }

    /// Register a view with sync settings, returning its request generation
    pub fn register_view(&self, view_id: ViewId, settings: ViewSyncSettings) -> Arc<RequestGeneration> {
        self.view_settings.write().insert(view_id, settings);
        self.generations
            .write()
            .entry(view_id)
            .or_insert_with(|| Arc::new(RequestGeneration::new()))
            .clone()
    }

    /// Unregister a view; any request it still has in flight becomes stale
    pub fn unregister_view(&self, view_id: &ViewId) {
        self.view_settings.write().remove(view_id);
        if let Some(generation) = self.generations.write().remove(view_id) {
            generation.invalidate();
        }
    }

    /// Request generation of a registered view
    pub fn generation(&self, view_id: &ViewId) -> Option<Arc<RequestGeneration>> {
        self.generations.read().get(view_id).cloned()
    }

    pub fn is_registered(&self, view_id: &ViewId) -> bool {
        self.view_settings.read().contains_key(view_id)
    }

    /// Check if a view should refresh on filter changes
    pub fn should_sync_filters(&self, view_id: &ViewId) -> bool {
        self.view_settings
            .read()
            .get(view_id)
            .map(|s| s.sync_filters)
            .unwrap_or(false)
    }

    pub fn view_count(&self) -> usize {
        self.view_settings.read().len()
    }
}
