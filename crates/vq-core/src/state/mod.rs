use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::events::events::FiltersChanged;
use crate::events::SyncBus;
use crate::filter::{Connector, FilterChain, FilterClause, FilterError};
use crate::sync::{QueryState, SyncManager};

/// Owner of the dashboard's filter chain
///
/// Every edit goes through here. When the rendered WHERE fragment changes a
/// fresh [`QueryState`] is stored in the sync manager and published as
/// [`FiltersChanged`]. Edits that leave the fragment untouched (for example
/// adding an empty clause) do not trigger view refreshes.
pub struct QueryController {
    resource_id: String,

    chain: RwLock<FilterChain>,

    revision: AtomicU64,

    /// Fragment of the last published state
    last_where: Mutex<String>,

    /// The synchronization manager
    pub sync_manager: Arc<SyncManager>,

    /// The event bus
    pub event_bus: Arc<SyncBus>,
}

impl QueryController {
    /// Create a controller over an empty chain
    pub fn new(resource_id: impl Into<String>) -> Self {
        let resource_id = resource_id.into();
        Self::with_parts(
            resource_id.clone(),
            Arc::new(SyncManager::new(resource_id)),
            Arc::new(SyncBus::new()),
        )
    }

    /// Create a controller sharing an existing manager and bus
    pub fn with_parts(
        resource_id: impl Into<String>,
        sync_manager: Arc<SyncManager>,
        event_bus: Arc<SyncBus>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            chain: RwLock::new(FilterChain::new()),
            revision: AtomicU64::new(0),
            last_where: Mutex::new(String::new()),
            sync_manager,
            event_bus,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Copy of the current chain
    pub fn filters(&self) -> FilterChain {
        self.chain.read().clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> QueryState {
        self.sync_manager.current_state()
    }

    /// Replace the whole chain, e.g. after loading saved options
    pub fn load(&self, chain: FilterChain) {
        *self.chain.write() = chain;
        self.publish_if_changed();
    }

    /// Append an empty clause
    pub fn add_clause(&self) -> usize {
        let index = self.chain.write().add_clause();
        self.publish_if_changed();
        index
    }

    pub fn remove_clause(&self, index: usize) -> Result<FilterClause, FilterError> {
        let removed = self.chain.write().remove_clause(index)?;
        self.publish_if_changed();
        Ok(removed)
    }

    pub fn set_clause(
        &self,
        index: usize,
        field: impl Into<String>,
        value: impl Into<String>,
        connector: Option<Connector>,
    ) -> Result<(), FilterError> {
        self.chain
            .write()
            .set_clause(index, field, value, connector)?;
        self.publish_if_changed();
        Ok(())
    }

    /// Publish the current chain unconditionally
    pub fn publish(&self) -> QueryState {
        let state = {
            let mut last = self.last_where.lock();
            let chain = self.chain.read().clone();
            *last = chain.build_where();
            self.commit(chain)
        };
        self.announce(&state);
        state
    }

    fn publish_if_changed(&self) -> Option<QueryState> {
        let state = {
            let mut last = self.last_where.lock();
            let chain = self.chain.read().clone();
            let where_clause = chain.build_where();
            if *last == where_clause {
                tracing::trace!("Filter edit left the query unchanged");
                return None;
            }
            *last = where_clause;
            self.commit(chain)
        };
        self.announce(&state);
        Some(state)
    }

    /// Number and store a snapshot; callers hold `last_where`
    fn commit(&self, chain: FilterChain) -> QueryState {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let state = QueryState::new(self.resource_id.clone(), chain, revision);

        tracing::debug!("Filters changed (revision {}): {}", revision, state.sql_string);

        self.sync_manager.set_state(state.clone());
        state
    }

    fn announce(&self, state: &QueryState) {
        self.event_bus.publish(FiltersChanged {
            state: state.clone(),
        });
    }
}
