//! View system for the visualization query engine
//!
//! Each view turns the shared filter state into its own query, fetches it and
//! hands a finished rendering configuration to a [`MountPoint`]. The
//! [`Viewport`] keeps every attached view in step with the [`SyncBus`].

pub mod format;
pub mod mount;
pub mod plots;
mod space_view;
pub mod tables;
pub mod template;
mod viewport;

pub use format::{format_measure, FormatError, NumberFormat};
pub use mount::{JsonMount, MemoryMount, MountPoint, Mounted};
pub use plots::{ChartConfig, ChartKind, ChartOptions, ChartView, MapConfig, MapOptions, MapView};
pub use space_view::{ViewConfig, ViewOutcome, VizView};
pub use tables::{TableConfig, TableOptions, TableView};
pub use template::{render_title, TemplateError, TitleContext};
pub use viewport::{SavedView, Viewport};

use std::sync::Arc;

use vq_core::{SyncBus, SyncManager};
use vq_data::{DataFetcher, EngineConfig};

/// Context handed to views when they refresh
#[derive(Clone)]
pub struct ViewerContext {
    /// Fetches datasets from the aggregation backend
    pub fetcher: DataFetcher,

    /// Query state and per-view request generations
    pub sync_manager: Arc<SyncManager>,

    /// Bus views subscribe to and report on
    pub event_bus: Arc<SyncBus>,

    /// Tokio runtime handle refreshes are spawned on
    pub runtime_handle: tokio::runtime::Handle,

    pub config: Arc<EngineConfig>,
}

impl ViewerContext {
    pub fn new(
        fetcher: DataFetcher,
        sync_manager: Arc<SyncManager>,
        event_bus: Arc<SyncBus>,
        runtime_handle: tokio::runtime::Handle,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            fetcher,
            sync_manager,
            event_bus,
            runtime_handle,
            config,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use vq_core::{SyncBus, SyncManager};
    use vq_data::{DataFetcher, EngineConfig, MemoryBackend};

    use crate::ViewerContext;

    /// Context over a fixture backend, on the test's runtime
    pub fn context(backend: Arc<MemoryBackend>) -> ViewerContext {
        let config = EngineConfig::default();
        ViewerContext::new(
            DataFetcher::new(backend, &config),
            Arc::new(SyncManager::new("res-1")),
            Arc::new(SyncBus::new()),
            tokio::runtime::Handle::current(),
            Arc::new(config),
        )
    }
}
