//! Sync bus - typed publish/subscribe between the query controller and views
//!
//! Handlers are keyed by the event's `TypeId`. Publishing snapshots the
//! handler list and releases the lock before calling out, so a handler may
//! subscribe, unsubscribe or publish again without deadlocking.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

/// Event trait that all bus payloads implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    /// Topic name used in logs
    fn topic(&self) -> &'static str;
}

/// Handle returned by [`SyncBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&dyn Event) + Send + Sync>;

/// System-wide event bus
pub struct SyncBus {
    handlers: Mutex<AHashMap<TypeId, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

/// Topics exchanged between the controller and views
pub mod events {
    use serde_json::Value;

    use super::Event;
    use crate::sync::{QueryState, ViewId};

    /// The filter chain changed; carries the new snapshot
    #[derive(Debug, Clone)]
    pub struct FiltersChanged {
        pub state: QueryState,
    }

    /// A view's axis or measure selection changed
    #[derive(Debug, Clone)]
    pub struct AxisChanged {
        pub view_id: ViewId,
        pub options: Value,
    }

    /// A view was removed from the dashboard
    #[derive(Debug, Clone)]
    pub struct VizRemoved {
        pub view_id: ViewId,
    }

    /// Outcome of one view refresh
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ViewStatus {
        Rendered,
        Placeholder(String),
        Failed(String),
    }

    /// A view finished a refresh
    #[derive(Debug, Clone)]
    pub struct ViewUpdated {
        pub view_id: ViewId,
        pub view_type: &'static str,
        pub revision: u64,
        pub status: ViewStatus,
    }

    macro_rules! impl_event {
        ($($t:ident),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }

                    fn topic(&self) -> &'static str {
                        stringify!($t)
                    }
                }
            )*
        }
    }

    impl_event!(FiltersChanged, AxisChanged, VizRemoved, ViewUpdated);
}

impl SyncBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(AHashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let erased: Handler = Arc::new(move |event: &dyn Event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                handler(event);
            }
        });

        self.handlers
            .lock()
            .entry(TypeId::of::<E>())
            .or_insert_with(Vec::new)
            .push((id, erased));
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let mut removed = false;
        for list in handlers.values_mut() {
            let before = list.len();
            list.retain(|(sub, _)| *sub != id);
            removed |= list.len() != before;
        }
        handlers.retain(|_, list| !list.is_empty());
        removed
    }

    /// Publish an event to every subscriber of its type
    pub fn publish<E: Event>(&self, event: E) {
        let snapshot: Vec<Handler> = self
            .handlers
            .lock()
            .get(&TypeId::of::<E>())
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        tracing::trace!("Publishing {} to {} subscriber(s)", event.topic(), snapshot.len());

        for handler in snapshot {
            handler(&event);
        }
    }

    /// Number of live subscriptions for an event type
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .get(&TypeId::of::<E>())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SyncBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock();
        f.debug_struct("SyncBus")
            .field("topics", &handlers.len())
            .field(
                "subscriptions",
                &handlers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}
