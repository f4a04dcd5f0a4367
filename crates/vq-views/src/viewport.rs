//! Viewport - keeps the attached views of a dashboard in step
//!
//! Every attached view subscribes to the sync bus. Filter changes refresh all
//! views that follow filters, axis changes refresh one view, and a removed
//! view is detached. Refreshes run on the context's runtime; a response is
//! applied only while it belongs to the view's latest request.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vq_core::events::events::{AxisChanged, FiltersChanged, ViewStatus, ViewUpdated, VizRemoved};
use vq_core::{QueryState, RequestGeneration, SubscriptionId, ViewId, ViewSyncSettings};

use crate::mount::MountPoint;
use crate::space_view::{ViewOutcome, VizView};
use crate::ViewerContext;

struct AttachedView {
    view: Arc<dyn VizView>,
    mount: Arc<dyn MountPoint>,
    generation: Arc<RequestGeneration>,
    subscriptions: Vec<SubscriptionId>,
}

struct Inner {
    ctx: ViewerContext,
    views: RwLock<IndexMap<ViewId, AttachedView>>,
}

/// Saved form of one attached view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedView {
    pub id: ViewId,
    pub view_type: &'static str,
    pub options: Value,
}

/// The set of views shown on one dashboard
#[derive(Clone)]
pub struct Viewport {
    inner: Arc<Inner>,
}

impl Viewport {
    pub fn new(ctx: ViewerContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                views: RwLock::new(IndexMap::new()),
            }),
        }
    }

    pub fn context(&self) -> &ViewerContext {
        &self.inner.ctx
    }

    /// Attach a view and its mount point
    ///
    /// Attaching does not refresh; call [`refresh`](Self::refresh) for the
    /// first draw. Re-attaching an id replaces the earlier attachment.
    pub fn attach(
        &self,
        view: Arc<dyn VizView>,
        mount: Arc<dyn MountPoint>,
        settings: ViewSyncSettings,
    ) -> ViewId {
        let view_id = view.id();
        self.detach(&view_id);

        let ctx = &self.inner.ctx;
        let sync_filters = settings.sync_filters;
        let generation = ctx.sync_manager.register_view(view_id, settings);

        let mut subscriptions = Vec::with_capacity(3);
        if sync_filters {
            let weak = Arc::downgrade(&self.inner);
            subscriptions.push(ctx.event_bus.subscribe::<FiltersChanged, _>(move |event| {
                with_inner(&weak, |inner| {
                    Inner::spawn_refresh(inner, view_id, event.state.clone());
                });
            }));
        }

        let weak = Arc::downgrade(&self.inner);
        subscriptions.push(ctx.event_bus.subscribe::<AxisChanged, _>(move |event| {
            if event.view_id != view_id {
                return;
            }
            with_inner(&weak, |inner| {
                let view = inner.views.read().get(&view_id).map(|a| a.view.clone());
                if let Some(view) = view {
                    view.load_config(event.options.clone());
                    let state = inner.ctx.sync_manager.current_state();
                    Inner::spawn_refresh(inner, view_id, state);
                }
            });
        }));

        let weak = Arc::downgrade(&self.inner);
        subscriptions.push(ctx.event_bus.subscribe::<VizRemoved, _>(move |event| {
            if event.view_id != view_id {
                return;
            }
            with_inner(&weak, |inner| {
                inner.detach(&view_id);
            });
        }));

        info!("Attached {} {}", view.view_type(), view_id);
        self.inner.views.write().insert(
            view_id,
            AttachedView {
                view,
                mount,
                generation,
                subscriptions,
            },
        );
        view_id
    }

    /// Detach a view; a refresh it still has in flight is discarded
    pub fn detach(&self, view_id: &ViewId) -> bool {
        self.inner.detach(view_id)
    }

    /// Refresh one view against the current query state
    pub fn refresh(&self, view_id: ViewId) -> Option<JoinHandle<()>> {
        let state = self.inner.ctx.sync_manager.current_state();
        Inner::spawn_refresh(&self.inner, view_id, state)
    }

    /// Refresh every attached view, in attach order
    pub fn refresh_all(&self) -> Vec<JoinHandle<()>> {
        let state = self.inner.ctx.sync_manager.current_state();
        self.view_ids()
            .into_iter()
            .filter_map(|id| Inner::spawn_refresh(&self.inner, id, state.clone()))
            .collect()
    }

    pub fn view(&self, view_id: &ViewId) -> Option<Arc<dyn VizView>> {
        self.inner.views.read().get(view_id).map(|a| a.view.clone())
    }

    pub fn view_ids(&self) -> Vec<ViewId> {
        self.inner.views.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.views.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Options of every view, in attach order
    pub fn save_layout(&self) -> Vec<SavedView> {
        self.inner
            .views
            .read()
            .values()
            .map(|attached| SavedView {
                id: attached.view.id(),
                view_type: attached.view.view_type(),
                options: attached.view.save_config(),
            })
            .collect()
    }
}

fn with_inner(weak: &Weak<Inner>, f: impl FnOnce(&Arc<Inner>)) {
    if let Some(inner) = weak.upgrade() {
        f(&inner);
    }
}

impl Inner {
    fn detach(&self, view_id: &ViewId) -> bool {
        let Some(attached) = self.views.write().shift_remove(view_id) else {
            return false;
        };

        for subscription in attached.subscriptions {
            self.ctx.event_bus.unsubscribe(subscription);
        }
        self.ctx.sync_manager.unregister_view(view_id);
        info!("Detached {} {}", attached.view.view_type(), view_id);
        true
    }

    /// Start a refresh of `view_id` against `state`
    ///
    /// The request token is taken before spawning, so a later refresh
    /// supersedes this one even if it starts first.
    fn spawn_refresh(inner: &Arc<Inner>, view_id: ViewId, state: QueryState) -> Option<JoinHandle<()>> {
        let (view, mount, generation) = {
            let views = inner.views.read();
            let attached = views.get(&view_id)?;
            (
                attached.view.clone(),
                attached.mount.clone(),
                attached.generation.clone(),
            )
        };

        let token = generation.begin();
        let ctx = inner.ctx.clone();
        let handle = ctx.runtime_handle.clone();

        Some(handle.spawn(async move {
            let outcome = view.refresh(&ctx, &state).await;

            if !generation.is_current(token) {
                debug!(
                    "Discarding stale response for {} (request {}, revision {})",
                    view_id,
                    token.value(),
                    state.revision
                );
                return;
            }

            let status = match outcome {
                ViewOutcome::Render(config) => {
                    mount.mount(view_id, &config);
                    ViewStatus::Rendered
                }
                ViewOutcome::Placeholder(message) => {
                    mount.placeholder(view_id, &message);
                    ViewStatus::Placeholder(message)
                }
                ViewOutcome::KeepPrevious(message) => {
                    warn!("{} {} kept its previous content: {}", view.view_type(), view_id, message);
                    ViewStatus::Failed(message)
                }
            };

            ctx.event_bus.publish(ViewUpdated {
                view_id,
                view_type: view.view_type(),
                revision: state.revision,
                status,
            });
        }))
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, attached) in self.views.get_mut().drain(..) {
            for subscription in attached.subscriptions {
                self.ctx.event_bus.unsubscribe(subscription);
            }
        }
    }
}
