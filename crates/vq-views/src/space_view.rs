//! Viz view abstraction - base trait for all dashboard views

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use vq_core::{QueryState, ViewId};

use crate::plots::{ChartConfig, MapConfig};
use crate::tables::TableConfig;
use crate::ViewerContext;

/// Finished rendering configuration, tagged by view kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewConfig {
    Chart(ChartConfig),
    Table(TableConfig),
    Map(MapConfig),
}

/// What a refresh produced
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    /// A configuration for the mount point
    Render(ViewConfig),

    /// Text shown in place of the view
    Placeholder(String),

    /// The refresh failed and the view keeps what it showed before
    KeepPrevious(String),
}

/// Base trait for all views (charts, tables, maps)
#[async_trait]
pub trait VizView: Send + Sync {
    /// Get the unique ID of this view
    fn id(&self) -> ViewId;

    /// Get the view type (for serialization)
    fn view_type(&self) -> &'static str;

    /// Get the title of this view
    fn title(&self) -> String;

    /// Save configuration
    fn save_config(&self) -> Value;

    /// Load configuration; keys missing from `config` keep their values
    fn load_config(&self, config: Value);

    /// Query, fetch and build a configuration for `state`
    async fn refresh(&self, ctx: &ViewerContext, state: &QueryState) -> ViewOutcome;

    /// Get as any for downcasting
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Overlay `update` onto `current`, key by key
pub(crate) fn merge_options(current: Value, update: Value) -> Value {
    match (current, update) {
        (Value::Object(mut current), Value::Object(update)) => {
            for (key, value) in update {
                current.insert(key, value);
            }
            Value::Object(current)
        }
        (current, Value::Null) => current,
        (_, update) => update,
    }
}
