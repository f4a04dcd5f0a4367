//! Mount points - where finished view configurations are handed off
//!
//! The drawing widgets live in the host. A mount point receives either a
//! configuration or a placeholder text for one view.

use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;

use vq_core::ViewId;

use crate::space_view::ViewConfig;

/// What was last handed to a mount point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "content", rename_all = "snake_case")]
pub enum Mounted {
    Config { config: ViewConfig },
    Placeholder { message: String },
}

/// Host-side target of a view
pub trait MountPoint: Send + Sync {
    /// Replace the view's content with a rendering configuration
    fn mount(&self, view_id: ViewId, config: &ViewConfig);

    /// Replace the view's content with a text message
    fn placeholder(&self, view_id: ViewId, message: &str);
}

/// Mount point keeping everything it receives, newest last
#[derive(Debug, Default)]
pub struct MemoryMount {
    history: Mutex<Vec<(ViewId, Mounted)>>,
}

impl MemoryMount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest content mounted for a view
    pub fn latest(&self, view_id: ViewId) -> Option<Mounted> {
        self.history
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| *id == view_id)
            .map(|(_, mounted)| mounted.clone())
    }

    pub fn history(&self) -> Vec<(ViewId, Mounted)> {
        self.history.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MountPoint for MemoryMount {
    fn mount(&self, view_id: ViewId, config: &ViewConfig) {
        self.history.lock().push((
            view_id,
            Mounted::Config {
                config: config.clone(),
            },
        ));
    }

    fn placeholder(&self, view_id: ViewId, message: &str) {
        self.history.lock().push((
            view_id,
            Mounted::Placeholder {
                message: message.to_string(),
            },
        ));
    }
}

#[derive(Serialize)]
struct MountRecord<'a> {
    view_id: ViewId,
    #[serde(flatten)]
    mounted: &'a Mounted,
}

/// Mount point writing one JSON document per line
pub struct JsonMount<W: Write + Send> {
    writer: Mutex<W>,
    pretty: bool,
}

impl<W: Write + Send> JsonMount<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            pretty: false,
        }
    }

    /// Indented output, one document after another
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write(&self, view_id: ViewId, mounted: &Mounted) {
        let record = MountRecord { view_id, mounted };
        let encoded = if self.pretty {
            serde_json::to_string_pretty(&record)
        } else {
            serde_json::to_string(&record)
        };

        let result = encoded
            .map_err(std::io::Error::from)
            .and_then(|line| {
                let mut writer = self.writer.lock();
                writeln!(writer, "{}", line)?;
                writer.flush()
            });
        if let Err(e) = result {
            tracing::warn!("Failed to write view {}: {}", view_id, e);
        }
    }
}

impl<W: Write + Send> MountPoint for JsonMount<W> {
    fn mount(&self, view_id: ViewId, config: &ViewConfig) {
        self.write(
            view_id,
            &Mounted::Config {
                config: config.clone(),
            },
        );
    }

    fn placeholder(&self, view_id: ViewId, message: &str) {
        self.write(
            view_id,
            &Mounted::Placeholder {
                message: message.to_string(),
            },
        );
    }
}
