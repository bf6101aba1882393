//! What a host application sees of the pipeline.

use serde::Serialize;
use tracing::debug;

use frameclass_engine::{LoadError, ModelConfig};

use crate::orchestrator::FramePipeline;

/// One row of the informational table shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoRow {
    pub name: &'static str,
    pub value: String,
}

impl InfoRow {
    fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Host-facing controls and readouts of a classifier.
pub trait HostSurface {
    /// Rows `class`, `index`, `confidence` and `model`. Values are empty
    /// until something has been classified or loaded.
    fn info_table(&self) -> Vec<InfoRow>;

    /// Number of numeric output channels. Always zero for now.
    fn info_channel_count(&self) -> usize;

    /// The message the host should show, if something is wrong.
    fn error_string(&self) -> Option<String>;

    /// Points the model at a new path. Reloads only when the path changed;
    /// returns whether it did.
    fn set_model_path(&self, path: &str) -> Result<bool, LoadError>;

    /// Handles a pulse parameter. `reload` reloads the current model;
    /// unknown names are ignored.
    fn pulse(&self, name: &str) -> Result<(), LoadError>;

    fn request_compute(&self);
}

impl HostSurface for FramePipeline {
    fn info_table(&self) -> Vec<InfoRow> {
        let model = self
            .engine()
            .model()
            .map(|m| m.path().to_string())
            .unwrap_or_default();
        match self.latest() {
            Some(r) => vec![
                InfoRow::new("class", r.class_name.clone()),
                InfoRow::new("index", r.class_index.to_string()),
                InfoRow::new("confidence", format!("{:.4}", r.confidence)),
                InfoRow::new("model", model),
            ],
            None => vec![
                InfoRow::new("class", ""),
                InfoRow::new("index", ""),
                InfoRow::new("confidence", ""),
                InfoRow::new("model", model),
            ],
        }
    }

    fn info_channel_count(&self) -> usize {
        0
    }

    fn error_string(&self) -> Option<String> {
        self.last_error()
    }

    fn set_model_path(&self, path: &str) -> Result<bool, LoadError> {
        let loaded = self.update_model_config(|current| {
            (current.path != path).then(|| ModelConfig {
                path: path.to_string(),
                ..current.clone()
            })
        })?;
        Ok(loaded.is_some())
    }

    fn pulse(&self, name: &str) -> Result<(), LoadError> {
        match name {
            "reload" => self.reload().map(|_| ()),
            other => {
                debug!(pulse = other, "ignoring unknown pulse");
                Ok(())
            }
        }
    }

    fn request_compute(&self) {
        FramePipeline::request_compute(self);
    }
}
