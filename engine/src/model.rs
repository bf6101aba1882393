//! Model configuration and the read-only description of a loaded model.

use std::path::PathBuf;
use std::sync::Arc;

use frameclass_tensor::TargetShape;
use serde::{Deserialize, Serialize};

use crate::backend::GraphInfo;
use crate::embedded::ModelId;
use crate::labels::LabelTable;

/// Path prefix for models compiled into the binary.
pub const BUILTIN_SCHEME: &str = "builtin://";

/// GPU placement options passed to backends that support a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuOptions {
    /// Try a GPU execution provider before falling back to CPU.
    pub enabled: bool,
    pub device_id: i32,
    /// Grow device memory on demand instead of reserving it up front, so the
    /// host application keeps its share of the GPU.
    pub allow_growth: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: 0,
            allow_growth: true,
        }
    }
}

/// Everything needed to load a model and feed it.
///
/// Node names and the input shape are optional: when unset they are taken
/// from what the graph declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model file path, or `builtin://<id>`.
    pub path: String,
    /// Label file, one class name per line. Falls back to labels embedded in
    /// the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<TargetShape>,
    pub mean: f32,
    pub stddev: f32,
    pub gpu: GpuOptions,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: format!("{BUILTIN_SCHEME}{}", ModelId::DOMINANT_COLOR),
            labels: None,
            input_node: None,
            output_node: None,
            input_shape: None,
            mean: 128.0,
            stddev: 128.0,
            gpu: GpuOptions::default(),
        }
    }
}

impl ModelConfig {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// A loaded model: resolved node names, input shape, normalization constants
/// and class labels.
///
/// Shared read-only between the session that runs it and whoever
/// interprets its output.
#[derive(Debug)]
pub struct Model {
    pub(crate) path: String,
    pub(crate) backend: &'static str,
    pub(crate) input_node: String,
    pub(crate) output_node: String,
    pub(crate) input_shape: TargetShape,
    pub(crate) mean: f32,
    pub(crate) stddev: f32,
    pub(crate) labels: Arc<LabelTable>,
    pub(crate) info: GraphInfo,
}

impl Model {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the backend that loaded the graph.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn input_node(&self) -> &str {
        &self.input_node
    }

    pub fn output_node(&self) -> &str {
        &self.output_node
    }

    /// The `(height, width, channels)` every input tensor must have.
    pub fn input_shape(&self) -> TargetShape {
        self.input_shape
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    pub fn stddev(&self) -> f32 {
        self.stddev
    }

    pub fn labels(&self) -> &Arc<LabelTable> {
        &self.labels
    }

    pub fn graph_info(&self) -> &GraphInfo {
        &self.info
    }
}
