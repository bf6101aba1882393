//! Inference runtime abstraction.
//!
//! A [`Backend`] turns serialized model bytes into a [`Graph`]; a graph runs
//! forward passes between named input and output nodes. The rest of the
//! crate only sees these two traits, so the ML runtime binding can change
//! without touching the frame pipeline.

mod linear;
#[cfg(feature = "onnx")]
mod onnx;

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use frameclass_tensor::NormalizedTensor;
use serde::Serialize;

use crate::embedded;
use crate::error::{InferenceError, LoadError};
use crate::model::{GpuOptions, BUILTIN_SCHEME};
use crate::output::OutputTensor;

pub use linear::LinearBackend;
#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;

/// A named graph node and its declared shape. Negative dimensions are
/// dynamic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub shape: Vec<i64>,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// What a loaded graph declares about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphInfo {
    pub inputs: Vec<NodeInfo>,
    pub outputs: Vec<NodeInfo>,
    /// Class names shipped inside the model file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl GraphInfo {
    /// Iterates inputs then outputs.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}

/// A loaded computation graph.
///
/// `run` is blocking and has no cancellation. Callers must not run the same
/// graph from two threads at once; [`InferenceSession`](crate::InferenceSession)
/// enforces this by taking `&mut self`.
pub trait Graph: Send {
    fn info(&self) -> &GraphInfo;

    fn run(
        &mut self,
        input_node: &str,
        input: &NormalizedTensor,
        output_node: &str,
    ) -> Result<OutputTensor, InferenceError>;
}

/// Deserializes model bytes into a [`Graph`].
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// `origin` is the model path or builtin id, used in error messages.
    fn load(
        &self,
        origin: &str,
        data: &[u8],
        gpu: &GpuOptions,
    ) -> Result<Box<dyn Graph>, LoadError>;
}

/// Maps model formats (file extensions) to backends.
#[derive(Clone)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl Default for BackendRegistry {
    /// Registers every backend compiled into this build: `json` always,
    /// `onnx` with the `onnx` feature.
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.register("json", Arc::new(LinearBackend));
        #[cfg(feature = "onnx")]
        reg.register("onnx", Arc::new(OnnxBackend));
        reg
    }
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Registers a backend for a format. Registering the same format twice
    /// replaces the previous backend.
    pub fn register(&mut self, format: &str, backend: Arc<dyn Backend>) {
        self.backends.insert(format.to_ascii_lowercase(), backend);
    }

    pub fn get(&self, format: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.get(&format.to_ascii_lowercase())
    }

    /// Returns the registered formats, sorted.
    pub fn formats(&self) -> Vec<String> {
        let mut f: Vec<String> = self.backends.keys().cloned().collect();
        f.sort();
        f
    }

    /// Finds the backend and model bytes for a path.
    ///
    /// `builtin://<id>` resolves against the embedded model registry; any
    /// other path is read from disk and dispatched on its extension. A
    /// missing file is `FileNotFound` whatever its extension.
    pub fn resolve(&self, path: &str) -> Result<(Arc<dyn Backend>, Cow<'static, [u8]>), LoadError> {
        if let Some(id) = path.strip_prefix(BUILTIN_SCHEME) {
            let model = embedded::lookup(id).ok_or_else(|| {
                LoadError::file_not_found(path, format!("no embedded model {id:?}"))
            })?;
            let backend = self.backend_for(path, model.format)?;
            return Ok((backend, Cow::Borrowed(model.data)));
        }

        let data = std::fs::read(path).map_err(|e| LoadError::file_not_found(path, e.to_string()))?;
        let format = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| LoadError::session_create(path, "model path has no extension"))?;
        let backend = self.backend_for(path, format)?;
        if data.is_empty() {
            return Err(LoadError::malformed(path, "empty model file"));
        }
        Ok((backend, Cow::Owned(data)))
    }

    fn backend_for(&self, path: &str, format: &str) -> Result<Arc<dyn Backend>, LoadError> {
        self.get(format).cloned().ok_or_else(|| {
            LoadError::session_create(
                path,
                format!(
                    "no backend for format {format:?} (available: {})",
                    self.formats().join(", ")
                ),
            )
        })
    }
}
