//! Inference sessions and the reloadable engine that owns one.

use std::sync::Arc;
use std::time::Instant;

use frameclass_tensor::{NormalizedTensor, TargetShape};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::backend::{BackendRegistry, Graph, GraphInfo, NodeInfo};
use crate::error::{InferenceError, LoadError};
use crate::labels::LabelTable;
use crate::model::{Model, ModelConfig};
use crate::output::OutputTensor;

/// Exclusive execution context for one loaded [`Model`].
///
/// `infer` takes `&mut self`, so at most one forward pass runs against a
/// session at a time.
pub struct InferenceSession {
    model: Arc<Model>,
    graph: Box<dyn Graph>,
}

impl InferenceSession {
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Runs a full forward pass. Blocks until the backend returns.
    ///
    /// The tensor's `(height, width, channels)` must equal the model's input
    /// shape exactly; nothing is coerced.
    pub fn infer(&mut self, tensor: NormalizedTensor) -> Result<OutputTensor, InferenceError> {
        let got = tensor.target_shape();
        if got != self.model.input_shape {
            return Err(InferenceError::shape_mismatch(format!(
                "model {:?} expects {}, got {got}",
                self.model.path, self.model.input_shape
            )));
        }

        let started = Instant::now();
        let output = self
            .graph
            .run(&self.model.input_node, &tensor, &self.model.output_node)?;
        debug!(
            shape = ?output.shape(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "output tensor"
        );
        Ok(output)
    }
}

/// Loads a model and creates a session bound to it.
pub fn load_model(
    registry: &BackendRegistry,
    cfg: &ModelConfig,
) -> Result<InferenceSession, LoadError> {
    let path = cfg.path.as_str();
    let (backend, data) = registry.resolve(path)?;
    let graph = backend.load(path, &data, &cfg.gpu)?;
    drop(data);

    let info = graph.info().clone();
    for (i, node) in info.nodes().take(3).enumerate() {
        debug!(index = i, name = %node.name, shape = ?node.shape, "graph node");
    }

    let input = select_node(path, "input", cfg.input_node.as_deref(), &info.inputs)?;
    let output = select_node(path, "output", cfg.output_node.as_deref(), &info.outputs)?;
    let input_shape = resolve_input_shape(path, cfg.input_shape, input)?;
    let labels = resolve_labels(path, cfg, &info)?;
    let input_node = input.name.clone();
    let output_node = output.name.clone();

    if let Some(&classes) = output.shape.last() {
        if classes > 0 && classes as usize != labels.len() {
            warn!(
                path,
                classes,
                labels = labels.len(),
                "output size does not match label count"
            );
        }
    }

    info!(
        path,
        backend = backend.name(),
        input = %input_node,
        output = %output_node,
        shape = %input_shape,
        classes = labels.len(),
        "model loaded"
    );

    let model = Model {
        path: path.to_string(),
        backend: backend.name(),
        input_node,
        output_node,
        input_shape,
        mean: cfg.mean,
        stddev: cfg.stddev,
        labels: Arc::new(labels),
        info,
    };
    Ok(InferenceSession {
        model: Arc::new(model),
        graph,
    })
}

fn select_node<'a>(
    path: &str,
    kind: &str,
    wanted: Option<&str>,
    nodes: &'a [NodeInfo],
) -> Result<&'a NodeInfo, LoadError> {
    match wanted {
        Some(name) => nodes.iter().find(|n| n.name == name).ok_or_else(|| {
            let known: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
            LoadError::malformed(
                path,
                format!("{kind} node {name:?} not found (graph has {known:?})"),
            )
        }),
        None => nodes
            .first()
            .ok_or_else(|| LoadError::malformed(path, format!("graph declares no {kind} nodes"))),
    }
}

/// Picks the NHWC input shape: the configured one if set, otherwise the
/// graph's declaration. A configured shape must agree with every fixed
/// dimension the graph declares.
fn resolve_input_shape(
    path: &str,
    configured: Option<TargetShape>,
    node: &NodeInfo,
) -> Result<TargetShape, LoadError> {
    let declared = &node.shape;
    if !declared.is_empty() && declared.len() != 4 {
        return Err(LoadError::malformed(
            path,
            format!(
                "input {:?} has rank {}, expected [1, H, W, C]",
                node.name,
                declared.len()
            ),
        ));
    }

    let shape = match configured {
        Some(shape) => {
            if !declared.is_empty() {
                let want = [shape.height, shape.width, shape.channels];
                for (axis, (&d, w)) in declared[1..].iter().zip(want).enumerate() {
                    if d > 0 && d as usize != w {
                        return Err(LoadError::malformed(
                            path,
                            format!(
                                "configured input shape {shape} conflicts with declared {declared:?} on axis {}",
                                axis + 1
                            ),
                        ));
                    }
                }
            }
            shape
        }
        None => {
            if declared.is_empty() || declared[1..].iter().any(|&d| d <= 0) {
                return Err(LoadError::malformed(
                    path,
                    format!(
                        "input {:?} shape {declared:?} is not fully known; set input_shape",
                        node.name
                    ),
                ));
            }
            TargetShape::new(
                declared[1] as usize,
                declared[2] as usize,
                declared[3] as usize,
            )
        }
    };

    if shape.element_count() == 0 {
        return Err(LoadError::malformed(
            path,
            format!("input shape {shape} has a zero dimension"),
        ));
    }
    Ok(shape)
}

fn resolve_labels(path: &str, cfg: &ModelConfig, info: &GraphInfo) -> Result<LabelTable, LoadError> {
    if let Some(file) = &cfg.labels {
        return LabelTable::from_file(file);
    }
    match &info.labels {
        Some(names) => Ok(LabelTable::new(names.clone())),
        None => Err(LoadError::malformed(
            path,
            "model carries no class labels; set a labels file",
        )),
    }
}

/// Holds at most one [`InferenceSession`] and swaps it atomically on reload.
///
/// Every forward pass holds the session lock for its full duration. A reload
/// builds the new session first, then takes the same lock, so it waits for
/// any in-flight pass and no caller ever sees a partly replaced session.
/// With no session loaded, every call fails with `SessionNotReady`.
pub struct Engine {
    registry: BackendRegistry,
    slot: Mutex<Option<InferenceSession>>,
    current: RwLock<Option<Arc<Model>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the default backends and no model loaded.
    pub fn new() -> Self {
        Self::with_registry(BackendRegistry::default())
    }

    pub fn with_registry(registry: BackendRegistry) -> Self {
        Self {
            registry,
            slot: Mutex::new(None),
            current: RwLock::new(None),
        }
    }

    /// Loads a model and installs it, replacing any previous session.
    ///
    /// On failure the previous session is torn down as well and the engine
    /// stays unready until a later load succeeds.
    pub fn load(&self, cfg: &ModelConfig) -> Result<Arc<Model>, LoadError> {
        match load_model(&self.registry, cfg) {
            Ok(session) => {
                let model = Arc::clone(session.model());
                self.install(Some(session));
                Ok(model)
            }
            Err(e) => {
                self.install(None);
                Err(e)
            }
        }
    }

    /// Drops the current session.
    pub fn unload(&self) {
        self.install(None);
    }

    fn install(&self, next: Option<InferenceSession>) {
        let previous = {
            let mut slot = self.slot.lock();
            *self.current.write() = next.as_ref().map(|s| Arc::clone(s.model()));
            std::mem::replace(&mut *slot, next)
        };
        drop(previous);
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// The currently installed model, if any. Does not wait for in-flight
    /// passes.
    pub fn model(&self) -> Option<Arc<Model>> {
        self.current.read().clone()
    }

    /// Runs `f` with exclusive access to the current session.
    ///
    /// Callers that must use the model's shape and labels consistently with
    /// the pass itself do all of that inside `f`.
    pub fn run<R>(&self, f: impl FnOnce(&mut InferenceSession) -> R) -> Result<R, InferenceError> {
        let mut slot = self.slot.lock();
        let session = slot.as_mut().ok_or_else(InferenceError::not_ready)?;
        Ok(f(session))
    }

    pub fn infer(&self, tensor: NormalizedTensor) -> Result<OutputTensor, InferenceError> {
        self.run(|s| s.infer(tensor))?
    }
}
