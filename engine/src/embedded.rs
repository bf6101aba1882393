//! Model registry: models compiled into the binary, addressed as
//! `builtin://<id>`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Identifies a built-in model.
pub struct ModelId;

impl ModelId {
    /// Average-colour classifier.
    /// Input: [1, 8, 8, 3] float32, normalized with mean 128 / stddev 128
    /// Output: [1, 3] float32 softmax over red, green, blue
    pub const DOMINANT_COLOR: &str = "dominant-color";
}

static DOMINANT_COLOR: &[u8] = include_bytes!("dominant_color.json");

/// Describes a registered model.
#[derive(Clone, Copy)]
pub struct EmbeddedModel {
    /// Backend format, e.g. `json` or `onnx`.
    pub format: &'static str,
    pub data: &'static [u8],
}

static REGISTRY: Lazy<Mutex<HashMap<String, EmbeddedModel>>> = Lazy::new(|| {
    let mut reg = HashMap::new();
    reg.insert(
        ModelId::DOMINANT_COLOR.to_string(),
        EmbeddedModel {
            format: "json",
            data: DOMINANT_COLOR,
        },
    );
    Mutex::new(reg)
});

/// Registers a model under `id`. Registering the same ID twice replaces the
/// previous registration.
pub fn register_model(id: &str, format: &'static str, data: &'static [u8]) {
    REGISTRY
        .lock()
        .insert(id.to_string(), EmbeddedModel { format, data });
}

/// Returns the IDs of all registered models, sorted.
pub fn list_models() -> Vec<String> {
    let mut ids: Vec<String> = REGISTRY.lock().keys().cloned().collect();
    ids.sort();
    ids
}

pub(crate) fn lookup(id: &str) -> Option<EmbeddedModel> {
    REGISTRY.lock().get(id).copied()
}
