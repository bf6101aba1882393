//! Model loading, exclusive inference sessions and result interpretation.
//!
//! The engine treats the neural network as a black box with one input node
//! and one output node. Backends (see [`backend`]) deserialize model bytes;
//! an [`InferenceSession`] owns the executable graph; [`Engine`] holds the
//! current session and swaps it atomically on reload; [`interpret`] turns the
//! output vector into a [`ClassificationResult`].
//!
//! # Usage
//!
//! ```
//! use frameclass_engine::{interpret, Engine, ModelConfig};
//! use frameclass_tensor::NormalizedTensor;
//!
//! let engine = Engine::new();
//! let model = engine.load(&ModelConfig::default()).unwrap();
//!
//! let shape = model.input_shape();
//! let input = NormalizedTensor::from_parts(shape.batched(), vec![0.0; shape.element_count()]).unwrap();
//! let output = engine.infer(input).unwrap();
//! let result = interpret(&output, model.labels()).unwrap();
//! println!("{} ({:.2})", result.class_name, result.confidence);
//! ```
//!
//! # Backends
//!
//! - `json`: in-process pool/dense/softmax classifier, always available.
//! - `onnx`: ONNX Runtime via the `ort` crate, behind the `onnx` feature.
//!
//! Models compiled into the binary are addressed as `builtin://<id>`; see
//! [`list_models`].

pub mod backend;
mod embedded;
mod error;
mod interpret;
mod labels;
mod model;
mod output;
mod session;

pub use backend::{Backend, BackendRegistry, Graph, GraphInfo, NodeInfo};
pub use embedded::{list_models, register_model, ModelId};
pub use error::{
    InferenceError, InferenceReason, InterpretError, InterpretReason, LoadError, LoadReason,
};
pub use interpret::{interpret, ClassificationResult};
pub use labels::LabelTable;
pub use model::{GpuOptions, Model, ModelConfig, BUILTIN_SCHEME};
pub use output::OutputTensor;
pub use session::{load_model, Engine, InferenceSession};
