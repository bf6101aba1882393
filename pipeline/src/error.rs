use std::path::PathBuf;

use frameclass_engine::{InferenceError, InferenceReason, InterpretError, LoadError};
use frameclass_tensor::ShapeError;
use thiserror::Error;

use crate::frame::Resolution;

/// The host frame source could not deliver the current frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("capture: staging holds {expected} bytes, frame has {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("capture: frame {0} does not fit in memory")]
    TooLarge(Resolution),

    #[error("capture: {0}")]
    Source(String),
}

/// Errors reading or writing a pipeline configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config: parse: {0}")]
    Parse(String),
}

/// Any failure that aborts a single frame.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

impl PipelineError {
    /// Returns true when the frame failed only because no model is loaded.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, PipelineError::Inference(e) if e.reason == InferenceReason::SessionNotReady)
    }
}
