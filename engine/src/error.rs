use std::fmt;

use thiserror::Error;

/// Why a model could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadReason {
    FileNotFound,
    MalformedGraph,
    SessionCreateFailed,
}

impl fmt::Display for LoadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadReason::FileNotFound => "file not found",
            LoadReason::MalformedGraph => "malformed graph",
            LoadReason::SessionCreateFailed => "session create failed",
        })
    }
}

/// Errors returned while loading a model and creating its session.
#[derive(Debug, Clone, Error)]
#[error("engine: load {path:?}: {reason}: {detail}")]
pub struct LoadError {
    pub reason: LoadReason,
    pub path: String,
    pub detail: String,
}

impl LoadError {
    pub fn new(reason: LoadReason, path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            reason,
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(LoadReason::FileNotFound, path, detail)
    }

    pub fn malformed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(LoadReason::MalformedGraph, path, detail)
    }

    pub fn session_create(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(LoadReason::SessionCreateFailed, path, detail)
    }
}

/// Why an inference call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceReason {
    ShapeMismatch,
    SessionNotReady,
    ExecutionFailed,
}

impl fmt::Display for InferenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InferenceReason::ShapeMismatch => "shape mismatch",
            InferenceReason::SessionNotReady => "session not ready",
            InferenceReason::ExecutionFailed => "execution failed",
        })
    }
}

/// Errors returned by a forward pass.
#[derive(Debug, Clone, Error)]
#[error("engine: infer: {reason}: {detail}")]
pub struct InferenceError {
    pub reason: InferenceReason,
    pub detail: String,
}

impl InferenceError {
    pub fn new(reason: InferenceReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn shape_mismatch(detail: impl Into<String>) -> Self {
        Self::new(InferenceReason::ShapeMismatch, detail)
    }

    pub fn not_ready() -> Self {
        Self::new(InferenceReason::SessionNotReady, "no model loaded")
    }

    pub fn execution(detail: impl Into<String>) -> Self {
        Self::new(InferenceReason::ExecutionFailed, detail)
    }
}

/// Why an output tensor could not be mapped onto the label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretReason {
    RankMismatch,
    LabelCountMismatch,
}

impl fmt::Display for InterpretReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InterpretReason::RankMismatch => "rank mismatch",
            InterpretReason::LabelCountMismatch => "label count mismatch",
        })
    }
}

/// Errors returned by [`interpret`](crate::interpret).
#[derive(Debug, Clone, Error)]
#[error("engine: interpret: {reason}: {detail}")]
pub struct InterpretError {
    pub reason: InterpretReason,
    pub detail: String,
}

impl InterpretError {
    pub fn new(reason: InterpretReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}
