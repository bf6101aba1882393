//! Per-frame pipeline states.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Where the current frame is. Every frame starts and ends in `Idle`; a
/// failure in any stage goes straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    CapturingFrame,
    Normalizing,
    Inferring,
    Interpreting,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::CapturingFrame => "capturing_frame",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Inferring => "inferring",
            PipelineState::Interpreting => "interpreting",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => PipelineState::CapturingFrame,
            2 => PipelineState::Normalizing,
            3 => PipelineState::Inferring,
            4 => PipelineState::Interpreting,
            _ => PipelineState::Idle,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`PipelineState`] readable from any thread.
#[derive(Debug, Default)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn load(&self) -> PipelineState {
        PipelineState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores `next` and returns the previous state.
    pub(crate) fn swap(&self, next: PipelineState) -> PipelineState {
        PipelineState::from_u8(self.0.swap(next as u8, Ordering::AcqRel))
    }
}
