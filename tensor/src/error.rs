use thiserror::Error;

/// Precondition violations while building pixel buffers or tensors.
///
/// These are caller bugs rather than runtime conditions: a frame that trips
/// one is dropped, not retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("tensor: {0} must be greater than zero")]
    ZeroDimension(&'static str),

    #[error("tensor: need {needed} source channels, buffer has {available}")]
    InsufficientChannels { needed: usize, available: usize },

    #[error("tensor: batch size must be 1, got {0}")]
    BatchSize(usize),

    #[error("tensor: {width}x{height}x{channels} does not fit in memory")]
    TooLarge {
        width: usize,
        height: usize,
        channels: usize,
    },

    #[error("tensor: data length mismatch: expected {expected}, got {got}")]
    DataLength { expected: usize, got: usize },

    #[error("tensor: stddev must be finite and non-zero, got {0}")]
    InvalidStddev(String),
}
