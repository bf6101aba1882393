use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// Spatial and channel dimensions a model expects for a single image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl TargetShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Returns the NHWC tensor shape with a batch of one.
    pub fn batched(&self) -> [usize; 4] {
        [1, self.height, self.width, self.channels]
    }

    pub fn element_count(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl fmt::Display for TargetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// A `(1, height, width, channels)` float tensor whose values have been
/// mean/stddev-normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    shape: [usize; 4],
    values: Vec<f32>,
}

impl NormalizedTensor {
    /// Wraps values that are already normalized.
    ///
    /// The batch dimension must be 1 and `values.len()` must equal the
    /// product of the shape.
    pub fn from_parts(shape: [usize; 4], values: Vec<f32>) -> Result<Self, ShapeError> {
        if shape[0] != 1 {
            return Err(ShapeError::BatchSize(shape[0]));
        }
        for (dim, name) in shape[1..].iter().zip(["height", "width", "channels"]) {
            if *dim == 0 {
                return Err(ShapeError::ZeroDimension(name));
            }
        }
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(ShapeError::DataLength {
                expected,
                got: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Returns the per-image dimensions, dropping the batch.
    pub fn target_shape(&self) -> TargetShape {
        TargetShape::new(self.shape[1], self.shape[2], self.shape[3])
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at row `y`, column `x`, channel `c` of the single batch entry.
    pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        let [_, h, w, ch] = self.shape;
        if y >= h || x >= w || c >= ch {
            return None;
        }
        Some(self.values[(y * w + x) * ch + c])
    }
}
