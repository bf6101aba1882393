use crate::error::InferenceError;

/// Raw tensor fetched from a graph's output node.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl OutputTensor {
    /// Creates an output tensor. `values.len()` must equal the product of
    /// `shape`.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, InferenceError> {
        let total: usize = shape.iter().product();
        if values.len() != total {
            return Err(InferenceError::execution(format!(
                "output data length {} does not match shape {shape:?}",
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
