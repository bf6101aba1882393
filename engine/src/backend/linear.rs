//! In-process backend for small JSON-described classifiers.
//!
//! The graph is fixed: global average pool over height and width, a dense
//! layer, then an optional softmax.
//!
//! ```json
//! {
//!   "input":  { "name": "image", "shape": [1, 8, 8, 3] },
//!   "output": { "name": "probs" },
//!   "weights": [[4, -2, -2], [-2, 4, -2], [-2, -2, 4]],
//!   "bias": [0, 0, 0],
//!   "activation": "softmax",
//!   "labels": ["red", "green", "blue"]
//! }
//! ```
//!
//! `weights` is `classes x channels`. Input height and width may be `-1`
//! (any size); the channel dimension must be fixed.

use frameclass_tensor::NormalizedTensor;
use serde::Deserialize;

use super::{Backend, Graph, GraphInfo, NodeInfo};
use crate::error::{InferenceError, LoadError};
use crate::model::GpuOptions;
use crate::output::OutputTensor;

#[derive(Deserialize)]
struct GraphFile {
    input: NodeSpec,
    output: NodeSpec,
    weights: Vec<Vec<f32>>,
    #[serde(default)]
    bias: Vec<f32>,
    #[serde(default)]
    activation: Activation,
    #[serde(default)]
    labels: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct NodeSpec {
    name: String,
    #[serde(default)]
    shape: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Activation {
    #[default]
    Softmax,
    Identity,
}

/// [`Backend`] for the JSON pool/dense/softmax graph format.
pub struct LinearBackend;

impl Backend for LinearBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn load(
        &self,
        origin: &str,
        data: &[u8],
        _gpu: &GpuOptions,
    ) -> Result<Box<dyn Graph>, LoadError> {
        let file: GraphFile = serde_json::from_slice(data)
            .map_err(|e| LoadError::malformed(origin, format!("parse graph JSON: {e}")))?;
        Ok(Box::new(LinearGraph::from_file(origin, file)?))
    }
}

struct LinearGraph {
    info: GraphInfo,
    input_name: String,
    output_name: String,
    /// Fixed height/width, `None` when dynamic.
    height: Option<usize>,
    width: Option<usize>,
    channels: usize,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    activation: Activation,
}

impl LinearGraph {
    fn from_file(origin: &str, file: GraphFile) -> Result<Self, LoadError> {
        let shape = &file.input.shape;
        if shape.len() != 4 {
            return Err(LoadError::malformed(
                origin,
                format!("input shape must be [1, H, W, C], got {shape:?}"),
            ));
        }
        if shape[0] != 1 && shape[0] != -1 {
            return Err(LoadError::malformed(
                origin,
                format!("input batch must be 1, got {}", shape[0]),
            ));
        }
        let dim = |d: i64| if d > 0 { Some(d as usize) } else { None };
        let channels = dim(shape[3])
            .ok_or_else(|| LoadError::malformed(origin, "input channel dimension must be fixed"))?;

        let classes = file.weights.len();
        if classes == 0 {
            return Err(LoadError::malformed(origin, "weights are empty"));
        }
        for (i, row) in file.weights.iter().enumerate() {
            if row.len() != channels {
                return Err(LoadError::malformed(
                    origin,
                    format!("weights row {i} has {} values, expected {channels}", row.len()),
                ));
            }
        }
        let bias = if file.bias.is_empty() {
            vec![0.0; classes]
        } else if file.bias.len() == classes {
            file.bias
        } else {
            return Err(LoadError::malformed(
                origin,
                format!("bias has {} values, expected {classes}", file.bias.len()),
            ));
        };
        if let Some(labels) = &file.labels {
            if labels.len() != classes {
                return Err(LoadError::malformed(
                    origin,
                    format!("{} labels for {classes} classes", labels.len()),
                ));
            }
        }

        let info = GraphInfo {
            inputs: vec![NodeInfo::new(file.input.name.clone(), shape.clone())],
            outputs: vec![NodeInfo::new(
                file.output.name.clone(),
                vec![1, classes as i64],
            )],
            labels: file.labels,
        };

        Ok(Self {
            info,
            input_name: file.input.name,
            output_name: file.output.name,
            height: dim(shape[1]),
            width: dim(shape[2]),
            channels,
            weights: file.weights,
            bias,
            activation: file.activation,
        })
    }

    fn check_input(&self, t: &NormalizedTensor) -> Result<(), InferenceError> {
        let [_, h, w, c] = t.shape();
        let fits = c == self.channels
            && self.height.is_none_or(|eh| eh == h)
            && self.width.is_none_or(|ew| ew == w);
        if !fits {
            return Err(InferenceError::shape_mismatch(format!(
                "input {:?} declared {:?}, got {:?}",
                self.input_name,
                self.info.inputs[0].shape,
                t.shape()
            )));
        }
        Ok(())
    }
}

impl Graph for LinearGraph {
    fn info(&self) -> &GraphInfo {
        &self.info
    }

    fn run(
        &mut self,
        input_node: &str,
        input: &NormalizedTensor,
        output_node: &str,
    ) -> Result<OutputTensor, InferenceError> {
        if input_node != self.input_name {
            return Err(InferenceError::execution(format!(
                "unknown input node {input_node:?}"
            )));
        }
        if output_node != self.output_name {
            return Err(InferenceError::execution(format!(
                "unknown output node {output_node:?}"
            )));
        }
        self.check_input(input)?;

        let mut pooled = vec![0.0f64; self.channels];
        for px in input.values().chunks_exact(self.channels) {
            for (acc, &v) in pooled.iter_mut().zip(px) {
                *acc += v as f64;
            }
        }
        let n = (input.values().len() / self.channels) as f64;
        let pooled: Vec<f32> = pooled.iter().map(|&s| (s / n) as f32).collect();

        let mut logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(&pooled).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();

        if self.activation == Activation::Softmax {
            softmax(&mut logits);
        }

        let classes = logits.len();
        OutputTensor::new(vec![1, classes], logits)
    }
}

fn softmax(v: &mut [f32]) {
    let max = v.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for x in v.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    if sum > 0.0 {
        for x in v.iter_mut() {
            *x /= sum;
        }
    }
}
