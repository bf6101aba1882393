//! ONNX Runtime backend.

use frameclass_tensor::NormalizedTensor;
use ort::execution_providers::{ArenaExtendStrategy, CUDAExecutionProvider};
use ort::session::Session;
use ort::value::{TensorRef, ValueType};
use tracing::debug;

use super::{Backend, Graph, GraphInfo, NodeInfo};
use crate::error::{InferenceError, LoadError};
use crate::model::GpuOptions;
use crate::output::OutputTensor;

/// [`Backend`] for `.onnx` models.
///
/// With GPU enabled the CUDA execution provider is registered first; its
/// memory arena grows by exactly what each allocation asks for when
/// `allow_growth` is set. ONNX Runtime falls back to CPU when CUDA is not
/// available.
pub struct OnnxBackend;

impl Backend for OnnxBackend {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn load(
        &self,
        origin: &str,
        data: &[u8],
        gpu: &GpuOptions,
    ) -> Result<Box<dyn Graph>, LoadError> {
        let mut builder =
            Session::builder().map_err(|e| LoadError::session_create(origin, e.to_string()))?;

        if gpu.enabled {
            let strategy = if gpu.allow_growth {
                ArenaExtendStrategy::SameAsRequested
            } else {
                ArenaExtendStrategy::NextPowerOfTwo
            };
            let cuda = CUDAExecutionProvider::default()
                .with_device_id(gpu.device_id)
                .with_arena_extend_strategy(strategy)
                .build();
            builder = builder
                .with_execution_providers([cuda])
                .map_err(|e| LoadError::session_create(origin, e.to_string()))?;
            debug!(device = gpu.device_id, allow_growth = gpu.allow_growth, "cuda provider registered");
        }

        let session = builder
            .commit_from_memory(data)
            .map_err(|e| LoadError::malformed(origin, e.to_string()))?;

        let info = GraphInfo {
            inputs: session
                .inputs
                .iter()
                .map(|i| NodeInfo::new(i.name.clone(), tensor_dims(&i.input_type)))
                .collect(),
            outputs: session
                .outputs
                .iter()
                .map(|o| NodeInfo::new(o.name.clone(), tensor_dims(&o.output_type)))
                .collect(),
            labels: None,
        };

        Ok(Box::new(OnnxGraph { session, info }))
    }
}

fn tensor_dims(ty: &ValueType) -> Vec<i64> {
    match ty {
        ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
        _ => Vec::new(),
    }
}

struct OnnxGraph {
    session: Session,
    info: GraphInfo,
}

impl Graph for OnnxGraph {
    fn info(&self) -> &GraphInfo {
        &self.info
    }

    fn run(
        &mut self,
        input_node: &str,
        input: &NormalizedTensor,
        output_node: &str,
    ) -> Result<OutputTensor, InferenceError> {
        let dims: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let tensor = TensorRef::from_array_view((dims, input.values()))
            .map_err(|e| InferenceError::shape_mismatch(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_node => tensor])
            .map_err(|e| InferenceError::execution(e.to_string()))?;

        let value = outputs.get(output_node).ok_or_else(|| {
            InferenceError::execution(format!("output node {output_node:?} not produced"))
        })?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::execution(e.to_string()))?;

        let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        OutputTensor::new(shape, data.to_vec())
    }
}
