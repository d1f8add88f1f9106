//! Neural network inference.
//!
//! [`NeuralNetwork`] wraps a runnable [tract] model together with an optionally acquired GPU
//! compute session. The GPU is treated strictly as a capability: acquisition is probed once at
//! load time via [`try_acquire_accelerator`] and absence only means the network runs on the CPU.

use std::borrow::Cow;
use std::collections::HashMap;

use tract_onnx::prelude::{
    tvec, Framework, Graph, InferenceModelExt, SimplePlan, Tensor, TypedFact, TypedOp,
};
use wonnx::utils::{InputTensor, OutputTensor};

use crate::{Error, Result};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A GPU compute session for a specific model.
///
/// Exclusively owned by the [`NeuralNetwork`] that acquired it; dropped (and its device
/// resources released) together with it.
pub struct Accelerator {
    session: wonnx::Session,
}

/// Probes for GPU execution support of the given ONNX model.
///
/// This never fails: any problem (no compatible adapter, driver error, unsupported operator set)
/// is logged and reported as `None`, which callers treat as "run on the CPU".
pub fn try_acquire_accelerator(raw: &[u8]) -> Option<Accelerator> {
    match pollster::block_on(wonnx::Session::from_bytes(raw)) {
        Ok(session) => {
            log::debug!("acquired GPU session for model");
            Some(Accelerator { session })
        }
        Err(e) => {
            log::debug!("no GPU support for this model, running on CPU; reason: {e}");
            None
        }
    }
}

/// A loaded neural network, runnable on CPU or (if acquired) on the GPU.
pub struct NeuralNetwork {
    inner: Model,
    gpu: Option<Accelerator>,
}

impl NeuralNetwork {
    /// Loads a pre-trained model from an in-memory ONNX file.
    ///
    /// Fails with [`Error::ModelLoad`] if the runtime rejects the bytes. GPU support is probed
    /// as part of loading and never causes a failure.
    pub fn from_onnx(raw: &[u8]) -> Result<Self> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*raw)
            .map_err(|e| Error::ModelLoad(e.to_string()))?;
        let model = graph
            .into_optimized()
            .and_then(|m| m.into_runnable())
            .map_err(|e| Error::ModelLoad(e.to_string()))?;

        let gpu = try_acquire_accelerator(raw);

        Ok(Self { inner: model, gpu })
    }

    /// Returns whether this network executes on an acquired GPU session.
    #[inline]
    pub fn uses_accelerator(&self) -> bool {
        self.gpu.is_some()
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.inner.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.inner.model().outputs.len()
    }

    /// Returns the concrete tensor shape of the network's first input, if it has one.
    pub fn input_shape(&self) -> Option<&[usize]> {
        let fact = self.inner.model().input_fact(0).ok()?;
        fact.shape.as_concrete()
    }

    /// Returns the concrete tensor shape of the network's first output, if it has one.
    pub fn output_shape(&self) -> Option<&[usize]> {
        let fact = self.inner.model().output_fact(0).ok()?;
        fact.shape.as_concrete()
    }

    fn input_name(&self) -> &str {
        let model = self.inner.model();
        let node = model.input_outlets().unwrap()[0].node;
        &model.node(node).name
    }

    fn output_name(&self) -> &str {
        let model = self.inner.model();
        let node = model.output_outlets().unwrap()[0].node;
        &model.node(node).name
    }

    /// Runs the network on a single `f32` input tensor, returning the first output tensor's
    /// data in row-major order.
    ///
    /// `input` must have exactly as many elements as the network's input shape requires.
    pub fn estimate(&self, input: &[f32]) -> Result<Vec<f32>> {
        match &self.gpu {
            Some(gpu) => {
                let mut inputs = HashMap::new();
                inputs.insert(
                    self.input_name().to_string(),
                    InputTensor::F32(Cow::Borrowed(input)),
                );

                let mut output_map = pollster::block_on(gpu.session.run(&inputs))
                    .map_err(|e| Error::Inference(e.to_string()))?;
                match output_map.remove(self.output_name()) {
                    Some(OutputTensor::F32(data)) => Ok(data),
                    Some(_) => Err(Error::Inference(
                        "GPU session returned a non-f32 output tensor".into(),
                    )),
                    None => Err(Error::Inference(
                        "GPU session did not produce the expected output".into(),
                    )),
                }
            }
            None => {
                let shape = self
                    .input_shape()
                    .ok_or_else(|| Error::Inference("network input shape is symbolic".into()))?
                    .to_vec();
                let tensor = Tensor::from_shape(&shape, input)
                    .map_err(|e| Error::Inference(e.to_string()))?;

                let outputs = self
                    .inner
                    .run(tvec!(tensor.into()))
                    .map_err(|e| Error::Inference(e.to_string()))?;
                let output = outputs
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::Inference("network produced no outputs".into()))?;
                let view = output
                    .to_array_view::<f32>()
                    .map_err(|e| Error::Inference(e.to_string()))?;
                Ok(view.iter().copied().collect())
            }
        }
    }
}
