use ndarray::Array4;
use std::sync::{Mutex, PoisonError};
use tch::{CModule, Device, Kind, Tensor};

use crate::config::{ModelConfig, OutputKind};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Cannot identify image file: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("Expected {expected} class scores, model returned {actual}")]
    OutputShape { expected: usize, actual: usize },
    #[error("Model returned non-finite scores")]
    NonFinite,
    #[error("No info entry for class {0}")]
    MissingInfo(String),
}

/// A loaded model that maps a preprocessed batch to one score per class.
pub trait Classifier: Send + Sync {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// TorchScript export of the scan classifier.
///
/// Forward passes are serialized through the mutex; TorchScript modules make
/// no promise about concurrent `forward` calls.
pub struct TorchClassifier {
    module: Mutex<CModule>,
    device: Device,
    output: OutputKind,
}

impl TorchClassifier {
    pub fn load(config: &ModelConfig) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(&config.path, device)?;
        Ok(Self::from_module(module, device, config.output))
    }

    fn from_module(mut module: CModule, device: Device, output: OutputKind) -> Self {
        module.set_eval();
        Self {
            module: Mutex::new(module),
            device,
            output,
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl Classifier for TorchClassifier {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let (n, h, w, c) = input.dim();
        let data = input.as_slice().ok_or_else(|| {
            InferenceError::Preprocessing("input tensor is not contiguous".to_string())
        })?;
        let tensor = Tensor::from_slice(data)
            .view([n as i64, h as i64, w as i64, c as i64])
            .to_device(self.device);

        let output = {
            // read-only after load
            let module = self.module.lock().unwrap_or_else(PoisonError::into_inner);
            tch::no_grad(|| module.forward_ts(&[tensor]))?
        };

        let mut output = output.to_kind(Kind::Float).view([-1]);
        if self.output == OutputKind::Logits {
            output = output.softmax(-1, Kind::Float);
        }
        let scores = Vec::<f32>::try_from(&output.to_device(Device::Cpu))?;
        Ok(scores)
    }
}
