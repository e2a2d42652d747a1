//! Structural summary of a loaded model.

use crate::inference::model::{ForwardOutput, ModelConfig, ParameterInfo, TokenBatch};
use serde::{Deserialize, Serialize};

/// Shapes of the synthetic probe input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub attention_mask: [usize; 2],
    pub input_ids: [usize; 2],
}

/// Result of [`InferenceEngine::analyze_model`](super::InferenceEngine::analyze_model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReport {
    pub input_shape: InputShape,
    pub embedding_size: usize,
    pub output_shape: Vec<usize>,
    pub num_trainable_params: u64,
    pub vocab_size: usize,
    /// Total parameter memory in bytes.
    pub size: u64,
    pub max_context_length: usize,
}

impl ModelReport {
    pub fn build(
        config: &ModelConfig,
        parameters: &[ParameterInfo],
        probe: &TokenBatch,
        output: ForwardOutput,
    ) -> Self {
        let shape = probe.shape();
        Self {
            input_shape: InputShape {
                attention_mask: [probe.attention_mask.len(), shape[1]],
                input_ids: shape,
            },
            embedding_size: config.hidden_size,
            output_shape: output.output_shape,
            num_trainable_params: parameters
                .iter()
                .filter(|p| p.trainable)
                .map(|p| p.numel)
                .sum(),
            vocab_size: config.vocab_size,
            size: parameters.iter().map(ParameterInfo::bytes).sum(),
            max_context_length: config.max_length,
        }
    }
}
