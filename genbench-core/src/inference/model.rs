//! Generation model contract.
//!
//! Weight loading lives outside this crate. The engine only needs a handle that
//! can run a forward pass, generate continuations over token ids, and describe
//! itself through [`ModelConfig`] and [`ParameterInfo`].

use crate::error::BenchError;
use crate::inference::params::GenerationParameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// Token ids and attention mask for a padded batch, row-major `[batch, seq]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBatch {
    pub input_ids: Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u32>>,
}

impl TokenBatch {
    /// Batch where every id and mask entry is 1.
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self {
            input_ids: vec![vec![1; cols]; rows],
            attention_mask: vec![vec![1; cols]; rows],
        }
    }

    /// `[rows, cols]`; `cols` is the padded sequence length.
    pub fn shape(&self) -> [usize; 2] {
        let cols = self.input_ids.first().map_or(0, Vec::len);
        [self.input_ids.len(), cols]
    }

    /// Every row has the same length and a matching mask row.
    pub fn is_rectangular(&self) -> bool {
        let [rows, cols] = self.shape();
        self.attention_mask.len() == rows
            && self.input_ids.iter().all(|r| r.len() == cols)
            && self.attention_mask.iter().all(|r| r.len() == cols)
    }
}

/// Architecture description published by the model provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_id: String,
    pub vocab_size: usize,
    /// Embedding width.
    pub hidden_size: usize,
    pub max_position_embeddings: usize,
    /// Longest sequence `generate` produces by default.
    pub max_length: usize,
    /// Class-id to label mapping for classification heads.
    #[serde(default)]
    pub id2label: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eos_token_id: Option<u32>,
}

/// One named weight tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub numel: u64,
    /// Bytes per element of the stored dtype.
    pub element_size: u64,
    pub trainable: bool,
}

impl ParameterInfo {
    pub fn bytes(&self) -> u64 {
        self.numel * self.element_size
    }
}

/// Result of a forward pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardOutput {
    /// Shape of the logits tensor, typically `[batch, seq, vocab]`.
    pub output_shape: Vec<usize>,
}

/// A loaded causal generation model.
pub trait GenerationModel: Send {
    fn config(&self) -> &ModelConfig;

    fn parameters(&self) -> Result<Vec<ParameterInfo>, BenchError>;

    /// Run one forward pass without sampling.
    fn forward(&self, batch: &TokenBatch) -> Result<ForwardOutput, BenchError>;

    /// Generate continuations. Each returned sequence starts with its prompt row,
    /// padding included, as causal models echo their input.
    fn generate(
        &self,
        batch: &TokenBatch,
        max_length: usize,
        params: &GenerationParameters,
    ) -> Result<Vec<Vec<u32>>, BenchError>;

    fn grad_enabled(&self) -> bool;

    fn set_grad_enabled(&mut self, enabled: bool);
}

/// Disables gradient tracking for its lifetime and restores the previous state
/// on drop, including when the guarded call fails.
pub struct NoGradGuard<'a> {
    model: &'a mut dyn GenerationModel,
    previous: bool,
}

impl<'a> NoGradGuard<'a> {
    pub fn new(model: &'a mut dyn GenerationModel) -> Self {
        let previous = model.grad_enabled();
        model.set_grad_enabled(false);
        Self { model, previous }
    }
}

impl<'a> Deref for NoGradGuard<'a> {
    type Target = dyn GenerationModel + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.model
    }
}

impl Drop for NoGradGuard<'_> {
    fn drop(&mut self) {
        self.model.set_grad_enabled(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EchoModel;

    #[test]
    fn test_token_batch_shape() {
        let batch = TokenBatch::ones(2, 5);
        assert_eq!(batch.shape(), [2, 5]);
        assert!(batch.is_rectangular());
        assert_eq!(TokenBatch::default().shape(), [0, 0]);
    }

    #[test]
    fn test_ragged_batch_detected() {
        let batch = TokenBatch {
            input_ids: vec![vec![1, 2], vec![3]],
            attention_mask: vec![vec![1, 1], vec![1]],
        };
        assert!(!batch.is_rectangular());
    }

    #[test]
    fn test_guard_disables_and_restores() {
        let mut model = EchoModel::new("ok");
        model.set_grad_enabled(true);
        {
            let guard = NoGradGuard::new(&mut model);
            assert!(!guard.grad_enabled());
        }
        assert!(model.grad_enabled());
    }

    #[test]
    fn test_guard_restores_after_failure() {
        let mut model = EchoModel::failing();
        model.set_grad_enabled(true);
        let result = {
            let guard = NoGradGuard::new(&mut model);
            guard.generate(&TokenBatch::ones(1, 2), 8, &GenerationParameters::default())
        };
        assert!(result.is_err());
        assert!(model.grad_enabled());
    }

    #[test]
    fn test_parameter_bytes() {
        let p = ParameterInfo {
            name: "wte".into(),
            numel: 10,
            element_size: 4,
            trainable: true,
        };
        assert_eq!(p.bytes(), 40);
    }
}
