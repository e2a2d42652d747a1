//! Batched generation over a dataset frame.

use crate::data::batch::BatchSource;
use crate::data::frame::{DatasetFrame, Sample};
use crate::error::BenchError;
use crate::inference::model::{GenerationModel, ModelConfig, NoGradGuard, TokenBatch};
use crate::inference::params::GenerationParameters;
use crate::inference::predictions::PredictionTable;
use crate::inference::report::ModelReport;
use crate::inference::tokenizer::{TextTokenizer, TokenizerInput};
use crate::timing::report_time;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compute device requested from the model provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
    Mps,
}

impl FromStr for Device {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "mps" => Ok(Device::Mps),
            "cuda" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|n| n.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| BenchError::config(format!("unknown device '{s}'"))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(n) => write!(f, "cuda:{n}"),
            Device::Mps => write!(f, "mps"),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = BenchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

/// Fixed settings of one engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Prompt truncation length and generation length limit.
    pub max_length: usize,
    pub batch_size: usize,
    pub device: Device,
    /// Decoding options for [`InferenceEngine::infer_dataset`].
    pub dataset_params: GenerationParameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_length: 120,
            batch_size: 64,
            device: Device::Cpu,
            dataset_params: GenerationParameters::dataset_default(),
        }
    }
}

impl EngineConfig {
    pub fn from_bench_config(config: &crate::config::BenchConfig) -> Self {
        Self {
            max_length: config.inference.max_length,
            batch_size: config.inference.batch_size,
            device: config.model.device,
            dataset_params: config.inference.dataset_params.clone(),
        }
    }
}

/// Runs one model and tokenizer over single samples or a whole frame.
pub struct InferenceEngine {
    model: Option<Box<dyn GenerationModel>>,
    tokenizer: Box<dyn TextTokenizer>,
    dataset: DatasetFrame,
    config: EngineConfig,
}

impl InferenceEngine {
    pub fn new(
        model: Box<dyn GenerationModel>,
        tokenizer: Box<dyn TextTokenizer>,
        dataset: DatasetFrame,
        config: EngineConfig,
    ) -> Self {
        tracing::info!(
            model = %model.config().model_id,
            device = %config.device,
            batch_size = config.batch_size,
            max_length = config.max_length,
            "Inference engine ready"
        );
        Self {
            model: Some(model),
            tokenizer,
            dataset,
            config,
        }
    }

    /// Engine with no model bound; sample calls yield `None`.
    pub fn without_model(
        tokenizer: Box<dyn TextTokenizer>,
        dataset: DatasetFrame,
        config: EngineConfig,
    ) -> Self {
        tracing::warn!("Inference engine started without a model");
        Self {
            model: None,
            tokenizer,
            dataset,
            config,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_config(&self) -> Option<&ModelConfig> {
        self.model.as_ref().map(|m| m.config())
    }

    pub fn dataset(&self) -> &DatasetFrame {
        &self.dataset
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Probe the model with an all-ones batch of
    /// `[batch_size, max_position_embeddings]` under a no-grad scope.
    pub fn analyze_model(&mut self) -> Result<Option<ModelReport>, BenchError> {
        let Some(model) = self.model.as_deref_mut() else {
            return Ok(None);
        };
        let guard = NoGradGuard::new(model);
        let config = guard.config().clone();
        let probe = TokenBatch::ones(self.config.batch_size, config.max_position_embeddings);
        let parameters = guard.parameters()?;
        let output = guard.forward(&probe)?;
        let report = ModelReport::build(&config, &parameters, &probe, output);
        tracing::info!(
            model = %config.model_id,
            params = report.num_trainable_params,
            bytes = report.size,
            "Model analyzed"
        );
        Ok(Some(report))
    }

    /// Generate for one sample; `None` when no model is bound.
    pub fn infer_sample(
        &mut self,
        sample: &Sample,
        params: Option<&GenerationParameters>,
    ) -> Result<Option<String>, BenchError> {
        if self.model.is_none() {
            return Ok(None);
        }
        let default_params = GenerationParameters::default();
        let params = params.unwrap_or(&default_params);
        let mut predictions = self.infer_batch(std::slice::from_ref(sample), params)?;
        Ok(predictions.pop())
    }

    /// Generate for every frame record, in order. Any failed batch aborts the run.
    pub fn infer_dataset(&mut self) -> Result<PredictionTable, BenchError> {
        report_time("infer_dataset", || -> Result<PredictionTable, BenchError> {
            let model = self
                .model
                .as_deref_mut()
                .ok_or_else(|| BenchError::inference("no model loaded"))?;
            let source = BatchSource::new(&self.dataset, self.config.batch_size)?;
            let total = source.len();

            let mut predictions = Vec::with_capacity(self.dataset.len());
            for (i, batch) in source.batches().enumerate() {
                let samples = batch.samples();
                let out = generate_batch(
                    model,
                    &*self.tokenizer,
                    self.config.max_length,
                    &samples,
                    &self.config.dataset_params,
                )?;
                tracing::debug!(batch = i + 1, total, offset = batch.offset, "Batch done");
                predictions.extend(out);
            }

            tracing::info!(rows = predictions.len(), batches = total, "Dataset inference finished");
            PredictionTable::from_columns(self.dataset.targets(), predictions)
        })
    }

    /// Generate for one batch; `result[i]` belongs to `samples[i]`.
    pub fn infer_batch(
        &mut self,
        samples: &[Sample],
        params: &GenerationParameters,
    ) -> Result<Vec<String>, BenchError> {
        let model = self
            .model
            .as_deref_mut()
            .ok_or_else(|| BenchError::inference("no model loaded"))?;
        generate_batch(model, &*self.tokenizer, self.config.max_length, samples, params)
    }
}

fn generate_batch(
    model: &mut dyn GenerationModel,
    tokenizer: &dyn TextTokenizer,
    max_length: usize,
    samples: &[Sample],
    params: &GenerationParameters,
) -> Result<Vec<String>, BenchError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    let inputs: Vec<TokenizerInput<'_>> = samples.iter().map(TokenizerInput::from).collect();
    let encoded = tokenizer.encode_batch(&inputs, max_length)?;
    // The text the model saw, after pairing and truncation.
    let prompts = tokenizer.decode_batch(&encoded.input_ids)?;

    let sequences = {
        let guard = NoGradGuard::new(model);
        guard.generate(&encoded, max_length, params)?
    };
    if sequences.len() != samples.len() {
        return Err(BenchError::inference(format!(
            "model returned {} sequences for {} prompts",
            sequences.len(),
            samples.len()
        )));
    }

    let decoded = tokenizer.decode_batch(&sequences)?;
    if decoded.len() != samples.len() {
        return Err(BenchError::inference(format!(
            "tokenizer decoded {} strings for {} sequences",
            decoded.len(),
            sequences.len()
        )));
    }

    Ok(decoded
        .into_iter()
        .zip(prompts.iter().zip(samples))
        .map(|(text, (prompt, sample))| strip_echo(text, prompt, sample))
        .collect())
}

/// Drop the echoed prompt and its `"\n"` separator. The decoded prompt row is
/// tried first, then `input_1` on its own.
fn strip_echo(text: String, prompt: &str, sample: &Sample) -> String {
    let echoed = format!("{prompt}\n");
    let first = format!("{}\n", sample.first());
    match text
        .strip_prefix(&echoed)
        .or_else(|| text.strip_prefix(&first))
    {
        Some(rest) => rest.to_string(),
        None => text,
    }
}
