//! In-memory model and tokenizer fakes.
//!
//! `CharTokenizer` maps every character to one token id, and `EchoModel` replays
//! its prompt followed by `"\n"` and a reply, the way causal checkpoints do.
//! Both refuse to work in states the real pipeline must never reach (generation
//! with gradients on, ragged batches), so tests built on them check those
//! invariants for free.

use crate::data::frame::Sample;
use crate::error::BenchError;
use crate::inference::model::{
    ForwardOutput, GenerationModel, ModelConfig, ParameterInfo, TokenBatch,
};
use crate::inference::params::GenerationParameters;
use crate::inference::tokenizer::{TextTokenizer, TokenizerInput};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PAD_ID: u32 = 0;
pub const SEP_ID: u32 = 1;
const OFFSET: u32 = 2;

fn encode_text(text: &str) -> Vec<u32> {
    text.chars().map(|c| c as u32 + OFFSET).collect()
}

fn decode_ids(ids: &[u32]) -> String {
    ids.iter()
        .filter(|&&id| id >= OFFSET)
        .filter_map(|&id| char::from_u32(id - OFFSET))
        .collect()
}

/// Shared log of the samples each `encode_batch` call received.
pub type InputLog = Arc<Mutex<Vec<Vec<Sample>>>>;

/// One token per character; pairs are joined with a separator token.
#[derive(Debug, Default)]
pub struct CharTokenizer {
    log: InputLog,
}

impl CharTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the input log that outlives a move into the engine.
    pub fn log(&self) -> InputLog {
        Arc::clone(&self.log)
    }
}

impl TextTokenizer for CharTokenizer {
    fn encode_batch(
        &self,
        inputs: &[TokenizerInput<'_>],
        max_length: usize,
    ) -> Result<TokenBatch, BenchError> {
        let mut rows: Vec<Vec<u32>> = inputs
            .iter()
            .map(|input| {
                let mut ids = match input {
                    TokenizerInput::Single(a) => encode_text(a),
                    TokenizerInput::Pair(a, b) => {
                        let mut ids = encode_text(a);
                        ids.push(SEP_ID);
                        ids.extend(encode_text(b));
                        ids
                    }
                };
                ids.truncate(max_length);
                ids
            })
            .collect();

        let longest = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut attention_mask = Vec::with_capacity(rows.len());
        for row in &mut rows {
            let pad = longest - row.len();
            let mut mask = vec![0; pad];
            mask.extend(std::iter::repeat_n(1, row.len()));
            row.splice(0..0, std::iter::repeat_n(PAD_ID, pad));
            attention_mask.push(mask);
        }

        if let Ok(mut log) = self.log.lock() {
            log.push(
                inputs
                    .iter()
                    .map(|input| match input {
                        TokenizerInput::Single(a) => Sample::Single(a.to_string()),
                        TokenizerInput::Pair(a, b) => Sample::Pair(a.to_string(), b.to_string()),
                    })
                    .collect(),
            );
        }

        Ok(TokenBatch {
            input_ids: rows,
            attention_mask,
        })
    }

    fn decode_batch(&self, sequences: &[Vec<u32>]) -> Result<Vec<String>, BenchError> {
        Ok(sequences.iter().map(|ids| decode_ids(ids)).collect())
    }
}

type ReplyFn = Box<dyn Fn(&str) -> String + Send>;

/// Echoes each prompt row, then `"\n"` and a reply computed from the prompt text.
pub struct EchoModel {
    config: ModelConfig,
    reply: ReplyFn,
    echo: bool,
    grad_enabled: bool,
    /// Generation calls that succeed before every further call fails.
    fail_after: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl EchoModel {
    /// Always replies with `reply`.
    pub fn new(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::with_reply(move |_| reply.clone())
    }

    pub fn with_reply(reply: impl Fn(&str) -> String + Send + 'static) -> Self {
        Self {
            config: ModelConfig {
                model_id: "echo".to_string(),
                vocab_size: 1024,
                hidden_size: 64,
                max_position_embeddings: 32,
                max_length: 128,
                id2label: BTreeMap::new(),
                eos_token_id: Some(SEP_ID),
            },
            reply: Box::new(reply),
            echo: true,
            grad_enabled: true,
            fail_after: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replies with the prompt upper-cased, which makes row order observable.
    pub fn uppercase() -> Self {
        Self::with_reply(|prompt| prompt.to_uppercase())
    }

    pub fn failing() -> Self {
        Self::new("").fail_after(0)
    }

    /// Return only the reply, as classification heads do.
    pub fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn with_labels(mut self, labels: &[(&str, &str)]) -> Self {
        self.config.id2label = labels
            .iter()
            .map(|(id, label)| (id.to_string(), label.to_string()))
            .collect();
        self
    }

    /// Counter of `generate` calls, shared with clones of the handle.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn check_inference_mode(&self, batch: &TokenBatch) -> Result<(), BenchError> {
        if self.grad_enabled {
            return Err(BenchError::inference("gradient tracking is enabled"));
        }
        if !batch.is_rectangular() {
            return Err(BenchError::inference("ragged batch"));
        }
        Ok(())
    }
}

impl GenerationModel for EchoModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn parameters(&self) -> Result<Vec<ParameterInfo>, BenchError> {
        let c = &self.config;
        Ok(vec![
            ParameterInfo {
                name: "wte.weight".into(),
                numel: (c.vocab_size * c.hidden_size) as u64,
                element_size: 4,
                trainable: true,
            },
            ParameterInfo {
                name: "wpe.weight".into(),
                numel: (c.max_position_embeddings * c.hidden_size) as u64,
                element_size: 4,
                trainable: true,
            },
            ParameterInfo {
                name: "attn.bias".into(),
                numel: (c.max_position_embeddings * c.max_position_embeddings) as u64,
                element_size: 1,
                trainable: false,
            },
        ])
    }

    fn forward(&self, batch: &TokenBatch) -> Result<ForwardOutput, BenchError> {
        self.check_inference_mode(batch)?;
        let [rows, cols] = batch.shape();
        Ok(ForwardOutput {
            output_shape: vec![rows, cols, self.config.vocab_size],
        })
    }

    fn generate(
        &self,
        batch: &TokenBatch,
        max_length: usize,
        _params: &GenerationParameters,
    ) -> Result<Vec<Vec<u32>>, BenchError> {
        self.check_inference_mode(batch)?;
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(BenchError::inference("generation failed"));
        }

        Ok(batch
            .input_ids
            .iter()
            .map(|row| {
                let prompt = decode_ids(row);
                let mut seq = Vec::new();
                if self.echo {
                    seq.extend_from_slice(row);
                    seq.extend(encode_text("\n"));
                }
                seq.extend(encode_text(&(self.reply)(&prompt)));
                seq.push(SEP_ID);
                seq.truncate(max_length.max(row.len()));
                seq
            })
            .collect())
    }

    fn grad_enabled(&self) -> bool {
        self.grad_enabled
    }

    fn set_grad_enabled(&mut self, enabled: bool) {
        self.grad_enabled = enabled;
    }
}
