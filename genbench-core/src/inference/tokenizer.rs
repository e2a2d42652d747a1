//! Tokenizer contract.

use crate::data::frame::Sample;
use crate::error::BenchError;
use crate::inference::model::TokenBatch;

/// Text handed to the tokenizer for one batch row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerInput<'a> {
    Single(&'a str),
    Pair(&'a str, &'a str),
}

impl<'a> From<&'a Sample> for TokenizerInput<'a> {
    fn from(sample: &'a Sample) -> Self {
        match sample {
            Sample::Single(a) => TokenizerInput::Single(a),
            Sample::Pair(a, b) => TokenizerInput::Pair(a, b),
        }
    }
}

/// Batch encoder/decoder paired with a [`GenerationModel`](super::GenerationModel).
pub trait TextTokenizer: Send {
    /// Encode all inputs together: each row truncated to `max_length`, the batch
    /// left-padded to its longest row.
    fn encode_batch(
        &self,
        inputs: &[TokenizerInput<'_>],
        max_length: usize,
    ) -> Result<TokenBatch, BenchError>;

    /// Decode each sequence, skipping special and padding tokens.
    fn decode_batch(&self, sequences: &[Vec<u32>]) -> Result<Vec<String>, BenchError>;
}
