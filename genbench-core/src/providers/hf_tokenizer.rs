//! [`TextTokenizer`] backed by a Hugging Face `tokenizer.json`.

use crate::error::BenchError;
use crate::inference::model::TokenBatch;
use crate::inference::tokenizer::{TextTokenizer, TokenizerInput};
use std::path::Path;
use tokenizers::{EncodeInput, PaddingDirection, Tokenizer, TruncationDirection};

/// GPT-style end-of-text token, the last resort for padding when neither a pad
/// token nor the model's end-of-sequence id is known.
pub const DEFAULT_PAD_TOKEN: &str = "<|endoftext|>";

/// Left-padding, right-truncating wrapper around [`tokenizers::Tokenizer`].
pub struct HfTokenizer {
    tokenizer: Tokenizer,
    pad_token: String,
    pad_id: u32,
}

impl HfTokenizer {
    /// Load `tokenizer.json`, dropping any padding or truncation stored in it.
    ///
    /// Padding uses `pad_token` when given, else the token behind the model's
    /// `eos_token_id`, else [`DEFAULT_PAD_TOKEN`].
    pub fn from_file(
        path: &Path,
        pad_token: Option<&str>,
        eos_token_id: Option<u32>,
    ) -> Result<Self, BenchError> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            BenchError::config(format!("Failed to load tokenizer {}: {e}", path.display()))
        })?;
        Self::from_tokenizer(tokenizer, pad_token, eos_token_id)
    }

    pub fn from_tokenizer(
        mut tokenizer: Tokenizer,
        pad_token: Option<&str>,
        eos_token_id: Option<u32>,
    ) -> Result<Self, BenchError> {
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| BenchError::config(format!("Failed to reset truncation: {e}")))?;

        let pad_token = match (pad_token, eos_token_id) {
            (Some(token), _) => token.to_string(),
            (None, Some(id)) => tokenizer.id_to_token(id).ok_or_else(|| {
                BenchError::config(format!("eos token id {id} is not in the vocabulary"))
            })?,
            (None, None) => DEFAULT_PAD_TOKEN.to_string(),
        };
        let pad_id = tokenizer.token_to_id(&pad_token).ok_or_else(|| {
            BenchError::config(format!("pad token '{pad_token}' is not in the vocabulary"))
        })?;
        tracing::debug!(pad_token = %pad_token, pad_id, "Tokenizer loaded");

        Ok(Self {
            tokenizer,
            pad_token,
            pad_id,
        })
    }

}

impl TextTokenizer for HfTokenizer {
    fn encode_batch(
        &self,
        inputs: &[TokenizerInput<'_>],
        max_length: usize,
    ) -> Result<TokenBatch, BenchError> {
        let inputs: Vec<EncodeInput<'_>> = inputs
            .iter()
            .map(|input| match *input {
                TokenizerInput::Single(a) => EncodeInput::from(a),
                TokenizerInput::Pair(a, b) => EncodeInput::from((a, b)),
            })
            .collect();
        let mut encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| BenchError::inference(format!("Tokenization failed: {e}")))?;

        for encoding in &mut encodings {
            encoding.truncate(max_length, 0, TruncationDirection::Right);
        }
        let longest = encodings.iter().map(|e| e.len()).max().unwrap_or(0);
        for encoding in &mut encodings {
            encoding.pad(
                longest,
                self.pad_id,
                0,
                &self.pad_token,
                PaddingDirection::Left,
            );
        }

        Ok(TokenBatch {
            input_ids: encodings.iter().map(|e| e.get_ids().to_vec()).collect(),
            attention_mask: encodings
                .iter()
                .map(|e| e.get_attention_mask().to_vec())
                .collect(),
        })
    }

    fn decode_batch(&self, sequences: &[Vec<u32>]) -> Result<Vec<String>, BenchError> {
        let refs: Vec<&[u32]> = sequences.iter().map(Vec::as_slice).collect();
        self.tokenizer
            .decode_batch(&refs, true)
            .map_err(|e| BenchError::inference(format!("Decoding failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": {"direction": "Left", "max_length": 1, "strategy": "LongestFirst", "stride": 0},
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": "<|endoftext|>", "single_word": false, "lstrip": false,
             "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": null,
        "pre_tokenizer": {"type": "WhitespaceSplit"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"<|endoftext|>": 0, "hello": 1, "world": 2, "again": 3, "[UNK]": 4},
            "unk_token": "[UNK]"
        }
    }"#;

    fn load() -> HfTokenizer {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, TOKENIZER_JSON).unwrap();
        HfTokenizer::from_file(&path, None, None).unwrap()
    }

    fn write_tokenizer(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("tokenizer.json");
        std::fs::write(&path, TOKENIZER_JSON).unwrap();
        path
    }

    #[test]
    fn test_left_padding_to_longest() {
        let tokenizer = load();
        let batch = tokenizer
            .encode_batch(
                &[
                    TokenizerInput::Single("hello"),
                    TokenizerInput::Single("hello world"),
                ],
                8,
            )
            .unwrap();
        assert_eq!(batch.input_ids, vec![vec![0, 1], vec![1, 2]]);
        assert_eq!(batch.attention_mask, vec![vec![0, 1], vec![1, 1]]);
    }

    #[test]
    fn test_truncates_on_the_right() {
        let tokenizer = load();
        let batch = tokenizer
            .encode_batch(&[TokenizerInput::Single("hello world again")], 2)
            .unwrap();
        assert_eq!(batch.input_ids, vec![vec![1, 2]]);
    }

    #[test]
    fn test_decode_skips_padding() {
        let tokenizer = load();
        let out = tokenizer.decode_batch(&[vec![0, 0, 1, 2]]).unwrap();
        assert_eq!(out, vec!["hello world"]);
    }

    #[test]
    fn test_unknown_pad_token_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tokenizer(dir.path());
        assert!(matches!(
            HfTokenizer::from_file(&path, Some("<pad>"), None),
            Err(BenchError::Config(_))
        ));
        assert!(matches!(
            HfTokenizer::from_file(&path, None, Some(99)),
            Err(BenchError::Config(_))
        ));
    }

    #[test]
    fn test_pads_with_model_eos_token() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer = HfTokenizer::from_file(&write_tokenizer(dir.path()), None, Some(3)).unwrap();
        let batch = tokenizer
            .encode_batch(
                &[
                    TokenizerInput::Single("hello"),
                    TokenizerInput::Single("hello world"),
                ],
                8,
            )
            .unwrap();
        assert_eq!(batch.input_ids, vec![vec![3, 1], vec![1, 2]]);
    }

    #[test]
    fn test_explicit_pad_token_wins_over_eos() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer =
            HfTokenizer::from_file(&write_tokenizer(dir.path()), Some("<|endoftext|>"), Some(3))
                .unwrap();
        let batch = tokenizer
            .encode_batch(
                &[TokenizerInput::Single("hello"), TokenizerInput::Single("hello world")],
                8,
            )
            .unwrap();
        assert_eq!(batch.input_ids[0], vec![0, 1]);
    }
}
