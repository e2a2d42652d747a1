//! Decoding options passed to the generation model.

use serde::{Deserialize, Serialize};

/// Named decoding options. Unset fields fall back to the model's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_repeat_ngram_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_beams: Option<usize>,
}

impl GenerationParameters {
    /// Options for whole-dataset runs. Long unattended decoding degenerates into
    /// repeats without a penalty and an n-gram block.
    pub fn dataset_default() -> Self {
        Self {
            repetition_penalty: Some(2.0),
            no_repeat_ngram_size: Some(8),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_default_differs_from_sample_default() {
        let dataset = GenerationParameters::dataset_default();
        assert_ne!(dataset, GenerationParameters::default());
        assert_eq!(dataset.repetition_penalty, Some(2.0));
        assert_eq!(dataset.no_repeat_ngram_size, Some(8));
    }

    #[test]
    fn test_unset_fields_are_not_serialized() {
        let json = serde_json::to_value(GenerationParameters::dataset_default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"repetition_penalty": 2.0, "no_repeat_ngram_size": 8})
        );
        assert!(GenerationParameters::default().is_empty());
    }
}
