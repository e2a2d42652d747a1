//! Configuration system for genbench.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! explicit config file -> environment -> CLI overrides. The user-level file lives
//! at `~/.config/genbench/config.toml` (platform equivalent via `directories`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::schema::TaskSchema;
use crate::inference::engine::Device;
use crate::inference::params::GenerationParameters;

/// Top-level configuration for a benchmark run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default = "TaskSchema::open_qa")]
    pub task: TaskSchema,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the raw benchmark table comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset identifier, used as a sub-directory of `data_dir`.
    pub name: String,
    /// Split designation, e.g. `validation`.
    pub split: String,
    pub data_dir: PathBuf,
    /// Explicit file path; wins over `data_dir/name/split`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: "truthful_qa".to_string(),
            split: "validation".to_string(),
            data_dir: PathBuf::from("data"),
            path: None,
        }
    }
}

impl DatasetConfig {
    /// Resolve the file holding the configured split.
    ///
    /// Prefers `<split>.jsonl` and falls back to `<split>.csv` when only the
    /// CSV export exists.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        let base = self.data_dir.join(&self.name);
        let jsonl = base.join(format!("{}.jsonl", self.split));
        let csv = base.join(format!("{}.csv", self.split));
        if !jsonl.exists() && csv.exists() {
            csv
        } else {
            jsonl
        }
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    /// Base URL of the generation server. No model is bound when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub tokenizer_path: PathBuf,
    /// Token used for left padding; defaults to the model's end-of-sequence token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_token: Option<String>,
    pub device: Device,
    pub request_timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            tokenizer_path: PathBuf::from("tokenizer.json"),
            pad_token: None,
            device: Device::Cpu,
            request_timeout_secs: 600,
        }
    }
}

/// Batching and decoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub batch_size: usize,
    pub max_length: usize,
    /// Decoding options for single-sample inference.
    #[serde(default)]
    pub sample_params: GenerationParameters,
    /// Decoding options for whole-dataset inference.
    #[serde(default = "GenerationParameters::dataset_default")]
    pub dataset_params: GenerationParameters,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            max_length: 120,
            sample_params: GenerationParameters::default(),
            dataset_params: GenerationParameters::dataset_default(),
        }
    }
}

/// Scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub metrics: Vec<String>,
    pub predictions_path: PathBuf,
    /// Fail instead of skipping unrecognized metric names.
    pub strict_metrics: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            metrics: vec!["bleu".to_string(), "rouge".to_string()],
            predictions_path: PathBuf::from("dist/predictions.csv"),
            strict_metrics: false,
        }
    }
}

/// HTTP front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Path of the user-level configuration file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "genbench", "genbench")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration with layered merging.
pub fn load_config(
    config_file: Option<&Path>,
    overrides: Option<&BenchConfig>,
) -> Result<BenchConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(BenchConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }

    // GENBENCH_INFERENCE__BATCH_SIZE, GENBENCH_MODEL__ENDPOINT, ...
    figment = figment.merge(Env::prefixed("GENBENCH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
