//! # genbench-core: benchmark inference and evaluation for causal language models
//!
//! A run moves a raw benchmark split through four stages:
//!
//! 1. **Data**: import a raw table, profile it, map it onto canonical roles
//!    (`input_1`, optional `input_2`, `target`) and batch it.
//! 2. **Inference**: feed each batch through an injected [`GenerationModel`] and
//!    [`TextTokenizer`] and collect predictions in frame order.
//! 3. **Persistence**: write a `target,predictions` table atomically.
//! 4. **Evaluation**: score the table with BLEU, ROUGE and label metrics.
//!
//! The core is synchronous and holds no locks.

pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod inference;
pub mod pipeline;
pub mod providers;
pub mod testing;
pub mod timing;

pub use config::{BenchConfig, load_config};
pub use data::{DatasetFrame, RawDataImporter, RawTable, Sample, TaskSchema};
pub use error::BenchError;
pub use eval::{Evaluator, Metric, MetricResult};
pub use inference::{
    Device, EngineConfig, GenerationModel, GenerationParameters, InferenceEngine, ModelReport,
    PredictionTable, TextTokenizer,
};
pub use pipeline::{EvaluationRun, PreparedDataset, RunReport, prepare_dataset};
pub use providers::{HfTokenizer, RemoteModel};
