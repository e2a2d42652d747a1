//! Inference: model and tokenizer contracts, the batch engine, and its outputs.

pub mod engine;
pub mod model;
pub mod params;
pub mod predictions;
pub mod report;
pub mod tokenizer;

pub use engine::{Device, EngineConfig, InferenceEngine};
pub use model::{ForwardOutput, GenerationModel, ModelConfig, NoGradGuard, ParameterInfo, TokenBatch};
pub use params::GenerationParameters;
pub use predictions::{PredictionRow, PredictionTable};
pub use report::{InputShape, ModelReport};
pub use tokenizer::{TextTokenizer, TokenizerInput};
