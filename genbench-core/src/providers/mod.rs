//! Concrete model and tokenizer providers.

pub mod hf_tokenizer;
pub mod remote_model;

pub use hf_tokenizer::HfTokenizer;
pub use remote_model::RemoteModel;
