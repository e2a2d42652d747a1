//! Evaluation: metric implementations and the prediction-table evaluator.

pub mod bleu;
pub mod classification;
pub mod evaluator;
pub mod metrics;
pub mod rouge;

pub use evaluator::{Evaluator, MetricResult};
pub use metrics::{Metric, MetricOutput, stable_mean};
