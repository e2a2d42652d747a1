//! Metric catalog and dispatch.

use crate::error::BenchError;
use crate::eval::{bleu, classification, rouge};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named sub-scores a metric produces in one call.
pub type MetricOutput = BTreeMap<String, f64>;

/// A supported scoring function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Bleu,
    Rouge,
    Accuracy,
    F1,
    ExactMatch,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Bleu,
        Metric::Rouge,
        Metric::Accuracy,
        Metric::F1,
        Metric::ExactMatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Bleu => "bleu",
            Metric::Rouge => "rouge",
            Metric::Accuracy => "accuracy",
            Metric::F1 => "f1",
            Metric::ExactMatch => "exact_match",
        }
    }

    /// The family member reported as this metric's single score.
    pub fn canonical_key(&self) -> &'static str {
        match self {
            Metric::Rouge => "rougeL",
            other => other.name(),
        }
    }

    /// Score all predictions against their references.
    pub fn compute(
        &self,
        predictions: &[&str],
        references: &[&str],
    ) -> Result<MetricOutput, BenchError> {
        if predictions.len() != references.len() {
            return Err(BenchError::evaluation(format!(
                "{} predictions for {} references",
                predictions.len(),
                references.len()
            )));
        }
        match self {
            Metric::Bleu => bleu::corpus_bleu(predictions, references, bleu::MAX_ORDER),
            Metric::Rouge => Ok(rouge::rouge_scores(predictions, references)),
            Metric::Accuracy => Ok(single(self, classification::accuracy(predictions, references))),
            Metric::F1 => Ok(single(self, classification::macro_f1(predictions, references))),
            Metric::ExactMatch => Ok(single(
                self,
                classification::exact_match(predictions, references),
            )),
        }
    }

    /// Pick the canonical member out of a metric family.
    pub fn select(&self, output: &MetricOutput) -> Result<f64, BenchError> {
        output.get(self.canonical_key()).copied().ok_or_else(|| {
            BenchError::evaluation(format!(
                "metric '{}' produced no '{}' score",
                self.name(),
                self.canonical_key()
            ))
        })
    }
}

fn single(metric: &Metric, value: f64) -> MetricOutput {
    MetricOutput::from([(metric.name().to_string(), value)])
}

impl FromStr for Metric {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| BenchError::evaluation(format!("unknown metric '{s}'")))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mean with Neumaier compensated summation; `0.0` for no values.
pub fn stable_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    let mut count = 0usize;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        (sum + compensation) / count as f64
    }
}
