//! Label-style metrics over whole predictions.

use crate::eval::metrics::stable_mean;
use std::collections::BTreeSet;

/// Fraction of rows whose trimmed prediction equals the trimmed reference.
pub fn accuracy(predictions: &[&str], references: &[&str]) -> f64 {
    stable_mean(
        predictions
            .iter()
            .zip(references)
            .map(|(p, r)| if p.trim() == r.trim() { 1.0 } else { 0.0 }),
    )
}

/// Unweighted mean of per-label F1 over every label seen on either side.
pub fn macro_f1(predictions: &[&str], references: &[&str]) -> f64 {
    let labels: BTreeSet<&str> = predictions
        .iter()
        .chain(references)
        .map(|s| s.trim())
        .collect();

    stable_mean(labels.iter().map(|label| {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (p, r) in predictions.iter().zip(references) {
            match (p.trim() == *label, r.trim() == *label) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }
        let denom = 2 * tp + fp + fn_;
        if denom == 0 {
            0.0
        } else {
            2.0 * tp as f64 / denom as f64
        }
    }))
}

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize_answer(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn exact_match(predictions: &[&str], references: &[&str]) -> f64 {
    stable_mean(predictions.iter().zip(references).map(|(p, r)| {
        if normalize_answer(p) == normalize_answer(r) {
            1.0
        } else {
            0.0
        }
    }))
}
