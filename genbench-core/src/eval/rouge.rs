//! ROUGE-1, ROUGE-2 and ROUGE-L F-measures.

use crate::eval::metrics::{MetricOutput, stable_mean};
use std::collections::HashMap;

/// Lowercase and split on anything that is not alphanumeric.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn f_measure(overlap: usize, predicted: usize, reference: usize) -> f64 {
    if overlap == 0 || predicted == 0 || reference == 0 {
        return 0.0;
    }
    let precision = overlap as f64 / predicted as f64;
    let recall = overlap as f64 / reference as f64;
    2.0 * precision * recall / (precision + recall)
}

fn ngrams(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// ROUGE-N F-measure for one pair.
pub fn rouge_n(prediction: &[String], reference: &[String], n: usize) -> f64 {
    let hyp = ngrams(prediction, n);
    let refs = ngrams(reference, n);
    let overlap: usize = hyp
        .iter()
        .map(|(gram, count)| (*count).min(refs.get(gram).copied().unwrap_or(0)))
        .sum();
    f_measure(overlap, hyp.values().sum(), refs.values().sum())
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for x in a {
        let mut diagonal = 0;
        for (j, y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// ROUGE-L F-measure for one pair.
pub fn rouge_l(prediction: &[String], reference: &[String]) -> f64 {
    f_measure(
        lcs_len(prediction, reference),
        prediction.len(),
        reference.len(),
    )
}

/// Per-row F-measures averaged over the corpus.
pub fn rouge_scores(predictions: &[&str], references: &[&str]) -> MetricOutput {
    let pairs: Vec<(Vec<String>, Vec<String>)> = predictions
        .iter()
        .zip(references)
        .map(|(p, r)| (tokenize(p), tokenize(r)))
        .collect();

    MetricOutput::from([
        (
            "rouge1".to_string(),
            stable_mean(pairs.iter().map(|(p, r)| rouge_n(p, r, 1))),
        ),
        (
            "rouge2".to_string(),
            stable_mean(pairs.iter().map(|(p, r)| rouge_n(p, r, 2))),
        ),
        (
            "rougeL".to_string(),
            stable_mean(pairs.iter().map(|(p, r)| rouge_l(p, r))),
        ),
    ])
}
