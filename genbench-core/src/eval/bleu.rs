//! Corpus BLEU with `13a` tokenization.
//!
//! Uniform n-gram weights up to [`MAX_ORDER`], clipped counts, brevity penalty,
//! no smoothing: a corpus with no matching 4-gram scores zero.

use crate::error::BenchError;
use crate::eval::metrics::MetricOutput;
use regex::Regex;
use std::collections::HashMap;

pub const MAX_ORDER: usize = 4;

/// The `13a` tokenizer used by mteval and sacrebleu.
pub struct Tokenizer13a {
    symbols: Regex,
    period_comma_after: Regex,
    period_comma_before: Regex,
    dash_after_digit: Regex,
}

impl Tokenizer13a {
    pub fn new() -> Result<Self, BenchError> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| BenchError::evaluation(format!("bad pattern: {e}")))
        };
        Ok(Self {
            symbols: build(r"([\{-~\[-` -&\(-\+:-@/])")?,
            period_comma_after: build(r"([^0-9])([\.,])")?,
            period_comma_before: build(r"([\.,])([^0-9])")?,
            dash_after_digit: build(r"([0-9])(-)")?,
        })
    }

    pub fn tokenize(&self, line: &str) -> Vec<String> {
        let mut text = line
            .replace("<skipped>", "")
            .replace("-\n", "")
            .replace('\n', " ");
        if text.contains('&') {
            text = text
                .replace("&quot;", "\"")
                .replace("&amp;", "&")
                .replace("&lt;", "<")
                .replace("&gt;", ">");
        }
        let text = format!(" {text} ");
        let text = self.symbols.replace_all(&text, " $1 ");
        let text = self.period_comma_after.replace_all(&text, "$1 $2 ");
        let text = self.period_comma_before.replace_all(&text, " $1 $2");
        let text = self.dash_after_digit.replace_all(&text, "$1 $2 ");
        text.split_whitespace().map(str::to_string).collect()
    }
}

fn ngram_counts(tokens: &[String], max_order: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    for n in 1..=max_order {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Corpus-level BLEU family: `bleu`, `precision_1..N`, `brevity_penalty`,
/// `length_ratio`, `translation_length`, `reference_length`.
pub fn corpus_bleu(
    predictions: &[&str],
    references: &[&str],
    max_order: usize,
) -> Result<MetricOutput, BenchError> {
    let tokenizer = Tokenizer13a::new()?;
    let mut matches = vec![0usize; max_order];
    let mut possible = vec![0usize; max_order];
    let mut translation_length = 0usize;
    let mut reference_length = 0usize;

    for (prediction, reference) in predictions.iter().zip(references) {
        let hyp = tokenizer.tokenize(prediction);
        let refs = tokenizer.tokenize(reference);
        translation_length += hyp.len();
        reference_length += refs.len();

        let ref_counts = ngram_counts(&refs, max_order);
        for (gram, count) in ngram_counts(&hyp, max_order) {
            let clipped = count.min(ref_counts.get(gram).copied().unwrap_or(0));
            matches[gram.len() - 1] += clipped;
        }
        for (n, slot) in possible.iter_mut().enumerate() {
            *slot += hyp.len().saturating_sub(n);
        }
    }

    let precisions: Vec<f64> = matches
        .iter()
        .zip(&possible)
        .map(|(&m, &p)| if p > 0 { m as f64 / p as f64 } else { 0.0 })
        .collect();

    let geo_mean = if precisions.iter().all(|&p| p > 0.0) {
        (precisions.iter().map(|p| p.ln()).sum::<f64>() / max_order as f64).exp()
    } else {
        0.0
    };

    let length_ratio = if reference_length > 0 {
        translation_length as f64 / reference_length as f64
    } else {
        0.0
    };
    let brevity_penalty = if length_ratio > 1.0 {
        1.0
    } else if length_ratio > 0.0 {
        (1.0 - 1.0 / length_ratio).exp()
    } else {
        0.0
    };

    let mut out = MetricOutput::new();
    out.insert("bleu".into(), geo_mean * brevity_penalty);
    for (i, p) in precisions.iter().enumerate() {
        out.insert(format!("precision_{}", i + 1), *p);
    }
    out.insert("brevity_penalty".into(), brevity_penalty);
    out.insert("length_ratio".into(), length_ratio);
    out.insert("translation_length".into(), translation_length as f64);
    out.insert("reference_length".into(), reference_length as f64);
    Ok(out)
}
