//! Scores a persisted prediction table.

use crate::error::BenchError;
use crate::eval::metrics::Metric;
use crate::inference::predictions::PredictionTable;
use crate::timing::report_time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One scalar per recognized metric, plus the names that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub unrecognized: Vec<String>,
}

impl MetricResult {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.scores.get(metric).copied()
    }
}

/// Runs a fixed set of metrics over the prediction file at `path`.
#[derive(Debug, Clone)]
pub struct Evaluator {
    path: PathBuf,
    metrics: Vec<Metric>,
    unrecognized: Vec<String>,
}

impl Evaluator {
    pub fn new(path: impl Into<PathBuf>, metrics: Vec<Metric>) -> Self {
        Self {
            path: path.into(),
            metrics,
            unrecognized: Vec::new(),
        }
    }

    /// Resolve metric names. Unknown names are skipped and reported, or rejected
    /// when `strict` is set. Repeated names are scored once.
    pub fn from_names(
        path: impl Into<PathBuf>,
        names: &[String],
        strict: bool,
    ) -> Result<Self, BenchError> {
        let mut metrics = Vec::new();
        let mut unrecognized = Vec::new();
        for name in names {
            match name.parse::<Metric>() {
                Ok(metric) if !metrics.contains(&metric) => metrics.push(metric),
                Ok(_) => {}
                Err(e) if strict => return Err(e),
                Err(_) => {
                    tracing::warn!(metric = %name, "Unrecognized metric skipped");
                    unrecognized.push(name.clone());
                }
            }
        }
        Ok(Self {
            path: path.into(),
            metrics,
            unrecognized,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Load the table and compute every metric; any failure yields no scores.
    pub fn run(&self) -> Result<MetricResult, BenchError> {
        report_time("evaluate", || -> Result<MetricResult, BenchError> {
            let table = PredictionTable::read_csv(&self.path).map_err(|e| {
                BenchError::evaluation(format!(
                    "cannot load predictions from {}: {e}",
                    self.path.display()
                ))
            })?;
            if table.is_empty() {
                return Err(BenchError::evaluation(format!(
                    "prediction table {} is empty",
                    self.path.display()
                )));
            }

            let predictions = table.predictions();
            let references = table.targets();
            let mut scores = BTreeMap::new();
            for metric in &self.metrics {
                let family = metric.compute(&predictions, &references)?;
                let score = metric.select(&family)?;
                tracing::info!(metric = %metric, score, "Metric computed");
                scores.insert(metric.name().to_string(), score);
            }

            Ok(MetricResult {
                scores,
                unrecognized: self.unrecognized.clone(),
            })
        })
    }
}
