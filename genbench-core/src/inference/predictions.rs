//! Persisted pairing of targets and generated predictions.

use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One `(target, prediction)` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub target: String,
    #[serde(rename = "predictions")]
    pub prediction: String,
}

/// Predictions in frame order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionTable {
    rows: Vec<PredictionRow>,
}

impl PredictionTable {
    /// Pair targets with predictions positionally.
    pub fn from_columns(
        targets: Vec<String>,
        predictions: Vec<String>,
    ) -> Result<Self, BenchError> {
        if targets.len() != predictions.len() {
            return Err(BenchError::inference(format!(
                "{} predictions for {} targets",
                predictions.len(),
                targets.len()
            )));
        }
        Ok(Self {
            rows: targets
                .into_iter()
                .zip(predictions)
                .map(|(target, prediction)| PredictionRow { target, prediction })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn targets(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.target.as_str()).collect()
    }

    pub fn predictions(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.prediction.as_str()).collect()
    }

    /// Write the table as CSV with a `target,predictions` header.
    ///
    /// Rows go to a sibling temp file that is renamed into place, so readers see
    /// either the previous file or the complete new one.
    pub fn write_csv(&self, path: &Path) -> Result<(), BenchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file_name = path
            .file_name()
            .ok_or_else(|| BenchError::config(format!("not a file path: {}", path.display())))?;
        let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

        let written = (|| -> Result<(), BenchError> {
            let mut writer = csv::Writer::from_path(&tmp)?;
            if self.rows.is_empty() {
                writer.write_record(["target", "predictions"])?;
            }
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
            Ok(())
        })();
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }

        std::fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "Predictions saved");
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self, BenchError> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<PredictionRow>, csv::Error>>()?;
        Ok(Self { rows })
    }
}
