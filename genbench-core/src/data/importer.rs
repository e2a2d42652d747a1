//! Raw data importers for benchmark splits exported to disk.

use crate::data::table::RawTable;
use crate::error::BenchError;
use crate::timing::report_time;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Anything that can produce the raw benchmark table.
pub trait RawDataImporter {
    /// Load the full table.
    fn obtain(&self) -> Result<RawTable, BenchError>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// CsvImporter
// ---------------------------------------------------------------------------

/// CSV file with a header row. All cells are read as strings.
pub struct CsvImporter {
    pub path: PathBuf,
    pub delimiter: u8,
}

impl CsvImporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }
}

impl RawDataImporter for CsvImporter {
    fn obtain(&self) -> Result<RawTable, BenchError> {
        report_time("obtain", || -> Result<RawTable, BenchError> {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_path(&self.path)
                .map_err(|e| {
                    BenchError::import(format!("Cannot open {}: {e}", self.path.display()))
                })?;

            let columns: Vec<String> = reader
                .headers()
                .map_err(|e| BenchError::import(format!("Missing CSV header: {e}")))?
                .iter()
                .map(|h| h.trim().to_string())
                .collect();
            if columns.is_empty() {
                return Err(BenchError::import("CSV file has no columns"));
            }

            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record.map_err(|e| {
                    let line = e.position().map_or(0, csv::Position::line);
                    BenchError::import(format!(
                        "{} line {line}: unreadable CSV record: {e}",
                        self.path.display()
                    ))
                })?;
                rows.push(
                    record
                        .iter()
                        .map(|cell| serde_json::Value::String(cell.to_string()))
                        .collect(),
                );
            }

            tracing::info!(source = %self.describe(), rows = rows.len(), "Imported raw table");
            Ok(RawTable::new(columns, rows))
        })
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// JsonlImporter
// ---------------------------------------------------------------------------

/// JSON-lines file, one object per line. Columns are the union of keys in
/// first-seen order.
pub struct JsonlImporter {
    pub path: PathBuf,
}

impl JsonlImporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RawDataImporter for JsonlImporter {
    fn obtain(&self) -> Result<RawTable, BenchError> {
        report_time("obtain", || -> Result<RawTable, BenchError> {
            let file = std::fs::File::open(&self.path).map_err(|e| {
                BenchError::import(format!("Cannot open {}: {e}", self.path.display()))
            })?;

            let mut columns: Vec<String> = Vec::new();
            let mut objects = Vec::new();
            for (line_no, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| {
                    BenchError::import(format!("Line {}: unreadable: {e}", line_no + 1))
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                let value: serde_json::Value = serde_json::from_str(&line).map_err(|e| {
                    BenchError::import(format!("Line {}: invalid JSON: {e}", line_no + 1))
                })?;
                let serde_json::Value::Object(object) = value else {
                    return Err(BenchError::import(format!(
                        "Line {}: expected a JSON object",
                        line_no + 1
                    )));
                };
                for key in object.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
                objects.push(object);
            }

            let rows = objects
                .into_iter()
                .map(|mut object| {
                    columns
                        .iter()
                        .map(|c| object.remove(c).unwrap_or(serde_json::Value::Null))
                        .collect()
                })
                .collect::<Vec<_>>();

            tracing::info!(source = %self.describe(), rows = rows.len(), "Imported raw table");
            Ok(RawTable::new(columns, rows))
        })
    }

    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

/// Pick an importer from the file extension.
pub fn importer_for_path(path: &Path) -> Result<Box<dyn RawDataImporter>, BenchError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(Box::new(CsvImporter::new(path))),
        Some("tsv") => Ok(Box::new(CsvImporter {
            path: path.to_path_buf(),
            delimiter: b'\t',
        })),
        Some("jsonl") | Some("ndjson") => Ok(Box::new(JsonlImporter::new(path))),
        _ => Err(BenchError::import(format!(
            "Unsupported dataset format: {}",
            path.display()
        ))),
    }
}
