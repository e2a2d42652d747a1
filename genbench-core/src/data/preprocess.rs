//! Dataset profiling and canonicalization.

use crate::data::frame::CanonicalRecord;
use crate::data::schema::{Role, TaskSchema};
use crate::data::table::{RawTable, cell_text};
use crate::error::BenchError;
use crate::timing::report_time;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key properties of a raw table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub dataset_number_of_samples: usize,
    pub dataset_columns: usize,
    pub dataset_duplicates: usize,
    pub dataset_empty_rows: usize,
    /// `None` when no text field has a value.
    pub dataset_sample_min_len: Option<usize>,
    pub dataset_sample_max_len: Option<usize>,
}

/// Table in the canonical schema, re-indexed from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTable {
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Back to a raw table with canonical column names.
    pub fn to_raw(&self) -> RawTable {
        let pair = self.records.iter().any(|r| r.input_2.is_some());
        let mut columns = vec![Role::Input1.column_name().to_string()];
        if pair {
            columns.push(Role::Input2.column_name().to_string());
        }
        columns.push(Role::Target.column_name().to_string());

        let rows = self
            .records
            .iter()
            .map(|r| {
                let mut row = vec![serde_json::Value::String(r.input_1.clone())];
                if pair {
                    row.push(
                        r.input_2
                            .clone()
                            .map(serde_json::Value::String)
                            .unwrap_or(serde_json::Value::Null),
                    );
                }
                row.push(serde_json::Value::String(r.target.clone()));
                row
            })
            .collect();
        RawTable::new(columns, rows)
    }
}

/// Capability to profile and canonicalize a raw table.
pub trait RawDataPreprocessor {
    /// Profile the table. Never fails; malformed rows are counted.
    fn analyze(&self, raw: &RawTable) -> DiagnosticsReport;

    /// Map into the canonical schema, dropping duplicates and incomplete rows.
    fn transform(&self, raw: &RawTable) -> Result<CanonicalTable, BenchError>;
}

/// Preprocessor driven by a [`TaskSchema`].
#[derive(Debug, Clone)]
pub struct TablePreprocessor {
    schema: TaskSchema,
}

impl TablePreprocessor {
    pub fn new(schema: TaskSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &TaskSchema {
        &self.schema
    }

    /// Column index serving `role`: the configured raw column, else the canonical one.
    fn resolve(&self, raw: &RawTable, role: Role) -> Result<usize, BenchError> {
        let configured = self.schema.source_column(role);
        configured
            .and_then(|name| raw.column_index(name))
            .or_else(|| raw.column_index(role.column_name()))
            .ok_or_else(|| {
                BenchError::schema(format!(
                    "Column for {role} not found (expected '{}' or '{}')",
                    configured.unwrap_or("-"),
                    role.column_name()
                ))
            })
    }

    fn profile(&self, raw: &RawTable) -> DiagnosticsReport {
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        let mut empty_rows = 0;
        for row in &raw.rows {
            let key = serde_json::to_string(row).unwrap_or_default();
            if !seen.insert(key) {
                duplicates += 1;
            }
            if raw.row_has_missing(row) {
                empty_rows += 1;
            }
        }

        let text_columns: Vec<usize> = self
            .schema
            .text_fields
            .iter()
            .filter_map(|name| raw.column_index(name))
            .collect();
        let lengths = raw.rows.iter().flat_map(|row| {
            text_columns
                .iter()
                .filter_map(|&i| cell_text(row.get(i)))
                .map(|text| text.chars().count())
        });
        let (min_len, max_len) = lengths.fold((None, None), |(lo, hi), len| {
            (
                Some(lo.map_or(len, |lo: usize| lo.min(len))),
                Some(hi.map_or(len, |hi: usize| hi.max(len))),
            )
        });

        let report = DiagnosticsReport {
            dataset_number_of_samples: raw.row_count(),
            dataset_columns: raw.column_count(),
            dataset_duplicates: duplicates,
            dataset_empty_rows: empty_rows,
            dataset_sample_min_len: min_len,
            dataset_sample_max_len: max_len,
        };
        tracing::info!(
            task = %self.schema.name,
            rows = report.dataset_number_of_samples,
            duplicates,
            empty_rows,
            "Analyzed raw table"
        );
        report
    }
}

impl RawDataPreprocessor for TablePreprocessor {
    fn analyze(&self, raw: &RawTable) -> DiagnosticsReport {
        report_time("analyze", || self.profile(raw))
    }

    fn transform(&self, raw: &RawTable) -> Result<CanonicalTable, BenchError> {
        report_time("transform", || -> Result<CanonicalTable, BenchError> {
            let columns = self
                .schema
                .roles()
                .into_iter()
                .map(|role| self.resolve(raw, role))
                .collect::<Result<Vec<_>, _>>()?;

            // 1. select into roles
            let selected = raw.rows.iter().map(|row| {
                columns
                    .iter()
                    .map(|&i| cell_text(row.get(i)))
                    .collect::<Vec<_>>()
            });

            // 2. drop exact duplicates, keeping the first occurrence
            let mut seen = HashSet::new();
            let unique = selected.filter(|row| seen.insert(row.clone()));

            // 3. drop rows with a missing role field
            let complete = unique.filter_map(|row| row.into_iter().collect::<Option<Vec<_>>>());

            // 4. positional re-index
            let pair = self.schema.is_pair();
            let records: Vec<CanonicalRecord> = complete
                .map(|mut fields| {
                    let target = fields.pop().unwrap_or_default();
                    let input_2 = if pair { fields.pop() } else { None };
                    let input_1 = fields.pop().unwrap_or_default();
                    CanonicalRecord {
                        input_1,
                        input_2,
                        target,
                    }
                })
                .collect();

            tracing::info!(
                task = %self.schema.name,
                rows_before = raw.row_count(),
                rows_after = records.len(),
                "Transformed raw table"
            );
            Ok(CanonicalTable { records })
        })
    }
}
