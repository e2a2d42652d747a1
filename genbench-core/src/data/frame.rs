//! Indexable view over canonical records.

use crate::data::preprocess::CanonicalTable;
use crate::error::BenchError;
use serde::{Deserialize, Serialize};

/// The input fields of one record as a fixed-arity tuple.
///
/// Order is always `(INPUT_1, INPUT_2)` or `(INPUT_1,)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sample {
    Single(String),
    Pair(String, String),
}

impl Sample {
    /// `INPUT_1`, which doubles as the prompt text echoed by causal models.
    pub fn first(&self) -> &str {
        match self {
            Sample::Single(a) | Sample::Pair(a, _) => a,
        }
    }

    pub fn second(&self) -> Option<&str> {
        match self {
            Sample::Single(_) => None,
            Sample::Pair(_, b) => Some(b),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Sample::Single(_) => 1,
            Sample::Pair(..) => 2,
        }
    }
}

/// One row of the canonical table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub input_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_2: Option<String>,
    pub target: String,
}

impl CanonicalRecord {
    pub fn sample(&self) -> Sample {
        match &self.input_2 {
            Some(second) => Sample::Pair(self.input_1.clone(), second.clone()),
            None => Sample::Single(self.input_1.clone()),
        }
    }
}

/// Immutable, ordered sequence of canonical records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFrame {
    records: Vec<CanonicalRecord>,
}

impl DatasetFrame {
    pub fn new(table: CanonicalTable) -> Self {
        Self {
            records: table.records,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Input tuple of the `index`-th record.
    pub fn get(&self, index: usize) -> Result<Sample, BenchError> {
        self.record(index).map(CanonicalRecord::sample)
    }

    pub fn record(&self, index: usize) -> Result<&CanonicalRecord, BenchError> {
        self.records.get(index).ok_or(BenchError::IndexOutOfBounds {
            index,
            len: self.records.len(),
        })
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter()
    }

    /// The `TARGET` column in frame order.
    pub fn targets(&self) -> Vec<String> {
        self.records.iter().map(|r| r.target.clone()).collect()
    }
}

impl From<Vec<CanonicalRecord>> for DatasetFrame {
    fn from(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }
}
