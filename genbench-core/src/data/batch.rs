//! Fixed-size batching over a [`DatasetFrame`].

use crate::data::frame::{CanonicalRecord, DatasetFrame, Sample};
use crate::error::BenchError;

/// A contiguous, non-empty run of frame records.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Frame position of the first record.
    pub offset: usize,
    records: &'a [CanonicalRecord],
}

impl<'a> Batch<'a> {
    pub fn records(&self) -> &'a [CanonicalRecord] {
        self.records
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.records.iter().map(CanonicalRecord::sample).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Groups frame records into batches of `batch_size`; the last one may be short.
#[derive(Debug, Clone, Copy)]
pub struct BatchSource<'a> {
    frame: &'a DatasetFrame,
    batch_size: usize,
}

impl<'a> BatchSource<'a> {
    pub fn new(frame: &'a DatasetFrame, batch_size: usize) -> Result<Self, BenchError> {
        if batch_size == 0 {
            return Err(BenchError::config("batch_size must be at least 1"));
        }
        Ok(Self { frame, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches, `ceil(len / batch_size)`.
    pub fn len(&self) -> usize {
        self.frame.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// A fresh pass over the frame. Each call starts from the first record.
    pub fn batches(&self) -> impl Iterator<Item = Batch<'a>> {
        let batch_size = self.batch_size;
        self.frame
            .records()
            .chunks(batch_size)
            .enumerate()
            .map(move |(i, records)| Batch {
                offset: i * batch_size,
                records,
            })
    }
}
