//! Data stages: import, profiling, canonicalization, framing, batching.

pub mod batch;
pub mod frame;
pub mod importer;
pub mod preprocess;
pub mod schema;
pub mod table;

pub use batch::{Batch, BatchSource};
pub use frame::{CanonicalRecord, DatasetFrame, Sample};
pub use importer::{CsvImporter, JsonlImporter, RawDataImporter, importer_for_path};
pub use preprocess::{CanonicalTable, DiagnosticsReport, RawDataPreprocessor, TablePreprocessor};
pub use schema::{Role, TaskSchema};
pub use table::RawTable;
