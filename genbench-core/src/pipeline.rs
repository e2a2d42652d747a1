//! End-to-end benchmark run: import, canonicalize, generate, persist, score.

use crate::config::BenchConfig;
use crate::data::frame::DatasetFrame;
use crate::data::importer::RawDataImporter;
use crate::data::preprocess::{DiagnosticsReport, RawDataPreprocessor, TablePreprocessor};
use crate::data::schema::TaskSchema;
use crate::error::BenchError;
use crate::eval::evaluator::{Evaluator, MetricResult};
use crate::inference::engine::{EngineConfig, InferenceEngine};
use crate::inference::model::GenerationModel;
use crate::inference::report::ModelReport;
use crate::inference::tokenizer::TextTokenizer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A profiled and canonicalized dataset.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub diagnostics: DiagnosticsReport,
    pub frame: DatasetFrame,
}

/// Obtain, profile and transform a raw table. Transform errors surface here,
/// before any model is touched.
pub fn prepare_dataset(
    schema: &TaskSchema,
    importer: &dyn RawDataImporter,
) -> Result<PreparedDataset, BenchError> {
    tracing::info!(source = %importer.describe(), task = %schema.name, "Loading dataset");
    let raw = importer.obtain()?;
    let preprocessor = TablePreprocessor::new(schema.clone());
    let diagnostics = preprocessor.analyze(&raw);
    let frame = DatasetFrame::new(preprocessor.transform(&raw)?);
    Ok(PreparedDataset { diagnostics, frame })
}

/// Outcome of one [`EvaluationRun`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source: String,
    pub diagnostics: DiagnosticsReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_report: Option<ModelReport>,
    pub predictions_path: PathBuf,
    pub rows: usize,
    pub metrics: MetricResult,
}

/// Drives every stage in order; the first failure ends the run.
pub struct EvaluationRun;

impl EvaluationRun {
    pub fn execute(
        config: &BenchConfig,
        importer: &dyn RawDataImporter,
        model: Box<dyn GenerationModel>,
        tokenizer: Box<dyn TextTokenizer>,
    ) -> Result<RunReport, BenchError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = tracing::info_span!("run", %run_id);
        let _enter = span.enter();

        // Metric names are checked up front so a strict run fails before generation.
        let evaluator = Evaluator::from_names(
            &config.evaluation.predictions_path,
            &config.evaluation.metrics,
            config.evaluation.strict_metrics,
        )?;

        let PreparedDataset { diagnostics, frame } = prepare_dataset(&config.task, importer)?;
        let rows = frame.len();

        let mut engine = InferenceEngine::new(
            model,
            tokenizer,
            frame,
            EngineConfig::from_bench_config(config),
        );
        let model_report = engine.analyze_model()?;
        let predictions = engine.infer_dataset()?;
        predictions.write_csv(&config.evaluation.predictions_path)?;

        let metrics = evaluator.run()?;
        let finished_at = Utc::now();
        tracing::info!(
            rows,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "Run finished"
        );

        Ok(RunReport {
            run_id,
            started_at,
            finished_at,
            source: importer.describe(),
            diagnostics,
            model_report,
            predictions_path: config.evaluation.predictions_path.clone(),
            rows,
            metrics,
        })
    }
}
