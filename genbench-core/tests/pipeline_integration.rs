//! Integration tests for a full benchmark run.
//!
//! These drive import → preprocess → inference → persistence → evaluation with
//! the in-memory EchoModel and CharTokenizer.

use genbench_core::config::BenchConfig;
use genbench_core::data::{JsonlImporter, TaskSchema};
use genbench_core::error::BenchError;
use genbench_core::inference::PredictionTable;
use genbench_core::pipeline::{EvaluationRun, prepare_dataset};
use genbench_core::testing::{CharTokenizer, EchoModel};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

const QA_ROWS: &str = r#"{"question": "where is the big red house", "best_answer": "WHERE IS THE BIG RED HOUSE"}
{"question": "who painted the old blue door", "best_answer": "WHO PAINTED THE OLD BLUE DOOR"}
{"question": "where is the big red house", "best_answer": "WHERE IS THE BIG RED HOUSE"}
{"question": "", "best_answer": "NOTHING"}
{"question": "what lies beyond the far hills", "best_answer": "SOMETHING ELSE ENTIRELY HERE"}
"#;

fn write_dataset(dir: &Path) -> PathBuf {
    let path = dir.join("validation.jsonl");
    std::fs::write(&path, QA_ROWS).unwrap();
    path
}

fn config(dir: &Path, metrics: &[&str]) -> BenchConfig {
    let mut config = BenchConfig::default();
    config.task = TaskSchema::open_qa();
    config.inference.batch_size = 2;
    config.evaluation.predictions_path = dir.join("dist").join("predictions.csv");
    config.evaluation.metrics = metrics.iter().map(|m| m.to_string()).collect();
    config
}

#[test]
fn test_full_run_scores_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let importer = JsonlImporter::new(write_dataset(dir.path()));
    let config = config(dir.path(), &["rouge", "accuracy", "exact_match", "perplexity"]);

    let report = EvaluationRun::execute(
        &config,
        &importer,
        Box::new(EchoModel::uppercase()),
        Box::new(CharTokenizer::new()),
    )
    .unwrap();

    assert_eq!(report.diagnostics.dataset_number_of_samples, 5);
    assert_eq!(report.diagnostics.dataset_duplicates, 1);
    assert_eq!(report.diagnostics.dataset_empty_rows, 1);
    assert_eq!(report.rows, 3);
    assert!(report.model_report.is_some());
    assert!(report.finished_at >= report.started_at);

    let accuracy = report.metrics.get("accuracy").unwrap();
    assert!((accuracy - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(report.metrics.get("exact_match"), Some(accuracy));
    assert!(report.metrics.get("rouge").unwrap() > 0.6);
    assert_eq!(report.metrics.unrecognized, vec!["perplexity"]);

    let table = PredictionTable::read_csv(&report.predictions_path).unwrap();
    assert_eq!(
        table.targets(),
        vec![
            "WHERE IS THE BIG RED HOUSE",
            "WHO PAINTED THE OLD BLUE DOOR",
            "SOMETHING ELSE ENTIRELY HERE"
        ]
    );
    assert_eq!(table.predictions()[2], "WHAT LIES BEYOND THE FAR HILLS");
}

#[test]
fn test_identical_predictions_score_perfect_bleu() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qa.jsonl");
    std::fs::write(
        &path,
        r#"{"question": "the cat sat on the mat", "best_answer": "THE CAT SAT ON THE MAT"}"#,
    )
    .unwrap();
    let config = config(dir.path(), &["bleu"]);

    let report = EvaluationRun::execute(
        &config,
        &JsonlImporter::new(path),
        Box::new(EchoModel::uppercase()),
        Box::new(CharTokenizer::new()),
    )
    .unwrap();
    assert!((report.metrics.get("bleu").unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_schema_error_aborts_before_inference() {
    let dir = tempfile::tempdir().unwrap();
    let importer = JsonlImporter::new(write_dataset(dir.path()));
    let mut config = config(dir.path(), &["rouge"]);
    config.task = TaskSchema::nli();

    let model = EchoModel::new("x");
    let calls = model.call_counter();
    let err = EvaluationRun::execute(
        &config,
        &importer,
        Box::new(model),
        Box::new(CharTokenizer::new()),
    )
    .unwrap_err();

    assert!(matches!(err, BenchError::Schema(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!config.evaluation.predictions_path.exists());
}

#[test]
fn test_failed_generation_leaves_no_table() {
    let dir = tempfile::tempdir().unwrap();
    let importer = JsonlImporter::new(write_dataset(dir.path()));
    let config = config(dir.path(), &["rouge"]);

    let err = EvaluationRun::execute(
        &config,
        &importer,
        Box::new(EchoModel::new("x").fail_after(1)),
        Box::new(CharTokenizer::new()),
    )
    .unwrap_err();

    assert!(matches!(err, BenchError::Inference(_)));
    assert!(!config.evaluation.predictions_path.exists());
}

#[test]
fn test_strict_metrics_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let importer = JsonlImporter::new(write_dataset(dir.path()));
    let mut config = config(dir.path(), &["perplexity"]);
    config.evaluation.strict_metrics = true;

    let model = EchoModel::new("x");
    let calls = model.call_counter();
    let err = EvaluationRun::execute(
        &config,
        &importer,
        Box::new(model),
        Box::new(CharTokenizer::new()),
    )
    .unwrap_err();
    assert!(matches!(err, BenchError::Evaluation(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_prepare_nli_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("xnli.jsonl");
    std::fs::write(
        &path,
        "{\"premise\": \"A man sleeps\", \"hypothesis\": \"A person rests\", \"label\": 0}\n",
    )
    .unwrap();

    let prepared = prepare_dataset(&TaskSchema::nli(), &JsonlImporter::new(path)).unwrap();
    let sample = prepared.frame.get(0).unwrap();
    assert_eq!(sample.first(), "A man sleeps");
    assert_eq!(sample.second(), Some("A person rests"));
    assert_eq!(prepared.frame.targets(), vec!["0"]);
}

#[test]
fn test_nli_run_scores_continuations_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("xnli.jsonl");
    std::fs::write(
        &path,
        concat!(
            "{\"premise\": \"A man sleeps\", \"hypothesis\": \"A person rests\", \"label\": 0}\n",
            "{\"premise\": \"A dog runs\", \"hypothesis\": \"A cat sleeps\", \"label\": 2}\n",
        ),
    )
    .unwrap();
    let mut config = config(dir.path(), &["accuracy"]);
    config.task = TaskSchema::nli();

    let model = EchoModel::with_reply(|prompt| {
        let label = if prompt.contains("rests") { "0" } else { "2" };
        label.to_string()
    });
    let report = EvaluationRun::execute(
        &config,
        &JsonlImporter::new(path),
        Box::new(model),
        Box::new(CharTokenizer::new()),
    )
    .unwrap();

    assert_eq!(report.metrics.get("accuracy"), Some(1.0));
    let table = PredictionTable::read_csv(&report.predictions_path).unwrap();
    assert_eq!(table.predictions(), vec!["0", "2"]);
}
