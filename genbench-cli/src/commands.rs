//! CLI subcommand handlers.

use crate::Commands;
use anyhow::Context;
use genbench_core::config::BenchConfig;
use genbench_core::data::{DatasetFrame, RawDataPreprocessor, TablePreprocessor, importer_for_path};
use genbench_core::inference::{EngineConfig, GenerationModel, InferenceEngine, TextTokenizer};
use genbench_core::{EvaluationRun, Evaluator, HfTokenizer, RemoteModel, prepare_dataset};
use std::time::Duration;

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, config: BenchConfig) -> anyhow::Result<()> {
    match command {
        Commands::Analyze => handle_analyze(&config),
        Commands::ModelReport => handle_model_report(&config),
        Commands::Sample { index } => handle_sample(&config, index),
        Commands::Infer { output } => {
            let mut config = config;
            if let Some(path) = output {
                config.evaluation.predictions_path = path;
            }
            handle_infer(&config)
        }
        Commands::Evaluate {
            predictions,
            metrics,
        } => {
            let mut config = config;
            if let Some(path) = predictions {
                config.evaluation.predictions_path = path;
            }
            if !metrics.is_empty() {
                config.evaluation.metrics = metrics;
            }
            handle_evaluate(&config)
        }
        Commands::Run => handle_run(&config),
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            crate::serve::run(config)
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Connect to the configured model server, if any.
pub fn load_model(config: &BenchConfig) -> anyhow::Result<Option<Box<dyn GenerationModel>>> {
    let Some(endpoint) = &config.model.endpoint else {
        return Ok(None);
    };
    let model = RemoteModel::connect(
        endpoint,
        config.model.device,
        Duration::from_secs(config.model.request_timeout_secs),
    )
    .with_context(|| format!("Failed to connect to model server at {endpoint}"))?;
    Ok(Some(Box::new(model)))
}

/// Load the tokenizer; `model` supplies the end-of-sequence id used for padding
/// when no pad token is configured.
pub fn load_tokenizer(
    config: &BenchConfig,
    model: Option<&dyn GenerationModel>,
) -> anyhow::Result<Box<dyn TextTokenizer>> {
    let eos_token_id = model.and_then(|m| m.config().eos_token_id);
    let tokenizer = HfTokenizer::from_file(
        &config.model.tokenizer_path,
        config.model.pad_token.as_deref(),
        eos_token_id,
    )
    .with_context(|| {
        format!(
            "Failed to load tokenizer from {}",
            config.model.tokenizer_path.display()
        )
    })?;
    Ok(Box::new(tokenizer))
}

/// Engine over `frame`; without a configured endpoint no model is bound.
pub fn build_engine(config: &BenchConfig, frame: DatasetFrame) -> anyhow::Result<InferenceEngine> {
    let model = load_model(config)?;
    let tokenizer = load_tokenizer(config, model.as_deref())?;
    let engine_config = EngineConfig::from_bench_config(config);
    Ok(match model {
        Some(model) => InferenceEngine::new(model, tokenizer, frame, engine_config),
        None => InferenceEngine::without_model(tokenizer, frame, engine_config),
    })
}

fn load_frame(config: &BenchConfig) -> anyhow::Result<DatasetFrame> {
    let importer = importer_for_path(&config.dataset.resolve_path())?;
    Ok(prepare_dataset(&config.task, importer.as_ref())?.frame)
}

fn handle_analyze(config: &BenchConfig) -> anyhow::Result<()> {
    let importer = importer_for_path(&config.dataset.resolve_path())?;
    let raw = importer.obtain()?;
    let report = TablePreprocessor::new(config.task.clone()).analyze(&raw);
    print_json(&report)
}

fn handle_model_report(config: &BenchConfig) -> anyhow::Result<()> {
    let mut engine = build_engine(config, DatasetFrame::empty())?;
    match engine.analyze_model()? {
        Some(report) => print_json(&report),
        None => print_json(&serde_json::json!({})),
    }
}

fn handle_sample(config: &BenchConfig, index: usize) -> anyhow::Result<()> {
    let frame = load_frame(config)?;
    let sample = frame.get(index)?;
    let mut engine = build_engine(config, frame)?;
    let prediction = engine.infer_sample(&sample, Some(&config.inference.sample_params))?;
    print_json(&serde_json::json!({
        "sample": sample,
        "prediction": prediction,
    }))
}

fn handle_infer(config: &BenchConfig) -> anyhow::Result<()> {
    if config.model.endpoint.is_none() {
        anyhow::bail!("model.endpoint is not configured; dataset inference needs a model");
    }
    let frame = load_frame(config)?;
    let mut engine = build_engine(config, frame)?;
    let predictions = engine.infer_dataset()?;
    predictions.write_csv(&config.evaluation.predictions_path)?;
    println!(
        "Saved {} predictions to {}",
        predictions.len(),
        config.evaluation.predictions_path.display()
    );
    Ok(())
}

fn handle_evaluate(config: &BenchConfig) -> anyhow::Result<()> {
    let evaluator = Evaluator::from_names(
        &config.evaluation.predictions_path,
        &config.evaluation.metrics,
        config.evaluation.strict_metrics,
    )?;
    print_json(&evaluator.run()?)
}

fn handle_run(config: &BenchConfig) -> anyhow::Result<()> {
    let model = load_model(config)?
        .context("model.endpoint is not configured; a benchmark run needs a model")?;
    let tokenizer = load_tokenizer(config, Some(&*model))?;
    let importer = importer_for_path(&config.dataset.resolve_path())?;
    let report = EvaluationRun::execute(config, importer.as_ref(), model, tokenizer)?;
    print_json(&report)
}
