//! HTTP front end for single-sample inference.
//!
//! One [`InferenceEngine`] is shared by all requests. It sits behind a
//! `std::sync::Mutex` and is only driven from `spawn_blocking`, so generation
//! never stalls the async workers and requests are served one at a time.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use genbench_core::config::BenchConfig;
use genbench_core::data::{DatasetFrame, Sample};
use genbench_core::inference::{GenerationParameters, InferenceEngine};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

/// Shared state built once at startup.
#[derive(Clone)]
pub struct AppContext {
    engine: Arc<Mutex<InferenceEngine>>,
    sample_params: Arc<GenerationParameters>,
    model_loaded: bool,
}

impl AppContext {
    pub fn new(engine: InferenceEngine, sample_params: GenerationParameters) -> Self {
        Self {
            model_loaded: engine.has_model(),
            engine: Arc::new(Mutex::new(engine)),
            sample_params: Arc::new(sample_params),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InferRequest {
    pub question: String,
}

/// `"A|B"` becomes the pair `(A, B)`; a query without `|` is paired with itself.
pub fn parse_query(text: &str) -> Sample {
    let mut parts = text.split('|');
    let first = parts.next().unwrap_or_default().to_string();
    let second = parts.next().map_or_else(|| first.clone(), str::to_string);
    Sample::Pair(first, second)
}

/// Build the router with `/`, `/health` and `/infer`.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/infer", post(infer_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("assets/index.html"))
}

async fn health_handler(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model_loaded": ctx.model_loaded,
    }))
}

fn error_response(message: String) -> Response {
    tracing::error!(error = %message, "Inference request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

async fn infer_handler(
    State(ctx): State<AppContext>,
    Json(request): Json<InferRequest>,
) -> Response {
    let sample = parse_query(&request.question);
    let task = tokio::task::spawn_blocking(move || -> Result<Value, String> {
        let mut engine = ctx
            .engine
            .lock()
            .map_err(|_| "inference engine is unavailable".to_string())?;
        let prediction = engine
            .infer_sample(&sample, Some(&ctx.sample_params))
            .map_err(|e| e.to_string())?;
        let labels = engine.model_config().map(|c| &c.id2label);
        Ok(match (prediction, labels) {
            (None, _) => Value::Null,
            (Some(p), Some(labels)) if !labels.is_empty() => labels
                .get(p.trim())
                .map_or(Value::Null, |label| Value::String(label.clone())),
            (Some(p), _) => Value::String(p),
        })
    })
    .await;

    match task {
        Ok(Ok(infer)) => Json(json!({ "infer": infer })).into_response(),
        Ok(Err(message)) => error_response(message),
        Err(e) => error_response(format!("inference task failed: {e}")),
    }
}

/// Build the engine and serve until Ctrl-C.
pub fn run(config: BenchConfig) -> anyhow::Result<()> {
    // Built outside the runtime: the blocking HTTP client must not be created
    // or dropped on an async worker.
    let engine = crate::commands::build_engine(&config, DatasetFrame::empty())?;
    let ctx = AppContext::new(engine, config.inference.sample_params.clone());
    let keep_alive = ctx.clone();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, model_loaded = ctx.model_loaded, "Serving");
        axum::serve(listener, router(ctx))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        anyhow::Ok(())
    })?;
    drop(runtime);
    drop(keep_alive);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use genbench_core::inference::EngineConfig;
    use genbench_core::testing::{CharTokenizer, EchoModel, InputLog};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn app_with(model: Option<EchoModel>) -> (Router, InputLog) {
        let tokenizer = CharTokenizer::new();
        let log = tokenizer.log();
        let engine = match model {
            Some(model) => InferenceEngine::new(
                Box::new(model),
                Box::new(tokenizer),
                DatasetFrame::empty(),
                EngineConfig::default(),
            ),
            None => InferenceEngine::without_model(
                Box::new(tokenizer),
                DatasetFrame::empty(),
                EngineConfig::default(),
            ),
        };
        (
            router(AppContext::new(engine, GenerationParameters::default())),
            log,
        )
    }

    async fn post_infer(app: Router, question: &str) -> (StatusCode, Value) {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/infer")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "question": question }).to_string()))
            .unwrap();
        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_parse_query() {
        assert_eq!(parse_query("A|B"), Sample::Pair("A".into(), "B".into()));
        assert_eq!(parse_query("A"), Sample::Pair("A".into(), "A".into()));
        assert_eq!(parse_query("A|B|C"), Sample::Pair("A".into(), "B".into()));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = app_with(Some(EchoModel::new("x")));
        let req = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"status": "ok", "model_loaded": true}));
    }

    #[tokio::test]
    async fn test_index_page() {
        let (app, _) = app_with(None);
        let req = axum::http::Request::builder()
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn test_infer_maps_label() {
        let model = EchoModel::new("1")
            .without_echo()
            .with_labels(&[("0", "entailment"), ("1", "neutral")]);
        let (app, log) = app_with(Some(model));
        let (status, json) = post_infer(app, "A man sleeps|A person rests").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"infer": "neutral"}));
        assert_eq!(
            log.lock().unwrap()[0],
            vec![Sample::Pair("A man sleeps".into(), "A person rests".into())]
        );
    }

    #[tokio::test]
    async fn test_infer_strips_echoed_pair() {
        let model = EchoModel::new("1").with_labels(&[("0", "entailment"), ("1", "neutral")]);
        let (app, _) = app_with(Some(model));
        let (status, json) = post_infer(app, "A man sleeps|A person rests").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"infer": "neutral"}));
    }

    #[tokio::test]
    async fn test_infer_strips_echoed_single_query() {
        let (app, _) = app_with(Some(EchoModel::new("yes")));
        let (_, json) = post_infer(app, "Is it?").await;
        assert_eq!(json, json!({"infer": "yes"}));
    }

    #[tokio::test]
    async fn test_unknown_label_is_null() {
        let model = EchoModel::new("7")
            .without_echo()
            .with_labels(&[("0", "entailment")]);
        let (app, _) = app_with(Some(model));
        let (_, json) = post_infer(app, "A").await;
        assert_eq!(json, json!({"infer": null}));
    }

    #[tokio::test]
    async fn test_raw_prediction_without_labels() {
        let (app, log) = app_with(Some(EchoModel::new("yes").without_echo()));
        let (_, json) = post_infer(app, "Is it?").await;
        assert_eq!(json, json!({"infer": "yes"}));
        assert_eq!(
            log.lock().unwrap()[0],
            vec![Sample::Pair("Is it?".into(), "Is it?".into())]
        );
    }

    #[tokio::test]
    async fn test_no_model_returns_null() {
        let (app, _) = app_with(None);
        let (status, json) = post_infer(app, "A|B").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"infer": null}));
    }

    #[tokio::test]
    async fn test_generation_failure_is_500() {
        let (app, _) = app_with(Some(EchoModel::failing()));
        let (status, json) = post_infer(app, "A").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("generation failed"));
    }
}
