//! [`GenerationModel`] served by a token-level generation server over HTTP/JSON.
//!
//! The server owns the weights; this client only ships token ids and reads back
//! token ids. Endpoints:
//!
//! - `GET  /config` returns a [`ModelConfig`], fetched once in [`RemoteModel::connect`]
//! - `GET  /parameters` returns `[ParameterInfo]`
//! - `POST /forward` returns `{"output_shape": [...]}`
//! - `POST /generate` returns `{"sequences": [[...], ...]}`

use crate::error::BenchError;
use crate::inference::engine::Device;
use crate::inference::model::{
    ForwardOutput, GenerationModel, ModelConfig, ParameterInfo, TokenBatch,
};
use crate::inference::params::GenerationParameters;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ForwardRequest<'a> {
    input_ids: &'a [Vec<u32>],
    attention_mask: &'a [Vec<u32>],
    device: Device,
    inference_mode: bool,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    input_ids: &'a [Vec<u32>],
    attention_mask: &'a [Vec<u32>],
    max_length: usize,
    params: &'a GenerationParameters,
    device: Device,
    inference_mode: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    sequences: Vec<Vec<u32>>,
}

/// Blocking HTTP client bound to one model server.
pub struct RemoteModel {
    client: Client,
    endpoint: String,
    device: Device,
    config: ModelConfig,
    grad_enabled: bool,
}

impl RemoteModel {
    /// Connect and fetch the model configuration.
    pub fn connect(endpoint: &str, device: Device, timeout: Duration) -> Result<Self, BenchError> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let config: ModelConfig = client
            .get(format!("{endpoint}/config"))
            .send()?
            .error_for_status()?
            .json()?;
        tracing::info!(
            endpoint = %endpoint,
            model = %config.model_id,
            device = %device,
            "Connected to model server"
        );
        Ok(Self {
            client,
            endpoint,
            device,
            config,
            grad_enabled: true,
        })
    }

    fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<R, BenchError> {
        let response = self
            .client
            .post(format!("{}/{route}", self.endpoint))
            .json(body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(BenchError::inference(format!(
                "{route} returned {status}: {text}"
            )));
        }
        response
            .json()
            .map_err(|e| BenchError::inference(format!("invalid {route} response: {e}")))
    }
}

impl GenerationModel for RemoteModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn parameters(&self) -> Result<Vec<ParameterInfo>, BenchError> {
        Ok(self
            .client
            .get(format!("{}/parameters", self.endpoint))
            .send()?
            .error_for_status()?
            .json()?)
    }

    fn forward(&self, batch: &TokenBatch) -> Result<ForwardOutput, BenchError> {
        self.post(
            "forward",
            &ForwardRequest {
                input_ids: &batch.input_ids,
                attention_mask: &batch.attention_mask,
                device: self.device,
                inference_mode: !self.grad_enabled,
            },
        )
    }

    fn generate(
        &self,
        batch: &TokenBatch,
        max_length: usize,
        params: &GenerationParameters,
    ) -> Result<Vec<Vec<u32>>, BenchError> {
        let response: GenerateResponse = self.post(
            "generate",
            &GenerateRequest {
                input_ids: &batch.input_ids,
                attention_mask: &batch.attention_mask,
                max_length,
                params,
                device: self.device,
                inference_mode: !self.grad_enabled,
            },
        )?;
        Ok(response.sequences)
    }

    fn grad_enabled(&self) -> bool {
        self.grad_enabled
    }

    fn set_grad_enabled(&mut self, enabled: bool) {
        self.grad_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::NoGradGuard;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serves one canned JSON body per connection and returns the request lines
    /// and bodies it received.
    fn fake_server(responses: Vec<&'static str>) -> (String, JoinHandle<Vec<(String, String)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for body in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header == "\r\n" || header.is_empty() {
                        break;
                    }
                    let lower = header.to_ascii_lowercase();
                    if let Some(v) = lower.strip_prefix("content-length:") {
                        content_length = v.trim().parse().unwrap();
                    }
                }
                let mut payload = vec![0; content_length];
                reader.read_exact(&mut payload).unwrap();
                seen.push((
                    request_line.trim().to_string(),
                    String::from_utf8(payload).unwrap(),
                ));

                let mut stream = reader.into_inner();
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .unwrap();
            }
            seen
        });
        (url, handle)
    }

    const CONFIG: &str = r#"{"model_id":"gpt-neo","vocab_size":50257,"hidden_size":768,"max_position_embeddings":2048,"max_length":20}"#;

    #[test]
    fn test_generate_round_trip() {
        let (url, server) = fake_server(vec![CONFIG, r#"{"sequences":[[1,2,3]]}"#]);
        let mut model = RemoteModel::connect(&url, Device::Cuda(0), Duration::from_secs(5)).unwrap();
        assert_eq!(model.config().vocab_size, 50257);

        let sequences = {
            let guard = NoGradGuard::new(&mut model);
            guard
                .generate(
                    &TokenBatch::ones(1, 2),
                    16,
                    &GenerationParameters::dataset_default(),
                )
                .unwrap()
        };
        assert_eq!(sequences, vec![vec![1, 2, 3]]);

        let seen = server.join().unwrap();
        assert!(seen[0].0.starts_with("GET /config"));
        assert!(seen[1].0.starts_with("POST /generate"));
        let body: serde_json::Value = serde_json::from_str(&seen[1].1).unwrap();
        assert_eq!(body["inference_mode"], true);
        assert_eq!(body["device"], "cuda:0");
        assert_eq!(body["max_length"], 16);
        assert_eq!(body["params"]["no_repeat_ngram_size"], 8);
    }

    #[test]
    fn test_unreachable_server_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        assert!(matches!(
            RemoteModel::connect(&url, Device::Cpu, Duration::from_secs(1)),
            Err(BenchError::Http(_))
        ));
    }
}
