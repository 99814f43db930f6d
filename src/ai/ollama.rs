//! Ollama-compatible HTTP backend for text generation.
//!
//! Each call to [`OllamaClient::complete`] is one `POST /api/generate`
//! request. Retries are the caller's concern (see [`super::InferenceClient`]).

use super::client::{CompletionBackend, GenerationOptions};
use crate::errors::InferenceError;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Longest body excerpt kept in an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Sampling parameters nested under `options` in the request body.
#[derive(Debug, Serialize)]
struct ModelOptions {
    num_predict: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// Request body for text generation.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: ModelOptions,
}

/// Response from text generation.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for an Ollama-style `/api/generate` endpoint.
pub struct OllamaClient {
    base_url: String,
    model: String,
    api_token: Option<String>,
    client: Client,
}

impl fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl OllamaClient {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the API (e.g., "http://127.0.0.1:11434")
    /// * `model` - Model identifier sent with every request
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_token: None,
            client: Client::new(),
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(error: reqwest::Error, options: &GenerationOptions) -> InferenceError {
        if error.is_timeout() {
            InferenceError::Timeout(options.timeout)
        } else if error.is_connect() {
            InferenceError::Unreachable(error.to_string())
        } else {
            InferenceError::Upstream {
                status: None,
                message: error.to_string(),
            }
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

impl CompletionBackend for OllamaClient {
    /// Sends one generation request.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the per-call deadline elapses
    /// - `RateLimited` on HTTP 429
    /// - `Unreachable` if no connection could be made
    /// - `Upstream` on any other non-2xx status or a malformed/empty body
    fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, InferenceError> {
        debug!("Sending generate request with model: {}", self.model);

        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: ModelOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
                seed: options.seed,
            },
        };

        let mut builder = self.client.post(&url).timeout(options.timeout).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = builder
            .send()
            .map_err(|e| Self::map_send_error(e, options))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(InferenceError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(InferenceError::Upstream {
                status: Some(status.as_u16()),
                message: excerpt(&error_text),
            });
        }

        let generated: GenerateResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(options.timeout)
            } else {
                InferenceError::Upstream {
                    status: None,
                    message: format!("Failed to parse generate response: {}", e),
                }
            }
        })?;

        if generated.response.trim().is_empty() {
            return Err(InferenceError::Upstream {
                status: None,
                message: "endpoint returned an empty completion".to_string(),
            });
        }

        debug!("Received completion ({} chars)", generated.response.len());
        Ok(generated.response)
    }
}
