//! Inference operations for mood classification and supportive replies.
//!
//! # Module Structure
//!
//! - `ollama`: HTTP backend for an Ollama-compatible generate endpoint
//! - `client`: `InferenceClient`, the retrying facade over a backend
//! - `retry`: retry bound and backoff schedule
//! - `prompts`: prompt builders and the fallback reply template
//!
//! # Example
//!
//! ```no_run
//! use moodlog::ai::{GenerationOptions, InferenceClient, OllamaClient, RetryPolicy};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let backend = Arc::new(OllamaClient::new("http://127.0.0.1:11434", "llama3.2:3b"));
//! let client = InferenceClient::new(backend, RetryPolicy::default());
//! let options = GenerationOptions::new(256, 0.7, Duration::from_secs(30))?;
//! let text = client.generate("Say something kind.", &options)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;
pub mod ollama;
pub mod prompts;
pub mod retry;

// Re-export commonly used types
pub use client::{CompletionBackend, GenerationOptions, InferenceClient};
pub use ollama::OllamaClient;
pub use retry::RetryPolicy;
