//! The inference client the rest of the crate talks to.
//!
//! A [`CompletionBackend`] performs exactly one request. [`InferenceClient`]
//! wraps a backend with a [`RetryPolicy`] so callers see a single
//! blocking-or-failing `generate` call and never deal with timing themselves.

use super::retry::RetryPolicy;
use crate::constants::{MAX_TEMPERATURE, MIN_TEMPERATURE};
use crate::errors::{AppError, AppResult, InferenceError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling randomness, within `[0, 2]`.
    pub temperature: f32,
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Sampling seed; set for calls that must be repeatable.
    pub seed: Option<u64>,
}

impl GenerationOptions {
    /// Creates validated options.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if `temperature` lies outside `[0, 2]`,
    /// `max_tokens` is zero, or `timeout` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodlog::ai::GenerationOptions;
    /// use std::time::Duration;
    ///
    /// assert!(GenerationOptions::new(256, 0.7, Duration::from_secs(30)).is_ok());
    /// assert!(GenerationOptions::new(256, 2.5, Duration::from_secs(30)).is_err());
    /// ```
    pub fn new(max_tokens: u32, temperature: f32, timeout: Duration) -> AppResult<Self> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(AppError::InvalidInput(format!(
                "temperature must be within [{}, {}], got {}",
                MIN_TEMPERATURE, MAX_TEMPERATURE, temperature
            )));
        }
        if max_tokens == 0 {
            return Err(AppError::InvalidInput(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(AppError::InvalidInput(
                "timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            max_tokens,
            temperature,
            timeout,
            seed: None,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A single attempt at turning a prompt into text.
///
/// Implementations must not retry and must not mutate shared local state.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, InferenceError>;
}

type RetryObserver = Arc<dyn Fn(&InferenceError, Duration) + Send + Sync>;

/// Inference client with retry and exponential backoff.
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone)]
pub struct InferenceClient {
    backend: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
    on_retry: Option<RetryObserver>,
}

impl fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            on_retry: None,
        }
    }

    /// Registers a callback that sees each retryable failure and the wait before the next attempt.
    pub fn on_retry(mut self, observer: impl Fn(&InferenceError, Duration) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generates text for `prompt`, retrying transient failures.
    ///
    /// At most `policy.max_attempts()` requests are issued. Permanent failures
    /// (4xx, malformed payloads) are returned immediately; once attempts run out
    /// the last transient error is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`InferenceError`] of the final attempt.
    pub fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, InferenceError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        let operation = || {
            attempt += 1;
            debug!(attempt, max_attempts, "Issuing inference request");

            self.backend.complete(prompt, options).map_err(|error| {
                if !error.is_retryable() {
                    debug!(attempt, error = %error, "Inference failed permanently");
                    return backoff::Error::permanent(error);
                }
                if attempt >= max_attempts {
                    warn!(attempts = attempt, error = %error, "Inference retry budget exhausted");
                    return backoff::Error::permanent(error);
                }

                let hint = match &error {
                    InferenceError::RateLimited { retry_after } => *retry_after,
                    _ => None,
                };
                match hint {
                    Some(hint) => backoff::Error::retry_after(error, self.policy.clamp_hint(hint)),
                    None => backoff::Error::transient(error),
                }
            })
        };

        let notify = |error: InferenceError, delay: Duration| {
            warn!(error = %error, delay_ms = delay.as_millis() as u64, "Inference attempt failed, backing off");
            if let Some(observer) = &self.on_retry {
                observer(&error, delay);
            }
        };

        backoff::retry_notify(self.policy.backoff(), operation, notify).map_err(|e| match e {
            backoff::Error::Permanent(error) => error,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}
