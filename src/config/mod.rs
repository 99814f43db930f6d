//! Configuration management for moodlog.
//!
//! This module loads and validates settings from environment variables, with
//! sensible defaults for everything. It also wires the configured pieces
//! (inference client, classifier, pipeline) together so `main` stays small.
//!
//! # Environment Variables
//!
//! - `MOODLOG_DB`: SQLite database path (defaults to ~/.local/share/moodlog/moodlog.db)
//! - `MOODLOG_ENDPOINT`: Inference endpoint base URL (defaults to a local Ollama server)
//! - `MOODLOG_MODEL`: Model identifier
//! - `MOODLOG_API_TOKEN`: Optional bearer token for the endpoint
//! - `MOODLOG_CLASSIFIER`: `lexicon` (default) or `model`
//! - `MOODLOG_MAX_TOKENS`, `MOODLOG_TEMPERATURE`, `MOODLOG_TIMEOUT_SECS`: reply generation
//! - `MOODLOG_MAX_ATTEMPTS`, `MOODLOG_BACKOFF_BASE_MS`, `MOODLOG_BACKOFF_MAX_MS`: retry policy
//! - `MOODLOG_MAX_ENTRY_CHARS`: Longest accepted entry
//! - `MOODLOG_FALLBACK_TEMPLATE`: Reply used when generation fails; `{mood}` is substituted
//! - `HOME`: Used for expanding the default database path

use crate::ai::{GenerationOptions, InferenceClient, OllamaClient, RetryPolicy};
use crate::constants::*;
use crate::db::EntryStore;
use crate::errors::{AppError, AppResult};
use crate::mood::{LexiconClassifier, ModelClassifier, MoodClassifier};
use crate::ops::{Pipeline, PipelineSettings};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which [`MoodClassifier`] implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Local keyword heuristic.
    Lexicon,
    /// Ask the inference endpoint.
    Model,
}

impl FromStr for ClassifierKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(ClassifierKind::Lexicon),
            "model" => Ok(ClassifierKind::Model),
            other => Err(AppError::Config(format!(
                "Unknown classifier '{}', expected 'lexicon' or 'model'",
                other
            ))),
        }
    }
}

/// Configuration for moodlog.
///
/// # Examples
///
/// Starting from defaults and overriding a field:
/// ```
/// use moodlog::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     db_path: PathBuf::from("/tmp/moodlog.db"),
///     ..Config::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
///
/// Loading configuration from environment variables:
/// ```no_run
/// use moodlog::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// config.validate().expect("Invalid configuration");
/// ```
#[derive(Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub endpoint: String,
    pub model: String,
    /// Sent as a bearer token when set. Never printed.
    pub api_token: Option<String>,
    pub classifier: ClassifierKind,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Deadline for a single inference attempt.
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub max_entry_chars: usize,
    pub fallback_template: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED_TOKEN]"),
            )
            .field("classifier", &self.classifier)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_max", &self.backoff_max)
            .field("max_entry_chars", &self.max_entry_chars)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    /// Defaults for everything except the database path, which depends on `HOME`.
    fn default() -> Self {
        Config {
            db_path: PathBuf::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_token: None,
            classifier: ClassifierKind::Lexicon,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
            max_entry_chars: DEFAULT_MAX_ENTRY_CHARS,
            fallback_template: DEFAULT_FALLBACK_TEMPLATE.to_string(),
        }
    }
}

/// Reads `key` and parses it, or returns `default` when unset.
fn env_parse<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| {
            AppError::Config(format!("Invalid value '{}' for {}: {}", raw, key, e))
        }),
        Err(_) => Ok(default),
    }
}

/// Reads `key` as a non-blank string.
fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// The database path is expanded with `shellexpand`, so `~` and `$VAR`
    /// references work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if:
    /// - A numeric variable does not parse
    /// - The classifier name is unknown
    /// - The database path expansion fails or yields an empty path
    pub fn load() -> AppResult<Self> {
        let db_path_str = env_string(ENV_VAR_DB).unwrap_or_else(|| {
            let home = env::var(ENV_VAR_HOME).unwrap_or_default();
            format!("{}/{}", home, DEFAULT_DB_SUBPATH)
        });

        // Expand the path (handles ~ and environment variables)
        let expanded_path = shellexpand::full(&db_path_str)
            .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;
        let db_path = PathBuf::from(expanded_path.into_owned());

        if db_path.as_os_str().is_empty() {
            return Err(AppError::Config("Database path is empty".to_string()));
        }

        let classifier = match env_string(ENV_VAR_CLASSIFIER) {
            Some(raw) => raw.parse()?,
            None => DEFAULT_CLASSIFIER.parse()?,
        };

        let fallback_template = match env::var(ENV_VAR_FALLBACK_TEMPLATE) {
            // An explicitly empty template is meaningful: degraded replies become `failed`.
            Ok(template) => template,
            Err(_) => DEFAULT_FALLBACK_TEMPLATE.to_string(),
        };

        Ok(Config {
            db_path,
            endpoint: env_string(ENV_VAR_ENDPOINT).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: env_string(ENV_VAR_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_token: env_string(ENV_VAR_API_TOKEN),
            classifier,
            max_tokens: env_parse(ENV_VAR_MAX_TOKENS, DEFAULT_MAX_TOKENS)?,
            temperature: env_parse(ENV_VAR_TEMPERATURE, DEFAULT_TEMPERATURE)?,
            timeout: Duration::from_secs(env_parse(ENV_VAR_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?),
            max_attempts: env_parse(ENV_VAR_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?,
            backoff_base: Duration::from_millis(env_parse(
                ENV_VAR_BACKOFF_BASE_MS,
                DEFAULT_BACKOFF_BASE_MS,
            )?),
            backoff_max: Duration::from_millis(env_parse(
                ENV_VAR_BACKOFF_MAX_MS,
                DEFAULT_BACKOFF_MAX_MS,
            )?),
            max_entry_chars: env_parse(ENV_VAR_MAX_ENTRY_CHARS, DEFAULT_MAX_ENTRY_CHARS)?,
            fallback_template,
        })
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first problem found:
    /// - Database path empty or relative
    /// - Endpoint not an http(s) URL, or model empty
    /// - Temperature outside `[0, 2]`, zero max tokens or zero timeout
    /// - Zero attempts, or a backoff base above the backoff ceiling
    /// - Zero maximum entry length
    pub fn validate(&self) -> AppResult<()> {
        if self.db_path.as_os_str().is_empty() {
            return Err(AppError::Config("Database path is empty".to_string()));
        }
        if !self.db_path.is_absolute() {
            return Err(AppError::Config(
                "Database path must be an absolute path".to_string(),
            ));
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Config("Model name is empty".to_string()));
        }

        // Reuse the generation option checks, reported as configuration errors
        self.reply_options().map_err(|e| match e {
            AppError::InvalidInput(msg) => AppError::Config(msg),
            other => other,
        })?;

        if self.max_attempts == 0 {
            return Err(AppError::Config(
                "Max attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff_base > self.backoff_max {
            return Err(AppError::Config(format!(
                "Backoff base {:?} exceeds backoff ceiling {:?}",
                self.backoff_base, self.backoff_max
            )));
        }
        if self.max_entry_chars == 0 {
            return Err(AppError::Config(
                "Maximum entry length must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.backoff_base, self.backoff_max)
    }

    /// Generation options for supportive replies.
    pub fn reply_options(&self) -> AppResult<GenerationOptions> {
        GenerationOptions::new(self.max_tokens, self.temperature, self.timeout)
    }

    /// Builds a retrying client over the configured endpoint.
    ///
    /// Each call returns an independent client with its own retry budget.
    pub fn inference_client(&self) -> InferenceClient {
        let mut backend = OllamaClient::new(&self.endpoint, &self.model);
        if let Some(token) = &self.api_token {
            backend = backend.with_api_token(token);
        }
        InferenceClient::new(Arc::new(backend), self.retry_policy())
    }

    pub fn classifier(&self) -> Arc<dyn MoodClassifier> {
        match self.classifier {
            ClassifierKind::Lexicon => Arc::new(LexiconClassifier::new()),
            ClassifierKind::Model => {
                Arc::new(ModelClassifier::new(self.inference_client(), self.timeout))
            }
        }
    }

    /// Assembles a submission pipeline over `store`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if the reply generation options are invalid.
    pub fn build_pipeline(&self, store: Arc<dyn EntryStore>) -> AppResult<Pipeline> {
        Ok(Pipeline::new(
            store,
            self.classifier(),
            self.inference_client(),
            self.reply_options()?,
            PipelineSettings {
                max_entry_chars: self.max_entry_chars,
                fallback_template: self.fallback_template.clone(),
            },
        ))
    }
}
