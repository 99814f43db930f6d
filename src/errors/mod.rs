//! Error handling utilities for the moodlog service.
//!
//! This module provides the central error type `AppError` which represents every
//! failure a caller of the entry pipeline can observe, the layered error types
//! for the store, the inference endpoint and the classifier, and the convenience
//! alias `AppResult`.

use std::time::Duration;
use thiserror::Error;

/// Represents specific error cases that can occur during database operations.
///
/// # Examples
///
/// ```
/// use moodlog::errors::DatabaseError;
///
/// let error = DatabaseError::NotFound("Entry with id 123 not found".to_string());
/// assert!(format!("{}", error).contains("not found"));
/// ```
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLite database error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("Failed to get connection from pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// Requested entry not found in database.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Stored data that cannot be decoded into a diary entry.
    #[error("Database error: {0}")]
    Custom(String),
}

/// Failure of a single call to the inference endpoint.
///
/// The variants are the observable outcomes of one attempt; the retry layer in
/// [`crate::ai::InferenceClient`] decides which of them are worth another try
/// through [`InferenceError::is_retryable`].
///
/// # Examples
///
/// ```
/// use moodlog::errors::InferenceError;
///
/// let error = InferenceError::RateLimited { retry_after: None };
/// assert!(error.is_retryable());
///
/// let error = InferenceError::Upstream { status: Some(400), message: "bad prompt".into() };
/// assert!(!error.is_retryable());
/// ```
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// No response arrived within the per-call deadline.
    #[error("Inference request timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint signalled throttling (HTTP 429).
    #[error("Inference endpoint is rate limiting requests")]
    RateLimited {
        /// Delay suggested by the endpoint's `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// Any other non-2xx response, or a payload that could not be understood.
    #[error("Inference endpoint error{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Upstream {
        /// HTTP status, `None` when the response was 2xx but malformed.
        status: Option<u16>,
        /// Body excerpt or parse failure description.
        message: String,
    },

    /// The endpoint could not be reached at all.
    #[error("Inference endpoint unreachable: {0}. Is the model server running?")]
    Unreachable(String),
}

impl InferenceError {
    /// Returns `true` for transient failures that a retry may resolve.
    ///
    /// Timeouts, throttling, connection failures and 5xx responses are transient.
    /// 4xx responses and malformed payloads are permanent for the call.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Timeout(_)
            | InferenceError::RateLimited { .. }
            | InferenceError::Unreachable(_) => true,
            InferenceError::Upstream { status, .. } => matches!(status, Some(s) if *s >= 500),
        }
    }
}

/// Reasons the mood classifier could not produce a label.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The inference call backing the classifier failed after its retries.
    #[error("classification request failed: {0}")]
    Inference(#[from] InferenceError),

    /// The model answered, but not with a parseable object.
    #[error("classifier output could not be parsed: {0}")]
    MalformedOutput(String),

    /// The model named a mood outside the closed label set.
    #[error("classifier returned unknown mood label '{0}'")]
    UnknownLabel(String),
}

/// Represents all possible errors that can occur in the moodlog service.
///
/// Only input validation, classification and storage failures escape an entry
/// submission. Reply generation failures are absorbed by the pipeline and
/// surface as a degraded reply status instead.
///
/// # Examples
///
/// ```
/// use moodlog::errors::AppError;
///
/// let error = AppError::InvalidInput("entry text is empty".to_string());
/// assert_eq!(format!("{}", error), "Invalid input: entry text is empty");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller supplied a request that can never succeed as-is.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The mandatory classification stage failed; nothing was stored.
    #[error("Classification failed: {0}")]
    ClassificationFailed(#[from] ClassifyError),

    /// The labeled entry could not be written. The caller should resubmit.
    #[error("Failed to store entry: {0}")]
    StoreWriteFailed(#[source] DatabaseError),

    /// Errors from read-side database operations.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Inference failures that have no local fallback, such as entry analysis.
    /// Reply generation never raises this.
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;
