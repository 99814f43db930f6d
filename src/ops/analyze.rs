//! Per-entry summary and topic tags.
//!
//! Unlike replies there is no local stand-in worth storing when the endpoint
//! is down, so an inference failure is returned to the caller. Output that
//! arrives but cannot be parsed is replaced by an excerpt of the entry.

use crate::ai::prompts::analysis_prompt;
use crate::ai::{GenerationOptions, InferenceClient};
use crate::constants::{ANALYSIS_MAX_TOKENS, ANALYSIS_SEED};
use crate::db::EntryStore;
use crate::errors::{AppError, AppResult};
use crate::journal::{self, normalize_tags, AnalysisStatus, EntryAnalysis, NewAnalysis};
use crate::mood::classifier::extract_json_object;
use crate::ops::converse::owned_entry;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, info_span, warn};

#[derive(Deserialize)]
struct AnalysisOutput {
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Zero-temperature, fixed-seed options for analysis requests.
pub fn analysis_options(timeout: Duration) -> GenerationOptions {
    GenerationOptions {
        max_tokens: ANALYSIS_MAX_TOKENS,
        temperature: 0.0,
        timeout,
        seed: Some(ANALYSIS_SEED),
    }
}

/// Extracts a summary and normalized tags from raw model output.
///
/// Returns `None` when there is no usable JSON object or the summary is blank.
///
/// # Examples
///
/// ```
/// use moodlog::ops::parse_analysis;
///
/// let (summary, tags) = parse_analysis(r#"Sure! {"summary": "A calm day.", "tags": ["Rest"]}"#).unwrap();
/// assert_eq!(summary, "A calm day.");
/// assert_eq!(tags, vec!["rest"]);
/// assert!(parse_analysis("no idea").is_none());
/// ```
pub fn parse_analysis(raw: &str) -> Option<(String, Vec<String>)> {
    let object = extract_json_object(raw)?;
    let output: AnalysisOutput = serde_json::from_str(object).ok()?;
    let summary = output.summary.trim();
    if summary.is_empty() {
        return None;
    }
    Some((summary.to_string(), normalize_tags(&output.tags)))
}

/// Summarizes and tags entry `entry_id`, storing the result.
///
/// # Errors
///
/// - `AppError::Database(NotFound)` if the entry does not exist or belongs to someone else
/// - `AppError::Inference` if the endpoint failed after retries (nothing stored)
/// - `AppError::StoreWriteFailed` if the analysis could not be stored
pub fn analyze_entry(
    store: &dyn EntryStore,
    analyst: &InferenceClient,
    options: &GenerationOptions,
    owner_id: &str,
    entry_id: i64,
) -> AppResult<EntryAnalysis> {
    let span = info_span!("analysis", entry_id);
    let _guard = span.enter();

    let entry = owned_entry(store, owner_id, entry_id)?;
    let raw = analyst.generate(&analysis_prompt(&entry.text), options)?;
    let created_at = journal::now();

    let analysis = match parse_analysis(&raw) {
        Some((summary, tags)) => NewAnalysis {
            entry_id,
            summary,
            tags,
            status: AnalysisStatus::Generated,
            created_at,
        },
        None => {
            warn!(
                output = %raw.chars().take(80).collect::<String>(),
                "Unusable analysis output, storing excerpt"
            );
            NewAnalysis::excerpt(entry_id, &entry.text, created_at)
        }
    };

    let id = store.append_analysis(&analysis).map_err(AppError::StoreWriteFailed)?;
    info!(analysis_id = id, status = %analysis.status, tags = analysis.tags.len(), "Analysis stored");
    Ok(EntryAnalysis::from_new(id, analysis))
}

/// Returns the latest stored analysis of an entry.
///
/// # Errors
///
/// Returns `AppError::Database` if the entry is missing, foreign, or unreadable.
pub fn get_analysis(store: &dyn EntryStore, owner_id: &str, entry_id: i64) -> AppResult<Option<EntryAnalysis>> {
    owned_entry(store, owner_id, entry_id)?;
    let analysis = store.latest_analysis(entry_id)?;
    debug!(entry_id, found = analysis.is_some(), "Analysis lookup");
    Ok(analysis)
}
