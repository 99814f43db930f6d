//! Per-entry summary and topic tags.

use crate::constants::{ANALYSIS_EXCERPT_CHARS, ANALYSIS_MAX_TAGS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an analysis came from the model or from the local excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Generated,
    Fallback,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Generated => "generated",
            AnalysisStatus::Fallback => "fallback",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(AnalysisStatus::Generated),
            "fallback" => Ok(AnalysisStatus::Fallback),
            other => Err(format!("unknown analysis status: {}", other)),
        }
    }
}

/// An analysis ready to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnalysis {
    pub entry_id: i64,
    pub summary: String,
    pub tags: Vec<String>,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
}

impl NewAnalysis {
    /// Summary taken from the start of the entry text, with no tags.
    pub fn excerpt(entry_id: i64, entry_text: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            entry_id,
            summary: excerpt_summary(entry_text),
            tags: Vec::new(),
            status: AnalysisStatus::Fallback,
            created_at,
        }
    }
}

/// A stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryAnalysis {
    pub id: i64,
    pub entry_id: i64,
    pub summary: String,
    pub tags: Vec<String>,
    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
}

impl EntryAnalysis {
    pub fn from_new(id: i64, analysis: NewAnalysis) -> Self {
        Self {
            id,
            entry_id: analysis.entry_id,
            summary: analysis.summary,
            tags: analysis.tags,
            status: analysis.status,
            created_at: analysis.created_at,
        }
    }
}

/// First [`ANALYSIS_EXCERPT_CHARS`] characters of `text` followed by `...`,
/// or the whole trimmed text when it is shorter.
///
/// # Examples
///
/// ```
/// use moodlog::journal::excerpt_summary;
///
/// assert_eq!(excerpt_summary("  short day  "), "short day");
/// assert!(excerpt_summary(&"a".repeat(80)).ends_with("..."));
/// ```
pub fn excerpt_summary(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= ANALYSIS_EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(ANALYSIS_EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// Trims and lowercases tags, drops blanks and repeats, and keeps at most
/// [`ANALYSIS_MAX_TAGS`].
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if tag.is_empty() || normalized.contains(&tag) {
            continue;
        }
        normalized.push(tag);
        if normalized.len() == ANALYSIS_MAX_TAGS {
            break;
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_cuts_on_characters() {
        let text = "é".repeat(60);
        let summary = excerpt_summary(&text);
        assert_eq!(summary.chars().count(), ANALYSIS_EXCERPT_CHARS + 3);
        assert!(summary.ends_with("..."));

        let exact = "x".repeat(ANALYSIS_EXCERPT_CHARS);
        assert_eq!(excerpt_summary(&exact), exact);
    }

    #[test]
    fn test_tags_are_normalized_and_capped() {
        let tags = normalize_tags(["Work", " work ", "", "Family", "sleep", "  ", "running", "music", "travel"]);
        assert_eq!(tags, vec!["work", "family", "sleep", "running", "music"]);
    }

    #[test]
    fn test_excerpt_analysis_has_no_tags() {
        let analysis = NewAnalysis::excerpt(7, "A long walk by the river", Utc::now());
        assert_eq!(analysis.status, AnalysisStatus::Fallback);
        assert_eq!(analysis.summary, "A long walk by the river");
        assert!(analysis.tags.is_empty());
    }
}
