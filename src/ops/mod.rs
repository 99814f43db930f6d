//! High-level operations for mood journaling.
//!
//! This module provides the caller-facing operations: submitting an entry
//! through the labeling pipeline, continuing the conversation on an entry,
//! analysing an entry, and reading mood trends back.

pub mod analyze;
pub mod converse;
pub mod submit;
pub mod trend;

// Re-export commonly used types and functions
pub use analyze::{analysis_options, analyze_entry, get_analysis, parse_analysis};
pub use converse::{follow_up, FollowUpReceipt};
pub use submit::{Draft, Pipeline, PipelineSettings, Stage, SubmissionReceipt};
pub use trend::{daily_breakdown, trend, DailyMood, MoodShare, MoodTrendSnapshot, PolarityCounts};
