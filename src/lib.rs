/*!
# moodlog

moodlog is a mood journal. Each diary entry is labeled with a mood from a
closed set, answered with a short supportive reply from a language model, and
stored so mood trends can be computed over any time window.

## Core Features

- Submit an entry and get back its mood and a reply in one call
- Retry with exponential backoff against a slow or rate-limited inference endpoint
- Fall back to a templated reply when generation fails, without losing the entry
- Mood distribution and per-day breakdowns over arbitrary windows
- Continue the conversation on an entry's reply
- Summarize an entry and tag its topics

## Architecture

The codebase follows a modular architecture with clear separation of concerns:

- `ai`: Inference endpoint client, retry policy and prompts
- `mood`: Mood labels and classifiers
- `db`: SQLite entry store with connection pooling
- `journal`: Entry records, conversation turns, analyses and time windows
- `ops`: Submission pipeline, follow-up conversation, entry analysis and trend statistics
- `cli`: Command-line interface handling using clap
- `config`: Configuration loading and validation
- `errors`: Error handling infrastructure

## Usage Example

```rust,no_run
use moodlog::db::Database;
use moodlog::journal::TimeRange;
use moodlog::Config;
use std::sync::Arc;

fn main() -> moodlog::AppResult<()> {
    let config = Config::load()?;
    config.validate()?;

    let db = Database::open(&config.db_path)?;
    db.initialize_schema()?;

    let pipeline = config.build_pipeline(Arc::new(db))?;
    let receipt = pipeline.submit_entry("alice", "I feel great today")?;
    println!("{}: {:?}", receipt.mood, receipt.reply_text());

    let exchange = pipeline.follow_up("alice", receipt.entry_id, "Thank you!")?;
    println!("{:?}", exchange.reply_text());

    let trend = pipeline.get_trend("alice", &TimeRange::all())?;
    println!("{:?}", trend.dominant);
    Ok(())
}
```
*/

/// Inference client, retry policy and prompt construction
pub mod ai;
/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Application-wide constants and defaults
pub mod constants;
/// Entry storage
pub mod db;
/// Error types and utilities for error handling
pub mod errors;
/// Entry records and query windows
pub mod journal;
/// Mood taxonomy and classifiers
pub mod mood;
/// Caller-facing operations
pub mod ops;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use journal::{DiaryEntry, EntryAnalysis, EntryMessage, Reply, ReplyStatus, TimeRange};
pub use mood::MoodLabel;
pub use ops::{FollowUpReceipt, MoodTrendSnapshot, Pipeline, SubmissionReceipt};
