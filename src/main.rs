/*!
# moodlog - A Mood Journal

moodlog records diary entries, labels each with a mood, answers with a short
supportive reply from a language model, and reports how moods trend over time.

This file contains the main application flow: logging setup, configuration,
and dispatch to the library operations.

## Usage

```
moodlog [OPTIONS] <COMMAND>

Commands:
  submit  Record a diary entry and print its mood and reply
  trend   Show the mood distribution over a window
  daily   Show mood counts per day
  list    List entries, oldest first
  show    Show a single entry with its conversation and latest analysis
  reply   Answer the reply to an entry and get a further reply
  analyze Summarize an entry and tag its topics

Options:
      --json                      Print results as JSON
      --log-format <LOG_FORMAT>   Log output format [default: text] [possible values: text, json]
  -v, --verbose                   Print verbose output
  -h, --help                      Print help
  -V, --version                   Print version
```

## Configuration

All settings come from `MOODLOG_*` environment variables; see the `config`
module. Logging honours `RUST_LOG`.
*/

use chrono::Utc;
use moodlog::cli::{CliArgs, Command, RangeArgs};
use moodlog::config::Config;
use moodlog::constants::{DEFAULT_LOG_LEVEL, TRACING_ROOT_SPAN_NAME};
use moodlog::db::{Database, EntryStore};
use moodlog::errors::{AppError, AppResult, DatabaseError};
use moodlog::journal::{DiaryEntry, EntryAnalysis, EntryMessage, MessageRole, TimeRange};
use moodlog::ops::{daily_breakdown, DailyMood, FollowUpReceipt, MoodTrendSnapshot, SubmissionReceipt};
use serde::Serialize;
use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Longest entry excerpt shown by `list`.
const LIST_EXCERPT_CHARS: usize = 60;

/// Everything `show` prints about an entry.
#[derive(Serialize)]
struct EntryDetail {
    #[serde(flatten)]
    entry: DiaryEntry,
    conversation: Vec<EntryMessage>,
    analysis: Option<EntryAnalysis>,
}

fn init_tracing(args: &CliArgs) {
    let default_level = if args.verbose { "debug" } else { DEFAULT_LOG_LEVEL };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdout carries only command output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if args.json_logs() {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// The main entry point for moodlog.
///
/// 1. Parses command-line arguments
/// 2. Initializes logging
/// 3. Loads and validates configuration
/// 4. Opens the database
/// 5. Runs the requested command
fn main() -> ExitCode {
    let args = CliArgs::parse_args();
    init_tracing(&args);

    let invocation_id = Uuid::new_v4();
    let span = info_span!(TRACING_ROOT_SPAN_NAME, %invocation_id);
    let _guard = span.enter();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Errors are logged once, here at the application boundary
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> AppResult<()> {
    debug!("CLI arguments: {:?}", args);

    info!("Loading configuration");
    let config = Config::load()?;
    config.validate()?;
    debug!("Configuration: {:?}", config);

    let db = Database::open(&config.db_path)?;
    db.initialize_schema()?;
    let store: Arc<dyn EntryStore> = Arc::new(db);

    match &args.command {
        Command::Submit { owner, text } => {
            let text = text_or_stdin(text.as_deref())?;
            let pipeline = config.build_pipeline(store)?;
            let receipt = pipeline.submit_entry(owner, &text)?;
            output(args, &receipt, print_receipt)
        }
        Command::Trend { owner, range } => {
            let snapshot = moodlog::ops::trend(store.as_ref(), owner, &resolve(range)?)?;
            output(args, &snapshot, print_trend)
        }
        Command::Daily { owner, range } => {
            let days = daily_breakdown(store.as_ref(), owner, &resolve(range)?)?;
            output(args, &days, |days: &Vec<DailyMood>| print_daily(days))
        }
        Command::List { owner, range } => {
            let entries = store.list_by_owner(owner, &resolve(range)?)?;
            output(args, &entries, |entries: &Vec<DiaryEntry>| print_list(entries))
        }
        Command::Show { id } => {
            let entry = store
                .get(*id)?
                .ok_or_else(|| DatabaseError::NotFound(format!("No entry with id {}", id)))?;
            let detail = EntryDetail {
                conversation: store.list_messages(entry.id)?,
                analysis: store.latest_analysis(entry.id)?,
                entry,
            };
            output(args, &detail, print_detail)
        }
        Command::Reply { id, owner, text } => {
            let text = text_or_stdin(text.as_deref())?;
            let pipeline = config.build_pipeline(store)?;
            let receipt = pipeline.follow_up(owner, *id, &text)?;
            output(args, &receipt, print_follow_up)
        }
        Command::Analyze { id, owner } => {
            let pipeline = config.build_pipeline(store)?;
            let analysis = pipeline.analyze_entry(owner, *id)?;
            output(args, &analysis, print_analysis)
        }
    }
}

fn text_or_stdin(text: Option<&str>) -> AppResult<String> {
    match text {
        Some(text) => Ok(text.to_string()),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn resolve(range: &RangeArgs) -> AppResult<TimeRange> {
    range
        .to_range(Utc::now())
        .map_err(|e| AppError::InvalidInput(format!("Invalid date range: {}", e)))
}

fn output<T: Serialize>(args: &CliArgs, value: &T, human: impl Fn(&T)) -> AppResult<()> {
    if args.json {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
        println!("{}", json);
    } else {
        human(value);
    }
    Ok(())
}

fn print_receipt(receipt: &SubmissionReceipt) {
    println!("Entry #{} recorded", receipt.entry_id);
    println!("Mood: {}", receipt.mood);
    match receipt.reply_text() {
        Some(text) => println!("Reply ({}): {}", receipt.reply_status(), text),
        None => println!("Reply: unavailable"),
    }
}

fn print_trend(snapshot: &MoodTrendSnapshot) {
    println!(
        "Mood trend for {} ({} entries)",
        snapshot.owner_id, snapshot.total
    );
    for share in &snapshot.moods {
        println!(
            "  {:<8} {:>4}  {:>5.1}%",
            share.mood.as_str(),
            share.count,
            share.percent
        );
    }
    match snapshot.dominant {
        Some(mood) => println!("Dominant: {}", mood),
        None => println!("Dominant: none"),
    }
    println!(
        "Polarity: {} positive, {} neutral, {} negative",
        snapshot.polarity.positive, snapshot.polarity.neutral, snapshot.polarity.negative
    );
}

fn print_daily(days: &[DailyMood]) {
    if days.is_empty() {
        println!("No entries in range");
        return;
    }
    for day in days {
        let counts = day
            .counts
            .iter()
            .map(|(mood, count)| format!("{} {}", mood, count))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{}  {:>3} entries  dominant: {:<8} ({})",
            day.date, day.total, day.dominant.as_str(), counts
        );
    }
}

fn excerpt(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > LIST_EXCERPT_CHARS || text.lines().nth(1).is_some() {
        let cut: String = first_line.chars().take(LIST_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    } else {
        first_line.to_string()
    }
}

fn print_list(entries: &[DiaryEntry]) {
    if entries.is_empty() {
        println!("No entries in range");
        return;
    }
    for entry in entries {
        println!(
            "#{:<5} {}  {:<8} {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.mood.as_str(),
            excerpt(&entry.text)
        );
    }
}

fn print_turn(turn: &EntryMessage) {
    match (turn.role(), turn.text()) {
        (MessageRole::User, Some(text)) => println!("  You: {}", text),
        (MessageRole::Assistant, Some(text)) => {
            let status = turn.body.reply_status().map(|s| s.as_str()).unwrap_or_default();
            println!("  Reply ({}): {}", status, text)
        }
        (_, None) => println!("  Reply: unavailable"),
    }
}

fn print_analysis(analysis: &EntryAnalysis) {
    println!("Summary ({}): {}", analysis.status, analysis.summary);
    if analysis.tags.is_empty() {
        println!("Tags: none");
    } else {
        println!("Tags: {}", analysis.tags.join(", "));
    }
}

fn print_detail(detail: &EntryDetail) {
    let entry = &detail.entry;
    println!("Entry #{} by {}", entry.id, entry.owner_id);
    println!("Created: {}", entry.created_at.to_rfc3339());
    println!("Mood: {} ({})", entry.mood, entry.mood.polarity().as_str());
    println!();
    println!("{}", entry.text);
    println!();
    match entry.reply_text() {
        Some(text) => println!("Reply ({}): {}", entry.reply_status(), text),
        None => println!("Reply: unavailable"),
    }
    if !detail.conversation.is_empty() {
        println!();
        println!("Conversation:");
        detail.conversation.iter().for_each(print_turn);
    }
    if let Some(analysis) = &detail.analysis {
        println!();
        print_analysis(analysis);
    }
}

fn print_follow_up(receipt: &FollowUpReceipt) {
    match receipt.reply_text() {
        Some(text) => println!("Reply ({}): {}", receipt.reply_status(), text),
        None => println!("Reply: unavailable"),
    }
    println!("Conversation on entry #{} now has {} messages", receipt.entry_id, receipt.conversation.len());
}
