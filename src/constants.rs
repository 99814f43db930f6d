//! Constants used throughout the application.
//!
//! Defaults for every tunable live here so configuration, tests and the CLI
//! agree on the same values.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "moodlog";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "A mood journal that labels entries and answers with a supportive reply";

// Logging
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";

// Configuration Keys & Environment Variables
/// Path of the SQLite database file.
pub const ENV_VAR_DB: &str = "MOODLOG_DB";
/// Base URL of the inference endpoint.
pub const ENV_VAR_ENDPOINT: &str = "MOODLOG_ENDPOINT";
/// Model identifier sent with every inference request.
pub const ENV_VAR_MODEL: &str = "MOODLOG_MODEL";
/// Bearer token for the inference endpoint.
pub const ENV_VAR_API_TOKEN: &str = "MOODLOG_API_TOKEN";
/// Classifier selection (`lexicon` or `model`).
pub const ENV_VAR_CLASSIFIER: &str = "MOODLOG_CLASSIFIER";
/// Maximum generated tokens for a reply.
pub const ENV_VAR_MAX_TOKENS: &str = "MOODLOG_MAX_TOKENS";
/// Sampling temperature for replies.
pub const ENV_VAR_TEMPERATURE: &str = "MOODLOG_TEMPERATURE";
/// Per-attempt inference deadline in seconds.
pub const ENV_VAR_TIMEOUT_SECS: &str = "MOODLOG_TIMEOUT_SECS";
/// Total attempts per inference call.
pub const ENV_VAR_MAX_ATTEMPTS: &str = "MOODLOG_MAX_ATTEMPTS";
/// First backoff delay in milliseconds.
pub const ENV_VAR_BACKOFF_BASE_MS: &str = "MOODLOG_BACKOFF_BASE_MS";
/// Backoff ceiling in milliseconds.
pub const ENV_VAR_BACKOFF_MAX_MS: &str = "MOODLOG_BACKOFF_MAX_MS";
/// Maximum entry length in characters.
pub const ENV_VAR_MAX_ENTRY_CHARS: &str = "MOODLOG_MAX_ENTRY_CHARS";
/// Template used when no reply could be generated.
pub const ENV_VAR_FALLBACK_TEMPLATE: &str = "MOODLOG_FALLBACK_TEMPLATE";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";

// Defaults
/// Default database location, relative to the home directory.
pub const DEFAULT_DB_SUBPATH: &str = ".local/share/moodlog/moodlog.db";
/// Default classifier; works without an inference endpoint.
pub const DEFAULT_CLASSIFIER: &str = "lexicon";
/// Default inference endpoint (a local Ollama server).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3.2:3b";
/// Default cap on generated reply length.
pub const DEFAULT_MAX_TOKENS: u32 = 512;
/// Default reply sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default total attempts per inference call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default first backoff delay.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
/// Default backoff ceiling.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 8_000;
/// Growth factor between consecutive backoff delays.
pub const BACKOFF_MULTIPLIER: f64 = 2.0;
/// Default maximum entry length in characters.
pub const DEFAULT_MAX_ENTRY_CHARS: usize = 10_000;
/// Fallback reply. `{mood}` is replaced by the entry's mood label.
pub const DEFAULT_FALLBACK_TEMPLATE: &str = "Thank you for writing today. It sounds like you are feeling {mood}. Whatever today brought, taking a moment to reflect on it matters.";

// Classification
/// Generation cap for classifier calls; the answer is a tiny JSON object.
pub const CLASSIFY_MAX_TOKENS: u32 = 32;
/// Fixed sampling seed so model classification is repeatable.
pub const CLASSIFY_SEED: u64 = 42;

// Follow-up conversation and entry analysis
/// Most recent conversation turns included in a follow-up prompt.
pub const FOLLOW_UP_HISTORY_TURNS: usize = 20;
/// Generation cap for entry analysis.
pub const ANALYSIS_MAX_TOKENS: u32 = 256;
/// Fixed sampling seed so analyses are repeatable.
pub const ANALYSIS_SEED: u64 = 42;
/// Most tags kept per analysis.
pub const ANALYSIS_MAX_TAGS: usize = 5;
/// Length of the excerpt used when the model's analysis is unusable.
pub const ANALYSIS_EXCERPT_CHARS: usize = 50;

// Temperature bounds accepted by the endpoint.
/// Lowest accepted sampling temperature.
pub const MIN_TEMPERATURE: f32 = 0.0;
/// Highest accepted sampling temperature.
pub const MAX_TEMPERATURE: f32 = 2.0;

// Database
/// Maximum pooled SQLite connections.
pub const DB_POOL_SIZE: u32 = 8;
/// How long a writer waits on a locked database before failing, in milliseconds.
pub const DB_BUSY_TIMEOUT_MS: u64 = 5_000;

// Date/Time
/// Date format string for ISO date format (YYYY-MM-DD).
pub const DATE_FORMAT_ISO: &str = "%Y-%m-%d";
/// Date format string for compact date format (YYYYMMDD).
pub const DATE_FORMAT_COMPACT: &str = "%Y%m%d";
