use crate::constants::{APP_DESCRIPTION, APP_NAME, LOG_FORMAT_JSON, LOG_FORMAT_TEXT};
use crate::journal::TimeRange;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

/// A mood journal that labels entries and answers with a supportive reply
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION)]
#[command(author, version, long_about = None)]
pub struct CliArgs {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log output format
    #[arg(long, global = true, default_value = LOG_FORMAT_TEXT, value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON])]
    pub log_format: String,

    /// Print verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Record a diary entry and print its mood and reply
    Submit {
        /// Owner of the entry
        #[arg(short = 'o', long)]
        owner: String,

        /// Entry text; read from standard input when omitted
        text: Option<String>,
    },

    /// Show the mood distribution over a window
    Trend {
        #[arg(short = 'o', long)]
        owner: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Show mood counts per day
    Daily {
        #[arg(short = 'o', long)]
        owner: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// List entries, oldest first
    List {
        #[arg(short = 'o', long)]
        owner: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Show a single entry with its conversation and latest analysis
    Show {
        /// Entry id
        id: i64,
    },

    /// Answer the reply to an entry and get a further reply
    Reply {
        /// Entry id
        id: i64,

        #[arg(short = 'o', long)]
        owner: String,

        /// Message text; read from standard input when omitted
        text: Option<String>,
    },

    /// Summarize an entry and tag its topics
    Analyze {
        /// Entry id
        id: i64,

        #[arg(short = 'o', long)]
        owner: String,
    },
}

/// Time window selection shared by the read commands.
#[derive(Args, Debug, Default, PartialEq, Eq)]
pub struct RangeArgs {
    /// Only the last N days
    #[arg(short = 'n', long, conflicts_with_all = &["since", "until"])]
    pub days: Option<u32>,

    /// Start date, inclusive (format: YYYY-MM-DD or YYYYMMDD)
    #[arg(short = 's', long)]
    pub since: Option<String>,

    /// End date, inclusive (format: YYYY-MM-DD or YYYYMMDD)
    #[arg(short = 'u', long)]
    pub until: Option<String>,
}

impl RangeArgs {
    /// Resolves the arguments against `now`.
    pub fn to_range(&self, now: DateTime<Utc>) -> Result<TimeRange, String> {
        TimeRange::from_cli_args(self.days, self.since.as_deref(), self.until.as_deref(), now)
    }
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == LOG_FORMAT_JSON
    }
}
