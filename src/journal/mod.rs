//! Diary entry records, the conversation and analysis attached to them, and
//! query windows.
//!
//! These are the types that flow between the operations, the store and the
//! stats aggregator. They carry no I/O.

mod analysis;
mod messages;

pub use analysis::{excerpt_summary, normalize_tags, AnalysisStatus, EntryAnalysis, NewAnalysis};
pub use messages::{EntryMessage, MessageBody, MessageRole, NewMessage};

use crate::constants;
use crate::mood::MoodLabel;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Current time at the precision timestamps are stored with (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Provenance marker for the reply text stored with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Generated,
    Fallback,
    Failed,
}

impl ReplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyStatus::Generated => "generated",
            ReplyStatus::Fallback => "fallback",
            ReplyStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(ReplyStatus::Generated),
            "fallback" => Ok(ReplyStatus::Fallback),
            "failed" => Ok(ReplyStatus::Failed),
            other => Err(format!("unknown reply status: {}", other)),
        }
    }
}

/// The supportive reply attached to an entry.
///
/// Text and provenance travel together, so a generated reply without text or a
/// failed reply with text cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Produced by the model.
    Generated(String),
    /// Rendered from the local template after generation failed.
    Fallback(String),
    /// No reply could be produced.
    Failed,
}

impl Reply {
    pub fn status(&self) -> ReplyStatus {
        match self {
            Reply::Generated(_) => ReplyStatus::Generated,
            Reply::Fallback(_) => ReplyStatus::Fallback,
            Reply::Failed => ReplyStatus::Failed,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Generated(text) | Reply::Fallback(text) => Some(text),
            Reply::Failed => None,
        }
    }

    /// Rebuilds a reply from its stored columns.
    ///
    /// Returns `None` when the columns disagree (text on a failed reply, or a
    /// missing text on a generated/fallback one).
    pub fn from_parts(status: ReplyStatus, text: Option<String>) -> Option<Reply> {
        match (status, text) {
            (ReplyStatus::Generated, Some(text)) => Some(Reply::Generated(text)),
            (ReplyStatus::Fallback, Some(text)) => Some(Reply::Fallback(text)),
            (ReplyStatus::Failed, None) => Some(Reply::Failed),
            _ => None,
        }
    }
}

/// A labeled entry ready to be appended; the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub owner_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub mood: MoodLabel,
    pub reply: Reply,
}

/// A persisted diary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DiaryEntry {
    pub id: i64,
    pub owner_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub mood: MoodLabel,
    pub reply: Reply,
}

impl DiaryEntry {
    pub fn from_new(id: i64, entry: NewEntry) -> Self {
        Self {
            id,
            owner_id: entry.owner_id,
            text: entry.text,
            created_at: entry.created_at,
            mood: entry.mood,
            reply: entry.reply,
        }
    }

    pub fn reply_status(&self) -> ReplyStatus {
        self.reply.status()
    }

    pub fn reply_text(&self) -> Option<&str> {
        self.reply.text()
    }
}

#[derive(Serialize)]
struct EntryView<'a> {
    id: i64,
    owner_id: &'a str,
    text: &'a str,
    created_at: DateTime<Utc>,
    mood_label: MoodLabel,
    reply_text: Option<&'a str>,
    reply_status: ReplyStatus,
}

/// Serializes with the flat `reply_text`/`reply_status` columns.
impl Serialize for DiaryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EntryView {
            id: self.id,
            owner_id: &self.owner_id,
            text: &self.text,
            created_at: self.created_at,
            mood_label: self.mood,
            reply_text: self.reply_text(),
            reply_status: self.reply_status(),
        }
        .serialize(serializer)
    }
}

/// Half-open window `[start, end)` over entry creation times.
///
/// A missing bound is unbounded on that side.
///
/// # Examples
///
/// ```
/// use moodlog::journal::TimeRange;
/// use chrono::{TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
/// let january = TimeRange::between(start, end).unwrap();
///
/// assert!(january.contains(start));
/// assert!(!january.contains(end));
/// assert!(TimeRange::all().contains(end));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// The unbounded window.
    pub fn all() -> Self {
        Self::default()
    }

    /// Everything at or after `start`.
    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns an error message if `end` is before `start`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        if end < start {
            return Err(format!("range end {} is before start {}", end, start));
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// The trailing `days` days ending at `now` (exclusive of anything after `now`).
    ///
    /// A window reaching back past the earliest representable time has no
    /// start bound.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        let start = Duration::try_days(i64::from(days)).and_then(|span| now.checked_sub_signed(span));
        Self {
            start,
            end: Some(now),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }

    /// Builds a range from command-line style arguments.
    ///
    /// `days` takes precedence over explicit bounds. Dates are accepted as
    /// `YYYY-MM-DD` or `YYYYMMDD` and read as UTC midnight; `until` is
    /// inclusive of its whole day.
    ///
    /// # Errors
    ///
    /// Returns a message describing an unparseable date or an inverted range.
    pub fn from_cli_args(
        days: Option<u32>,
        since: Option<&str>,
        until: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        if let Some(days) = days {
            return Ok(Self::last_days(days, now));
        }

        let start = since.map(parse_day_start).transpose()?;
        let end = until
            .map(|s| {
                parse_day_start(s)?
                    .checked_add_signed(Duration::days(1))
                    .ok_or_else(|| format!("date '{}' is out of range", s))
            })
            .transpose()?;

        match (start, end) {
            (Some(start), Some(end)) => Self::between(start, end),
            (start, end) => Ok(Self { start, end }),
        }
    }
}

/// Parses a date string in YYYY-MM-DD or YYYYMMDD format into UTC midnight.
pub fn parse_day_start(date_str: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(date_str, constants::DATE_FORMAT_ISO)
        .or_else(|_| NaiveDate::parse_from_str(date_str, constants::DATE_FORMAT_COMPACT))
        .map_err(|e| format!("invalid date '{}': {}", date_str, e))?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}
