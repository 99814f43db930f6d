//! Submission pipeline: validate, classify, reply, persist.
//!
//! A submission moves through the explicit [`Stage`] machine:
//!
//! ```text
//! Received -> Classified -> Replied     -> Persisted
//!                        \-> ReplyFailed -> Persisted
//! ```
//!
//! Reply generation happens while leaving `Classified`: the inference call
//! either yields `Replied` with the generated text or gives up at `ReplyFailed`.
//!
//! Classification and storage failures abort the submission. Reply failures
//! never do: the entry is stored with a fallback reply, or with no reply at all.

use crate::ai::prompts::{render_fallback, reply_prompt};
use crate::ai::{GenerationOptions, InferenceClient};
use crate::db::EntryStore;
use crate::errors::{AppError, AppResult, InferenceError};
use crate::journal::{self, DiaryEntry, EntryAnalysis, NewEntry, Reply, ReplyStatus, TimeRange};
use crate::mood::{MoodClassifier, MoodLabel};
use crate::ops::analyze::{analysis_options, analyze_entry};
use crate::ops::converse::{follow_up, FollowUpReceipt};
use crate::ops::trend::{trend, MoodTrendSnapshot};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// A validated submission that has not been labeled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub owner_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    fn into_entry(self, mood: MoodLabel, reply: Reply) -> NewEntry {
        NewEntry {
            owner_id: self.owner_id,
            text: self.text,
            created_at: self.created_at,
            mood,
            reply,
        }
    }
}

/// Where a submission currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Input validated and timestamped.
    Received(Draft),
    /// Mood label assigned.
    Classified { draft: Draft, mood: MoodLabel },
    /// Generation succeeded; the entry and its reply are ready to be stored.
    Replied(NewEntry),
    /// Generation gave up; a fallback will be rendered before storing.
    ReplyFailed { draft: Draft, mood: MoodLabel },
    /// Durably stored. Terminal.
    Persisted(DiaryEntry),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Received(_) => "received",
            Stage::Classified { .. } => "classified",
            Stage::Replied(_) => "replied",
            Stage::ReplyFailed { .. } => "reply_failed",
            Stage::Persisted(_) => "persisted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Persisted(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a successful submission.
///
/// A degraded reply is still a success; check [`reply_status`](Self::reply_status).
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub entry_id: i64,
    pub mood: MoodLabel,
    pub reply: Reply,
    pub created_at: DateTime<Utc>,
}

impl SubmissionReceipt {
    pub fn reply_text(&self) -> Option<&str> {
        self.reply.text()
    }

    pub fn reply_status(&self) -> ReplyStatus {
        self.reply.status()
    }
}

impl From<DiaryEntry> for SubmissionReceipt {
    fn from(entry: DiaryEntry) -> Self {
        Self {
            entry_id: entry.id,
            mood: entry.mood,
            reply: entry.reply,
            created_at: entry.created_at,
        }
    }
}

#[derive(Serialize)]
struct ReceiptView<'a> {
    entry_id: i64,
    mood_label: MoodLabel,
    reply_text: Option<&'a str>,
    reply_status: ReplyStatus,
    created_at: DateTime<Utc>,
}

impl Serialize for SubmissionReceipt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReceiptView {
            entry_id: self.entry_id,
            mood_label: self.mood,
            reply_text: self.reply_text(),
            reply_status: self.reply_status(),
            created_at: self.created_at,
        }
        .serialize(serializer)
    }
}

/// Tunables that shape a submission but not its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Maximum entry length in characters, after trimming.
    pub max_entry_chars: usize,
    /// Fallback reply template; `{mood}` is substituted.
    pub fallback_template: String,
}

impl PipelineSettings {
    /// Trims `text` and checks it is non-blank and within `max_entry_chars`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` describing the violation.
    pub fn validate_text<'a>(&self, text: &'a str) -> AppResult<&'a str> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidInput("entry text is empty".to_string()));
        }
        let chars = text.chars().count();
        if chars > self.max_entry_chars {
            return Err(AppError::InvalidInput(format!(
                "entry text is {} characters, the maximum is {}",
                chars, self.max_entry_chars
            )));
        }
        Ok(text)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_entry_chars: crate::constants::DEFAULT_MAX_ENTRY_CHARS,
            fallback_template: crate::constants::DEFAULT_FALLBACK_TEMPLATE.to_string(),
        }
    }
}

/// Orchestrates submissions.
///
/// Holds no per-submission state, so a single instance can be shared across
/// threads and used for concurrent submissions.
pub struct Pipeline {
    store: Arc<dyn EntryStore>,
    classifier: Arc<dyn MoodClassifier>,
    replier: InferenceClient,
    reply_options: GenerationOptions,
    settings: PipelineSettings,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("classifier", &self.classifier.name())
            .field("replier", &self.replier)
            .field("reply_options", &self.reply_options)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn EntryStore>,
        classifier: Arc<dyn MoodClassifier>,
        replier: InferenceClient,
        reply_options: GenerationOptions,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            classifier,
            replier,
            reply_options,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Validates a submission and enters the machine at [`Stage::Received`].
    ///
    /// Text is trimmed before checking and storing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if the owner id is blank, the text is
    /// blank, or the text is longer than `max_entry_chars` characters.
    pub fn receive(&self, owner_id: &str, text: &str) -> AppResult<Stage> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(AppError::InvalidInput("owner id is empty".to_string()));
        }

        let text = self.settings.validate_text(text)?;

        Ok(Stage::Received(Draft {
            owner_id: owner_id.to_string(),
            text: text.to_string(),
            created_at: journal::now(),
        }))
    }

    /// Performs one transition.
    ///
    /// `Persisted` is terminal and is returned unchanged.
    ///
    /// # Errors
    ///
    /// - `AppError::ClassificationFailed` from `Received`
    /// - `AppError::StoreWriteFailed` from `Replied` or `ReplyFailed`
    pub fn advance(&self, stage: Stage) -> AppResult<Stage> {
        match stage {
            Stage::Received(draft) => {
                let mood = self.classifier.classify(&draft.text)?;
                Ok(Stage::Classified { draft, mood })
            }
            Stage::Classified { draft, mood } => {
                match self.generate_reply(&draft.text, mood) {
                    Ok(text) => Ok(Stage::Replied(draft.into_entry(mood, Reply::Generated(text)))),
                    Err(e) => {
                        warn!(error = %e, "Reply generation failed, using fallback");
                        Ok(Stage::ReplyFailed { draft, mood })
                    }
                }
            }
            Stage::Replied(entry) => self.persist(entry),
            Stage::ReplyFailed { draft, mood } => {
                let reply = match render_fallback(&self.settings.fallback_template, mood) {
                    Some(text) => Reply::Fallback(text),
                    None => Reply::Failed,
                };
                self.persist(draft.into_entry(mood, reply))
            }
            Stage::Persisted(entry) => Ok(Stage::Persisted(entry)),
        }
    }

    fn generate_reply(&self, text: &str, mood: MoodLabel) -> Result<String, InferenceError> {
        let reply = self.replier.generate(&reply_prompt(text, mood), &self.reply_options)?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(InferenceError::Upstream {
                status: None,
                message: "blank reply".to_string(),
            });
        }
        Ok(reply.to_string())
    }

    fn persist(&self, entry: NewEntry) -> AppResult<Stage> {
        let id = self.store.append(&entry).map_err(AppError::StoreWriteFailed)?;
        Ok(Stage::Persisted(DiaryEntry::from_new(id, entry)))
    }

    /// Accepts an entry, labels it, attaches a reply and stores it.
    ///
    /// Returns only after the entry is durably stored. Reply generation
    /// failures degrade the reply instead of failing the call.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidInput` for blank or oversize input
    /// - `AppError::ClassificationFailed` if no mood could be assigned (nothing stored)
    /// - `AppError::StoreWriteFailed` if the append failed (safe to resubmit)
    pub fn submit_entry(&self, owner_id: &str, text: &str) -> AppResult<SubmissionReceipt> {
        let submission_id = Uuid::new_v4();
        let span = info_span!("submission", %submission_id, owner_id = %owner_id);
        let _guard = span.enter();

        let mut stage = self.receive(owner_id, text)?;
        debug!(stage = %stage, classifier = self.classifier.name(), "Submission received");

        let entry = loop {
            match stage {
                Stage::Persisted(entry) => break entry,
                other => {
                    stage = self.advance(other)?;
                    debug!(stage = %stage, "Stage transition");
                }
            }
        };

        let receipt = SubmissionReceipt::from(entry);
        if receipt.reply_status() == ReplyStatus::Generated {
            info!(entry_id = receipt.entry_id, mood = %receipt.mood, "Entry stored");
        } else {
            warn!(
                entry_id = receipt.entry_id,
                mood = %receipt.mood,
                reply_status = %receipt.reply_status(),
                "Entry stored with degraded reply"
            );
        }
        Ok(receipt)
    }

    /// Answers the writer's follow-up on one of their entries.
    ///
    /// See [`follow_up`] for the error cases.
    pub fn follow_up(&self, owner_id: &str, entry_id: i64, text: &str) -> AppResult<FollowUpReceipt> {
        follow_up(
            self.store.as_ref(),
            &self.replier,
            &self.reply_options,
            &self.settings,
            owner_id,
            entry_id,
            text,
        )
    }

    /// Summarizes and tags one of the writer's entries.
    ///
    /// Uses the reply client's endpoint and timeout at zero temperature.
    /// See [`analyze_entry`] for the error cases.
    pub fn analyze_entry(&self, owner_id: &str, entry_id: i64) -> AppResult<EntryAnalysis> {
        let options = analysis_options(self.reply_options.timeout);
        analyze_entry(self.store.as_ref(), &self.replier, &options, owner_id, entry_id)
    }

    /// Computes the mood distribution for an owner over `range`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store cannot be read.
    pub fn get_trend(&self, owner_id: &str, range: &TimeRange) -> AppResult<MoodTrendSnapshot> {
        trend(self.store.as_ref(), owner_id, range)
    }
}
