//! Follow-up conversation on an entry's reply.
//!
//! The writer can answer the reply an entry received and get a further
//! answer. Generation degrades the same way entry replies do: an endpoint
//! failure yields the fallback template, never an error. The writer's turn and
//! the answer are stored together or not at all.

use crate::ai::prompts::{follow_up_prompt, render_fallback};
use crate::ai::{GenerationOptions, InferenceClient};
use crate::db::EntryStore;
use crate::errors::{AppError, AppResult, DatabaseError, InferenceError};
use crate::journal::{self, DiaryEntry, EntryMessage, MessageBody, NewMessage, Reply, ReplyStatus};
use crate::ops::submit::PipelineSettings;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Result of a follow-up exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpReceipt {
    pub entry_id: i64,
    pub reply: Reply,
    pub created_at: DateTime<Utc>,
    /// The whole thread, including the two turns just stored.
    pub conversation: Vec<EntryMessage>,
}

impl FollowUpReceipt {
    pub fn reply_text(&self) -> Option<&str> {
        self.reply.text()
    }

    pub fn reply_status(&self) -> ReplyStatus {
        self.reply.status()
    }
}

#[derive(Serialize)]
struct FollowUpView<'a> {
    entry_id: i64,
    reply_text: Option<&'a str>,
    reply_status: ReplyStatus,
    created_at: DateTime<Utc>,
    conversation: &'a [EntryMessage],
}

impl Serialize for FollowUpReceipt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FollowUpView {
            entry_id: self.entry_id,
            reply_text: self.reply_text(),
            reply_status: self.reply_status(),
            created_at: self.created_at,
            conversation: &self.conversation,
        }
        .serialize(serializer)
    }
}

/// Loads an entry as seen by `owner_id`.
///
/// An entry owned by someone else is reported exactly like a missing one.
pub(crate) fn owned_entry(store: &dyn EntryStore, owner_id: &str, entry_id: i64) -> AppResult<DiaryEntry> {
    match store.get(entry_id)? {
        Some(entry) if entry.owner_id == owner_id.trim() => Ok(entry),
        _ => Err(DatabaseError::NotFound(format!("No entry with id {}", entry_id)).into()),
    }
}

fn generate(
    replier: &InferenceClient,
    options: &GenerationOptions,
    entry: &DiaryEntry,
    history: &[EntryMessage],
    message: &str,
) -> Result<String, InferenceError> {
    let answer = replier.generate(&follow_up_prompt(entry, history, message), options)?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(InferenceError::Upstream {
            status: None,
            message: "blank reply".to_string(),
        });
    }
    Ok(answer.to_string())
}

/// Answers the writer's follow-up `text` on entry `entry_id`.
///
/// # Errors
///
/// - `AppError::InvalidInput` for blank or oversize text, or a blank owner
/// - `AppError::Database(NotFound)` if the entry does not exist or belongs to
///   someone else (nothing stored)
/// - `AppError::StoreWriteFailed` if the turns could not be stored (nothing stored)
pub fn follow_up(
    store: &dyn EntryStore,
    replier: &InferenceClient,
    options: &GenerationOptions,
    settings: &PipelineSettings,
    owner_id: &str,
    entry_id: i64,
    text: &str,
) -> AppResult<FollowUpReceipt> {
    let exchange_id = Uuid::new_v4();
    let span = info_span!("follow_up", %exchange_id, entry_id);
    let _guard = span.enter();

    if owner_id.trim().is_empty() {
        return Err(AppError::InvalidInput("owner id is empty".to_string()));
    }
    let text = settings.validate_text(text)?;
    let received_at = journal::now();

    let entry = owned_entry(store, owner_id, entry_id)?;
    let mut conversation = store.list_messages(entry_id)?;
    debug!(turns = conversation.len(), "Loaded conversation");

    let reply = match generate(replier, options, &entry, &conversation, text) {
        Ok(answer) => Reply::Generated(answer),
        Err(e) => {
            warn!(error = %e, "Follow-up generation failed, using fallback");
            match render_fallback(&settings.fallback_template, entry.mood) {
                Some(text) => Reply::Fallback(text),
                None => Reply::Failed,
            }
        }
    };

    let answered_at = journal::now();
    let turns = vec![
        NewMessage {
            entry_id,
            body: MessageBody::User(text.to_string()),
            created_at: received_at,
        },
        NewMessage {
            entry_id,
            body: MessageBody::Assistant(reply.clone()),
            created_at: answered_at,
        },
    ];
    let ids = store.append_messages(&turns).map_err(AppError::StoreWriteFailed)?;
    conversation.extend(ids.into_iter().zip(turns).map(|(id, turn)| EntryMessage::from_new(id, turn)));

    if reply.status() == ReplyStatus::Generated {
        info!(turns = conversation.len(), "Follow-up stored");
    } else {
        warn!(reply_status = %reply.status(), "Follow-up stored with degraded reply");
    }

    Ok(FollowUpReceipt {
        entry_id,
        reply,
        created_at: answered_at,
        conversation,
    })
}
