//! Conversation turn append and query operations.

use crate::db::entries::{conversion_error, format_timestamp, parse_timestamp};
use crate::errors::DatabaseError;
use crate::journal::{EntryMessage, MessageBody, MessageRole, NewMessage, ReplyStatus};
use rusqlite::{params, Connection, Row};
use tracing::debug;

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<EntryMessage> {
    let role: String = row.get(2)?;
    let role = role.parse::<MessageRole>().map_err(|e| conversion_error(2, e))?;

    let text: Option<String> = row.get(3)?;
    let status: Option<String> = row.get(4)?;
    let status = status
        .map(|s| s.parse::<ReplyStatus>())
        .transpose()
        .map_err(|e| conversion_error(4, e))?;

    let body = MessageBody::from_parts(role, text, status)
        .ok_or_else(|| conversion_error(3, format!("message columns inconsistent with role {}", role)))?;

    Ok(EntryMessage {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        body,
        created_at: parse_timestamp(row, 5)?,
    })
}

/// Appends `messages` in one transaction and returns their ids in order.
///
/// Either every message is stored or none is.
///
/// # Errors
///
/// Returns an error if any insert fails; the transaction is rolled back.
pub fn insert_messages(conn: &mut Connection, messages: &[NewMessage]) -> Result<Vec<i64>, DatabaseError> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(messages.len());
    {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO entry_messages (entry_id, role, text, reply_status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;
        for message in messages {
            stmt.execute(params![
                message.entry_id,
                message.body.role().as_str(),
                message.body.text(),
                message.body.reply_status().map(|s| s.as_str()),
                format_timestamp(message.created_at),
            ])?;
            ids.push(tx.last_insert_rowid());
        }
    }
    tx.commit()?;

    debug!("Appended {} messages", ids.len());
    Ok(ids)
}

/// Lists the conversation for an entry, oldest first.
pub fn list_messages(conn: &Connection, entry_id: i64) -> Result<Vec<EntryMessage>, DatabaseError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, entry_id, role, text, reply_status, created_at
        FROM entry_messages
        WHERE entry_id = ?1
        ORDER BY created_at ASC, id ASC
        "#,
    )?;

    let messages = stmt
        .query_map(params![entry_id], row_to_message)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Found {} messages for entry {}", messages.len(), entry_id);
    Ok(messages)
}
