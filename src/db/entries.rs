//! Entry append and query operations.
//!
//! Entries are append-only: there is no update or delete here. Timestamps are
//! stored as RFC 3339 UTC strings with fixed microsecond precision, so textual
//! order in SQLite equals chronological order.

use crate::errors::DatabaseError;
use crate::journal::{DiaryEntry, NewEntry, Reply, ReplyStatus, TimeRange};
use crate::mood::MoodLabel;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::debug;

const ENTRY_COLUMNS: &str = "id, owner_id, text, created_at, mood_label, reply_text, reply_status";

/// Formats a timestamp the way it is stored.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// Reads a stored timestamp column.
pub(crate) fn parse_timestamp(row: &Row<'_>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, format!("bad timestamp '{}': {}", raw, e)))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<DiaryEntry> {
    let created_at = parse_timestamp(row, 3)?;

    let mood: String = row.get(4)?;
    let mood = mood.parse::<MoodLabel>().map_err(|e| conversion_error(4, e))?;

    let reply_text: Option<String> = row.get(5)?;
    let reply_status: String = row.get(6)?;
    let reply_status = reply_status
        .parse::<ReplyStatus>()
        .map_err(|e| conversion_error(6, e))?;
    let reply = Reply::from_parts(reply_status, reply_text)
        .ok_or_else(|| conversion_error(5, format!("reply text inconsistent with status {}", reply_status)))?;

    Ok(DiaryEntry {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        text: row.get(2)?,
        created_at,
        mood,
        reply,
    })
}

/// Appends a labeled entry and returns its new id.
///
/// A single `INSERT`, so concurrent appends never interleave partial rows.
///
/// # Errors
///
/// Returns an error if the database operation fails or a constraint rejects the row.
pub fn insert_entry(conn: &Connection, entry: &NewEntry) -> Result<i64, DatabaseError> {
    debug!(
        "Appending entry for owner {} with mood {}",
        entry.owner_id, entry.mood
    );

    conn.execute(
        r#"
        INSERT INTO entries (owner_id, text, created_at, mood_label, reply_text, reply_status)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            entry.owner_id,
            entry.text,
            format_timestamp(entry.created_at),
            entry.mood.as_str(),
            entry.reply.text(),
            entry.reply.status().as_str(),
        ],
    )?;

    let entry_id = conn.last_insert_rowid();
    debug!("Entry appended with id {}", entry_id);
    Ok(entry_id)
}

/// Lists an owner's entries inside `range`, oldest first.
///
/// Entries sharing a timestamp are returned in insertion order.
///
/// # Errors
///
/// Returns an error if the query fails or a stored row cannot be decoded.
pub fn list_entries_by_owner(
    conn: &Connection,
    owner_id: &str,
    range: &TimeRange,
) -> Result<Vec<DiaryEntry>, DatabaseError> {
    debug!("Listing entries for owner {} in {:?}", owner_id, range);

    let start = range.start.map(format_timestamp);
    let end = range.end.map(format_timestamp);

    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {}
        FROM entries
        WHERE owner_id = ?1
          AND (?2 IS NULL OR created_at >= ?2)
          AND (?3 IS NULL OR created_at < ?3)
        ORDER BY created_at ASC, id ASC
        "#,
        ENTRY_COLUMNS
    ))?;

    let entries = stmt
        .query_map(params![owner_id, start, end], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Found {} entries", entries.len());
    Ok(entries)
}

/// Retrieves an entry by id.
///
/// Returns `Ok(None)` if no entry exists with that id.
pub fn get_entry(conn: &Connection, entry_id: i64) -> Result<Option<DiaryEntry>, DatabaseError> {
    debug!("Getting entry id {}", entry_id);

    let result = conn.query_row(
        &format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS),
        params![entry_id],
        row_to_entry,
    );

    match result {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::Sqlite(e)),
    }
}
