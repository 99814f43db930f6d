//! Entry analysis append and lookup.
//!
//! Tags are stored as a JSON array in a single text column.

use crate::db::entries::{conversion_error, format_timestamp, parse_timestamp};
use crate::errors::DatabaseError;
use crate::journal::{AnalysisStatus, EntryAnalysis, NewAnalysis};
use rusqlite::{params, Connection, Row};
use tracing::debug;

fn row_to_analysis(row: &Row<'_>) -> rusqlite::Result<EntryAnalysis> {
    let tags: String = row.get(3)?;
    let tags: Vec<String> =
        serde_json::from_str(&tags).map_err(|e| conversion_error(3, format!("bad tags '{}': {}", tags, e)))?;

    let status: String = row.get(4)?;
    let status = status.parse::<AnalysisStatus>().map_err(|e| conversion_error(4, e))?;

    Ok(EntryAnalysis {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        summary: row.get(2)?,
        tags,
        status,
        created_at: parse_timestamp(row, 5)?,
    })
}

/// Appends an analysis and returns its id.
pub fn insert_analysis(conn: &Connection, analysis: &NewAnalysis) -> Result<i64, DatabaseError> {
    let tags = serde_json::to_string(&analysis.tags)
        .map_err(|e| DatabaseError::Custom(format!("Failed to encode tags: {}", e)))?;

    conn.execute(
        r#"
        INSERT INTO entry_analyses (entry_id, summary, tags, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            analysis.entry_id,
            analysis.summary,
            tags,
            analysis.status.as_str(),
            format_timestamp(analysis.created_at),
        ],
    )?;

    let analysis_id = conn.last_insert_rowid();
    debug!("Analysis {} appended for entry {}", analysis_id, analysis.entry_id);
    Ok(analysis_id)
}

/// Returns the most recent analysis of an entry, if any.
pub fn latest_analysis(conn: &Connection, entry_id: i64) -> Result<Option<EntryAnalysis>, DatabaseError> {
    let result = conn.query_row(
        r#"
        SELECT id, entry_id, summary, tags, status, created_at
        FROM entry_analyses
        WHERE entry_id = ?1
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
        params![entry_id],
        row_to_analysis,
    );

    match result {
        Ok(analysis) => Ok(Some(analysis)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::Sqlite(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entries::insert_entry;
    use crate::journal::{NewEntry, Reply};
    use crate::mood::MoodLabel;
    use chrono::{Duration, Utc};

    fn setup_test_db() -> (Connection, i64) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::create_tables(&conn).unwrap();
        let entry_id = insert_entry(
            &conn,
            &NewEntry {
                owner_id: "alice".into(),
                text: "Long run along the coast, then dinner with my sister".into(),
                created_at: Utc::now(),
                mood: MoodLabel::Joy,
                reply: Reply::Generated("Sounds lovely.".into()),
            },
        )
        .unwrap();
        (conn, entry_id)
    }

    #[test]
    fn test_latest_analysis_wins() {
        let (conn, entry_id) = setup_test_db();
        let now = crate::journal::now();

        let first = NewAnalysis::excerpt(entry_id, "Long run along the coast", now);
        insert_analysis(&conn, &first).unwrap();

        let second = NewAnalysis {
            entry_id,
            summary: "A run and a family dinner".into(),
            tags: vec!["running".into(), "family".into()],
            status: AnalysisStatus::Generated,
            created_at: now + Duration::seconds(1),
        };
        let id = insert_analysis(&conn, &second).unwrap();

        let latest = latest_analysis(&conn, entry_id).unwrap().unwrap();
        assert_eq!(latest, EntryAnalysis::from_new(id, second));
    }

    #[test]
    fn test_entry_without_analysis() {
        let (conn, entry_id) = setup_test_db();
        assert!(latest_analysis(&conn, entry_id).unwrap().is_none());
    }

    #[test]
    fn test_empty_tags_round_trip() {
        let (conn, entry_id) = setup_test_db();
        insert_analysis(&conn, &NewAnalysis::excerpt(entry_id, "text", Utc::now())).unwrap();

        let stored: String = conn
            .query_row("SELECT tags FROM entry_analyses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, "[]");
        assert!(latest_analysis(&conn, entry_id).unwrap().unwrap().tags.is_empty());
    }
}
