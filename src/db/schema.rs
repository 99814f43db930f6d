//! Database schema definitions and initialization.
//!
//! The `entries` table enforces the record invariants at the storage layer as
//! well: a row cannot exist without a mood label from the closed set, and
//! `reply_text` is NULL exactly when `reply_status` is `failed`. The
//! conversation and analysis tables carry the same kind of checks.

use crate::errors::DatabaseError;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
///
/// Increment this whenever schema changes are made to support future migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Creates all database tables and indexes.
///
/// This function is idempotent - it uses `CREATE TABLE IF NOT EXISTS`
/// so it's safe to call multiple times.
///
/// # Tables
///
/// - `entries`: diary entries with their mood label and reply
/// - `entry_messages`: follow-up conversation turns (version 2)
/// - `entry_analyses`: summaries and tags (version 2)
/// - `schema_version`: applied schema versions
///
/// A version 1 database gains the version 2 tables and a new version row.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub fn create_tables(conn: &Connection) -> Result<(), DatabaseError> {
    debug!("Creating database tables");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL CHECK(length(owner_id) > 0),
            text TEXT NOT NULL CHECK(length(text) > 0),
            created_at TEXT NOT NULL,
            mood_label TEXT NOT NULL
                CHECK(mood_label IN ('joy', 'sadness', 'anger', 'fear', 'calm', 'neutral')),
            reply_text TEXT,
            reply_status TEXT NOT NULL
                CHECK(reply_status IN ('generated', 'fallback', 'failed')),
            CHECK((reply_status = 'failed') = (reply_text IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_entries_owner_created ON entries(owner_id, created_at);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entry_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL REFERENCES entries(id),
            role TEXT NOT NULL CHECK(role IN ('user', 'assistant')),
            text TEXT,
            reply_status TEXT CHECK(reply_status IN ('generated', 'fallback', 'failed')),
            created_at TEXT NOT NULL,
            CHECK(
                (role = 'user' AND reply_status IS NULL
                    AND text IS NOT NULL AND length(text) > 0)
                OR (role = 'assistant' AND reply_status IS NOT NULL
                    AND (reply_status = 'failed') = (text IS NULL))
            )
        );

        CREATE INDEX IF NOT EXISTS idx_entry_messages_entry ON entry_messages(entry_id, created_at);

        CREATE TABLE IF NOT EXISTS entry_analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id INTEGER NOT NULL REFERENCES entries(id),
            summary TEXT NOT NULL CHECK(length(summary) > 0),
            tags TEXT NOT NULL CHECK(json_valid(tags) AND json_type(tags) = 'array'),
            status TEXT NOT NULL CHECK(status IN ('generated', 'fallback')),
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entry_analyses_entry ON entry_analyses(entry_id);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;

    // Record schema version if older or not yet recorded
    let current_version = get_schema_version(conn)?;
    match current_version {
        Some(version) if version >= SCHEMA_VERSION => {
            debug!("Schema version already recorded: {}", version);
        }
        _ => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?)",
                [SCHEMA_VERSION],
            )?;
            info!(
                "Database schema version {} recorded (was {:?})",
                SCHEMA_VERSION, current_version
            );
        }
    }

    debug!("Database tables created successfully");
    Ok(())
}

/// Gets the current schema version from the database.
///
/// Returns `None` if the schema_version table doesn't exist or is empty.
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>, DatabaseError> {
    let result = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i32>>(0)
    });

    match result {
        Ok(version) => Ok(version),
        Err(e) if e.to_string().contains("no such table") => Ok(None),
        Err(e) => Err(DatabaseError::Sqlite(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::MoodLabel;
    use rusqlite::params;

    fn insert(
        conn: &Connection,
        mood: &str,
        reply_text: Option<&str>,
        reply_status: &str,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO entries (owner_id, text, created_at, mood_label, reply_text, reply_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params!["alice", "some text", "2024-01-01T00:00:00.000000Z", mood, reply_text, reply_status],
        )
    }

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let table_exists: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='entries'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_exists, 1);

        let index_exists: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_entries_owner_created'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_exists, 1);
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_create_tables_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_every_mood_label_is_accepted() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        for label in MoodLabel::ALL {
            insert(&conn, label.as_str(), Some("reply"), "generated").unwrap();
        }
    }

    #[test]
    fn test_rows_without_valid_mood_are_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        assert!(insert(&conn, "bewildered", Some("reply"), "generated").is_err());

        let missing = conn.execute(
            "INSERT INTO entries (owner_id, text, created_at, reply_text, reply_status)
             VALUES ('alice', 'text', '2024-01-01T00:00:00.000000Z', 'reply', 'generated')",
            [],
        );
        assert!(missing.is_err());
    }

    #[test]
    fn test_version_one_database_is_upgraded() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                mood_label TEXT NOT NULL,
                reply_text TEXT,
                reply_status TEXT NOT NULL
            );
            CREATE TABLE schema_version (
                version INTEGER NOT NULL,
                applied_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO schema_version (version) VALUES (1);
            "#,
        )
        .unwrap();
        insert(&conn, "calm", Some("reply"), "generated").unwrap();

        create_tables(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));

        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('entry_messages', 'entry_analyses')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);

        let entries: i32 = conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(entries, 1);

        // A second run records nothing new
        create_tables(&conn).unwrap();
        let versions: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 2);
    }

    #[test]
    fn test_message_rows_must_match_their_role() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        insert(&conn, "joy", Some("reply"), "generated").unwrap();

        let message = |role: &str, text: Option<&str>, status: Option<&str>| {
            conn.execute(
                "INSERT INTO entry_messages (entry_id, role, text, reply_status, created_at)
                 VALUES (1, ?1, ?2, ?3, '2024-01-01T00:00:00.000000Z')",
                params![role, text, status],
            )
        };

        message("user", Some("thanks"), None).unwrap();
        message("assistant", Some("you're welcome"), Some("generated")).unwrap();
        message("assistant", None, Some("failed")).unwrap();

        assert!(message("user", None, None).is_err());
        assert!(message("user", Some(""), None).is_err());
        assert!(message("user", Some("thanks"), Some("generated")).is_err());
        assert!(message("assistant", Some("text"), None).is_err());
        assert!(message("assistant", Some("text"), Some("failed")).is_err());
        assert!(message("system", Some("text"), None).is_err());
    }

    #[test]
    fn test_analysis_tags_must_be_a_json_array() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        insert(&conn, "joy", Some("reply"), "generated").unwrap();

        let analysis = |summary: &str, tags: &str, status: &str| {
            conn.execute(
                "INSERT INTO entry_analyses (entry_id, summary, tags, status, created_at)
                 VALUES (1, ?1, ?2, ?3, '2024-01-01T00:00:00.000000Z')",
                params![summary, tags, status],
            )
        };

        analysis("A good day", r#"["work"]"#, "generated").unwrap();
        analysis("A good day", "[]", "fallback").unwrap();

        assert!(analysis("A good day", "work", "generated").is_err());
        assert!(analysis("A good day", r#"{"a":1}"#, "generated").is_err());
        assert!(analysis("", "[]", "generated").is_err());
        assert!(analysis("A good day", "[]", "failed").is_err());
    }

    #[test]
    fn test_reply_text_and_status_must_agree() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        insert(&conn, "joy", None, "failed").unwrap();
        insert(&conn, "joy", Some("template"), "fallback").unwrap();

        assert!(insert(&conn, "joy", Some("text"), "failed").is_err());
        assert!(insert(&conn, "joy", None, "generated").is_err());
        assert!(insert(&conn, "joy", Some("text"), "pending").is_err());
    }
}
