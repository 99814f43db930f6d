//! Durable storage for diary entries and what hangs off them.
//!
//! The [`EntryStore`] trait is the contract the pipeline and the stats
//! aggregator depend on. [`Database`] implements it over SQLite with
//! connection pooling via r2d2, so concurrent submissions each append through
//! their own connection.
//!
//! # Module Structure
//!
//! - `schema`: Table definitions and schema initialization
//! - `entries`: Append and query operations
//! - `messages`: Follow-up conversation turns
//! - `analyses`: Entry summaries and tags
//!
//! # Example
//!
//! ```no_run
//! use moodlog::db::Database;
//! use std::path::Path;
//!
//! let db = Database::open(Path::new("/tmp/moodlog.db"))?;
//! db.initialize_schema()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analyses;
pub mod entries;
#[cfg(test)]
pub(crate) mod memory;
pub mod messages;
pub mod schema;

use crate::constants::{DB_BUSY_TIMEOUT_MS, DB_POOL_SIZE};
use crate::errors::{AppResult, DatabaseError};
use crate::journal::{DiaryEntry, EntryAnalysis, EntryMessage, NewAnalysis, NewEntry, NewMessage, TimeRange};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a pooled SQLite connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Append-only persistence for diary entries.
pub trait EntryStore: Send + Sync {
    /// Durably writes `entry` and returns its assigned id.
    fn append(&self, entry: &NewEntry) -> Result<i64, DatabaseError>;

    /// Returns the owner's entries in `range`, ordered by `created_at` ascending.
    fn list_by_owner(&self, owner_id: &str, range: &TimeRange) -> Result<Vec<DiaryEntry>, DatabaseError>;

    /// Looks up a single entry.
    fn get(&self, entry_id: i64) -> Result<Option<DiaryEntry>, DatabaseError>;

    /// Durably writes all of `messages` or none of them; returns their ids in order.
    fn append_messages(&self, messages: &[NewMessage]) -> Result<Vec<i64>, DatabaseError>;

    /// Returns an entry's conversation, oldest first.
    fn list_messages(&self, entry_id: i64) -> Result<Vec<EntryMessage>, DatabaseError>;

    fn append_analysis(&self, analysis: &NewAnalysis) -> Result<i64, DatabaseError>;

    /// Returns the most recent analysis of an entry.
    fn latest_analysis(&self, entry_id: i64) -> Result<Option<EntryAnalysis>, DatabaseError>;
}

/// Database handle with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Opens or creates a SQLite database, creating parent directories as needed.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the database file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory cannot be created
    /// - Database file cannot be opened
    /// - Connection pool cannot be initialized
    pub fn open(db_path: &Path) -> AppResult<Self> {
        debug!("Opening database at: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(DB_POOL_SIZE)
            .connection_customizer(Box::new(SqliteConfig {
                busy_timeout: Duration::from_millis(DB_BUSY_TIMEOUT_MS),
            }))
            .build(manager)
            .map_err(DatabaseError::Pool)?;

        // Test the connection
        let conn = pool.get().map_err(DatabaseError::Pool)?;
        conn.execute_batch("SELECT 1").map_err(DatabaseError::Sqlite)?;
        drop(conn);

        info!("Database opened successfully");
        Ok(Database { pool })
    }

    fn conn(&self) -> Result<PooledConnection, DatabaseError> {
        self.pool.get().map_err(DatabaseError::Pool)
    }

    /// Gets a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is available or the pool is exhausted.
    pub fn get_conn(&self) -> AppResult<PooledConnection> {
        Ok(self.conn()?)
    }

    /// Initializes the database schema.
    ///
    /// Creates all necessary tables and indexes if they don't exist.
    /// This is idempotent and safe to call multiple times.
    pub fn initialize_schema(&self) -> AppResult<()> {
        let conn = self.conn()?;
        schema::create_tables(&conn)?;
        info!("Database schema initialized");
        Ok(())
    }
}

impl EntryStore for Database {
    fn append(&self, entry: &NewEntry) -> Result<i64, DatabaseError> {
        let conn = self.conn()?;
        entries::insert_entry(&conn, entry)
    }

    fn list_by_owner(&self, owner_id: &str, range: &TimeRange) -> Result<Vec<DiaryEntry>, DatabaseError> {
        let conn = self.conn()?;
        entries::list_entries_by_owner(&conn, owner_id, range)
    }

    fn get(&self, entry_id: i64) -> Result<Option<DiaryEntry>, DatabaseError> {
        let conn = self.conn()?;
        entries::get_entry(&conn, entry_id)
    }

    fn append_messages(&self, new_messages: &[NewMessage]) -> Result<Vec<i64>, DatabaseError> {
        let mut conn = self.conn()?;
        messages::insert_messages(&mut conn, new_messages)
    }

    fn list_messages(&self, entry_id: i64) -> Result<Vec<EntryMessage>, DatabaseError> {
        let conn = self.conn()?;
        messages::list_messages(&conn, entry_id)
    }

    fn append_analysis(&self, analysis: &NewAnalysis) -> Result<i64, DatabaseError> {
        let conn = self.conn()?;
        analyses::insert_analysis(&conn, analysis)
    }

    fn latest_analysis(&self, entry_id: i64) -> Result<Option<EntryAnalysis>, DatabaseError> {
        let conn = self.conn()?;
        analyses::latest_analysis(&conn, entry_id)
    }
}

/// Connection customizer applied to every pooled connection.
#[derive(Debug)]
struct SqliteConfig {
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for SqliteConfig {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        // Writers wait for each other instead of failing with SQLITE_BUSY
        conn.busy_timeout(self.busy_timeout)?;
        // WAL lets readers see a consistent snapshot while a writer appends
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn on_release(&self, _conn: Connection) {}
}
