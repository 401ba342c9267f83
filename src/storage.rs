//! Local persistence for archived sessions.
//!
//! Every archived session lives in a single `SQLite` database:
//!
//! ```text
//! <data-dir>/history.sqlite
//!   session   # One row per ended session: identity, thresholds, tallies
//!   part      # One row per part, `seq` preserving testing order
//!   slot      # One row per filled slot: channel, index, current, duration, verdict
//! ```
//!
//! Sessions are written once, in a single transaction, when they end.

mod session;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rusqlite::Connection;
use uuid::Uuid;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("session already archived: {0}")]
    SessionAlreadyArchived(Uuid),

    #[error("no session matching '{0}'")]
    NoSessionMatching(String),

    #[error("'{prefix}' is ambiguous: matches {count} sessions")]
    AmbiguousSession { prefix: String, count: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt history: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS session (
    id                 TEXT PRIMARY KEY,
    operator           TEXT NOT NULL,
    machine_id         TEXT NOT NULL,
    supervisor_id      TEXT NOT NULL,
    company            TEXT NOT NULL,
    part_description   TEXT NOT NULL,
    headshot_threshold REAL NOT NULL,
    coilshot_threshold REAL NOT NULL,
    started_at         TEXT NOT NULL,
    ended_at           TEXT,
    total              INTEGER NOT NULL,
    accepted           INTEGER NOT NULL,
    rejected           INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS part (
    session_id  TEXT NOT NULL REFERENCES session(id),
    seq         INTEGER NOT NULL,
    part_number INTEGER NOT NULL,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    status      TEXT NOT NULL,
    PRIMARY KEY (session_id, part_number)
);
CREATE TABLE IF NOT EXISTS slot (
    session_id  TEXT NOT NULL,
    part_number INTEGER NOT NULL,
    channel     TEXT NOT NULL,
    idx         INTEGER NOT NULL,
    current     REAL NOT NULL,
    duration    REAL NOT NULL,
    verdict     TEXT NOT NULL,
    PRIMARY KEY (session_id, part_number, channel, idx)
);
";

/// File-backed history of ended sessions.
pub struct Storage {
    path: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the history database at the given path.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { path, conn })
    }

    /// The history database inside a data directory.
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("history.sqlite")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
