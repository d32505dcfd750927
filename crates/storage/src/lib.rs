#![forbid(unsafe_code)]

mod error;
mod lookups;
mod requests;
mod tracks;

pub use error::StoreError;
pub use requests::*;

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE_NAME: &str = "topdata.db";
const SCHEMA_VERSION: i64 = 1;

const REQUIRED_TABLES: [&str; 6] = [
    "store_state",
    "genomes",
    "transcription_factors",
    "cell_types",
    "rep_names",
    "tracks",
];

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE_NAME))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::init(conn, Some(storage_dir))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, storage_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        preflight_gate(&conn)?;
        install_schema(&conn)?;
        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )?)
    }
}

/// Refuses to reuse a database that was not created by this store.
fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = REQUIRED_TABLES.into_iter().collect();
    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }
    if required.iter().any(|table| !tables.contains(*table)) {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: required table is missing",
        ));
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS genomes (
          name TEXT PRIMARY KEY CHECK(length(name) BETWEEN 1 AND 255)
        );

        CREATE TABLE IF NOT EXISTS transcription_factors (
          name TEXT PRIMARY KEY CHECK(length(name) BETWEEN 1 AND 255)
        );

        CREATE TABLE IF NOT EXISTS cell_types (
          name TEXT PRIMARY KEY CHECK(length(name) BETWEEN 1 AND 255)
        );

        CREATE TABLE IF NOT EXISTS rep_names (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE CHECK(length(name) BETWEEN 1 AND 255)
        );

        CREATE TABLE IF NOT EXISTS tracks (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          genome TEXT NOT NULL,
          name TEXT NOT NULL CHECK(length(name) BETWEEN 1 AND 255),
          short_label TEXT NOT NULL,
          long_label TEXT NOT NULL,
          big_data_url TEXT NOT NULL CHECK(length(big_data_url) <= 1000),
          file_type TEXT NOT NULL,
          tf TEXT NOT NULL,
          cell_type TEXT NOT NULL,
          rep_name_id INTEGER NOT NULL,
          position TEXT NOT NULL DEFAULT '',
          UNIQUE(genome, name),
          FOREIGN KEY(genome) REFERENCES genomes(name) ON DELETE CASCADE,
          FOREIGN KEY(tf) REFERENCES transcription_factors(name) ON DELETE CASCADE,
          FOREIGN KEY(cell_type) REFERENCES cell_types(name) ON DELETE CASCADE,
          FOREIGN KEY(rep_name_id) REFERENCES rep_names(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_tracks_tf_cell_type
          ON tracks(tf, cell_type, id);

        CREATE INDEX IF NOT EXISTS idx_tracks_genome
          ON tracks(genome, id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

/// `?1, ?2, ...` for an `IN (...)` list starting at parameter `first`.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|idx| format!("?{idx}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                && message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
