// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do not open additional connections for writes.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use recall_core::RecallError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the memory database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and run migrations.
    ///
    /// Parent directories are created as needed.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, RecallError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(RecallError::store)?;
        }

        let conn = Connection::open(path).await.map_err(RecallError::store)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "memory database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, RecallError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(RecallError::store)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), RecallError> {
        self.conn
            .call(move |conn| -> Result<(), RecallError> {
                let journal = if wal_mode { "WAL" } else { "DELETE" };
                conn.execute_batch(&format!(
                    "PRAGMA journal_mode = {journal};
                     PRAGMA synchronous = NORMAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;"
                ))
                .map_err(RecallError::store)?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(flatten_call_err)
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), RecallError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert tokio_rusqlite errors into [`RecallError::StoreUnavailable`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RecallError {
    RecallError::store(e)
}

fn flatten_call_err(e: tokio_rusqlite::Error<RecallError>) -> RecallError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => RecallError::store(other),
    }
}

/// Format a timestamp the way it is stored: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp column.
pub fn parse_timestamp(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
