//! `SQLite` store connection.

use super::connection::{acquire_lock, configure_connection};
use crate::storage::traits::{
    Dialect, Row, SqlValue, StoreConnection, StoreError, StoreErrorKind, StoreResult,
};
use crate::{Error, Result};
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::{Connection, ErrorCode, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Text(s) => ToSqlOutput::from(s.as_str()),
            Self::Integer(n) => ToSqlOutput::from(*n),
        })
    }
}

/// Maps a rusqlite error onto the store error classification.
fn classify(e: &rusqlite::Error) -> StoreError {
    let kind = match e {
        rusqlite::Error::SqliteFailure(err, msg) => match err.code {
            ErrorCode::ConstraintViolation
                if matches!(
                    err.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                ) =>
            {
                StoreErrorKind::UniqueViolation
            },
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::OperationInterrupted => {
                StoreErrorKind::Timeout
            },
            _ if msg
                .as_deref()
                .is_some_and(|m| m.starts_with("no such table")) =>
            {
                StoreErrorKind::MissingTable
            },
            _ => StoreErrorKind::Other,
        },
        _ => StoreErrorKind::Other,
    };
    StoreError::new(kind, e.to_string())
}

/// `SQLite`-backed store connection.
///
/// A single connection serialized behind a mutex; WAL mode and the busy
/// timeout keep contention between processes manageable.
pub struct SqliteConnection {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteConnection {
    /// Opens (or creates) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreFailure`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| Error::StoreFailure {
            operation: "sqlite_open",
            cause: format!("{}: {e}", path.display()),
        })?;
        configure_connection(&conn, busy_timeout);

        tracing::debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreFailure`] if `SQLite` cannot allocate the database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::StoreFailure {
            operation: "sqlite_open",
            cause: e.to_string(),
        })?;
        configure_connection(&conn, super::DEFAULT_BUSY_TIMEOUT);

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Returns the database file path, or `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl StoreConnection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&self, sql: &str, args: &[SqlValue]) -> StoreResult<u64> {
        let conn = acquire_lock(&self.conn);
        let affected = conn
            .execute(sql, params_from_iter(args.iter()))
            .map_err(|e| classify(&e))?;
        Ok(u64::try_from(affected).unwrap_or(u64::MAX))
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> StoreResult<Vec<Row>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn.prepare(sql).map_err(|e| classify(&e))?;
        let columns = stmt.column_count();

        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                (0..columns)
                    .map(|i| row.get::<_, String>(i))
                    .collect::<rusqlite::Result<Row>>()
            })
            .map_err(|e| classify(&e))?
            .collect::<rusqlite::Result<Vec<Row>>>()
            .map_err(|e| classify(&e))?;

        Ok(rows)
    }
}
