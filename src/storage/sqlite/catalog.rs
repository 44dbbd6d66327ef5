//! File-based database catalog for `SQLite`.
//!
//! Each database is a file `<dir>/<name>.db`. Names that would resolve
//! outside `<dir>` are refused.
//!
//! Existence is a file lookup, so on case-insensitive filesystems (macOS and
//! Windows defaults) `App` and `app` name the same database.

use super::connection::configure_connection;
use super::DEFAULT_BUSY_TIMEOUT;
use crate::storage::traits::{Catalog, StoreError, StoreResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// File extension of database files.
const DB_EXTENSION: &str = "db";

/// Characters that would let a database name leave the catalog directory.
const PATH_SEPARATORS: &[char] = &['/', '\\'];

/// Checks that `name` maps to a file directly inside the catalog directory.
fn confine(name: &str) -> StoreResult<()> {
    if name.contains(PATH_SEPARATORS) || name == ".." {
        return Err(StoreError::other(format!(
            "database name {name:?} is not a plain file name"
        )));
    }
    Ok(())
}

/// Catalog over a directory of `SQLite` database files.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    dir: Option<PathBuf>,
}

impl SqliteCatalog {
    /// Creates a catalog rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Catalog for in-memory databases, which always exist.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self { dir: None }
    }

    /// Returns the file path for database `name`, or `None` when in-memory.
    #[must_use]
    pub fn database_path(&self, name: &str) -> Option<PathBuf> {
        self.dir
            .as_deref()
            .map(|dir| dir.join(format!("{name}.{DB_EXTENSION}")))
    }

    /// Returns the catalog directory.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl Catalog for SqliteCatalog {
    fn database_exists(&self, name: &str) -> StoreResult<bool> {
        confine(name)?;
        Ok(self.database_path(name).is_none_or(|path| path.is_file()))
    }

    fn create_database(&self, name: &str) -> StoreResult<()> {
        confine(name)?;
        let (Some(dir), Some(path)) = (self.dir(), self.database_path(name)) else {
            return Ok(());
        };

        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::other(format!("{}: {e}", dir.display())))?;

        // Switching to WAL writes the database header, so the file exists once
        // this transient connection is dropped.
        let conn = Connection::open(&path)
            .map_err(|e| StoreError::other(format!("{}: {e}", path.display())))?;
        configure_connection(&conn, DEFAULT_BUSY_TIMEOUT);
        Ok(())
    }
}
