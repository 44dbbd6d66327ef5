//! Store connection trait.
//!
//! The key-value layer talks to the backing engine only through
//! [`StoreConnection::execute`] and [`StoreConnection::query`]. Backends are
//! responsible for classifying their native errors into [`StoreErrorKind`].

use std::fmt;
use std::sync::Arc;

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// Text value (keys, values, bounds).
    Text(String),
    /// Integer value (limits).
    Integer(i64),
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

/// One result row; every column is read back as text.
pub type Row = Vec<String>;

/// Placeholder style of the backing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `?1`, `?2`, ...
    Sqlite,
    /// `$1`, `$2`, ...
    Postgres,
}

impl Dialect {
    /// Returns the placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Sqlite => format!("?{index}"),
            Self::Postgres => format!("${index}"),
        }
    }

    /// Returns the backend label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgresql",
        }
    }
}

/// Classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The referenced table does not exist.
    MissingTable,
    /// A uniqueness constraint rejected the write.
    UniqueViolation,
    /// The store gave up waiting (lock timeout, cancelled query, elapsed deadline).
    Timeout,
    /// Anything else.
    Other,
}

/// A classified failure reported by a [`StoreConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// Classification.
    pub kind: StoreErrorKind,
    /// Backend message.
    pub message: String,
}

impl StoreError {
    /// Creates a new store error.
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an unclassified store error.
    pub fn other(message: impl fmt::Display) -> Self {
        Self::new(StoreErrorKind::Other, message.to_string())
    }

    /// Returns true if the failure means the table has to be created.
    #[must_use]
    pub fn is_missing_table(&self) -> bool {
        self.kind == StoreErrorKind::MissingTable
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreError {}

/// Result type for raw backend calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Live handle to one database of the backing engine.
///
/// Implementations must tolerate concurrent calls from several threads.
pub trait StoreConnection: Send + Sync {
    /// Returns the placeholder dialect of this backend.
    fn dialect(&self) -> Dialect;

    /// Executes a mutating statement and returns the number of affected rows.
    fn execute(&self, sql: &str, args: &[SqlValue]) -> StoreResult<u64>;

    /// Runs a query and returns every row.
    fn query(&self, sql: &str, args: &[SqlValue]) -> StoreResult<Vec<Row>>;
}

impl<T: StoreConnection + ?Sized> StoreConnection for Box<T> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(&self, sql: &str, args: &[SqlValue]) -> StoreResult<u64> {
        (**self).execute(sql, args)
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> StoreResult<Vec<Row>> {
        (**self).query(sql, args)
    }
}

impl<T: StoreConnection + ?Sized> StoreConnection for Arc<T> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(&self, sql: &str, args: &[SqlValue]) -> StoreResult<u64> {
        (**self).execute(sql, args)
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> StoreResult<Vec<Row>> {
        (**self).query(sql, args)
    }
}
