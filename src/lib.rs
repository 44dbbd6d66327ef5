//! # sqlkv
//!
//! String key-value tables layered on a relational store.
//!
//! Every logical table is a two-column mapping (`k`, `v`) that is created the
//! first time it is used. The backing database itself is created when the
//! store is opened.
//!
//! ## Features
//!
//! - `SQLite` backend (always available) and PostgreSQL backend (`postgres` feature)
//! - Strict table-name validation before any identifier reaches statement text
//! - Parameterized range scans over the ordered key space
//! - Transparent "missing table → provision → retry once" handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlkv::{KvStore, RangeRequest, StoreConfig};
//!
//! let store = KvStore::open(&StoreConfig::sqlite("./data", "app"))?;
//! store.set("users", "alice", "admin")?;
//! assert_eq!(store.get("users", "alice")?.as_deref(), Some("admin"));
//!
//! let entries = store.get_range(&RangeRequest::new("users").min("a", true).limit(10))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod kv;
pub mod models;
pub mod must;
pub mod observability;
pub mod storage;

pub use config::{BackendKind, StoreConfig};
pub use kv::KvStore;
pub use models::{Entry, RangeRequest};
pub use must::Must;
pub use storage::{IdentifierError, StoreConnection, validate_identifier};

/// Error type for sqlkv operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidIdentifier` | Table or database name is empty or contains a space/semicolon |
/// | `InvalidConfig` | Required construction options are missing |
/// | `StoreFailure` | The backing store rejected a statement (tagged by operation) |
/// | `NoRowsAffected` | A set/insert/delete completed but changed nothing |
/// | `DuplicateKey` | Insert hit the key uniqueness constraint |
/// | `ProvisioningFailure` | A missing database or table could not be created |
/// | `DeadlineExceeded` | The store did not answer within the operation timeout |
/// | `FeatureNotEnabled` | A backend was requested that was not compiled in |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A table or database name failed validation.
    #[error("invalid identifier {name:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: IdentifierError,
    },

    /// Construction options are incomplete.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The backing store failed to execute a statement.
    #[error("operation '{operation}' failed: {cause}")]
    StoreFailure {
        /// Stable tag of the operation that failed.
        operation: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// A mutating statement succeeded without changing any row.
    #[error("operation '{operation}' affected {affected} rows")]
    NoRowsAffected {
        /// Stable tag of the operation.
        operation: &'static str,
        /// Rows reported by the store.
        affected: u64,
    },

    /// Insert collided with an existing key.
    #[error("duplicate key in table '{table}': {cause}")]
    DuplicateKey {
        /// Table the insert targeted.
        table: String,
        /// Store message.
        cause: String,
    },

    /// A missing schema object could not be created.
    #[error("failed to provision {object}: {cause}")]
    ProvisioningFailure {
        /// Description of the object, e.g. `table "users"`.
        object: String,
        /// The underlying cause.
        cause: String,
    },

    /// The store did not respond in time.
    #[error("operation '{operation}' exceeded its deadline: {cause}")]
    DeadlineExceeded {
        /// Stable tag of the operation.
        operation: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

/// Result type alias for sqlkv operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidIdentifier {
            name: "a b".to_string(),
            reason: IdentifierError::IllegalCharacter(' '),
        };
        assert_eq!(
            err.to_string(),
            "invalid identifier \"a b\": illegal character ' '"
        );

        let err = Error::StoreFailure {
            operation: "kv_set",
            cause: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'kv_set' failed: boom");

        let err = Error::NoRowsAffected {
            operation: "kv_delete",
            affected: 0,
        };
        assert_eq!(err.to_string(), "operation 'kv_delete' affected 0 rows");
    }
}
