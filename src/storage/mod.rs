//! Storage layer.
//!
//! - [`identifier`]: table/database name validation and quoting
//! - [`range_query`]: parameterized range scan builder
//! - [`provision`]: database and table provisioning
//! - [`traits`]: the narrow execute/query and catalog seams
//! - [`sqlite`]: `SQLite` backend (always available)
//! - [`postgresql`]: PostgreSQL backend (`postgres` feature)

// Dropping the connection guard slightly earlier gives no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod identifier;
pub mod metrics;
pub mod postgresql;
pub mod provision;
pub mod range_query;
pub mod sqlite;
pub mod traits;

pub use identifier::{IdentifierError, quote_identifier, validate_identifier};
pub use metrics::record_operation_metrics;
#[cfg(feature = "postgres")]
pub use postgresql::{PostgresCatalog, PostgresConnection, build_runtime};
pub use provision::{KEY_MAX_LEN, create_table_sql, ensure_database, ensure_table};
pub use range_query::RangeQuery;
pub use sqlite::{SqliteCatalog, SqliteConnection};
pub use traits::{
    Catalog, Dialect, Row, SqlValue, StoreConnection, StoreError, StoreErrorKind, StoreResult,
};
