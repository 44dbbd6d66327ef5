//! Schema provisioning.
//!
//! Databases are ensured once when a store is opened. Tables are created
//! reactively, the first time a statement against them reports that they do
//! not exist.
//!
//! ```text
//! ensure_database: validate → exists? ──yes──> done
//!                                  └─no──> create → exists? ──no──> ProvisioningFailure
//! ensure_table:    validate → CREATE TABLE IF NOT EXISTS
//! ```

use crate::storage::identifier::{quote_identifier, validate_identifier};
use crate::storage::traits::{Catalog, StoreConnection, StoreErrorKind};
use crate::{Error, Result};

/// Maximum length of the key column.
pub const KEY_MAX_LEN: usize = 255;

/// Returns the idempotent create statement for a key-value table.
#[must_use]
pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (k VARCHAR({KEY_MAX_LEN}) NOT NULL PRIMARY KEY, v TEXT NOT NULL)",
        quote_identifier(table)
    )
}

/// Makes sure the database `name` exists, creating it through `catalog`.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] for an invalid name and
/// [`Error::ProvisioningFailure`] if the lookup or creation fails, or if the
/// database is still missing afterwards.
pub fn ensure_database(catalog: &dyn Catalog, name: &str) -> Result<()> {
    validate_identifier(name)?;

    let object = format!("database {name:?}");
    let failure = |cause: String| Error::ProvisioningFailure {
        object: object.clone(),
        cause,
    };

    if catalog.database_exists(name).map_err(|e| failure(e.message))? {
        tracing::debug!(database = name, "Database already exists");
        return Ok(());
    }

    catalog
        .create_database(name)
        .map_err(|e| failure(e.message))?;

    if !catalog.database_exists(name).map_err(|e| failure(e.message))? {
        return Err(failure("database not found after create".to_string()));
    }

    tracing::info!(database = name, "Created database");
    Ok(())
}

/// Creates the key-value table `table` if it does not exist.
///
/// Safe to call concurrently: losing a creation race is reported by some
/// engines as a unique violation on their catalog, which is treated as success.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] for an invalid name and
/// [`Error::ProvisioningFailure`] if the create statement fails.
pub fn ensure_table(conn: &dyn StoreConnection, table: &str) -> Result<()> {
    validate_identifier(table)?;

    match conn.execute(&create_table_sql(table), &[]) {
        Ok(_) => {},
        Err(e) if e.kind == StoreErrorKind::UniqueViolation => {
            tracing::debug!(table, "Table created concurrently");
        },
        Err(e) => {
            return Err(Error::ProvisioningFailure {
                object: format!("table {table:?}"),
                cause: e.message,
            });
        },
    }

    metrics::counter!(
        "kv_tables_provisioned_total",
        "backend" => conn.dialect().as_str()
    )
    .increment(1);
    tracing::info!(table, backend = conn.dialect().as_str(), "Provisioned table");
    Ok(())
}
