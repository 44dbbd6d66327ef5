//! Database catalog trait.

use super::StoreResult;

/// Administrative view of the engine used to provision databases.
///
/// The primary [`StoreConnection`](super::StoreConnection) is bound to a
/// database that may not exist yet, so existence checks and creation go
/// through a separate, short-lived session.
pub trait Catalog {
    /// Returns true if a database with exactly this name exists.
    fn database_exists(&self, name: &str) -> StoreResult<bool>;

    /// Creates the database. `name` has already been validated.
    fn create_database(&self, name: &str) -> StoreResult<()>;
}
