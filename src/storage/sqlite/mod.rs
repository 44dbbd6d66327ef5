//! `SQLite` backend.
//!
//! ## Module Structure
//!
//! - [`connection`]: mutex acquisition with poison recovery and pragmas
//! - `backend`: [`SqliteConnection`], the [`StoreConnection`](crate::storage::StoreConnection) implementation
//! - `catalog`: [`SqliteCatalog`], one database file per database name

mod backend;
mod catalog;
pub mod connection;

pub use backend::SqliteConnection;
pub use catalog::SqliteCatalog;
pub use connection::{DEFAULT_BUSY_TIMEOUT, acquire_lock, configure_connection};
