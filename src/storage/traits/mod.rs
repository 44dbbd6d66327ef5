//! Storage traits.

mod catalog;
mod connection;

pub use catalog::Catalog;
pub use connection::{
    Dialect, Row, SqlValue, StoreConnection, StoreError, StoreErrorKind, StoreResult,
};
