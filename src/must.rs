//! Abort-on-error view of a [`KvStore`].
//!
//! For call sites with no recovery path, such as start-up code that seeds
//! required entries. Every method behaves like its [`KvStore`] counterpart
//! but panics on error. The panic aborts the process only in binaries built
//! with `panic = "abort"`, as the `sqlkv` release profile is; otherwise it
//! unwinds like any other panic.

// This module exists to turn errors into aborts.
#![allow(clippy::panic)]

use crate::kv::KvStore;
use crate::models::{Entry, RangeRequest};
use crate::Result;

/// Borrowed view whose operations panic instead of returning errors.
///
/// Obtain one with [`KvStore::must`].
#[derive(Clone, Copy)]
pub struct Must<'a> {
    store: &'a KvStore,
}

impl<'a> Must<'a> {
    pub(crate) const fn new(store: &'a KvStore) -> Self {
        Self { store }
    }

    /// [`KvStore::set`], panicking on error.
    pub fn set(&self, table: &str, key: &str, value: &str) {
        abort_on_error("set", self.store.set(table, key, value));
    }

    /// [`KvStore::get`], panicking on error.
    pub fn get(&self, table: &str, key: &str) -> Option<String> {
        abort_on_error("get", self.store.get(table, key))
    }

    /// [`KvStore::delete`], panicking on error.
    pub fn delete(&self, table: &str, key: &str) -> bool {
        abort_on_error("delete", self.store.delete(table, key))
    }

    /// [`KvStore::insert`], panicking on error.
    pub fn insert(&self, table: &str, key: &str, value: &str) {
        abort_on_error("insert", self.store.insert(table, key, value));
    }

    /// [`KvStore::get_range`], panicking on error.
    pub fn get_range(&self, req: &RangeRequest) -> Vec<Entry> {
        abort_on_error("get_range", self.store.get_range(req))
    }
}

#[track_caller]
fn abort_on_error<T>(operation: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(operation, error = %e, "Unrecoverable key-value failure");
            panic!("sqlkv {operation} failed: {e}");
        },
    }
}
