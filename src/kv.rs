//! Key-value façade.
//!
//! [`KvStore`] exposes set/get/delete/insert/range over named tables. Every
//! call validates the table name, runs its statement, and when the store
//! reports that the table does not exist, provisions it and retries once.
//!
//! ```text
//! Attempt ──ok──────────────────────────────> Done
//!    │
//!    └─missing table (budget left)─> Provision ──ok──> Attempt (retry)
//!    │                                   └─err──> ProvisioningFailure
//!    └─any other failure / budget spent ─> classified error
//! ```

use crate::config::{BackendKind, StoreConfig};
use crate::models::{Entry, RangeRequest};
use crate::must::Must;
use crate::storage::sqlite::DEFAULT_BUSY_TIMEOUT;
use crate::storage::{
    RangeQuery, SqlValue, SqliteCatalog, SqliteConnection, StoreConnection, StoreError,
    StoreErrorKind, StoreResult, ensure_database, ensure_table, quote_identifier,
    record_operation_metrics, validate_identifier,
};
use crate::{Error, Result};
use std::time::Instant;

/// Number of provision-then-retry cycles allowed per call.
const MISSING_TABLE_RETRIES: u32 = 1;

/// Façade operations and their stable error tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Set,
    Get,
    Delete,
    Insert,
    GetRange,
}

impl Op {
    const fn tag(self) -> &'static str {
        match self {
            Self::Set => "kv_set",
            Self::Get => "kv_get",
            Self::Delete => "kv_delete",
            Self::Insert => "kv_insert",
            Self::GetRange => "kv_get_range",
        }
    }

    /// Converts a backend failure into the caller-facing error.
    fn failure(self, table: &str, e: StoreError) -> Error {
        match e.kind {
            StoreErrorKind::Timeout => Error::DeadlineExceeded {
                operation: self.tag(),
                cause: e.message,
            },
            StoreErrorKind::UniqueViolation if self == Self::Insert => Error::DuplicateKey {
                table: table.to_string(),
                cause: e.message,
            },
            _ => Error::StoreFailure {
                operation: self.tag(),
                cause: e.message,
            },
        }
    }
}

/// Key-value store over one database of the backing engine.
///
/// `KvStore` is `Send + Sync`; share it across threads behind an `Arc`.
/// Concurrent writers rely on the engine's own row atomicity.
pub struct KvStore {
    conn: Box<dyn StoreConnection>,
}

impl KvStore {
    /// Opens a store, creating the configured database if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] or [`Error::InvalidIdentifier`] for bad
    /// options, [`Error::ProvisioningFailure`] if the database cannot be
    /// created, and [`Error::FeatureNotEnabled`] for a backend that was not
    /// compiled in.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let store = match config.backend {
            BackendKind::Sqlite => Self::open_sqlite(config)?,
            BackendKind::Postgres => Self::open_postgres(config)?,
        };

        tracing::info!(
            backend = store.backend(),
            database = %config.database_name,
            "Opened key-value store"
        );
        Ok(store)
    }

    fn open_sqlite(config: &StoreConfig) -> Result<Self> {
        let catalog = if config.is_in_memory() {
            SqliteCatalog::in_memory()
        } else {
            SqliteCatalog::new(&config.host)
        };
        ensure_database(&catalog, &config.database_name)?;

        let busy_timeout = config.operation_timeout.unwrap_or(DEFAULT_BUSY_TIMEOUT);
        let conn = match catalog.database_path(&config.database_name) {
            Some(path) => SqliteConnection::open(path, busy_timeout)?,
            None => SqliteConnection::in_memory()?,
        };
        Ok(Self::with_connection(conn))
    }

    #[cfg(feature = "postgres")]
    fn open_postgres(config: &StoreConfig) -> Result<Self> {
        use crate::storage::postgresql::{PostgresCatalog, PostgresConnection, build_runtime};
        use std::sync::Arc;

        let runtime = build_runtime()?;
        let catalog = PostgresCatalog::new(config, Arc::clone(&runtime));
        ensure_database(&catalog, &config.database_name)?;
        Ok(Self::with_connection(PostgresConnection::connect(
            config, runtime,
        )?))
    }

    #[cfg(not(feature = "postgres"))]
    fn open_postgres(_config: &StoreConfig) -> Result<Self> {
        Err(Error::FeatureNotEnabled("postgres".to_string()))
    }

    /// Wraps an already open connection.
    ///
    /// The connection's database must exist; tables are still provisioned
    /// on demand.
    #[must_use]
    pub fn with_connection(conn: impl StoreConnection + 'static) -> Self {
        Self {
            conn: Box::new(conn),
        }
    }

    /// Returns the backend label (`sqlite` or `postgresql`).
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.conn.dialect().as_str()
    }

    /// Returns the abort-on-error view of this store.
    #[must_use]
    pub const fn must(&self) -> Must<'_> {
        Must::new(self)
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`], [`Error::NoRowsAffected`] if the
    /// upsert changed nothing, or a classified store failure.
    pub fn set(&self, table: &str, key: &str, value: &str) -> Result<()> {
        self.timed(Op::Set, table, || {
            let dialect = self.conn.dialect();
            let sql = format!(
                "INSERT INTO {} (k, v) VALUES ({}, {}) ON CONFLICT (k) DO UPDATE SET v = EXCLUDED.v",
                quote_identifier(table),
                dialect.placeholder(1),
                dialect.placeholder(2)
            );
            self.mutate(Op::Set, table, &sql, &[key.into(), value.into()])
                .map(|_| ())
        })
    }

    /// Returns the value stored under `key`, or `None` if there is none.
    ///
    /// A missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] or a classified store failure.
    pub fn get(&self, table: &str, key: &str) -> Result<Option<String>> {
        self.timed(Op::Get, table, || {
            let sql = format!(
                "SELECT v FROM {} WHERE k = {}",
                quote_identifier(table),
                self.conn.dialect().placeholder(1)
            );
            let rows = self.with_table(Op::Get, table, |conn| {
                conn.query(&sql, &[key.into()])
            })?;
            Ok(rows.into_iter().next().and_then(|row| row.into_iter().next()))
        })
    }

    /// Deletes the entry under `key`.
    ///
    /// Returns `true` when the entry was removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRowsAffected`] if no entry existed for `key`,
    /// [`Error::InvalidIdentifier`], or a classified store failure.
    pub fn delete(&self, table: &str, key: &str) -> Result<bool> {
        self.timed(Op::Delete, table, || {
            let sql = format!(
                "DELETE FROM {} WHERE k = {}",
                quote_identifier(table),
                self.conn.dialect().placeholder(1)
            );
            self.mutate(Op::Delete, table, &sql, &[key.into()])
                .map(|_| true)
        })
    }

    /// Inserts a new entry; fails if `key` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateKey`] if the key exists,
    /// [`Error::InvalidIdentifier`], [`Error::NoRowsAffected`], or a
    /// classified store failure.
    pub fn insert(&self, table: &str, key: &str, value: &str) -> Result<()> {
        self.timed(Op::Insert, table, || {
            let dialect = self.conn.dialect();
            let sql = format!(
                "INSERT INTO {} (k, v) VALUES ({}, {})",
                quote_identifier(table),
                dialect.placeholder(1),
                dialect.placeholder(2)
            );
            self.mutate(Op::Insert, table, &sql, &[key.into(), value.into()])
                .map(|_| ())
        })
    }

    /// Returns the entries matching `req`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] or a classified store failure.
    pub fn get_range(&self, req: &RangeRequest) -> Result<Vec<Entry>> {
        self.timed(Op::GetRange, &req.table, || {
            let query = RangeQuery::build(req, self.conn.dialect());
            let rows = self.with_table(Op::GetRange, &req.table, |conn| {
                conn.query(&query.sql, &query.args)
            })?;

            rows.into_iter()
                .map(|row| {
                    let mut columns = row.into_iter();
                    match (columns.next(), columns.next()) {
                        (Some(key), Some(value)) => Ok(Entry { key, value }),
                        _ => Err(Error::StoreFailure {
                            operation: Op::GetRange.tag(),
                            cause: "row has fewer than two columns".to_string(),
                        }),
                    }
                })
                .collect()
        })
    }

    /// Validates `table`, runs `f`, and records metrics for the call.
    fn timed<T>(&self, op: Op, table: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = validate_identifier(table).and_then(|()| f());

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(self.backend(), op.tag(), start, status);
        if let Err(ref e) = result {
            tracing::debug!(operation = op.tag(), table, error = %e, "Operation failed");
        }
        result
    }

    /// Executes a mutating statement that must change at least one row.
    fn mutate(&self, op: Op, table: &str, sql: &str, args: &[SqlValue]) -> Result<u64> {
        let affected = self.with_table(op, table, |conn| conn.execute(sql, args))?;
        if affected == 0 {
            return Err(Error::NoRowsAffected {
                operation: op.tag(),
                affected,
            });
        }
        Ok(affected)
    }

    /// Runs `attempt`, provisioning the table and retrying when it is missing.
    fn with_table<T>(
        &self,
        op: Op,
        table: &str,
        attempt: impl Fn(&dyn StoreConnection) -> StoreResult<T>,
    ) -> Result<T> {
        let mut retries_left = MISSING_TABLE_RETRIES;
        loop {
            match attempt(self.conn.as_ref()) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_missing_table() && retries_left > 0 => {
                    retries_left -= 1;
                    tracing::debug!(operation = op.tag(), table, "Table missing, provisioning");
                    ensure_table(self.conn.as_ref(), table)?;
                },
                Err(e) => {
                    if e.is_missing_table() {
                        tracing::warn!(
                            operation = op.tag(),
                            table,
                            "Table still missing after provisioning"
                        );
                    }
                    return Err(op.failure(table, e));
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Dialect, Row};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Connection that replays scripted failures and records every statement.
    #[derive(Default)]
    struct ScriptedConnection {
        failures: Mutex<VecDeque<StoreErrorKind>>,
        create_failure: Option<StoreErrorKind>,
        affected: u64,
        rows: Vec<Row>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedConnection {
        fn failing(kinds: &[StoreErrorKind]) -> Self {
            Self {
                failures: Mutex::new(kinds.iter().copied().collect()),
                affected: 1,
                ..Self::default()
            }
        }

        fn next(&self, sql: &str) -> StoreResult<()> {
            self.log.lock().unwrap().push(sql.to_string());
            if sql.starts_with("CREATE TABLE") {
                return self
                    .create_failure
                    .map_or(Ok(()), |kind| Err(StoreError::new(kind, "create failed")));
            }
            match self.failures.lock().unwrap().pop_front() {
                Some(kind) => Err(StoreError::new(kind, format!("{kind:?}"))),
                None => Ok(()),
            }
        }
    }

    impl StoreConnection for ScriptedConnection {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        fn execute(&self, sql: &str, _args: &[SqlValue]) -> StoreResult<u64> {
            self.next(sql).map(|()| self.affected)
        }

        fn query(&self, sql: &str, _args: &[SqlValue]) -> StoreResult<Vec<Row>> {
            self.next(sql).map(|()| self.rows.clone())
        }
    }

    fn store(conn: ScriptedConnection) -> (KvStore, Arc<ScriptedConnection>) {
        let conn = Arc::new(conn);
        (KvStore::with_connection(Arc::clone(&conn)), conn)
    }

    fn statements(conn: &ScriptedConnection) -> Vec<String> {
        conn.log
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.split_whitespace().take(2).collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn test_missing_table_provisions_and_retries_once() {
        let (kv, conn) = store(ScriptedConnection::failing(&[StoreErrorKind::MissingTable]));
        kv.set("users", "a", "1").unwrap();
        assert_eq!(
            statements(&conn),
            vec!["INSERT INTO", "CREATE TABLE", "INSERT INTO"]
        );
    }

    #[test]
    fn test_second_missing_table_is_surfaced() {
        let (kv, conn) = store(ScriptedConnection::failing(&[
            StoreErrorKind::MissingTable,
            StoreErrorKind::MissingTable,
        ]));
        let result = kv.delete("users", "a");
        assert!(matches!(
            result,
            Err(Error::StoreFailure { operation: "kv_delete", .. })
        ));
        assert_eq!(
            statements(&conn),
            vec!["DELETE FROM", "CREATE TABLE", "DELETE FROM"]
        );
    }

    #[test]
    fn test_provisioning_failure_aborts_retry() {
        let mut scripted = ScriptedConnection::failing(&[StoreErrorKind::MissingTable]);
        scripted.create_failure = Some(StoreErrorKind::Other);
        let (kv, conn) = store(scripted);

        let result = kv.insert("users", "a", "1");
        assert!(matches!(result, Err(Error::ProvisioningFailure { .. })));
        assert_eq!(statements(&conn), vec!["INSERT INTO", "CREATE TABLE"]);
    }

    #[test]
    fn test_other_failure_is_not_retried() {
        let (kv, conn) = store(ScriptedConnection::failing(&[StoreErrorKind::Other]));
        let result = kv.get("users", "a");
        assert!(matches!(
            result,
            Err(Error::StoreFailure { operation: "kv_get", .. })
        ));
        assert_eq!(statements(&conn), vec!["SELECT v"]);
    }

    #[test]
    fn test_timeout_maps_to_deadline_exceeded() {
        let (kv, conn) = store(ScriptedConnection::failing(&[StoreErrorKind::Timeout]));
        let result = kv.get_range(&RangeRequest::new("users"));
        assert!(matches!(
            result,
            Err(Error::DeadlineExceeded { operation: "kv_get_range", .. })
        ));
        assert_eq!(conn.log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unique_violation_on_insert_is_duplicate_key() {
        let (kv, _) = store(ScriptedConnection::failing(&[StoreErrorKind::UniqueViolation]));
        let result = kv.insert("users", "a", "1");
        assert!(matches!(
            result,
            Err(Error::DuplicateKey { ref table, .. }) if table == "users"
        ));
    }

    #[test]
    fn test_zero_rows_affected_is_an_error() {
        let (kv, _) = store(ScriptedConnection::default());
        assert!(matches!(
            kv.set("t", "a", "1"),
            Err(Error::NoRowsAffected { operation: "kv_set", affected: 0 })
        ));
        assert!(matches!(
            kv.insert("t", "a", "1"),
            Err(Error::NoRowsAffected { operation: "kv_insert", .. })
        ));
        assert!(matches!(
            kv.delete("t", "a"),
            Err(Error::NoRowsAffected { operation: "kv_delete", .. })
        ));
    }

    #[test]
    fn test_invalid_table_runs_nothing() {
        let (kv, conn) = store(ScriptedConnection::failing(&[]));
        for table in ["", "a b", "a;b"] {
            assert!(matches!(
                kv.set(table, "k", "v"),
                Err(Error::InvalidIdentifier { .. })
            ));
            assert!(matches!(
                kv.get_range(&RangeRequest::new(table)),
                Err(Error::InvalidIdentifier { .. })
            ));
        }
        assert!(conn.log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_get_on_provisioned_table_is_not_found() {
        let (kv, conn) = store(ScriptedConnection::failing(&[StoreErrorKind::MissingTable]));
        assert_eq!(kv.get("fresh", "a").unwrap(), None);
        assert_eq!(
            statements(&conn),
            vec!["SELECT v", "CREATE TABLE", "SELECT v"]
        );
    }

    #[test]
    fn test_get_range_maps_rows() {
        let scripted = ScriptedConnection {
            rows: vec![
                vec!["b".to_string(), "2".to_string()],
                vec!["c".to_string(), "3".to_string()],
            ],
            ..ScriptedConnection::default()
        };
        let (kv, _) = store(scripted);
        let entries = kv.get_range(&RangeRequest::new("t")).unwrap();
        assert_eq!(entries, vec![Entry::new("b", "2"), Entry::new("c", "3")]);
    }

    #[test]
    fn test_get_range_rejects_short_rows() {
        let scripted = ScriptedConnection {
            rows: vec![vec!["b".to_string()]],
            ..ScriptedConnection::default()
        };
        let (kv, _) = store(scripted);
        assert!(matches!(
            kv.get_range(&RangeRequest::new("t")),
            Err(Error::StoreFailure { .. })
        ));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let result = KvStore::open(&StoreConfig::sqlite(".", ""));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn test_open_postgres_without_feature() {
        let config = StoreConfig::postgres("localhost", "root", "", "app");
        assert!(matches!(
            KvStore::open(&config),
            Err(Error::FeatureNotEnabled(_))
        ));
    }
}
