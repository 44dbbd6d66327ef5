//! PostgreSQL backend.
//!
//! A pooled [`StoreConnection`](crate::storage::StoreConnection) plus an admin
//! [`Catalog`](crate::storage::Catalog) that provisions databases over a
//! transient connection to the maintenance database. Both are driven from a
//! private Tokio runtime so callers stay synchronous; they must not be called
//! from inside another Tokio runtime.

#[cfg(feature = "postgres")]
mod implementation {
    use crate::config::StoreConfig;
    use crate::storage::identifier::quote_identifier;
    use crate::storage::traits::{
        Catalog, Dialect, Row, SqlValue, StoreConnection, StoreError, StoreErrorKind,
        StoreResult,
    };
    use crate::{Error, Result};
    use deadpool_postgres::{
        Config, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime, Timeouts,
    };
    use secrecy::ExposeSecret;
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Runtime as TokioRuntime;
    use tokio_postgres::NoTls;
    use tokio_postgres::error::SqlState;
    use tokio_postgres::types::ToSql;

    /// Default maximum connections in pool.
    pub const DEFAULT_POOL_MAX_SIZE: usize = 20;

    /// Wait/create/recycle timeout for pooled connections.
    const POOL_TIMEOUT: Duration = Duration::from_secs(5);

    /// Builds the runtime shared by the pool and the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreFailure`] if the runtime cannot be created.
    pub fn build_runtime() -> Result<Arc<TokioRuntime>> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("sqlkv-postgres")
            .enable_all()
            .build()
            .map(Arc::new)
            .map_err(|e| Error::StoreFailure {
                operation: "postgres_create_runtime",
                cause: e.to_string(),
            })
    }

    /// Maps a driver error onto the store error classification.
    fn classify(e: &tokio_postgres::Error) -> StoreError {
        let kind = match e.code() {
            Some(code) if *code == SqlState::UNDEFINED_TABLE => StoreErrorKind::MissingTable,
            Some(code) if *code == SqlState::UNIQUE_VIOLATION => StoreErrorKind::UniqueViolation,
            Some(code) if *code == SqlState::QUERY_CANCELED => StoreErrorKind::Timeout,
            _ => StoreErrorKind::Other,
        };
        // The driver's Display for server errors is just "db error".
        let message = e.as_db_error().map_or_else(
            || e.to_string(),
            |db| format!("{}: {} ({})", db.severity(), db.message(), db.code().code()),
        );
        StoreError::new(kind, message)
    }

    fn classify_pool(e: PoolError) -> StoreError {
        match e {
            PoolError::Timeout(kind) => StoreError::new(
                StoreErrorKind::Timeout,
                format!("connection pool timeout ({kind:?})"),
            ),
            PoolError::Backend(e) => classify(&e),
            other => StoreError::other(other),
        }
    }

    /// Borrows bound values as driver parameters.
    fn to_params(args: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
        args.iter()
            .map(|arg| match arg {
                SqlValue::Text(s) => s as &(dyn ToSql + Sync),
                SqlValue::Integer(n) => n as &(dyn ToSql + Sync),
            })
            .collect()
    }

    /// Runs `fut` on `runtime`, bounded by `deadline` when set.
    fn block_on<F, T>(runtime: &TokioRuntime, deadline: Option<Duration>, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match deadline {
            Some(limit) => runtime.block_on(async {
                tokio::time::timeout(limit, fut).await.map_err(|_| {
                    StoreError::new(
                        StoreErrorKind::Timeout,
                        format!("no response within {}ms", limit.as_millis()),
                    )
                })?
            }),
            None => runtime.block_on(fut),
        }
    }

    /// Pooled PostgreSQL connection bound to one database.
    pub struct PostgresConnection {
        pool: Pool,
        runtime: Arc<TokioRuntime>,
        operation_timeout: Option<Duration>,
    }

    impl PostgresConnection {
        /// Creates the pool for `config.database_name`.
        ///
        /// Connections are established lazily on first use.
        ///
        /// # Errors
        ///
        /// Returns [`Error::StoreFailure`] if the pool cannot be configured.
        pub fn connect(config: &StoreConfig, runtime: Arc<TokioRuntime>) -> Result<Self> {
            let mut cfg = Config::new();
            cfg.host = Some(config.host.clone());
            cfg.port = config.port;
            cfg.user = Some(config.user.clone());
            cfg.password = Some(config.password.expose_secret().to_string());
            cfg.dbname = Some(config.database_name.clone());
            if let Some(timeout) = config.operation_timeout {
                cfg.options = Some(format!("-c statement_timeout={}", timeout.as_millis()));
            }
            cfg.pool = Some(PoolConfig {
                max_size: config.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE),
                timeouts: Timeouts {
                    wait: Some(POOL_TIMEOUT),
                    create: Some(POOL_TIMEOUT),
                    recycle: Some(POOL_TIMEOUT),
                },
                ..Default::default()
            });
            cfg.manager = Some(ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            });

            let pool = cfg
                .create_pool(Some(Runtime::Tokio1), NoTls)
                .map_err(|e| Error::StoreFailure {
                    operation: "postgres_create_pool",
                    cause: e.to_string(),
                })?;

            tracing::debug!(
                host = %config.host,
                database = %config.database_name,
                "Created PostgreSQL pool"
            );
            Ok(Self {
                pool,
                runtime,
                operation_timeout: config.operation_timeout,
            })
        }
    }

    impl StoreConnection for PostgresConnection {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        fn execute(&self, sql: &str, args: &[SqlValue]) -> StoreResult<u64> {
            block_on(&self.runtime, self.operation_timeout, async {
                let client = self.pool.get().await.map_err(classify_pool)?;
                client
                    .execute(sql, &to_params(args))
                    .await
                    .map_err(|e| classify(&e))
            })
        }

        fn query(&self, sql: &str, args: &[SqlValue]) -> StoreResult<Vec<Row>> {
            block_on(&self.runtime, self.operation_timeout, async {
                let client = self.pool.get().await.map_err(classify_pool)?;
                let rows = client
                    .query(sql, &to_params(args))
                    .await
                    .map_err(|e| classify(&e))?;

                rows.iter()
                    .map(|row| {
                        (0..row.len())
                            .map(|i| row.try_get::<_, String>(i))
                            .collect::<std::result::Result<Row, _>>()
                            .map_err(|e| classify(&e))
                    })
                    .collect()
            })
        }
    }

    /// Admin catalog backed by a transient connection to the maintenance database.
    pub struct PostgresCatalog {
        config: tokio_postgres::Config,
        runtime: Arc<TokioRuntime>,
        operation_timeout: Option<Duration>,
    }

    impl PostgresCatalog {
        /// Creates a catalog that connects to `config.admin_database`.
        #[must_use]
        pub fn new(config: &StoreConfig, runtime: Arc<TokioRuntime>) -> Self {
            let mut pg = tokio_postgres::Config::new();
            pg.host(&config.host)
                .user(&config.user)
                .password(config.password.expose_secret())
                .dbname(&config.admin_database)
                .connect_timeout(POOL_TIMEOUT);
            if let Some(port) = config.port {
                pg.port(port);
            }
            Self {
                config: pg,
                runtime,
                operation_timeout: config.operation_timeout,
            }
        }

        async fn client(&self) -> StoreResult<tokio_postgres::Client> {
            let (client, connection) = self
                .config
                .connect(NoTls)
                .await
                .map_err(|e| classify(&e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "Admin connection closed with error");
                }
            });
            Ok(client)
        }
    }

    impl Catalog for PostgresCatalog {
        fn database_exists(&self, name: &str) -> StoreResult<bool> {
            block_on(&self.runtime, self.operation_timeout, async {
                let client = self.client().await?;
                let rows = client
                    .query("SELECT datname FROM pg_database WHERE datname = $1", &[&name])
                    .await
                    .map_err(|e| classify(&e))?;
                Ok(!rows.is_empty())
            })
        }

        fn create_database(&self, name: &str) -> StoreResult<()> {
            block_on(&self.runtime, self.operation_timeout, async {
                let client = self.client().await?;
                // CREATE DATABASE cannot run inside a transaction block, so use
                // the simple query protocol.
                match client
                    .batch_execute(&format!("CREATE DATABASE {}", quote_identifier(name)))
                    .await
                {
                    Ok(()) => Ok(()),
                    Err(e) if e.code() == Some(&SqlState::DUPLICATE_DATABASE) => Ok(()),
                    Err(e) => Err(classify(&e)),
                }
            })
        }
    }
}

#[cfg(feature = "postgres")]
pub use implementation::{
    DEFAULT_POOL_MAX_SIZE, PostgresCatalog, PostgresConnection, build_runtime,
};
