//! Configuration management.
//!
//! Settings are layered, lowest precedence first: defaults, the TOML config
//! file, `SQLKV_*` environment variables, and finally explicit overrides made
//! by the caller (the CLI applies its flags last).

use crate::storage::validate_identifier;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default maintenance database used for `CREATE DATABASE` on PostgreSQL.
pub const DEFAULT_ADMIN_DATABASE: &str = "postgres";

/// Default principal for backends without authentication.
const DEFAULT_USER: &str = "sqlkv";

/// Backing engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// `SQLite` files under a data directory.
    #[default]
    Sqlite,
    /// PostgreSQL server (requires the `postgres` feature).
    Postgres,
}

impl BackendKind {
    /// Parses a backend name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

/// Store construction options.
///
/// For `SQLite`, `host` is the directory holding the database files, or
/// `:memory:` for a private in-memory database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backing engine.
    pub backend: BackendKind,
    /// Network host (PostgreSQL) or data directory (`SQLite`).
    pub host: String,
    /// Network port; the engine default when `None`.
    pub port: Option<u16>,
    /// Credential principal.
    pub user: String,
    /// Credential secret.
    pub password: SecretString,
    /// Target logical database, created on open if missing.
    pub database_name: String,
    /// Maintenance database used while provisioning (PostgreSQL only).
    pub admin_database: String,
    /// Maximum pooled connections (PostgreSQL only).
    pub pool_max_size: Option<usize>,
    /// Per-call deadline; also used as the `SQLite` busy timeout.
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            host: ".".to_string(),
            port: None,
            user: DEFAULT_USER.to_string(),
            password: SecretString::from(String::new()),
            database_name: String::new(),
            admin_database: DEFAULT_ADMIN_DATABASE.to_string(),
            pool_max_size: None,
            operation_timeout: None,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Backend name.
    pub backend: Option<String>,
    /// Host or data directory.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// User.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Database name.
    pub database: Option<String>,
    /// Admin database.
    pub admin_database: Option<String>,
    /// Pool size.
    pub pool_max_size: Option<usize>,
    /// Operation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `SQLite` configuration storing `database_name` under `dir`.
    #[must_use]
    pub fn sqlite(dir: impl Into<String>, database_name: impl Into<String>) -> Self {
        Self {
            host: dir.into(),
            database_name: database_name.into(),
            ..Self::default()
        }
    }

    /// In-memory `SQLite` configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::sqlite(":memory:", "memory")
    }

    /// PostgreSQL configuration.
    #[must_use]
    pub fn postgres(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database_name: impl Into<String>,
    ) -> Self {
        Self {
            backend: BackendKind::Postgres,
            host: host.into(),
            user: user.into(),
            password: SecretString::from(password.into()),
            database_name: database_name.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            Error::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })?;

        Self::default().merge_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `<config_dir>/sqlkv/config.toml` (platform specific), then
    /// `~/.config/sqlkv/config.toml`. Returns defaults if neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but is invalid.
    pub fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let candidates = [
            base_dirs.config_dir().join("sqlkv").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("sqlkv")
                .join("config.toml"),
        ];

        candidates
            .iter()
            .find(|path| path.is_file())
            .map_or_else(|| Ok(Self::default()), |path| Self::load_from_file(path))
    }

    /// Applies a parsed config file on top of `self`.
    fn merge_file(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(backend) = file.backend {
            self.backend = BackendKind::parse(&backend)
                .ok_or_else(|| Error::InvalidConfig(format!("unknown backend '{backend}'")))?;
        }
        if let Some(host) = file.host {
            self.host = host;
        }
        if file.port.is_some() {
            self.port = file.port;
        }
        if let Some(user) = file.user {
            self.user = user;
        }
        if let Some(password) = file.password {
            self.password = SecretString::from(password);
        }
        if let Some(database) = file.database {
            self.database_name = database;
        }
        if let Some(admin) = file.admin_database {
            self.admin_database = admin;
        }
        if file.pool_max_size.is_some() {
            self.pool_max_size = file.pool_max_size;
        }
        if let Some(ms) = file.timeout_ms {
            self.operation_timeout = Some(Duration::from_millis(ms));
        }
        Ok(self)
    }

    /// Applies `SQLKV_*` environment variable overrides.
    ///
    /// Unparseable numeric values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(backend) = env("SQLKV_BACKEND").and_then(|v| BackendKind::parse(&v)) {
            self.backend = backend;
        }
        if let Some(host) = env("SQLKV_HOST") {
            self.host = host;
        }
        if let Some(port) = env("SQLKV_PORT").and_then(|v| v.parse().ok()) {
            self.port = Some(port);
        }
        if let Some(user) = env("SQLKV_USER") {
            self.user = user;
        }
        if let Some(password) = env("SQLKV_PASSWORD") {
            self.password = SecretString::from(password);
        }
        if let Some(database) = env("SQLKV_DATABASE") {
            self.database_name = database;
        }
        if let Some(admin) = env("SQLKV_ADMIN_DATABASE") {
            self.admin_database = admin;
        }
        if let Some(size) = env("SQLKV_POOL_MAX_SIZE").and_then(|v| v.parse::<usize>().ok()) {
            self.pool_max_size = Some(size.max(1));
        }
        if let Some(ms) = env("SQLKV_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.operation_timeout = Some(Duration::from_millis(ms));
        }
        self
    }

    /// Sets the backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the pool size.
    #[must_use]
    pub const fn with_pool_max_size(mut self, size: usize) -> Self {
        self.pool_max_size = Some(size);
        self
    }

    /// Sets the per-call deadline.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Sets the admin database.
    #[must_use]
    pub fn with_admin_database(mut self, name: impl Into<String>) -> Self {
        self.admin_database = name.into();
        self
    }

    /// Returns true if the `SQLite` backend should stay in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.backend == BackendKind::Sqlite && self.host == ":memory:"
    }

    /// Checks the construction rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the database name or user is empty
    /// or the pool size is zero, and [`Error::InvalidIdentifier`] if the
    /// database name is not a valid identifier.
    pub fn validate(&self) -> Result<()> {
        if self.database_name.is_empty() {
            return Err(Error::InvalidConfig("database name is required".to_string()));
        }
        if self.user.is_empty() {
            return Err(Error::InvalidConfig("user is required".to_string()));
        }
        if self.pool_max_size == Some(0) {
            return Err(Error::InvalidConfig(
                "pool_max_size must be at least 1".to_string(),
            ));
        }
        validate_identifier(&self.database_name)?;
        if self.backend == BackendKind::Postgres {
            validate_identifier(&self.admin_database)?;
        }
        Ok(())
    }
}

/// Reads a non-empty environment variable.
fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_validate_requires_database_and_user() {
        let config = StoreConfig::sqlite(".", "");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = StoreConfig::sqlite(".", "app");
        config.user = String::new();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_database_name() {
        let config = StoreConfig::sqlite(".", "app;drop");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_validate_ok() {
        assert!(StoreConfig::sqlite("/tmp", "app").validate().is_ok());
        assert!(
            StoreConfig::postgres("localhost", "root", "", "app")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(BackendKind::parse("SQLite"), Some(BackendKind::Sqlite));
        assert_eq!(BackendKind::parse("postgresql"), Some(BackendKind::Postgres));
        assert_eq!(BackendKind::parse("mysql"), None);
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let config = StoreConfig::postgres("localhost", "root", "hunter2", "app");
        assert!(!format!("{config:?}").contains("hunter2"));
        assert_eq!(config.password.expose_secret(), "hunter2");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend = "postgres"
host = "db.internal"
port = 5433
user = "svc"
password = "secret"
database = "orders"
pool_max_size = 4
timeout_ms = 1500
"#
        )
        .unwrap();

        let config = StoreConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, Some(5433));
        assert_eq!(config.user, "svc");
        assert_eq!(config.database_name, "orders");
        assert_eq!(config.admin_database, DEFAULT_ADMIN_DATABASE);
        assert_eq!(config.pool_max_size, Some(4));
        assert_eq!(config.operation_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_load_from_file_unknown_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend = \"oracle\"").unwrap();
        assert!(matches!(
            StoreConfig::load_from_file(file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_pool_size() {
        let config = StoreConfig::postgres("localhost", "root", "", "app").with_pool_max_size(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database = \"app\"\npool_max_size = 0").unwrap();
        let config = StoreConfig::load_from_file(file.path()).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_builders() {
        let config = StoreConfig::new()
            .with_backend(BackendKind::Postgres)
            .with_port(6543)
            .with_pool_max_size(4)
            .with_operation_timeout(Duration::from_millis(250))
            .with_admin_database("template1");

        assert_eq!(config.backend, BackendKind::Postgres);
        assert_eq!(config.host, ".");
        assert_eq!(config.port, Some(6543));
        assert_eq!(config.pool_max_size, Some(4));
        assert_eq!(config.operation_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.admin_database, "template1");
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_in_memory() {
        let config = StoreConfig::in_memory();
        assert!(config.is_in_memory());
        assert!(config.validate().is_ok());
    }
}
