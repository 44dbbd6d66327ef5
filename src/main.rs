//! Binary entry point for sqlkv.
//!
//! A small CLI over the key-value façade, mostly useful for poking at a
//! database by hand.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use sqlkv::observability::{self, LoggingConfig};
use sqlkv::{BackendKind, Entry, KvStore, RangeRequest, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// sqlkv - an auto-provisioning key-value layer over SQL databases.
#[derive(Parser)]
#[command(name = "sqlkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection overrides applied on top of file and environment config.
#[derive(Args)]
struct ConnectionArgs {
    /// Backend: sqlite or postgres.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Host (`SQLite`: directory holding database files).
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// User.
    #[arg(long, global = true)]
    user: Option<String>,

    /// Password.
    #[arg(long, global = true)]
    password: Option<String>,

    /// Database name.
    #[arg(long, global = true)]
    database: Option<String>,

    /// Maintenance database used to create the target database (PostgreSQL).
    #[arg(long, global = true)]
    admin_database: Option<String>,

    /// Maximum pooled connections (PostgreSQL).
    #[arg(long, global = true)]
    pool_max_size: Option<usize>,

    /// Per-call deadline in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Store a value, replacing any existing one.
    Set {
        /// Table name.
        table: String,
        /// Key.
        key: String,
        /// Value.
        value: String,
    },

    /// Print the value stored under a key.
    Get {
        /// Table name.
        table: String,
        /// Key.
        key: String,
    },

    /// Delete a key.
    Delete {
        /// Table name.
        table: String,
        /// Key.
        key: String,
    },

    /// Store a value, failing if the key already exists.
    Insert {
        /// Table name.
        table: String,
        /// Key.
        key: String,
        /// Value.
        value: String,
    },

    /// List entries in key order.
    Range {
        /// Table name.
        table: String,

        /// Lower bound on keys.
        #[arg(long)]
        min: Option<String>,

        /// Upper bound on keys.
        #[arg(long)]
        max: Option<String>,

        /// Include the lower bound.
        #[arg(long)]
        min_include: bool,

        /// Include the upper bound.
        #[arg(long)]
        max_include: bool,

        /// Maximum entries to return (0 for no limit).
        #[arg(short, long, default_value = "0")]
        limit: u32,

        /// Descending key order.
        #[arg(long)]
        desc: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Walk through every operation against one table.
    Demo {
        /// Table name.
        table: String,
    },
}

fn main() -> ExitCode {
    // Missing .env files are fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = observability::init_logging(LoggingConfig::from_env(cli.verbose)) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.connection)?;
    let store = KvStore::open(&config).context("failed to open store")?;

    match cli.command {
        Commands::Set { table, key, value } => {
            store.set(&table, &key, &value)?;
            println!("OK");
        },
        Commands::Get { table, key } => match store.get(&table, &key)? {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("key {key:?} not found in {table:?}"),
        },
        Commands::Delete { table, key } => {
            store.delete(&table, &key)?;
            println!("Deleted {key:?}");
        },
        Commands::Insert { table, key, value } => {
            store.insert(&table, &key, &value)?;
            println!("OK");
        },
        Commands::Range {
            table,
            min,
            max,
            min_include,
            max_include,
            limit,
            desc,
            json,
        } => {
            let mut req = RangeRequest::new(table).limit(limit);
            if let Some(min) = min {
                req = req.min(min, min_include);
            }
            if let Some(max) = max {
                req = req.max(max, max_include);
            }
            if desc {
                req = req.descending();
            }
            print_entries(&store.get_range(&req)?, json)?;
        },
        Commands::Demo { table } => demo(&store, &table)?,
    }

    Ok(())
}

/// Builds the effective config: file, then environment, then flags.
fn load_config(path: Option<&std::path::Path>, args: ConnectionArgs) -> Result<StoreConfig> {
    let mut config = match path {
        Some(path) => StoreConfig::load_from_file(path)?,
        None => StoreConfig::load_default()?,
    }
    .with_env_overrides();

    if let Some(backend) = args.backend {
        let kind = BackendKind::parse(&backend)
            .with_context(|| format!("unknown backend '{backend}'"))?;
        config = config.with_backend(kind);
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(user) = args.user {
        config.user = user;
    }
    if let Some(password) = args.password {
        config.password = SecretString::from(password);
    }
    if let Some(database) = args.database {
        config.database_name = database;
    }
    if let Some(admin) = args.admin_database {
        config = config.with_admin_database(admin);
    }
    if let Some(size) = args.pool_max_size {
        config = config.with_pool_max_size(size);
    }
    if let Some(ms) = args.timeout_ms {
        config = config.with_operation_timeout(Duration::from_millis(ms));
    }

    Ok(config)
}

fn print_entries(entries: &[Entry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
    }
    for entry in entries {
        println!("{}\t{}", entry.key, entry.value);
    }
    Ok(())
}

fn demo(store: &KvStore, table: &str) -> Result<()> {
    let key = "demo-key";

    store.set(table, key, "first")?;
    println!("set {key} = first");

    println!("get {key} -> {:?}", store.get(table, key)?);

    let deleted = store.delete(table, key)?;
    println!("delete {key} -> {deleted}");

    println!("get {key} -> {:?}", store.get(table, key)?);

    store.insert(table, key, "second")?;
    println!("insert {key} = second");

    println!("get {key} -> {:?}", store.get(table, key)?);

    let entries = store.get_range(&RangeRequest::new(table))?;
    println!("range {table} ({} entries):", entries.len());
    print_entries(&entries, false)
}
