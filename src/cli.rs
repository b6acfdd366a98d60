//! Command-line interface parsing for shelfcache
//!
//! The binary is an operator tool over the same cache the staff client uses:
//! it can inspect and edit namespaces, run cleanup passes, read metrics and
//! perform cached fetches against the hosted backend.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::Namespace;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--ttl` override was not of the form `namespace=seconds`
    #[error("Invalid TTL override: '{0}'. Expected NAMESPACE=SECONDS, e.g. tasks=120")]
    InvalidTtl(String),

    /// A value passed to `set` was not valid JSON
    #[error("Invalid JSON value: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No storage directory was given and none could be determined
    #[error("Could not determine a storage directory; pass --storage-dir")]
    NoStorageDir,

    /// The store refused a write requested on the command line
    #[error("Cache operation failed: {0}")]
    CacheFailed(#[from] crate::cache::CacheError),

    /// Waiting for the shutdown signal failed
    #[error("Signal handling failed: {0}")]
    Signal(#[from] std::io::Error),
}

/// shelfcache - inspect and maintain the offline cache of the store task app
#[derive(Parser, Debug)]
#[command(name = "shelfcache")]
#[command(about = "Offline-aware TTL cache for the grocery store task app")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache entries (defaults to the platform cache directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Treat the network as unavailable
    #[arg(long, global = true)]
    pub offline: bool,

    /// Reject writes once stored entries exceed this many bytes
    #[arg(long, value_name = "BYTES", global = true)]
    pub quota_bytes: Option<u64>,

    /// Quota assumed when reporting storage usage percentages
    #[arg(long, value_name = "BYTES", global = true)]
    pub assumed_quota: Option<u64>,

    /// Override a namespace's default TTL, e.g. --ttl tasks=120
    #[arg(long = "ttl", value_name = "NAMESPACE=SECONDS", global = true)]
    pub ttl: Vec<String>,

    /// Backend project URL used by `fetch`
    #[arg(long, env = "SHELFCACHE_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Backend API key used by `fetch`
    #[arg(long, env = "SHELFCACHE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Cache operations exposed on the command line
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Store a JSON value
    Set {
        namespace: Namespace,
        key: String,
        /// JSON payload, e.g. '{"sku":"milk-2l","quantity":12}'
        value: String,
        /// TTL in milliseconds (defaults to the namespace TTL)
        #[arg(long)]
        ttl_ms: Option<u64>,
    },
    /// Print a value if it is still fresh
    Get { namespace: Namespace, key: String },
    /// Print the stored entry regardless of age
    Peek { namespace: Namespace, key: String },
    /// Remove a key
    Delete { namespace: Namespace, key: String },
    /// List keys in a namespace
    Keys { namespace: Namespace },
    /// Remove every key in a namespace
    Clear { namespace: Namespace },
    /// Show storage statistics (all namespaces if none given)
    Stats { namespace: Option<Namespace> },
    /// Remove stale and corrupted entries (all namespaces if none given)
    Cleanup { namespace: Option<Namespace> },
    /// Show hit/miss counters
    Metrics {
        /// Zero the counters
        #[arg(long)]
        reset: bool,
    },
    /// Fetch a backend table through the cache
    Fetch {
        namespace: Namespace,
        table: String,
        /// Columns to select
        #[arg(long, default_value = "*")]
        select: String,
        /// Cache key (defaults to "<table>?select=<columns>")
        #[arg(long)]
        key: Option<String>,
    },
    /// Run the periodic cleanup until interrupted
    Watch {
        /// Seconds between cleanup passes
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

/// Parses a `namespace=seconds` TTL override
pub fn parse_ttl_override(s: &str) -> Result<(Namespace, Duration), CliError> {
    let invalid = || CliError::InvalidTtl(s.to_string());
    let (namespace, seconds) = s.split_once('=').ok_or_else(invalid)?;
    let namespace = namespace.parse::<Namespace>().map_err(|_| invalid())?;
    let seconds = seconds.trim().parse::<u64>().map_err(|_| invalid())?;
    Ok((namespace, Duration::from_secs(seconds)))
}
