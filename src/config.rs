//! Runtime configuration for the cache stack
//!
//! Defaults match the staff client: the platform cache directory, a 5 MiB
//! assumed quota for usage reporting, each namespace's built-in TTL and a
//! five minute cleanup interval. Command-line flags override them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{Namespace, DEFAULT_ASSUMED_QUOTA};
use crate::cleanup::CleanupConfig;
use crate::cli::{parse_ttl_override, Cli, CliError, Command};
use crate::store::FileStore;

/// Connection details for the hosted backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
}

/// Configuration derived from defaults and CLI arguments
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Where entries are stored; `None` means the platform cache directory
    pub storage_dir: Option<PathBuf>,
    /// Hard byte limit enforced by the store
    pub store_quota: Option<u64>,
    /// Quota assumed by `stats()` for usage percentages
    pub assumed_quota: u64,
    /// Per-namespace replacements for the built-in TTLs
    pub ttl_overrides: HashMap<Namespace, Duration>,
    /// Background cleanup settings
    pub cleanup: CleanupConfig,
    /// Connectivity assumed at startup
    pub start_online: bool,
    /// Backend used by cached fetches, if configured
    pub backend: Option<BackendConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            store_quota: None,
            assumed_quota: DEFAULT_ASSUMED_QUOTA,
            ttl_overrides: HashMap::new(),
            cleanup: CleanupConfig::default(),
            start_online: true,
            backend: None,
        }
    }
}

impl CacheConfig {
    /// Creates a CacheConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(CacheConfig)` with overrides applied
    /// * `Err(CliError)` if a TTL override is malformed
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = CacheConfig {
            storage_dir: cli.storage_dir.clone(),
            store_quota: cli.quota_bytes,
            start_online: !cli.offline,
            ..CacheConfig::default()
        };

        if let Some(bytes) = cli.assumed_quota {
            config.assumed_quota = bytes;
        }

        for arg in &cli.ttl {
            let (namespace, ttl) = parse_ttl_override(arg)?;
            config.ttl_overrides.insert(namespace, ttl);
        }

        if let Command::Watch { interval_secs } = cli.command {
            config.cleanup.interval = Duration::from_secs(interval_secs.max(1));
        }

        config.backend = cli.backend_url.as_ref().map(|url| BackendConfig {
            url: url.clone(),
            api_key: cli.api_key.clone().unwrap_or_default(),
        });

        Ok(config)
    }

    /// Opens the file store described by this configuration
    pub fn open_store(&self) -> Result<FileStore, CliError> {
        let dir = match &self.storage_dir {
            Some(dir) => dir.clone(),
            None => FileStore::default_dir().ok_or(CliError::NoStorageDir)?,
        };
        let store = FileStore::with_dir(dir);
        Ok(match self.store_quota {
            Some(quota) => store.with_quota(quota),
            None => store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.assumed_quota, 5 * 1024 * 1024);
        assert_eq!(config.cleanup.interval, Duration::from_secs(300));
        assert!(config.start_online);
        assert!(config.ttl_overrides.is_empty());
        assert!(config.backend.is_none());
    }

    #[test]
    fn test_from_cli_applies_flags() {
        let cli = Cli::parse_from([
            "shelfcache",
            "--storage-dir",
            "/tmp/shelf",
            "--offline",
            "--quota-bytes",
            "2048",
            "--assumed-quota",
            "4096",
            "--ttl",
            "tasks=30",
            "--ttl",
            "users=0",
            "--backend-url",
            "https://project.example.co",
            "keys",
            "tasks",
        ]);
        let config = CacheConfig::from_cli(&cli).unwrap();

        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/shelf")));
        assert!(!config.start_online);
        assert_eq!(config.store_quota, Some(2048));
        assert_eq!(config.assumed_quota, 4096);
        assert_eq!(config.ttl_overrides[&Namespace::Tasks], Duration::from_secs(30));
        assert_eq!(config.ttl_overrides[&Namespace::Users], Duration::ZERO);
        let backend = config.backend.expect("backend configured");
        assert_eq!(backend.url, "https://project.example.co");
    }

    #[test]
    fn test_from_cli_watch_interval() {
        let cli = Cli::parse_from(["shelfcache", "watch", "--interval-secs", "15"]);
        let config = CacheConfig::from_cli(&cli).unwrap();
        assert_eq!(config.cleanup.interval, Duration::from_secs(15));
    }

    #[test]
    fn test_from_cli_invalid_ttl() {
        let cli = Cli::parse_from(["shelfcache", "--ttl", "tasks", "stats"]);
        assert!(CacheConfig::from_cli(&cli).is_err());
    }

    #[test]
    fn test_open_store_uses_storage_dir() {
        let config = CacheConfig {
            storage_dir: Some(PathBuf::from("/tmp/shelf-test")),
            ..CacheConfig::default()
        };
        let store = config.open_store().unwrap();
        assert_eq!(store.dir(), PathBuf::from("/tmp/shelf-test").as_path());
    }
}
