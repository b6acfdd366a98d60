//! Directory-backed store persisting one file per key
//!
//! Each key is written to `<dir>/<percent-encoded key>.json`. Characters
//! outside `[A-Za-z0-9-_.~]` are percent-encoded so namespaced keys such as
//! `tasks:today` map to portable file names and can be recovered on
//! enumeration.

use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StoreError};

/// File extension used for stored values
const FILE_EXTENSION: &str = "json";

/// Stores values as files in an XDG-compliant cache directory
///
/// Uses `~/.cache/shelfcache/` on Linux, or the platform equivalent.
///
/// Encoding can triple a key's length, so keys with more than roughly 80
/// non-alphanumeric bytes exceed the usual 255-byte file name limit and their
/// writes fail with an I/O error.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where value files are stored
    dir: PathBuf,
    /// Optional byte quota across all stored values
    quota: Option<u64>,
}

impl FileStore {
    /// Creates a FileStore in the platform cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        Self::default_dir().map(Self::with_dir)
    }

    /// Returns the platform cache directory for shelfcache
    pub fn default_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "shelfcache")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir, quota: None }
    }

    /// Limits the total size of stored values to `quota` bytes
    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Directory backing this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path to the value file for the given key
    fn item_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", urlencoding::encode(key), FILE_EXTENSION))
    }

    /// Ensures the store directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Sums the sizes of all value files except the one at `skip`
    fn used_bytes(&self, skip: &Path) -> Result<u64, StoreError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path() == skip {
                continue;
            }
            total += entry.metadata()?.len();
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        // Invalid UTF-8 is passed through lossily so callers see it as a corrupt value
        match fs::read(self.item_path(key)) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let path = self.item_path(key);

        if let Some(quota) = self.quota {
            let needed = self.used_bytes(&path)? + value.len() as u64;
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        fs::write(path, value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| urlencoding::decode(stem).ok())
            {
                keys.push(key.into_owned());
            }
        }
        Ok(keys)
    }
}
