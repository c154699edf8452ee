//! Per-directory episode cache
//!
//! Each series directory carries a `cache.json` document mapping landing page
//! URLs to the metadata resolved for them, so repeated runs skip landing page
//! fetches. The whole document is rewritten after every insertion through a
//! temp file + rename, so a crash leaves either the old or the new document on
//! disk, never a torn one.
//!
//! - [`entry`] - Entry type and entry-level validation

pub mod entry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::constants::files;
use crate::errors::{CacheError, CacheResult};

pub use entry::CacheEntry;

/// Persistent store of resolved episode metadata
///
/// Raw document values are kept as loaded; an entry is validated only when it
/// is read, so one bad entry never costs the rest of the document.
#[derive(Debug)]
pub struct EpisodeCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl EpisodeCache {
    /// Load the cache stored in `dir`
    ///
    /// A missing document yields an empty cache. So does a document that is
    /// not a JSON object, after a warning.
    pub async fn load(dir: &Path) -> Self {
        let path = dir.join(files::CACHE_FILE_NAME);
        let entries = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, Value>>(&bytes) {
                Ok(entries) => {
                    debug!("Loaded {} cached entries from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!("Corrupted cache file {} ({}). Starting fresh.", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Inaccessible cache file {} ({}). Starting fresh.", path.display(), e);
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of raw entries, valid or not
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Look up an entry; invalid entries are misses
    pub async fn get(&self, landing_url: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock().await;
        let value = entries.get(landing_url)?;
        let entry = CacheEntry::from_value(value);
        if entry.is_none() {
            debug!("Ignoring incomplete cache entry for {}", landing_url);
        }
        entry
    }

    /// Insert or replace an entry and persist the whole document
    ///
    /// The in-memory entry is kept even when the write fails.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if serialization or the atomic replace fails
    pub async fn put(&self, landing_url: &str, entry: &CacheEntry) -> CacheResult<()> {
        let value = serde_json::to_value(entry)?;
        let mut entries = self.entries.lock().await;
        entries.insert(landing_url.to_string(), value);
        self.write_document(&entries).await
    }

    async fn write_document(&self, entries: &BTreeMap<String, Value>) -> CacheResult<()> {
        let content = serde_json::to_vec_pretty(entries)?;
        let temp_path = self.path.with_file_name(format!(
            "{}{}",
            files::CACHE_FILE_NAME,
            files::TEMP_FILE_SUFFIX
        ));

        fs::write(&temp_path, &content).await.map_err(|e| {
            error!("Failed to write temporary cache file: {}", e);
            CacheError::AtomicWriteFailed {
                path: temp_path.clone(),
                reason: format!("Temporary file write failed: {}", e),
            }
        })?;

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            error!("Failed to rename temporary cache file: {}", e);
            CacheError::AtomicWriteFailed {
                path: self.path.clone(),
                reason: format!("Atomic rename failed: {}", e),
            }
        })
    }
}
