//! Content-addressed module cache.
//!
//! # Caching Strategy
//!
//! ```text
//! CacheStore
//! ├── records: FxHashMap<key, Option<Arc<CacheRecord>>>   (in-memory, per run)
//! │     None = known miss, never re-read from disk this run
//! └── <cache dir>/<key>                                   (on disk, across runs)
//!
//! key = hash(fingerprint + identity)
//! ```
//!
//! A record is valid for a module only while its `source_hash` equals the
//! hash of the module's current content. Nothing in this layer is fatal:
//! unreadable or malformed records are misses, failed writes are dropped.

mod dir;
pub mod hash;
mod record;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::config::Options;

pub use dir::{locate as locate_cache_dir, CACHE_DIR_NAME};
pub use record::{CacheRecord, RecordError};

use self::hash::content_hash;

// =============================================================================
// Pending Writes
// =============================================================================

/// Counts in-flight background writes so callers can wait for them.
#[derive(Default)]
struct PendingWrites {
    count: Mutex<usize>,
    idle: Condvar,
}

impl PendingWrites {
    fn begin(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

// =============================================================================
// Cache Store
// =============================================================================

/// Two-level (memory + disk) store of [`CacheRecord`]s.
pub struct CacheStore {
    enabled: bool,
    dir: PathBuf,
    fingerprint: String,
    records: RwLock<FxHashMap<String, Option<Arc<CacheRecord>>>>,
    pending: Arc<PendingWrites>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("enabled", &self.enabled)
            .field("dir", &self.dir)
            .field("records", &self.records.read().len())
            .finish()
    }
}

impl CacheStore {
    /// Create an enabled store persisting under `dir`.
    pub fn new(dir: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self {
            enabled: true,
            dir: dir.into(),
            fingerprint: fingerprint.into(),
            records: RwLock::new(FxHashMap::default()),
            pending: Arc::default(),
        }
    }

    /// Create the store described by `options`.
    ///
    /// A disabled store still knows its directory so it can be cleared.
    pub fn from_options(options: &Options) -> Self {
        let dir = options
            .cache_dir
            .clone()
            .unwrap_or_else(|| locate_cache_dir(&options.context));
        Self {
            enabled: options.cache,
            ..Self::new(dir, options.fingerprint.clone())
        }
    }

    /// Whether lookups and stores are active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Directory holding record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record key for a module identity.
    pub fn key(&self, identity: &str) -> String {
        content_hash(format!("{}{identity}", self.fingerprint))
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Look up a record valid for `content`.
    pub fn lookup(&self, identity: &str, content: &[u8]) -> Option<Arc<CacheRecord>> {
        if !self.enabled {
            return None;
        }

        let key = self.key(identity);
        let cached = self.records.read().get(&key).cloned();
        let record = match cached {
            Some(record) => record,
            None => {
                let record = self.read_record(&key).map(Arc::new);
                self.records.write().insert(key, record.clone());
                record
            }
        };

        let record = record?;
        if record.source_hash == content_hash(content) {
            tracing::debug!(target: "module_transformer::cache", identity, "cache hit");
            Some(record)
        } else {
            tracing::debug!(target: "module_transformer::cache", identity, "stale cache record");
            None
        }
    }

    fn read_record(&self, key: &str) -> Option<CacheRecord> {
        let path = self.record_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(
                        target: "module_transformer::cache",
                        path = %path.display(),
                        error = %err,
                        "unreadable cache record"
                    );
                }
                return None;
            }
        };
        CacheRecord::decode(&bytes)
            .inspect_err(|err| {
                tracing::debug!(
                    target: "module_transformer::cache",
                    path = %path.display(),
                    error = %err,
                    "corrupt cache record"
                );
            })
            .ok()
    }

    /// Persist a record for `identity`.
    ///
    /// The in-memory map is updated before returning; the disk write happens
    /// in the background and its failure is only logged.
    pub fn store(
        &self,
        identity: &str,
        source: &[u8],
        dependencies: Vec<String>,
        output: String,
    ) -> Option<Arc<CacheRecord>> {
        if !self.enabled {
            return None;
        }

        let key = self.key(identity);
        let record = Arc::new(CacheRecord {
            source_hash: content_hash(source),
            dependencies,
            output,
        });
        self.records.write().insert(key.clone(), Some(record.clone()));

        let path = self.record_path(&key);
        let bytes = record.encode();
        self.pending.begin();
        let pending = self.pending.clone();
        spawn(move || {
            if let Err(err) = write_atomic(&path, &bytes) {
                tracing::debug!(
                    target: "module_transformer::cache",
                    path = %path.display(),
                    error = %err,
                    "cache write failed"
                );
            }
            pending.finish();
        });
        Some(record)
    }

    /// Block until every background write has finished.
    pub fn flush(&self) {
        self.pending.wait();
    }

    /// Drop every record, in memory and on disk.
    ///
    /// Removes the files inside the cache directory; the directory stays.
    pub fn clear(&self) -> io::Result<()> {
        self.flush();
        self.records.write().clear();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        tracing::debug!(target: "module_transformer::cache", dir = %self.dir.display(), "cache cleared");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(feature = "parallel")]
fn spawn(job: impl FnOnce() + Send + 'static) {
    rayon::spawn(job);
}

#[cfg(not(feature = "parallel"))]
fn spawn(job: impl FnOnce() + Send + 'static) {
    job();
}
