//! Change cache: SHA-256 fingerprints of the last successful upload per
//! `(environment, remote path)`.
//!
//! Persists a flat JSON document at `~/.webpub/cache/publish-cache.json`:
//!
//! ```text
//! { "dev::pkg/web/forms/acct.js": { "modifiedTime": 1718000000000, "byteSize": 812, "contentHash": "9f86…" } }
//! ```
//!
//! The content hash is the only evidence of "unchanged"; modification time
//! and size are refreshed when they drift under a matching hash. Entries are
//! never deleted: a stale one just loses the hash comparison.
//!
//! Writes use the `.tmp` + rename pattern and happen while the in-memory map
//! is locked, so two publishes never interleave a save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use webpub_core::{config, EnvironmentName};

use crate::error::{io_err, SyncError};

/// Fingerprint of one local file at upload time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    /// Milliseconds since the Unix epoch.
    pub modified_time: f64,
    pub byte_size: u64,
    pub content_hash: String,
}

impl Fingerprint {
    fn same_stat(&self, other: &Fingerprint) -> bool {
        self.byte_size == other.byte_size && self.modified_time == other.modified_time
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// `"<environment key>::<remote path>"`, environment lowercased and path
/// separators normalized to `/`.
pub fn cache_key(environment: &EnvironmentName, remote_path: &str) -> String {
    format!("{}::{}", environment.key(), remote_path.replace('\\', "/"))
}

/// Persistent change cache. Share one instance per configuration lifetime.
#[derive(Debug)]
pub struct ChangeCache {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, Fingerprint>>,
}

impl ChangeCache {
    /// A cache that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load the cache stored at `path`.
    ///
    /// A missing file is an empty cache; the file is created on first write.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| SyncError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(io_err(&path, err)),
        };
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Load the cache under `<home>/.webpub/cache/`.
    pub async fn load_at(home: &Path) -> Result<Self, SyncError> {
        Self::load(config::cache_path_at(home)).await
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn get(&self, environment: &EnvironmentName, remote_path: &str) -> Option<Fingerprint> {
        self.entries
            .lock()
            .await
            .get(&cache_key(environment, remote_path))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// `true` when the last upload of `remote_path` to `environment` had the
    /// same content hash as `current`.
    ///
    /// On a hash match with drifted time or size, the stored entry is
    /// refreshed so the next check reflects the touched file.
    pub async fn is_unchanged(
        &self,
        environment: &EnvironmentName,
        remote_path: &str,
        current: &Fingerprint,
    ) -> Result<bool, SyncError> {
        let key = cache_key(environment, remote_path);
        let mut entries = self.entries.lock().await;
        let Some(stored) = entries.get(&key) else {
            return Ok(false);
        };
        if stored.content_hash != current.content_hash {
            return Ok(false);
        }
        if !stored.same_stat(current) {
            tracing::debug!(key = %key, "refreshing fingerprint of touched-but-identical file");
            entries.insert(key, current.clone());
            self.save_locked(&entries).await?;
        }
        Ok(true)
    }

    /// Record `fingerprint` as the state last uploaded for `remote_path`.
    pub async fn record(
        &self,
        environment: &EnvironmentName,
        remote_path: &str,
        fingerprint: Fingerprint,
    ) -> Result<(), SyncError> {
        let mut entries = self.entries.lock().await;
        entries.insert(cache_key(environment, remote_path), fingerprint);
        self.save_locked(&entries).await
    }

    async fn save_locked(&self, entries: &BTreeMap<String, Fingerprint>) -> Result<(), SyncError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let Some(dir) = path.parent() else {
            return Err(io_err(path, std::io::Error::other("invalid change cache path")));
        };
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| io_err(dir, e))?;

        let json = serde_json::to_string_pretty(entries).map_err(|source| SyncError::Json {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_err(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| io_err(path, e))?;
        Ok(())
    }
}
