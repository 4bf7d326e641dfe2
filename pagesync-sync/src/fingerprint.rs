//! Fingerprint store: SHA-256 change detection for content files.
//!
//! Persists a [`FingerprintFile`] JSON document, by default at
//! `.pagesync/fingerprints.json`. Writes use an atomic `.tmp` + rename.
//! A record only moves forward after a successful upsert; the orchestrator
//! is the sole caller of [`FingerprintStore::commit`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use pagesync_core::ItemKey;

use crate::error::{io_err, SyncError};

/// Item key (source path) to SHA-256 hex digest.
pub type Fingerprints = BTreeMap<String, String>;

/// On-disk payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintFile {
    pub synced_at: DateTime<Utc>,
    pub files: Fingerprints,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FingerprintCompat {
    Structured(StructuredCompat),
    Legacy(Fingerprints),
}

#[derive(Debug, Deserialize)]
struct StructuredCompat {
    synced_at: Option<DateTime<Utc>>,
    files: Fingerprints,
}

/// SHA-256 hex digest of `bytes`.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// SHA-256 hex digest of a file's contents.
pub fn fingerprint_file(path: &Path) -> Result<String, SyncError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    Ok(fingerprint_bytes(&bytes))
}

/// Loaded fingerprint records plus the file they flush to.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
    synced_at: Option<DateTime<Utc>>,
    files: Fingerprints,
}

impl FingerprintStore {
    /// Load from `path`. A missing, unreadable, or corrupt file yields an
    /// empty store; every item then counts as changed.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let empty = |path: PathBuf| Self {
            path,
            synced_at: None,
            files: Fingerprints::new(),
        };

        if !path.exists() {
            tracing::warn!("no fingerprint file at {}, starting cold", path.display());
            return empty(path);
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("cannot read {}: {e}; starting cold", path.display());
                return empty(path);
            }
        };
        match serde_json::from_str::<FingerprintCompat>(&contents) {
            Ok(FingerprintCompat::Structured(s)) => Self {
                path,
                synced_at: s.synced_at,
                files: s.files,
            },
            Ok(FingerprintCompat::Legacy(files)) => Self {
                path,
                synced_at: None,
                files,
            },
            Err(e) => {
                tracing::warn!("corrupt fingerprint file {}: {e}; starting cold", path.display());
                empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` if `key` is unknown or its recorded digest differs from `hash`.
    pub fn has_changed(&self, key: &ItemKey, hash: &str) -> bool {
        self.files.get(key.as_str()).map(String::as_str) != Some(hash)
    }

    pub fn get(&self, key: &ItemKey) -> Option<&str> {
        self.files.get(key.as_str()).map(String::as_str)
    }

    /// Record `hash` as the last successfully synced digest for `key`.
    pub fn commit(&mut self, key: &ItemKey, hash: &str) {
        self.files.insert(key.as_str().to_string(), hash.to_string());
    }

    /// Atomically persist all records and stamp `synced_at`.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`.
    pub fn flush(&mut self) -> Result<(), SyncError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }

        let synced_at = Utc::now();
        let file = FingerprintFile {
            synced_at,
            files: self.files.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        self.synced_at = Some(synced_at);
        tracing::debug!("flushed {} fingerprints to {}", self.files.len(), self.path.display());
        Ok(())
    }

    /// Records in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Time of the last flush, if any was ever recorded.
    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.synced_at
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
