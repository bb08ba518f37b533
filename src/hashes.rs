//! Content-hash store for baseline drift detection.
//!
//! The store ties each baseline copy to the digest it had when it was last
//! added, so `baseline review` and `status` can detect staleness without
//! guessing. Entries are only ever overwritten, never pruned.
use crate::util::{sha256_hex, write_json_atomic};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One tracked file: the digest recorded at add time and when it was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub hash: String,
    pub updated: String,
    /// Live project file the baseline copy was taken from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Mapping from absolute path to its tracked digest, persisted as
/// `{ "<path>": { "hash": ..., "updated": ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashStore {
    entries: BTreeMap<String, TrackedFile>,
}

/// SHA-256 of the file's full contents, lowercase hex.
pub fn compute_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(sha256_hex(&bytes))
}

fn store_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn now_timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

impl HashStore {
    /// Load the store; a missing or unreadable file yields an empty store.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            return Self::default();
        }
        let parsed = fs::read(path)
            .with_context(|| format!("read {}", path.display()))
            .and_then(|bytes| {
                serde_json::from_slice::<HashStore>(&bytes).context("parse hash store JSON")
            });
        match parsed {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable hash store");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).with_context(|| format!("save hash store {}", path.display()))
    }

    pub fn get(&self, path: &Path) -> Option<&TrackedFile> {
        self.entries.get(&store_key(path))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite the entry for `path` with its current digest and the current time.
    pub fn record(&mut self, path: &Path) -> Result<()> {
        self.insert(path, None)
    }

    /// Record a baseline copy along with the live file it mirrors.
    pub fn record_with_source(&mut self, path: &Path, source: &Path) -> Result<()> {
        self.record(path)?;
        if let Some(entry) = self.entries.get_mut(&store_key(path)) {
            entry.source = Some(store_key(source));
        }
        Ok(())
    }

    fn insert(&mut self, path: &Path, source: Option<String>) -> Result<()> {
        let hash = compute_hash(path)?;
        self.entries.insert(
            store_key(path),
            TrackedFile {
                hash,
                updated: now_timestamp(),
                source,
            },
        );
        Ok(())
    }

    /// Whether the live content no longer matches the recorded digest.
    ///
    /// Never-recorded paths are not stale. When the entry names a source file
    /// that still exists, that file is the live content; otherwise `path`
    /// itself is hashed.
    pub fn is_stale(&self, path: &Path) -> Result<bool> {
        let Some(entry) = self.get(path) else {
            return Ok(false);
        };
        let live = entry
            .source
            .as_deref()
            .map(PathBuf::from)
            .filter(|source| source.is_file())
            .unwrap_or_else(|| path.to_path_buf());
        Ok(compute_hash(&live)? != entry.hash)
    }
}
