//! The manifest: the durable, structured record of staging decisions.
//!
//! One NDJSON line per staged workflow, so the file can be appended to and
//! re-read across pipeline phases without full re-parsing. The same format
//! serves two roles: the per-run restore manifest, and the `.flowvault`
//! manifest artifact a backup leaves beside its tree (the highest-priority
//! identity signal for the next restore).

mod types;

pub use types::{
    ManifestEntry, MatchType, NOTE_SANITIZED_EXISTING_INVALID, NOTE_SANITIZED_INVALID_FORMAT,
    NOTE_STAGED_DUPLICATE_CONFLICT,
};

use crate::text::{comparison_key, normalize_folder_path};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to serialize manifest entry: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Normalized lookup key for a backup-root-relative file path: the
/// extension dropped and every segment slugified, so renamed backup roots
/// and re-cased directories still hit the same entry.
#[must_use]
pub fn normalized_path_key(source_path: &str) -> String {
    let without_ext = Path::new(source_path).with_extension("");
    normalize_folder_path(&without_ext.to_string_lossy())
}

/// In-memory manifest, persisted as NDJSON at well-defined checkpoints.
#[derive(Debug, Default)]
pub struct ManifestStore {
    path: PathBuf,
    entries: Vec<ManifestEntry>,
    /// Normalized source path to position in `entries`.
    by_path_key: HashMap<String, usize>,
}

impl ManifestStore {
    /// Empty store that will persist to `path` on flush.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ManifestStore {
            path: path.into(),
            entries: Vec::new(),
            by_path_key: HashMap::new(),
        }
    }

    /// Load an existing manifest. An absent file yields an empty store; a
    /// malformed line is skipped with a warning rather than failing the
    /// whole manifest.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let mut store = Self::new(path);
        if !path.exists() {
            debug!("No manifest at {}; starting empty", path.display());
            return Ok(store);
        }

        let content = fs::read_to_string(path).await?;
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ManifestEntry>(line) {
                Ok(entry) => store.upsert(entry),
                Err(e) => {
                    warn!(
                        "Skipping malformed manifest line {} in {}: {e}",
                        lineno.saturating_add(1),
                        path.display()
                    );
                }
            }
        }
        debug!(
            "Loaded {} manifest entries from {}",
            store.entries.len(),
            path.display()
        );
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the entry for its source path.
    pub fn upsert(&mut self, entry: ManifestEntry) {
        let key = normalized_path_key(&entry.source_path);
        match self.by_path_key.get(&key) {
            Some(&pos) => {
                if let Some(slot) = self.entries.get_mut(pos) {
                    *slot = entry;
                }
            }
            None => {
                self.by_path_key.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Prior-run entry whose normalized source path equals `path_key`,
    /// provided it carries a final id worth reusing.
    #[must_use]
    pub fn prior_by_path(&self, path_key: &str) -> Option<&ManifestEntry> {
        self.by_path_key
            .get(path_key)
            .and_then(|&pos| self.entries.get(pos))
            .filter(|entry| entry.id.is_some())
    }

    /// Prior-run name fallback: among entries with a final id and a
    /// matching name, the most recently updated one. Ties break toward the
    /// greater id so the result never depends on insertion order.
    #[must_use]
    pub fn prior_by_name_newest(&self, name: &str) -> Option<&ManifestEntry> {
        let key = comparison_key(name);
        self.entries
            .iter()
            .filter(|entry| entry.id.is_some() && comparison_key(&entry.name) == key)
            .max_by(|a, b| {
                (a.updated_at.as_str(), a.id.as_deref())
                    .cmp(&(b.updated_at.as_str(), b.id.as_deref()))
            })
    }

    /// Persist all entries as NDJSON, one object per line.
    pub async fn flush(&self) -> Result<(), ManifestError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        fs::write(&self.path, out).await?;
        debug!(
            "Flushed {} manifest entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}
