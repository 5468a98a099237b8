//! The persistent state file.
//!
//! One JSON object per recipe root, mapping cache key to what the last
//! successful run observed. The file is the only persistent global; all I/O
//! goes through [`State::load`] and [`State::save`], and tests work against
//! the in-memory value directly.

use crate::fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tasktree_graph::TaskGraph;

/// State file name, created in the recipe root directory.
pub const STATE_FILE_NAME: &str = ".tasktree-state";

/// State error types.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Serialisation or write failure while persisting
    #[error("failed to write state file {path}: {message}")]
    Write {
        /// Target path
        path: PathBuf,
        /// Underlying failure
        message: String,
    },
}

/// What was known about a task after its last successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Wall-clock seconds at the start of the last successful run
    pub last_run: u64,
    /// mtime observed then, for every path that was an input at that time
    #[serde(default)]
    pub input_state: BTreeMap<String, u64>,
}

/// In-memory task state, keyed by cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    entries: BTreeMap<String, StateEntry>,
}

impl State {
    /// Load the state file.
    ///
    /// A missing file is an empty state. An unreadable or unparseable file
    /// is reported with a one-line warning and also yields empty state —
    /// losing freshness is recoverable, refusing to run is not. Entries
    /// whose key is not a cache key, or whose value has the wrong shape,
    /// are dropped silently.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("ignoring unreadable state file {}: {e}", path.display());
                return Self::default();
            }
        };

        let parsed: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_str(&content) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!("ignoring corrupt state file {}: {e}", path.display());
                    return Self::default();
                }
            };

        let mut entries = BTreeMap::new();
        for (key, value) in parsed {
            if !is_cache_key(&key) {
                continue;
            }
            if let Ok(entry) = serde_json::from_value::<StateEntry>(value) {
                let _ = entries.insert(key, entry);
            }
        }

        Self { entries }
    }

    /// Serialise to JSON and persist atomically: write a temporary sibling,
    /// then rename over the target. A crash mid-write leaves either the old
    /// file or the new one, never a torn state.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| StateError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, json).map_err(|e| StateError::Write {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        std::fs::rename(&tmp, path).map_err(|e| StateError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Drop entries whose task-hash prefix does not belong to any task in
    /// the current graph. Runs before staleness analysis.
    pub fn prune(&mut self, graph: &TaskGraph) -> usize {
        let valid: BTreeSet<String> = graph.tasks().map(fingerprint::task_fingerprint).collect();

        let before = self.entries.len();
        self.entries.retain(|key, _| valid.contains(key_prefix(key)));
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!("pruned {removed} state entries with no matching task");
        }
        removed
    }

    /// Look up the entry for a cache key.
    #[must_use]
    pub fn get(&self, cache_key: &str) -> Option<&StateEntry> {
        self.entries.get(cache_key)
    }

    /// Record the entry for a cache key.
    pub fn insert(&mut self, cache_key: String, entry: StateEntry) {
        let _ = self.entries.insert(cache_key, entry);
    }

    /// Whether any entry exists under this task-hash prefix.
    #[must_use]
    pub fn has_task(&self, task_hash: &str) -> bool {
        self.entries.keys().any(|key| key_prefix(key) == task_hash)
    }

    /// Whether these exact arguments are recorded under a different task
    /// hash. Only possible against an unpruned state.
    #[must_use]
    pub fn has_args_elsewhere(&self, task_hash: &str, args_hash: &str) -> bool {
        self.entries
            .keys()
            .any(|key| key_prefix(key) != task_hash && key_suffix(key) == Some(args_hash))
    }

    /// All cache keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the state holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key_prefix(key: &str) -> &str {
    key.split_once("__").map(|(prefix, _)| prefix).unwrap_or(key)
}

fn key_suffix(key: &str) -> Option<&str> {
    key.split_once("__").map(|(_, suffix)| suffix)
}

/// 8 lowercase hex chars, optionally followed by `__` and 8 more.
fn is_cache_key(key: &str) -> bool {
    fn hex8(s: &str) -> bool {
        s.len() == 8
            && s.chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    match key.split_once("__") {
        Some((task, args)) => hex8(task) && hex8(args),
        None => hex8(key),
    }
}
