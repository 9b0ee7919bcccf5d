use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Archive paths written by the synchronizer itself.
///
/// Entries live for the lifetime of the process and are never evicted, so a
/// restart forgets them.
#[derive(Debug, Default)]
pub struct SelfCreatedMarkers {
    paths: Mutex<HashSet<PathBuf>>,
}

impl SelfCreatedMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: impl Into<PathBuf>) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paths the synchronizer itself removed or renamed, waiting for the watcher
/// to report them back.
///
/// An exact match is consumed by the first event that reports it. A recorded
/// directory also covers events for anything that was inside it, until the
/// event for the directory itself arrives.
#[derive(Debug, Default)]
pub struct PendingEchoes {
    paths: Mutex<HashSet<PathBuf>>,
}

impl PendingEchoes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&self, path: impl Into<PathBuf>) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into());
    }

    /// True if `path` is an echo of our own action.
    pub fn take(&self, path: &Path) -> bool {
        let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
        if paths.remove(path) {
            return true;
        }
        path.ancestors().skip(1).any(|dir| paths.contains(dir))
    }

    /// Drop expectations for `path` and its ancestors once something new lives there.
    pub fn forget(&self, path: &Path) {
        let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in path.ancestors() {
            paths.remove(entry);
        }
    }

    pub fn len(&self) -> usize {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
