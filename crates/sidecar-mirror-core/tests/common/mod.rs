#![allow(dead_code)]

use sidecar_mirror_core::{AppConfig, MirrorReporter, MirrorSynchronizer, Notice};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
pub struct RecordingReporter {
    notices: Mutex<Vec<Notice>>,
    pub backfill_completed: Mutex<Option<usize>>,
}

impl RecordingReporter {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.notices().iter().map(|n| n.to_string()).collect()
    }
}

impl MirrorReporter for RecordingReporter {
    fn notice(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }

    fn on_backfill_complete(&self, sidecars_created: usize, _duration_secs: f64) {
        *self.backfill_completed.lock().unwrap() = Some(sidecars_created);
    }
}

pub struct Fixture {
    _tmp: TempDir,
    pub source: PathBuf,
    pub archive: PathBuf,
    pub reporter: Arc<RecordingReporter>,
    pub sync: MirrorSynchronizer,
}

pub fn fixture() -> Fixture {
    fixture_with(|_| {})
}

/// Source and archive roots named like a typical media setup, both under one temp dir.
pub fn fixture_with(customize: impl FnOnce(&mut AppConfig)) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = AppConfig::new(
        tmp.path().join("video archive dir"),
        tmp.path().join(".txt archive dir"),
    );
    customize(&mut config);
    config.prepare_roots().unwrap();

    let reporter = Arc::new(RecordingReporter::default());
    let sync = MirrorSynchronizer::new(&config, reporter.clone()).unwrap();

    Fixture {
        _tmp: tmp,
        source: config.source_root.clone(),
        archive: config.archive_root.clone(),
        reporter,
        sync,
    }
}

/// Create a file with some bytes, creating parent directories as needed.
pub fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"media bytes").unwrap();
}

pub fn count_files_recursive(dir: &Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files_recursive(&path);
            } else if path.is_file() {
                count += 1;
            }
        }
    }
    count
}
