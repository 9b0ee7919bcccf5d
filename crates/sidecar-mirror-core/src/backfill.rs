use crate::error::Error;
use crate::mapping::Located;
use crate::reporter::Notice;
use crate::synchronizer::MirrorSynchronizer;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use walkdir::WalkDir;

#[derive(Debug)]
pub struct BackfillResult {
    pub files_scanned: usize,
    pub sidecars_created: usize,
    pub already_mirrored: usize,
    pub duration: Duration,
}

/// Create sidecars for source files that existed before watching started.
///
/// Existing sidecars are never rewritten. When several source files share a
/// sidecar path, the first one in file-name order claims it.
pub fn backfill(synchronizer: &MirrorSynchronizer) -> Result<BackfillResult, Error> {
    let start = Instant::now();
    let reporter = synchronizer.reporter();
    let mapping = synchronizer.mapping();
    reporter.on_backfill_start();

    let mut pending: BTreeMap<PathBuf, Located> = BTreeMap::new();
    let mut files_scanned = 0usize;
    let mut already_mirrored = 0usize;

    let walker = WalkDir::new(mapping.source_root())
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !synchronizer.is_ignored(entry.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::PermissionDenied) {
                    error!("Access denied during backfill: {}", err);
                    continue;
                }
                let path = err.path().map(PathBuf::from).unwrap_or_default();
                let source = io::Error::from(err);
                return Err(Error::Fs {
                    action: "walk",
                    path,
                    source,
                });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let Some(located) = mapping.locate(entry.path()) else {
            continue;
        };
        if mapping.is_sidecar_name(&located.name) {
            continue;
        }

        files_scanned += 1;
        let sidecar_path = mapping.sidecar_path(&located);
        if pending.contains_key(&sidecar_path) || sidecar_path.exists() {
            already_mirrored += 1;
            continue;
        }
        pending.insert(sidecar_path, located);
    }
    debug!(
        "Backfill scanned {} files, {} need a sidecar",
        files_scanned,
        pending.len()
    );

    let created = AtomicUsize::new(0);
    pending
        .par_iter()
        .try_for_each(|(sidecar_path, located)| -> Result<(), Error> {
            if let Some(parent) = sidecar_path.parent() {
                std::fs::create_dir_all(parent).map_err(Error::fs("create directory", parent))?;
            }
            synchronizer.write_sidecar(located, sidecar_path)?;
            reporter.notice(&Notice::SidecarCreated {
                source_name: located.name.clone(),
            });
            let done = created.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_backfill_progress(files_scanned, done);
            Ok(())
        })?;

    let sidecars_created = created.into_inner();
    let duration = start.elapsed();
    reporter.on_backfill_complete(sidecars_created, duration.as_secs_f64());
    info!(
        "Backfill complete in {:.2}s: {} created, {} already mirrored",
        duration.as_secs_f64(),
        sidecars_created,
        already_mirrored
    );

    Ok(BackfillResult {
        files_scanned,
        sidecars_created,
        already_mirrored,
        duration,
    })
}
