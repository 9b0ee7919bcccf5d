use crate::config::AppConfig;
use crate::error::Error;
use crate::mapping::{Located, MirrorMapping, Side};
use crate::markers::{PendingEchoes, SelfCreatedMarkers};
use crate::reporter::{MirrorReporter, Notice};
use crate::sidecar::SidecarRecord;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A filesystem notification from either watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Created { path: PathBuf, is_dir: bool },
    Moved { from: PathBuf, to: PathBuf, is_dir: bool },
    Deleted { path: PathBuf, is_dir: bool },
}

/// Applies the mirroring rules for events seen in the source and archive trees.
///
/// Every handler runs to completion with direct filesystem calls. Nothing is
/// staged or rolled back: if a later step fails, earlier steps stay done.
///
/// Removals and renames done here are remembered until the watcher reports
/// them back, and those reports are dropped. Otherwise removing `clip.txt`
/// for a deleted `clip.mp4` would come back as a sidecar deletion and take a
/// sibling `clip.mov` with it.
pub struct MirrorSynchronizer {
    mapping: MirrorMapping,
    markers: Arc<SelfCreatedMarkers>,
    echoes: PendingEchoes,
    ignore_patterns: Vec<Pattern>,
    reporter: Arc<dyn MirrorReporter>,
}

impl MirrorSynchronizer {
    pub fn new(config: &AppConfig, reporter: Arc<dyn MirrorReporter>) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            mapping: MirrorMapping::new(config),
            markers: Arc::new(SelfCreatedMarkers::new()),
            echoes: PendingEchoes::new(),
            ignore_patterns: config.ignore_globs()?,
            reporter,
        })
    }

    pub fn mapping(&self) -> &MirrorMapping {
        &self.mapping
    }

    pub fn markers(&self) -> &Arc<SelfCreatedMarkers> {
        &self.markers
    }

    pub fn pending_echoes(&self) -> &PendingEchoes {
        &self.echoes
    }

    pub(crate) fn reporter(&self) -> &dyn MirrorReporter {
        self.reporter.as_ref()
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    pub fn handle(&self, event: &FsEvent) -> Result<(), Error> {
        match event {
            FsEvent::Created { path, is_dir } => {
                if self.is_ignored(path) {
                    debug!("Ignore pattern matched {}", path.display());
                    return Ok(());
                }
                self.handle_create(path, *is_dir)
            }
            FsEvent::Deleted { path, is_dir } => {
                if self.is_ignored(path) {
                    debug!("Ignore pattern matched {}", path.display());
                    return Ok(());
                }
                self.handle_deleted(path, *is_dir)
            }
            FsEvent::Moved { from, to, is_dir } => {
                match (self.is_ignored(from), self.is_ignored(to)) {
                    (true, true) => Ok(()),
                    // e.g. a download finishing `clip.part` -> `clip.mp4`
                    (true, false) => self.handle_create(to, *is_dir),
                    (false, true) => self.handle_deleted(from, *is_dir),
                    (false, false) => self.handle_moved(from, to, *is_dir),
                }
            }
        }
    }

    fn locate(&self, path: &Path) -> Option<Located> {
        let located = self.mapping.locate(path);
        if located.is_none() {
            warn!(
                "Ignoring event outside watched roots or with a non UTF-8 name: {}",
                path.display()
            );
        }
        located
    }

    /// Consumes a pending echo for `path`, compared in normalized form.
    fn is_echo(&self, path: &Path) -> bool {
        let key = match self.mapping.locate(path) {
            Some(located) => self.mapping.root(located.side).join(located.relative()),
            None => path.to_path_buf(),
        };
        if self.echoes.take(&key) {
            debug!("Own change reported back: {}", path.display());
            return true;
        }
        false
    }

    pub fn handle_create(&self, path: &Path, is_dir: bool) -> Result<(), Error> {
        if self.is_echo(path) {
            return Ok(());
        }
        if is_dir {
            return match self.mapping.locate(path) {
                Some(located) if located.side == Side::Source => self.mirror_new_dir(path),
                _ => Ok(()),
            };
        }
        let Some(located) = self.locate(path) else {
            return Ok(());
        };

        let sidecar_path = match located.side {
            Side::Source => {
                let sidecar_path = self.mapping.sidecar_path(&located);
                ensure_parent(&sidecar_path)?;
                Some(sidecar_path)
            }
            Side::Archive => None,
        };

        // The event is the very sidecar this call writes.
        if sidecar_path.as_deref() == Some(path) {
            return Ok(());
        }

        if self.mapping.is_sidecar_name(&located.name) {
            let normalized = self.mapping.root(located.side).join(located.relative());
            if self.markers.contains(&normalized) || self.markers.contains(path) {
                debug!("Sidecar {} was written by us", normalized.display());
                return Ok(());
            }
            self.reporter.notice(&Notice::SidecarIgnored {
                name: located.name.clone(),
            });
            return Ok(());
        }

        let Some(sidecar_path) = sidecar_path else {
            warn!(
                "Not mirroring {}: only sidecar files belong in the archive tree",
                path.display()
            );
            return Ok(());
        };

        self.write_sidecar(&located, &sidecar_path)?;
        self.reporter.notice(&Notice::SidecarCreated {
            source_name: located.name,
        });
        Ok(())
    }

    pub(crate) fn write_sidecar(&self, source: &Located, sidecar_path: &Path) -> Result<(), Error> {
        SidecarRecord::new(source.name.as_str()).write_to(sidecar_path)?;
        self.markers.record(sidecar_path);
        self.echoes.forget(sidecar_path);
        debug!(
            "Wrote sidecar {} for {}",
            sidecar_path.display(),
            source.relative().display()
        );
        Ok(())
    }

    /// Give every file under a directory that appeared in the source tree its
    /// sidecar. Files that already have one are left alone.
    fn mirror_new_dir(&self, dir: &Path) -> Result<(), Error> {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry under {}: {}", dir.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(located) = self.mapping.locate(entry.path()) else {
                continue;
            };
            if self.mapping.sidecar_path(&located).exists() {
                continue;
            }
            self.handle_create(entry.path(), false)?;
        }
        Ok(())
    }

    pub fn handle_moved(&self, from: &Path, to: &Path, is_dir: bool) -> Result<(), Error> {
        let from_echo = self.is_echo(from);
        let to_echo = self.is_echo(to);
        if from_echo || to_echo {
            return Ok(());
        }
        if is_dir {
            return self.relocate_dir(from, to);
        }

        let (old, new) = match (self.mapping.locate(from), self.mapping.locate(to)) {
            (Some(old), Some(new)) => (old, new),
            (Some(_), None) => return self.handle_deleted(from, false),
            (None, Some(_)) => return self.handle_create(to, false),
            (None, None) => {
                warn!(
                    "Ignoring move outside watched roots: {} -> {}",
                    from.display(),
                    to.display()
                );
                return Ok(());
            }
        };

        if old.side != new.side {
            self.handle_deleted(from, false)?;
            return self.handle_create(to, false);
        }

        match old.side {
            Side::Source => self.relocate_sidecar(&old, &new),
            Side::Archive => self.relocate_source(&old, &new),
        }
    }

    fn relocate_sidecar(&self, old: &Located, new: &Located) -> Result<(), Error> {
        if self.mapping.is_sidecar_name(&old.name) {
            return Ok(());
        }

        let old_sidecar = self.mapping.sidecar_path(old);
        let new_sidecar = self.mapping.sidecar_path(new);
        if old_sidecar == new_sidecar || !old_sidecar.exists() {
            return Ok(());
        }

        ensure_parent(&new_sidecar)?;
        fs::rename(&old_sidecar, &new_sidecar).map_err(Error::fs("move sidecar", &old_sidecar))?;
        self.echoes.expect(&old_sidecar);
        self.echoes.expect(&new_sidecar);
        debug!(
            "Moved sidecar {} -> {}",
            old_sidecar.display(),
            new_sidecar.display()
        );
        self.reporter.notice(&Notice::SidecarMoved {
            from: old.relative(),
            to: new.relative(),
        });
        Ok(())
    }

    fn relocate_source(&self, old: &Located, new: &Located) -> Result<(), Error> {
        if !self.mapping.is_sidecar_name(&old.name) || !self.mapping.is_sidecar_name(&new.name) {
            return Ok(());
        }

        let old_candidates = self.mapping.source_candidates(old);
        let new_candidates = self.mapping.source_candidates(new);
        let Some((source, target)) = old_candidates
            .into_iter()
            .zip(new_candidates)
            .find(|(candidate, _)| candidate.is_file())
        else {
            return Ok(());
        };

        if source == target {
            return Ok(());
        }
        if target.exists() {
            warn!(
                "Not moving {}: {} already exists",
                source.display(),
                target.display()
            );
            return Ok(());
        }

        ensure_parent(&target)?;
        fs::rename(&source, &target).map_err(Error::fs("move source file", &source))?;
        self.echoes.expect(&source);
        self.echoes.expect(&target);
        debug!("Moved source {} -> {}", source.display(), target.display());
        self.reporter.notice(&Notice::SourceMoved {
            from: relative_to(&source, self.mapping.source_root()),
            to: relative_to(&target, self.mapping.source_root()),
        });
        Ok(())
    }

    /// A directory moved within the source tree takes its archive counterpart
    /// along. Moves into or out of the source tree act as a create or a delete.
    fn relocate_dir(&self, from: &Path, to: &Path) -> Result<(), Error> {
        let (old, new) = match (self.mapping.locate(from), self.mapping.locate(to)) {
            (Some(old), Some(new)) if old.side == Side::Source && new.side == Side::Source => {
                (old, new)
            }
            (_, Some(new)) if new.side == Side::Source => return self.handle_create(to, true),
            (Some(old), _) if old.side == Side::Source => return self.handle_deleted(from, true),
            _ => {
                debug!("Directory move {} -> {} not mirrored", from.display(), to.display());
                return Ok(());
            }
        };

        let old_dir = self.mapping.counterpart_dir(&old);
        let new_dir = self.mapping.counterpart_dir(&new);
        if !old_dir.is_dir() {
            return self.mirror_new_dir(to);
        }

        if !new_dir.exists() {
            ensure_parent(&new_dir)?;
            fs::rename(&old_dir, &new_dir).map_err(Error::fs("move directory", &old_dir))?;
            self.echoes.expect(&old_dir);
            self.echoes.expect(&new_dir);
            debug!("Moved archive directory {} -> {}", old_dir.display(), new_dir.display());
            self.reporter.notice(&Notice::DirectoryMoved {
                from: old.relative(),
                to: new.relative(),
            });
            return Ok(());
        }

        // The archive already has the target directory: merge file by file.
        for entry in WalkDir::new(to).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry under {}: {}", to.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(to) else {
                continue;
            };
            let previous = from.join(rel);
            if let (Some(old_file), Some(new_file)) = (
                self.mapping.locate(&previous),
                self.mapping.locate(entry.path()),
            ) {
                self.relocate_sidecar(&old_file, &new_file)?;
            }
        }
        Ok(())
    }

    pub fn handle_deleted(&self, path: &Path, is_dir: bool) -> Result<(), Error> {
        if self.is_echo(path) {
            return Ok(());
        }
        let Some(located) = self.locate(path) else {
            return Ok(());
        };

        if is_dir {
            return self.delete_mirrored_dir(&located);
        }

        match located.side {
            Side::Source => {
                if self.mapping.is_sidecar_name(&located.name) {
                    return Ok(());
                }
                let sidecar_path = self.mapping.sidecar_path(&located);
                if sidecar_path.exists() {
                    fs::remove_file(&sidecar_path)
                        .map_err(Error::fs("delete sidecar", &sidecar_path))?;
                    self.echoes.expect(&sidecar_path);
                    debug!("Deleted sidecar {}", sidecar_path.display());
                    self.reporter.notice(&Notice::SidecarDeleted {
                        source_name: located.name,
                    });
                }
                Ok(())
            }
            Side::Archive => {
                if !self.mapping.is_sidecar_name(&located.name) {
                    return Ok(());
                }
                self.delete_first_source(&located)
            }
        }
    }

    fn delete_mirrored_dir(&self, located: &Located) -> Result<(), Error> {
        if located.side != Side::Source {
            debug!(
                "Archive directory {} deleted, source tree left alone",
                located.relative().display()
            );
            return Ok(());
        }

        let archive_dir = self.mapping.counterpart_dir(located);
        if archive_dir.exists() {
            fs::remove_dir_all(&archive_dir)
                .map_err(Error::fs("delete directory", &archive_dir))?;
            self.echoes.expect(&archive_dir);
            debug!("Deleted archive directory {}", archive_dir.display());
            self.reporter.notice(&Notice::DirectoryDeleted {
                rel_dir: located.relative(),
            });
        }
        Ok(())
    }

    /// Reverse deletion: the first candidate in extension order goes, the rest stay.
    fn delete_first_source(&self, sidecar: &Located) -> Result<(), Error> {
        let Some(source) = self
            .mapping
            .source_candidates(sidecar)
            .into_iter()
            .find(|candidate| candidate.is_file())
        else {
            debug!("No source file left for {}", sidecar.relative().display());
            return Ok(());
        };

        fs::remove_file(&source).map_err(Error::fs("delete source file", &source))?;
        self.echoes.expect(&source);
        debug!("Deleted source {}", source.display());
        self.reporter.notice(&Notice::SourceDeleted {
            sidecar_name: sidecar.name.clone(),
            source_name: source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        });
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<(), Error> {
    match path.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(Error::fs("create directory", parent))
        }
        None => Ok(()),
    }
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
