//! Bridges `notify` to the synchronizer.
//!
//! One recursive watcher covers both roots. Raw notifications cross a channel
//! to a translation step that pairs rename halves, and the resulting
//! [`FsEvent`]s feed a single dispatch loop which runs each handler to
//! completion before taking the next event.

use crate::error::Error;
use crate::mapping::{MirrorMapping, Side};
use crate::synchronizer::{FsEvent, MirrorSynchronizer};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How long a rename `From` waits for its `To` before it counts as a removal.
pub const RENAME_PAIR_WINDOW: Duration = Duration::from_millis(100);

/// Turns raw notify events into mirror events.
///
/// Backends disagree on renames. inotify reports `From`, `To` and then `Both`,
/// all carrying the same tracker. Windows reports `From` and `To` back to back
/// without a tracker. FSEvents reports each side on its own as `Any`. A paired
/// move is emitted once; a `From` nobody claims is a removal and a `To` without
/// a partner is a creation.
pub struct EventTranslator {
    mapping: MirrorMapping,
    pending_from: Option<(PathBuf, Option<usize>)>,
    last_move: Option<(PathBuf, PathBuf)>,
    pair_untracked: bool,
}

impl EventTranslator {
    pub fn new(mapping: MirrorMapping) -> Self {
        Self {
            mapping,
            pending_from: None,
            last_move: None,
            pair_untracked: cfg!(windows),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_from.is_some()
    }

    /// Give up waiting for the other half of a rename.
    pub fn flush(&mut self) -> Option<FsEvent> {
        let (path, _) = self.pending_from.take()?;
        let is_dir = self.was_directory(&path);
        debug!("Rename of {} has no partner, treating as removal", path.display());
        Some(FsEvent::Deleted { path, is_dir })
    }

    pub fn translate(&mut self, event: Event) -> Vec<FsEvent> {
        let tracker = event.tracker();
        let completes_rename = matches!(
            event.kind,
            EventKind::Modify(ModifyKind::Name(RenameMode::To))
        ) && self.pairs_with_pending(tracker);

        let mut translated = Vec::new();
        if !completes_rename {
            translated.extend(self.flush());
        }
        translated.extend(self.translate_one(event, tracker));
        translated
    }

    fn pairs_with_pending(&self, tracker: Option<usize>) -> bool {
        match (&self.pending_from, tracker) {
            (Some((_, Some(from))), Some(to)) => *from == to,
            (Some((_, None)), None) => self.pair_untracked,
            _ => false,
        }
    }

    fn translate_one(&mut self, event: Event, tracker: Option<usize>) -> Option<FsEvent> {
        let first = event.paths.first()?.clone();

        match event.kind {
            EventKind::Create(kind) => {
                let is_dir = match kind {
                    CreateKind::Folder => true,
                    CreateKind::File => false,
                    _ => first.is_dir(),
                };
                Some(FsEvent::Created {
                    path: first,
                    is_dir,
                })
            }
            EventKind::Remove(kind) => {
                let is_dir = match kind {
                    RemoveKind::Folder => true,
                    RemoveKind::File => false,
                    _ => self.was_directory(&first),
                };
                Some(FsEvent::Deleted {
                    path: first,
                    is_dir,
                })
            }
            EventKind::Modify(ModifyKind::Name(mode)) => {
                self.translate_rename(mode, tracker, event.paths)
            }
            _ => None,
        }
    }

    fn translate_rename(
        &mut self,
        mode: RenameMode,
        tracker: Option<usize>,
        mut paths: Vec<PathBuf>,
    ) -> Option<FsEvent> {
        match mode {
            RenameMode::From => {
                self.pending_from = paths.pop().map(|path| (path, tracker));
                None
            }
            RenameMode::To => {
                let to = paths.pop()?;
                match self.pending_from.take() {
                    Some((from, _)) => {
                        self.last_move = Some((from.clone(), to.clone()));
                        Some(moved(from, to))
                    }
                    // Arrived from outside the watched roots.
                    None => {
                        let is_dir = to.is_dir();
                        Some(FsEvent::Created { path: to, is_dir })
                    }
                }
            }
            _ if paths.len() >= 2 => {
                let to = paths.pop()?;
                let from = paths.pop()?;
                if self.last_move.as_ref() == Some(&(from.clone(), to.clone())) {
                    self.last_move = None;
                    return None;
                }
                Some(moved(from, to))
            }
            // One side of a rename with no hint which one: look at the disk.
            _ => {
                let path = paths.pop()?;
                if path.exists() {
                    let is_dir = path.is_dir();
                    Some(FsEvent::Created { path, is_dir })
                } else {
                    let is_dir = self.was_directory(&path);
                    Some(FsEvent::Deleted { path, is_dir })
                }
            }
        }
    }

    /// A removed path can no longer be inspected, so look at its counterpart.
    fn was_directory(&self, path: &Path) -> bool {
        match self.mapping.locate(path) {
            Some(located) if located.side == Side::Source => {
                self.mapping.counterpart_dir(&located).is_dir()
            }
            _ => false,
        }
    }
}

fn moved(from: PathBuf, to: PathBuf) -> FsEvent {
    let is_dir = to.is_dir();
    FsEvent::Moved { from, to, is_dir }
}

pub struct MirrorWatcher {
    _watcher: RecommendedWatcher,
    raw: mpsc::UnboundedReceiver<Event>,
    translator: EventTranslator,
}

impl MirrorWatcher {
    /// Start watching both roots recursively.
    pub fn new(mapping: &MirrorMapping) -> Result<Self, Error> {
        let (tx, raw) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })?;

        watcher.watch(mapping.source_root(), RecursiveMode::Recursive)?;
        watcher.watch(mapping.archive_root(), RecursiveMode::Recursive)?;
        info!(
            "Watching {} and {}",
            mapping.source_root().display(),
            mapping.archive_root().display()
        );

        Ok(Self {
            _watcher: watcher,
            raw,
            translator: EventTranslator::new(mapping.clone()),
        })
    }

    /// Dispatch events until `shutdown` resolves. Returns the number of events handled.
    pub async fn run<F>(self, synchronizer: &MirrorSynchronizer, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let Self {
            _watcher: watcher,
            raw,
            translator,
        } = self;
        let (tx, rx) = mpsc::unbounded_channel();

        let translating = translate_events(translator, raw, tx);
        let dispatching = async move {
            let mut rx = rx;
            dispatch(synchronizer, &mut rx, shutdown).await
        };
        let ((), handled) = tokio::join!(translating, dispatching);

        drop(watcher);
        handled
    }
}

enum Incoming {
    Event(Event),
    RenameTimedOut,
    Closed,
}

async fn next_incoming(raw: &mut mpsc::UnboundedReceiver<Event>, pending: bool) -> Incoming {
    if !pending {
        return raw.recv().await.map_or(Incoming::Closed, Incoming::Event);
    }
    match tokio::time::timeout(RENAME_PAIR_WINDOW, raw.recv()).await {
        Ok(Some(event)) => Incoming::Event(event),
        Ok(None) => Incoming::Closed,
        Err(_) => Incoming::RenameTimedOut,
    }
}

/// Feed raw notifications through the translator until either side hangs up.
async fn translate_events(
    mut translator: EventTranslator,
    mut raw: mpsc::UnboundedReceiver<Event>,
    events: mpsc::UnboundedSender<FsEvent>,
) {
    loop {
        let incoming = tokio::select! {
            _ = events.closed() => break,
            incoming = next_incoming(&mut raw, translator.has_pending()) => incoming,
        };

        let translated: Vec<FsEvent> = match incoming {
            Incoming::Event(event) => translator.translate(event),
            Incoming::RenameTimedOut => translator.flush().into_iter().collect(),
            Incoming::Closed => break,
        };
        for event in translated {
            if events.send(event).is_err() {
                return;
            }
        }
    }
}

/// Handle events one at a time until the channel closes or `shutdown` resolves.
///
/// A failing handler is logged and does not stop the loop.
pub async fn dispatch<F>(
    synchronizer: &MirrorSynchronizer,
    events: &mut mpsc::UnboundedReceiver<FsEvent>,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut handled = 0usize;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, {} events handled", handled);
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Event channel closed");
                    break;
                };
                handled += 1;
                debug!("Handling {:?}", event);
                if let Err(err) = synchronizer.handle(&event) {
                    error!("Error handling {:?}: {}", event, err);
                }
            }
        }
    }

    handled
}
