pub mod backfill;
pub mod config;
pub mod error;
pub mod mapping;
pub mod markers;
pub mod reporter;
pub mod sidecar;
pub mod synchronizer;
pub mod watcher;

pub use backfill::BackfillResult;
pub use config::{AppConfig, SidecarNaming};
pub use error::Error;
pub use mapping::{MirrorMapping, Side};
pub use markers::{PendingEchoes, SelfCreatedMarkers};
pub use reporter::{MirrorReporter, Notice, SilentReporter};
pub use synchronizer::{FsEvent, MirrorSynchronizer};
pub use watcher::MirrorWatcher;
