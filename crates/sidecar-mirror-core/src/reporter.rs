use crate::mapping::split_extension;
use std::fmt;
use std::path::PathBuf;

/// Something the synchronizer did (or deliberately did not do) that the user
/// should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A source file appeared and its sidecar was written.
    SidecarCreated { source_name: String },
    /// A sidecar-extension file was added independently and left alone.
    SidecarIgnored { name: String },
    /// A source file was deleted and its sidecar went with it.
    SidecarDeleted { source_name: String },
    /// A sidecar was deleted and the first matching source file went with it.
    SourceDeleted {
        sidecar_name: String,
        source_name: String,
    },
    /// A source directory was deleted along with its archive subtree.
    DirectoryDeleted { rel_dir: PathBuf },
    SidecarMoved { from: PathBuf, to: PathBuf },
    SourceMoved { from: PathBuf, to: PathBuf },
    DirectoryMoved { from: PathBuf, to: PathBuf },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SidecarCreated { source_name } => write!(
                f,
                "File added: {}\nCorresponding source file also created.",
                source_name
            ),
            Notice::SidecarIgnored { name } => {
                let ext = split_extension(name).1.unwrap_or("txt");
                write!(f, "Ignored .{} file: {}", ext, name)
            }
            Notice::SidecarDeleted { source_name } => write!(
                f,
                "File deleted: {}\nCorresponding source file also deleted.",
                source_name
            ),
            Notice::SourceDeleted {
                sidecar_name,
                source_name,
            } => write!(
                f,
                "File deleted: {}\nWatch file also deleted: {}",
                sidecar_name, source_name
            ),
            Notice::DirectoryDeleted { rel_dir } => write!(
                f,
                "Directory deleted: {}\nCorresponding source files also deleted.",
                rel_dir.display()
            ),
            Notice::SidecarMoved { from, to } => write!(
                f,
                "File moved: {} -> {}\nCorresponding source file also moved.",
                from.display(),
                to.display()
            ),
            Notice::SourceMoved { from, to } => write!(
                f,
                "File moved: {} -> {}\nWatch file also moved.",
                from.display(),
                to.display()
            ),
            Notice::DirectoryMoved { from, to } => write!(
                f,
                "Directory moved: {} -> {}\nCorresponding source files also moved.",
                from.display(),
                to.display()
            ),
        }
    }
}

/// Trait for surfacing synchronizer activity.
///
/// CLI implements with console output, tests record notices.
/// All methods have default no-op implementations.
pub trait MirrorReporter: Send + Sync {
    fn notice(&self, _notice: &Notice) {}
    fn on_backfill_start(&self) {}
    fn on_backfill_progress(&self, _files_scanned: usize, _sidecars_created: usize) {}
    fn on_backfill_complete(&self, _sidecars_created: usize, _duration_secs: f64) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl MirrorReporter for SilentReporter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_notice_text() {
        let notice = Notice::SidecarIgnored {
            name: "notes.txt".to_string(),
        };
        assert_eq!(notice.to_string(), "Ignored .txt file: notes.txt");
    }

    #[test]
    fn test_source_deleted_notice_text() {
        let notice = Notice::SourceDeleted {
            sidecar_name: "video.txt".to_string(),
            source_name: "video.mp4".to_string(),
        };
        assert_eq!(
            notice.to_string(),
            "File deleted: video.txt\nWatch file also deleted: video.mp4"
        );
    }
}
