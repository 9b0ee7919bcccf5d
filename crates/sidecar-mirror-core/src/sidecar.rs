use crate::error::Error;
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::Path;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Metadata record kept in the archive tree for one source file.
/// `Link` and `Other` are left blank for the user to fill in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRecord {
    pub file_name: String,
    pub updated: NaiveDateTime,
}

impl SidecarRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            updated: Local::now().naive_local(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "File name: {}\n\nLink: \n\nLast updated: {}\n\nOther:\n",
            self.file_name,
            self.updated.format(TIMESTAMP_FORMAT)
        )
    }

    /// Truncates any existing file at `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), Error> {
        fs::write(path, self.render()).map_err(Error::fs("write sidecar", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_render_layout() {
        let record = SidecarRecord {
            file_name: "clip.webm".to_string(),
            updated: NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(7, 5, 59)
                .unwrap(),
        };
        assert_eq!(
            record.render(),
            "File name: clip.webm\n\nLink: \n\nLast updated: 2024-03-09 07:05\n\nOther:\n"
        );
    }

    #[test]
    fn test_write_to_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.txt");
        fs::write(&path, "stale").unwrap();

        SidecarRecord::new("clip.mov").write_to(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("File name: clip.mov\n"));
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_write_to_missing_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("clip.txt");
        let err = SidecarRecord::new("clip.mp4").write_to(&path).unwrap_err();
        assert!(matches!(err, Error::Fs { action: "write sidecar", .. }));
    }
}
