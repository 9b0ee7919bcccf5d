use crate::config::{AppConfig, SidecarNaming};
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Which watched tree a path was observed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Archive,
}

/// A path split against the root it lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub side: Side,
    /// Relative directory of the entry, empty for entries directly under the root.
    pub rel_dir: PathBuf,
    /// NFC-normalized file name.
    pub name: String,
}

impl Located {
    /// Normalized name with its last extension stripped, like `Path::file_stem`.
    pub fn stem(&self) -> &str {
        split_extension(&self.name).0
    }

    pub fn extension(&self) -> Option<&str> {
        split_extension(&self.name).1
    }

    pub fn relative(&self) -> PathBuf {
        self.rel_dir.join(&self.name)
    }
}

/// Canonical Unicode composition for names used in paths and comparisons.
pub fn nfc(name: &str) -> String {
    name.nfc().collect()
}

/// Splits `clip.tar.gz` into (`clip.tar`, `gz`). Dot files such as `.hidden`
/// have no extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
    }
}

/// Path translation between the source tree and the archive tree.
#[derive(Debug, Clone)]
pub struct MirrorMapping {
    source_root: PathBuf,
    archive_root: PathBuf,
    sidecar_extension: String,
    media_extensions: Vec<String>,
    naming: SidecarNaming,
}

impl MirrorMapping {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            source_root: config.source_root.clone(),
            archive_root: config.archive_root.clone(),
            sidecar_extension: config.sidecar_extension.clone(),
            media_extensions: config.media_extensions.clone(),
            naming: config.sidecar_naming,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    pub fn root(&self, side: Side) -> &Path {
        match side {
            Side::Source => &self.source_root,
            Side::Archive => &self.archive_root,
        }
    }

    /// Classify an absolute path. Returns `None` for paths outside both roots,
    /// for the roots themselves and for names that are not valid UTF-8.
    pub fn locate(&self, path: &Path) -> Option<Located> {
        let (side, relative) = if let Ok(rel) = path.strip_prefix(&self.archive_root) {
            (Side::Archive, rel)
        } else if let Ok(rel) = path.strip_prefix(&self.source_root) {
            (Side::Source, rel)
        } else {
            return None;
        };

        let name = nfc(relative.file_name()?.to_str()?);
        let rel_dir = relative
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Some(Located {
            side,
            rel_dir,
            name,
        })
    }

    pub fn is_sidecar_name(&self, name: &str) -> bool {
        split_extension(name).1 == Some(self.sidecar_extension.as_str())
    }

    fn sidecar_name(&self, source_name: &str) -> String {
        let base = match self.naming {
            SidecarNaming::Stem => split_extension(source_name).0,
            SidecarNaming::FullName => source_name,
        };
        format!("{}.{}", base, self.sidecar_extension)
    }

    /// Sidecar location for a file observed under the source root.
    pub fn sidecar_path(&self, source: &Located) -> PathBuf {
        self.archive_root
            .join(&source.rel_dir)
            .join(self.sidecar_name(&source.name))
    }

    /// Source files a sidecar may belong to, in lookup order.
    pub fn source_candidates(&self, sidecar: &Located) -> Vec<PathBuf> {
        let dir = self.source_root.join(&sidecar.rel_dir);
        let stem = sidecar.stem();
        match self.naming {
            SidecarNaming::Stem => self
                .media_extensions
                .iter()
                .map(|ext| dir.join(format!("{}{}", stem, ext)))
                .collect(),
            SidecarNaming::FullName => vec![dir.join(stem)],
        }
    }

    /// Same relative directory under the other root.
    pub fn counterpart_dir(&self, located: &Located) -> PathBuf {
        let other = match located.side {
            Side::Source => &self.archive_root,
            Side::Archive => &self.source_root,
        };
        other.join(located.relative())
    }
}
