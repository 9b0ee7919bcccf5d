use crate::error::Error;
use config::{Config, Environment, File as ConfigFile};
use glob::Pattern;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Lookup order for reverse deletion. First existing match wins.
pub const DEFAULT_MEDIA_EXTENSIONS: [&str; 15] = [
    ".mp4", ".avi", ".mkv", ".mov", ".webm", ".gif", ".jpeg", ".jpg", ".png", ".webp", ".mp3",
    ".aac", ".wav", ".flac", ".bmp",
];

/// How a source file name turns into a sidecar name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidecarNaming {
    /// `clip.mp4` -> `clip.txt`. Files sharing a stem share one sidecar.
    #[default]
    Stem,
    /// `clip.mp4` -> `clip.mp4.txt`.
    FullName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source_root: PathBuf,
    pub archive_root: PathBuf,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_media_extensions")]
    pub media_extensions: Vec<String>,
    #[serde(default = "default_sidecar_extension")]
    pub sidecar_extension: String,
    #[serde(default)]
    pub sidecar_naming: SidecarNaming,
}

fn default_media_extensions() -> Vec<String> {
    DEFAULT_MEDIA_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_sidecar_extension() -> String {
    "txt".to_string()
}

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub source_root: Option<PathBuf>,
    pub archive_root: Option<PathBuf>,
}

pub fn load_configuration(overrides: &Overrides) -> Result<AppConfig, Error> {
    let file_source = match &overrides.config_file {
        Some(path) => ConfigFile::from(path.as_path()).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(Environment::with_prefix("SIDECAR_MIRROR"))
        .set_override_option(
            "source_root",
            overrides
                .source_root
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )?
        .set_override_option(
            "archive_root",
            overrides
                .archive_root
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        )?
        .build()?;

    let mut config = builder.try_deserialize::<AppConfig>()?;
    config.normalize_extensions();
    Ok(config)
}

impl AppConfig {
    pub fn new(source_root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            archive_root: archive_root.into(),
            ignore_patterns: Vec::new(),
            media_extensions: default_media_extensions(),
            sidecar_extension: default_sidecar_extension(),
            sidecar_naming: SidecarNaming::default(),
        }
    }

    /// Media extensions always carry a leading dot, the sidecar extension never does.
    pub fn normalize_extensions(&mut self) {
        for ext in self.media_extensions.iter_mut() {
            if !ext.starts_with('.') {
                ext.insert(0, '.');
            }
        }
        let trimmed = self.sidecar_extension.trim_start_matches('.').to_string();
        self.sidecar_extension = trimmed;
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.sidecar_extension.is_empty() {
            return Err(Error::InvalidConfig(
                "sidecar_extension must not be empty".to_string(),
            ));
        }

        let (source, archive) = (&self.source_root, &self.archive_root);
        if source.starts_with(archive) || archive.starts_with(source) {
            return Err(Error::InvalidConfig(format!(
                "source root {} and archive root {} must be separate trees",
                self.source_root.display(),
                self.archive_root.display()
            )));
        }

        self.ignore_globs().map(|_| ())
    }

    pub fn ignore_globs(&self) -> Result<Vec<Pattern>, Error> {
        self.ignore_patterns
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|source| Error::Pattern {
                    pattern: glob.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Create both roots if missing and replace them with their canonical form,
    /// so that paths reported by the watcher share a prefix with them.
    pub fn prepare_roots(&mut self) -> Result<(), Error> {
        self.source_root = prepare_root(&self.source_root)?;
        self.archive_root = prepare_root(&self.archive_root)?;
        self.validate()
    }
}

fn prepare_root(root: &Path) -> Result<PathBuf, Error> {
    fs::create_dir_all(root).map_err(Error::fs("create root", root))?;
    fs::canonicalize(root).map_err(Error::fs("canonicalize root", root))
}
