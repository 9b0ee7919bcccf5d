use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/sidecar-mirror.log";

/// Where and how much to log. `TRACING_LEVEL` wins over `-v`.
#[derive(Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub file: PathBuf,
}

impl LogSettings {
    pub fn from_env(verbosity: u8) -> Self {
        Self::resolve(
            env::var("TRACING_LEVEL").ok(),
            env::var("LOG_FILE_PATH").ok(),
            verbosity,
        )
    }

    fn resolve(level: Option<String>, file: Option<String>, verbosity: u8) -> Self {
        let filter = level.unwrap_or_else(|| {
            match verbosity {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
            .to_string()
        });
        let file = PathBuf::from(file.unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()));
        Self { filter, file }
    }

    fn file_parts(&self) -> (&Path, &Path) {
        let dir = self
            .file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = self
            .file
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new("sidecar-mirror.log"));
        (dir, name)
    }
}

/// Console output stays terse because notices already go to stdout; the file
/// gets every event with its target.
pub fn init_logger(settings: &LogSettings) -> WorkerGuard {
    let (dir, name) = settings.file_parts();
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_target(false)
                .without_time(),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_thread_names(true),
        )
        .with(EnvFilter::new(&settings.filter))
        .init();

    debug!(
        "Logging at {} to {}",
        settings.filter,
        settings.file.display()
    );

    guard
}
