use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sidecar_mirror_core::{MirrorReporter, Notice};
use std::sync::Mutex;

const BORDER: &str = "=========================";

/// Prints notices the way users of the tool expect them, one block per
/// notice followed by a separator line. Backfill gets a spinner.
pub struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn print_block(&self, text: &str) {
        let guard = self.bar.lock().unwrap();
        match guard.as_ref() {
            Some(pb) => pb.suspend(|| println!("{}\n{}", text, BORDER)),
            None => println!("{}\n{}", text, BORDER),
        }
    }
}

impl MirrorReporter for ConsoleReporter {
    fn notice(&self, notice: &Notice) {
        let text = notice.to_string();
        let text = match notice {
            Notice::SidecarCreated { .. } => text.green().to_string(),
            Notice::SidecarIgnored { .. } => text.yellow().to_string(),
            Notice::SidecarDeleted { .. }
            | Notice::SourceDeleted { .. }
            | Notice::DirectoryDeleted { .. } => text.red().to_string(),
            Notice::SidecarMoved { .. }
            | Notice::SourceMoved { .. }
            | Notice::DirectoryMoved { .. } => text.cyan().to_string(),
        };
        self.print_block(&text);
    }

    fn on_backfill_start(&self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message("Scanning source tree...");
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        *self.bar.lock().unwrap() = Some(pb);
    }

    fn on_backfill_progress(&self, files_scanned: usize, sidecars_created: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_message(format!(
                "Backfilling... {}/{} sidecars written",
                sidecars_created, files_scanned
            ));
        }
    }

    fn on_backfill_complete(&self, sidecars_created: usize, duration_secs: f64) {
        if let Some(pb) = self.bar.lock().unwrap().take() {
            pb.finish_and_clear();
        }
        eprintln!(
            "  \x1b[32m✓\x1b[0m Backfill complete: {} sidecars written in {:.2}s",
            sidecars_created, duration_secs
        );
    }
}
