mod commands;
mod console;
mod logging;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use console::ConsoleReporter;
use dotenv::dotenv;
use sidecar_mirror_core::config::{self, Overrides};
use sidecar_mirror_core::{backfill, AppConfig, MirrorSynchronizer, MirrorWatcher};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(&logging::LogSettings::from_env(args.verbose));

    let overrides = Overrides {
        config_file: args.config.clone(),
        source_root: args.source.clone(),
        archive_root: args.archive.clone(),
    };

    let mut config = match config::load_configuration(&overrides) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command.unwrap_or(Commands::Watch { backfill: false }) {
        Commands::Watch { backfill } => {
            config.prepare_roots()?;
            run_watch(&config, backfill).await
        }
        Commands::Backfill => {
            config.prepare_roots()?;
            run_backfill(&config)
        }
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
    }
}

fn synchronizer(config: &AppConfig) -> anyhow::Result<MirrorSynchronizer> {
    let reporter = Arc::new(ConsoleReporter::new());
    MirrorSynchronizer::new(config, reporter).context("Error building synchronizer")
}

async fn run_watch(config: &AppConfig, with_backfill: bool) -> anyhow::Result<()> {
    let synchronizer = synchronizer(config)?;

    if with_backfill {
        backfill::backfill(&synchronizer).context("Backfill failed")?;
    }

    let watcher = MirrorWatcher::new(synchronizer.mapping()).context("Error starting watcher")?;
    info!(
        "Mirroring {} -> {} (Ctrl-C to stop)",
        format!("{}", config.source_root.display()).green(),
        format!("{}", config.archive_root.display()).cyan(),
    );

    let handled = watcher
        .run(&synchronizer, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        })
        .await;

    info!(
        "{} events handled, {} sidecars written this session",
        handled,
        synchronizer.markers().len()
    );
    Ok(())
}

fn run_backfill(config: &AppConfig) -> anyhow::Result<()> {
    let synchronizer = synchronizer(config)?;
    let result = backfill::backfill(&synchronizer).context("Backfill failed")?;

    info!(
        "{} files scanned, {} sidecars created, {} already mirrored in {}",
        result.files_scanned,
        format!("{}", result.sidecars_created).green(),
        result.already_mirrored,
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
    );
    Ok(())
}
