use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sidecar-mirror")]
#[command(about = "Keeps a tree of .txt sidecars in step with a media tree", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Source root holding the media files
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Archive root holding the sidecar files
    #[arg(long, global = true)]
    pub archive: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch both roots and mirror changes until interrupted (default)
    Watch {
        /// Create sidecars for existing source files before watching
        #[arg(long)]
        backfill: bool,
    },
    /// Create sidecars for existing source files and exit
    Backfill,
    /// Print configuration values
    PrintConfig,
}
