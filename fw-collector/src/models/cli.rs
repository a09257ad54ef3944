use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show detailed progress information
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository root containing the sl/ and ti/ directories
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Settings file (defaults to <root>/fw-collector.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a shields.io endpoint badge with the container package's total downloads
    Badge {
        #[arg(long, env = "GH_OWNER")]
        owner: String,
        #[arg(long, env = "GH_REPO")]
        repo: String,
        #[arg(long, env = "GH_IMAGE")]
        image: String,
    },
    /// Build sl/manifest.json from GitHub folders and vendor JSON feeds
    Sl,
    /// Download and extract ti/ archives, then merge them into ti/manifest.json
    Ti {
        /// Leave non-firmware files in place after the manifest update
        #[arg(long)]
        keep_files: bool,
    },
}
