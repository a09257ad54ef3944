use anyhow::{Context, Result};
use clap::Parser;

use fw_collector::collector::{build_sl_manifest, build_ti_manifest, package_downloads_badge};
use fw_collector::config::Settings;
use fw_collector::models::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.root, cli.config.as_deref())?;

    match cli.command {
        Commands::Badge { owner, repo, image } => {
            let badge = package_downloads_badge(&settings, &owner, &repo, &image, cli.verbose).await?;
            let json = serde_json::to_string(&badge).context("Failed to serialize badge")?;
            println!("{}", json);
        }
        Commands::Sl => {
            println!("🚀 Building Silicon Labs firmware manifest...");
            let manifest = build_sl_manifest(&settings, cli.verbose).await?;
            for (fw_type, chips) in &manifest.0 {
                println!("📦 {}: {} files across {} chips", fw_type, manifest.count(fw_type), chips.len());
            }
        }
        Commands::Ti { keep_files } => {
            println!("🚀 Building TI firmware manifest...");
            build_ti_manifest(&settings, cli.verbose, keep_files).await?;
        }
    }

    Ok(())
}
