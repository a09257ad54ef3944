mod section;
mod sources;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use fw_collector::config::{Settings, MANIFEST_FILE_NAME, TASK_FILE_NAME};
use fw_collector::models::{load_json, SlManifest, SlTask, TiManifest, TiTask};

use section::update_section;
use sources::{sl_downloaded_sources, sl_repos, ti_repos, Tally};

const TI_SECTION: &str = "♥️ Ti";
const SL_SECTION: &str = "💚 Sl";

/// Refresh the firmware counts and source lists in README.md
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository root containing README.md, sl/ and ti/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Settings file (defaults to <root>/fw-collector.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args.root, args.config.as_deref())?;

    if update_readme(&settings)? {
        println!("✅ README.md updated successfully.");
    }

    Ok(())
}

/// Rewrite the TI and SL sections of the README. Returns `false` when there is no README.
fn update_readme(settings: &Settings) -> Result<bool> {
    let readme_path = settings.readme_path();
    if !readme_path.exists() {
        println!("⚠️  README file not found at {}", readme_path.display());
        return Ok(false);
    }

    let mut content = fs::read_to_string(&readme_path)
        .with_context(|| format!("Failed to read {:?}", readme_path))?;

    let ti_manifest_path = settings.ti_dir().join(MANIFEST_FILE_NAME);
    if ti_manifest_path.exists() {
        let manifest = TiManifest::load(&ti_manifest_path)?;
        let counts = [
            ("Zigbee_Router", manifest.count("router")),
            ("Zigbee_Coordinator", manifest.count("coordinator")),
            ("OpenThread", manifest.count("thread")),
        ];

        let task_path = settings.ti_dir().join(TASK_FILE_NAME);
        let repos = if task_path.exists() {
            ti_repos(&load_json::<Vec<TiTask>>(&task_path)?)
        } else {
            Tally::default()
        };

        content = update_section(&content, TI_SECTION, &counts, &repos, "Downloaded from:", None);
        println!("📊 Ti counts: {}", format_counts(&counts));
    }

    let sl_manifest_path = settings.sl_dir().join(MANIFEST_FILE_NAME);
    if sl_manifest_path.exists() {
        let manifest = SlManifest::load(&sl_manifest_path)?;
        let counts = [
            ("Zigbee_Router", manifest.count("zb_router")),
            ("Zigbee_NCP", manifest.count("zigbee_ncp")),
            ("OpenThread", manifest.count("openthread_rcp")),
            ("Multi_PAN", manifest.count("multipan")),
        ];

        let repos = sl_repos(&manifest, &settings.own_repository);
        let task_path = settings.sl_dir().join(TASK_FILE_NAME);
        let downloaded = if task_path.exists() {
            sl_downloaded_sources(&load_json::<SlTask>(&task_path)?)
        } else {
            Tally::default()
        };

        content = update_section(
            &content,
            SL_SECTION,
            &counts,
            &repos,
            "Indexed from:",
            Some(&downloaded),
        );
        println!("📊 Sl counts: {}", format_counts(&counts));
    }

    fs::write(&readme_path, content).with_context(|| format!("Failed to write {:?}", readme_path))?;
    Ok(true)
}

fn format_counts(counts: &[(&str, usize)]) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("{}={}", name, count))
        .collect::<Vec<_>>()
        .join(", ")
}
