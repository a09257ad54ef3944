use anyhow::Result;

use crate::config::Settings;
use crate::external::{fetch_total_downloads, http_client, package_page_url};
use crate::models::Badge;

/// Build the download badge for a container package.
///
/// Diagnostics go to stderr: stdout carries only the badge JSON.
pub async fn package_downloads_badge(
    settings: &Settings,
    owner: &str,
    repo: &str,
    image: &str,
    verbose: bool,
) -> Result<Badge> {
    let url = package_page_url(&settings.github_web_url, owner, repo, image);
    if verbose {
        eprintln!("📥 Fetching {}", url);
    }

    let client = http_client()?;
    let count = fetch_total_downloads(&client, &url).await?;
    if verbose {
        eprintln!("📊 Total downloads: {}", count);
    }

    Ok(Badge::downloads(count))
}
