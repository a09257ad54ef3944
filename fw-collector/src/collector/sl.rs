use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{Settings, MANIFEST_FILE_NAME, SL_DIR, TASK_FILE_NAME};
use crate::external::{download_file, fetch_json, http_client, is_listed_firmware, GitHubClient};
use crate::firmware::{extract_baud, extract_version, sanitize_board_name};
use crate::models::{load_json, resolve_signed, FirmwareEntry, SlConfig, SlManifest, SlTask};

use super::progress_bar;

/// Key of the descriptor array inside a vendor firmware feed
pub const FEED_LIST_KEY: &str = "firmwareList";

/// One firmware descriptor of a vendor JSON feed
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedFirmware {
    #[serde(default)]
    pub device_type: Option<String>,
    pub firmware_type: String,
    pub file_name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Vendors publish this both as a string and as a number
    #[serde(default)]
    pub baud_rate: Option<serde_json::Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FeedFirmware {
    fn baud(&self) -> Option<String> {
        match self.baud_rate.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Builds the Silicon Labs manifest from GitHub folders and vendor feeds
pub struct SlCollector {
    settings: Settings,
    github: GitHubClient,
    http: reqwest::Client,
    verbose: bool,
}

impl SlCollector {
    pub fn new(settings: &Settings, verbose: bool) -> Result<Self> {
        Ok(Self {
            settings: settings.clone(),
            github: GitHubClient::new(settings)?,
            http: http_client()?,
            verbose,
        })
    }

    /// Walk the task descriptor and build a fresh manifest.
    pub async fn collect(&self, task: &SlTask) -> Result<SlManifest> {
        let total: usize = task
            .values()
            .flat_map(|boards| boards.values())
            .map(|configs| configs.len())
            .sum();
        let pb = progress_bar(total as u64)?;

        let mut manifest = SlManifest::default();

        for (chip_family, boards) in task {
            for (board, configs) in boards {
                for config in configs {
                    pb.set_message(board.clone());
                    match &config.json {
                        Some(feed_url) => {
                            self.collect_from_feed(&mut manifest, chip_family, board, config, feed_url, &pb)
                                .await
                        }
                        None => {
                            self.collect_from_folders(&mut manifest, chip_family, board, config, &pb)
                                .await
                        }
                    }
                    pb.inc(1);
                }
            }
        }

        pb.finish_with_message("✅ Collection complete!");
        Ok(manifest)
    }

    /// Directory-listing flow: one GitHub folder per firmware type.
    async fn collect_from_folders(
        &self,
        manifest: &mut SlManifest,
        chip_family: &str,
        board: &str,
        config: &SlConfig,
        pb: &ProgressBar,
    ) {
        for (fw_type, fw_config) in &config.firmware {
            let Some(folder) = fw_config.folder.as_ref().or(config.folder.as_ref()) else {
                continue;
            };
            let signed = resolve_signed(fw_config.signed, config.signed);

            if self.verbose {
                pb.println(format!("🔍 {} / {} / {}: {}", chip_family, board, fw_type, folder));
            }

            let entries = match self.github.list_directory(folder).await {
                Ok(entries) => entries,
                Err(e) => {
                    pb.println(format!("❌ Error listing {}: {:#}", folder, e));
                    continue;
                }
            };

            for entry in entries
                .iter()
                .filter(|e| is_listed_firmware(e, fw_config.mask.as_deref()))
            {
                let Some(link) = entry.download_url.clone() else {
                    continue;
                };
                manifest.insert(
                    fw_type,
                    chip_family,
                    board,
                    &entry.name,
                    FirmwareEntry {
                        ver: Some(extract_version(&entry.name)),
                        link,
                        baud: Some(extract_baud(&entry.name)),
                        signed: Some(signed),
                        ..Default::default()
                    },
                );
                if self.verbose {
                    pb.println(format!("  ✨ {}", entry.name));
                }
            }
        }
    }

    /// JSON-feed flow: mirror matching vendor files into `sl/` and link to the copies.
    async fn collect_from_feed(
        &self,
        manifest: &mut SlManifest,
        chip_family: &str,
        board: &str,
        config: &SlConfig,
        feed_url: &str,
        pb: &ProgressBar,
    ) {
        let labels = label_table(config);

        let document: serde_json::Value = match fetch_json(&self.http, feed_url).await {
            Ok(document) => document,
            Err(e) => {
                pb.println(format!("❌ Error fetching feed {}: {:#}", feed_url, e));
                return;
            }
        };
        let firmwares = feed_firmwares(&document);
        if firmwares.is_empty() {
            pb.println(format!("⚠️  No '{}' entries in {}", FEED_LIST_KEY, feed_url));
            return;
        }

        for firmware in firmwares {
            if let Some(device_type) = &config.device_type {
                if firmware.device_type.as_deref() != Some(device_type.as_str()) {
                    continue;
                }
            }
            let Some(fw_type) = labels.get(&firmware.firmware_type.to_lowercase()) else {
                continue;
            };
            let Some(file_name) = Path::new(&firmware.file_name)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
            else {
                continue;
            };

            let remote_url = match feed_file_url(feed_url, &firmware.file_name) {
                Ok(url) => url,
                Err(e) => {
                    pb.println(format!("❌ {:#}", e));
                    continue;
                }
            };
            let relative = mirror_path(fw_type, board, &file_name);
            let dest = self.settings.root.join(&relative);

            if let Err(e) = download_file(&self.http, &remote_url, &dest).await {
                pb.println(format!("❌ Error downloading {}: {:#}", remote_url, e));
                continue;
            }
            if self.verbose {
                pb.println(format!("  ⬇️  {} -> {}", remote_url, dest.display()));
            }

            let signed = resolve_signed(
                config.firmware.get(fw_type).and_then(|fw| fw.signed),
                config.signed,
            );

            manifest.insert(
                fw_type,
                chip_family,
                board,
                &file_name,
                FirmwareEntry {
                    ver: Some(
                        firmware
                            .version
                            .clone()
                            .filter(|v| !v.is_empty())
                            .unwrap_or_else(|| extract_version(&file_name)),
                    ),
                    link: self.settings.raw_link(&relative),
                    baud: Some(firmware.baud().unwrap_or_else(|| extract_baud(&file_name))),
                    signed: Some(signed),
                    notes: firmware.notes.clone().or_else(|| config.notes.clone()),
                    ..Default::default()
                },
            );
        }
    }
}

/// Vendor label (lowercased) -> firmware type key of the task.
///
/// Firmware types without a `firmwareType` hint match a label equal to their own key.
pub fn label_table(config: &SlConfig) -> HashMap<String, String> {
    let mut table = HashMap::new();
    for (fw_type, fw_config) in &config.firmware {
        match &fw_config.firmware_type {
            Some(hint) => {
                for label in hint.values() {
                    table.insert(label.to_lowercase(), fw_type.clone());
                }
            }
            None => {
                table.insert(fw_type.to_lowercase(), fw_type.clone());
            }
        }
    }
    table
}

/// Descriptors of a feed document; a missing list or malformed items count as nothing.
pub fn feed_firmwares(document: &serde_json::Value) -> Vec<FeedFirmware> {
    document
        .get(FEED_LIST_KEY)
        .and_then(|list| list.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve a feed's file name against the feed's own directory.
pub fn feed_file_url(feed_url: &str, file_name: &str) -> Result<String> {
    let base = reqwest::Url::parse(feed_url).with_context(|| format!("Invalid feed URL {}", feed_url))?;
    let url = base
        .join(file_name)
        .with_context(|| format!("Cannot resolve {} against {}", file_name, feed_url))?;
    Ok(url.to_string())
}

/// Repository-relative location of a mirrored vendor file.
pub fn mirror_path(fw_type: &str, board: &str, file_name: &str) -> PathBuf {
    PathBuf::from(SL_DIR)
        .join(fw_type)
        .join(sanitize_board_name(board))
        .join(file_name)
}

/// Keep hand-written notes of the previous run where the new entry has none.
pub fn carry_over_notes(manifest: &mut SlManifest, previous: &SlManifest) {
    for (fw_type, chips) in manifest.0.iter_mut() {
        for (chip, boards) in chips.iter_mut() {
            for (board, files) in boards.iter_mut() {
                for (file, entry) in files.iter_mut() {
                    if entry.notes.is_none() {
                        entry.notes = previous
                            .get(fw_type, chip, board, file)
                            .and_then(|old| old.notes.clone());
                    }
                }
            }
        }
    }
}

/// Build `sl/manifest.json` from `sl/task.json`.
pub async fn build_sl_manifest(settings: &Settings, verbose: bool) -> Result<SlManifest> {
    let sl_dir = settings.sl_dir();
    let task_path = sl_dir.join(TASK_FILE_NAME);
    let manifest_path = sl_dir.join(MANIFEST_FILE_NAME);

    println!("📂 Reading {}", task_path.display());
    let task: SlTask = load_json(&task_path)?;
    let previous = SlManifest::load(&manifest_path)?;

    let collector = SlCollector::new(settings, verbose)?;
    if verbose || !collector.github.has_token() {
        match collector.github.check_rate_limit().await {
            Ok(info) => {
                println!(
                    "📊 GitHub API rate limit: {}/{} (resets at {})",
                    info.remaining, info.limit, info.reset
                );
                if info.remaining < 20 {
                    println!("⚠️  Low rate limit. Some folders may fail to list.");
                }
            }
            Err(e) => println!("⚠️  Could not check rate limit: {:#}", e),
        }
    }

    let mut manifest = collector.collect(&task).await?;
    carry_over_notes(&mut manifest, &previous);

    manifest.save(&manifest_path)?;
    println!(
        "💾 Successfully generated {} ({} files)",
        manifest_path.display(),
        manifest.len()
    );

    Ok(manifest)
}
