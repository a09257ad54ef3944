use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Settings, MANIFEST_FILE_NAME, TASK_FILE_NAME};
use crate::external::{download_file, http_client};
use crate::firmware::{
    classify_chip, dated_file_name, extract_zip, find_embedded_date, format_file_date,
    has_trailing_date, is_ti_image, remove_macos_artifacts, split_ti_file_name, ti_baud,
};
use crate::models::{load_json, FirmwareEntry, TiManifest, TiTask};

use super::progress_bar;

/// What a TI run did, stage by stage
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TiSummary {
    pub downloaded: usize,
    pub renamed: usize,
    pub merged: usize,
    pub removed: usize,
}

/// Download every task link into `ti/<type>/`, unpacking zip archives in place.
pub async fn fetch_archives(
    client: &reqwest::Client,
    tasks: &[TiTask],
    ti_dir: &Path,
    verbose: bool,
) -> Result<usize> {
    let pb = progress_bar(tasks.len() as u64)?;
    let mut downloaded = 0;

    for task in tasks {
        pb.set_message(task.kind.clone());
        let dir = ti_dir.join(&task.kind);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

        let file_name = link_file_name(&task.link);
        let file_path = dir.join(&file_name);

        if let Err(e) = download_file(client, &task.link, &file_path).await {
            pb.println(format!("❌ Error downloading from {}: {:#}", task.link, e));
            pb.inc(1);
            continue;
        }
        downloaded += 1;

        if file_name.ends_with(".zip") {
            match extract_zip(&file_path, &dir, verbose) {
                Ok(files) => {
                    pb.println(format!("📦 {}: extracted {} files", file_name, files.len()));
                    fs::remove_file(&file_path)
                        .with_context(|| format!("Failed to remove {:?}", file_path))?;
                    remove_macos_artifacts(&dir)?;
                }
                // The archive stays on disk; the cleanup stage removes it
                Err(e) => pb.println(format!("❌ Error unpacking archive {}: {:#}", file_name, e)),
            }
        } else if verbose {
            pb.println(format!("💾 Downloaded file saved to {}", file_path.display()));
        }
        pb.inc(1);
    }

    pb.finish_with_message("✅ Downloads complete!");
    Ok(downloaded)
}

/// Last path segment of a download link, without query or fragment.
pub fn link_file_name(link: &str) -> String {
    if let Ok(url) = reqwest::Url::parse(link) {
        if let Some(name) = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
        {
            return urlencoding::decode(name)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| name.to_string());
        }
    }
    link.rsplit('/').next().unwrap_or(link).to_string()
}

fn ti_images(ti_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(ti_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry.file_type().is_file() && is_ti_image(&entry.file_name().to_string_lossy())
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Give every `.hex` without a trailing `_YYYYMMDD` one, taken from an
/// embedded date token or else from the file's modification time.
pub fn normalize_filenames(ti_dir: &Path, verbose: bool) -> Result<Vec<PathBuf>> {
    let mut renamed = Vec::new();

    for path in ti_images(ti_dir) {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if has_trailing_date(&stem) {
            continue;
        }

        let date = find_embedded_date(&stem).or_else(|| {
            fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .ok()
                .map(format_file_date)
        });
        let Some(date) = date else {
            println!("⚠️  No date found for {}", path.display());
            continue;
        };

        let new_path = path.with_file_name(dated_file_name(&file_name, &date));
        fs::rename(&path, &new_path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", path, new_path))?;
        if verbose {
            println!("  ✏️  {} renamed - {}", file_name, new_path.display());
        }
        renamed.push(new_path);
    }

    Ok(renamed)
}

/// Merge every `.hex` under `ti/` into `ti/manifest.json`.
pub fn update_manifest(settings: &Settings, verbose: bool) -> Result<TiManifest> {
    let ti_dir = settings.ti_dir();
    let manifest_path = ti_dir.join(MANIFEST_FILE_NAME);
    let mut manifest = TiManifest::load(&manifest_path)?;

    for path in ti_images(&ti_dir) {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let kind = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&ti_dir).ok())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default();
        if kind.is_empty() {
            println!("⚠️  Skipping {}: not inside a type directory", path.display());
            continue;
        }

        let (token, version) = split_ti_file_name(&file_name);
        let chip = classify_chip(&token);
        let relative = path.strip_prefix(&settings.root).unwrap_or(path.as_path());

        let entry = FirmwareEntry {
            ver: Some(version),
            link: settings.raw_link(relative),
            baud: Some(ti_baud(&file_name)),
            notes: Some(String::new()),
            ..Default::default()
        };
        if verbose {
            println!("  📄 {} / {} / {}", kind, chip, file_name);
        }
        manifest.merge(&kind, &chip, &file_name, entry);
    }

    manifest.save(&manifest_path)?;
    Ok(manifest)
}

/// Delete everything under `ti/` except firmware images, the manifest and the task file.
pub fn clean_directory(ti_dir: &Path) -> Result<usize> {
    let doomed: Vec<PathBuf> = WalkDir::new(ti_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(is_ti_image(&name) || name == MANIFEST_FILE_NAME || name == TASK_FILE_NAME)
        })
        .map(|entry| entry.into_path())
        .collect();

    for path in &doomed {
        fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))?;
        println!("🗑️  Removed file: {}", path.display());
    }

    Ok(doomed.len())
}

/// Run all TI stages: fetch, rename, merge, clean.
pub async fn build_ti_manifest(settings: &Settings, verbose: bool, keep_files: bool) -> Result<TiSummary> {
    let ti_dir = settings.ti_dir();
    let tasks: Vec<TiTask> = load_json(&ti_dir.join(TASK_FILE_NAME))?;
    let mut summary = TiSummary::default();

    println!("⬇️  Downloading files...");
    let client = http_client()?;
    summary.downloaded = fetch_archives(&client, &tasks, &ti_dir, verbose).await?;

    println!("📝 Updating filenames...");
    summary.renamed = normalize_filenames(&ti_dir, verbose)?.len();

    println!("📄 Updating manifest...");
    let manifest = update_manifest(settings, verbose)?;
    summary.merged = manifest.0.values().flat_map(|chips| chips.values()).map(|f| f.len()).sum();

    if keep_files {
        println!("📌 Keeping extracted files");
    } else {
        println!("🧹 Cleaning directory...");
        summary.removed = clean_directory(&ti_dir)?;
    }

    println!(
        "✅ {} downloads, {} renamed, {} manifest entries, {} files removed",
        summary.downloaded, summary.renamed, summary.merged, summary.removed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_file_name() {
        assert_eq!(
            link_file_name("https://github.com/Koenkk/Z-Stack-firmware/raw/master/router/bin/CC2652RB_router_20221102.zip"),
            "CC2652RB_router_20221102.zip"
        );
        assert_eq!(
            link_file_name("https://example.org/fw/My%20Router.hex?raw=true"),
            "My Router.hex"
        );
    }

    #[test]
    fn test_normalize_then_merge() {
        let root = tempfile::tempdir().unwrap();
        let settings = Settings {
            root: root.path().to_path_buf(),
            ..Default::default()
        };
        let router = settings.ti_dir().join("router");
        fs::create_dir_all(&router).unwrap();
        fs::write(router.join("CC2652RB_router_20221102.hex"), b"").unwrap();
        fs::write(router.join("CC1352P2_CC2652P_other_router_20230507_460800.hex"), b"").unwrap();

        let renamed = normalize_filenames(&settings.ti_dir(), false).unwrap();
        assert_eq!(
            renamed,
            vec![router.join("CC1352P2_CC2652P_other_router_460800_20230507.hex")]
        );

        let manifest = update_manifest(&settings, false).unwrap();
        let rb = manifest
            .get("router", "CC2652RB", "CC2652RB_router_20221102.hex")
            .unwrap();
        assert_eq!(rb.ver.as_deref(), Some("20221102"));
        assert_eq!(rb.baud.as_deref(), Some("115200"));
        assert_eq!(
            rb.link,
            "https://raw.githubusercontent.com/xyzroe/XZG-MT/fw_files/ti/router/CC2652RB_router_20221102.hex"
        );

        let other = manifest
            .get("router", "CC2652P2_other", "CC1352P2_CC2652P_other_router_460800_20230507.hex")
            .unwrap();
        assert_eq!(other.baud.as_deref(), Some("460800"));
        assert_eq!(other.notes.as_deref(), Some(""));
    }

    #[test]
    fn test_clean_directory_keeps_images_and_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("router")).unwrap();
        fs::write(dir.path().join("task.json"), b"[]").unwrap();
        fs::write(dir.path().join("manifest.json"), b"{}").unwrap();
        fs::write(dir.path().join("router/a_20230101.hex"), b"").unwrap();
        fs::write(dir.path().join("router/readme.txt"), b"").unwrap();
        fs::write(dir.path().join("router/broken.zip"), b"").unwrap();

        assert_eq!(clean_directory(dir.path()).unwrap(), 2);
        assert!(dir.path().join("router/a_20230101.hex").exists());
        assert!(dir.path().join("task.json").exists());
        assert!(!dir.path().join("router/readme.txt").exists());
    }
}
