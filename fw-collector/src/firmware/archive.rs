use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

const MACOS_METADATA_DIR: &str = "__MACOSX";
const MACOS_RESOURCE_FORK_PREFIX: &str = "._";

/// Extract every member of a zip archive into `dest`.
///
/// Extracted files get the timestamp stored in the archive as their
/// modification time; the rename stage later dates files from it.
/// Members whose names would escape `dest` are skipped.
pub fn extract_zip(archive_path: &Path, dest: &Path, verbose: bool) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {:?}", archive_path))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read zip archive: {:?}", archive_path))?;

    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry {} of {:?}", i, archive_path))?;

        let Some(relative) = member.enclosed_name() else {
            println!("⚠️  Skipping unsafe zip entry: {}", member.name());
            continue;
        };
        let dest_path = dest.join(relative);

        if member.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&dest_path)
            .with_context(|| format!("Failed to create {:?}", dest_path))?;
        std::io::copy(&mut member, &mut outfile)
            .with_context(|| format!("Failed to extract {:?}", dest_path))?;

        if let Some(modified) = member.last_modified().and_then(zip_time_to_system_time) {
            outfile
                .set_modified(modified)
                .with_context(|| format!("Failed to set modification time of {:?}", dest_path))?;
        }

        if verbose {
            println!("  📦 Extracted {} to {}", member.name(), dest.display());
        }
        extracted.push(dest_path);
    }

    Ok(extracted)
}

/// Zip timestamps carry no zone; they are read as local wall-clock time.
fn zip_time_to_system_time(time: zip::DateTime) -> Option<SystemTime> {
    let naive = NaiveDate::from_ymd_opt(time.year().into(), time.month().into(), time.day().into())?
        .and_hms_opt(time.hour().into(), time.minute().into(), time.second().into())?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(SystemTime::from)
}

/// Remove `__MACOSX` directories and `._*` resource forks left by macOS archivers.
pub fn remove_macos_artifacts(directory: &Path) -> Result<usize> {
    let mut removed = 0;
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in WalkDir::new(directory).into_iter().filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() && name == MACOS_METADATA_DIR {
            dirs.push(entry.path().to_path_buf());
        } else if entry.file_type().is_file() && name.starts_with(MACOS_RESOURCE_FORK_PREFIX) {
            files.push(entry.path().to_path_buf());
        }
    }

    for dir in dirs {
        if dir.exists() {
            fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {:?}", dir))?;
            println!("🗑️  Removed directory: {}", dir.display());
            removed += 1;
        }
    }
    for file in files {
        // May already be gone together with a __MACOSX directory
        if file.exists() {
            fs::remove_file(&file).with_context(|| format!("Failed to remove {:?}", file))?;
            println!("🗑️  Removed file: {}", file.display());
            removed += 1;
        }
    }

    Ok(removed)
}
