use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const SL_DIR: &str = "sl";
pub const TI_DIR: &str = "ti";
pub const TASK_FILE_NAME: &str = "task.json";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const README_FILE_NAME: &str = "README.md";
pub const SETTINGS_FILE_NAME: &str = "fw-collector.toml";

pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com/xyzroe/XZG-MT/fw_files";
pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_WEB_URL: &str = "https://github.com";
pub const OWN_REPOSITORY: &str = "xyzroe/XZG-MT";
pub const SONOFF_FLASHER_URL: &str = "https://dongle.sonoff.tech/sonoff-dongle-flasher/";
pub const SONOFF_HOST: &str = "dongle.sonoff.tech";

/// GitHub rejects API requests without a User-Agent
pub const USER_AGENT: &str = "Firmware-Manifest-Generator";

/// Runtime settings, overridable through `fw-collector.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Repository root holding `sl/`, `ti/` and `README.md`
    #[serde(skip)]
    pub root: PathBuf,
    /// Base for links to files mirrored into this repository
    pub raw_content_base: String,
    pub github_api_url: String,
    pub github_web_url: String,
    /// `owner/repo` slug of this repository, excluded from attribution
    pub own_repository: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            raw_content_base: RAW_CONTENT_BASE.to_string(),
            github_api_url: GITHUB_API_URL.to_string(),
            github_web_url: GITHUB_WEB_URL.to_string(),
            own_repository: OWN_REPOSITORY.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, `<root>/fw-collector.toml`, or defaults.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let default_path = root.join(SETTINGS_FILE_NAME);
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None if default_path.exists() => Some(default_path),
            None => None,
        };

        let mut settings = match path {
            Some(path) => {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read settings: {:?}", path))?;
                toml::from_str::<Settings>(&content)
                    .with_context(|| format!("Failed to parse settings: {:?}", path))?
            }
            None => Settings::default(),
        };
        settings.root = root.to_path_buf();

        Ok(settings)
    }

    pub fn sl_dir(&self) -> PathBuf {
        self.root.join(SL_DIR)
    }

    pub fn ti_dir(&self) -> PathBuf {
        self.root.join(TI_DIR)
    }

    pub fn readme_path(&self) -> PathBuf {
        self.root.join(README_FILE_NAME)
    }

    /// Raw-content link for a file stored at `relative` inside the repository.
    pub fn raw_link(&self, relative: &Path) -> String {
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => {
                    Some(urlencoding::encode(&part.to_string_lossy()).into_owned())
                }
                _ => None,
            })
            .collect();
        format!(
            "{}/{}",
            self.raw_content_base.trim_end_matches('/'),
            segments.join("/")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_link_encodes_segments() {
        let settings = Settings::default();
        let link = settings.raw_link(Path::new("sl/zb_router/ZBDongle E/fw 1.gbl"));
        assert_eq!(
            link,
            "https://raw.githubusercontent.com/xyzroe/XZG-MT/fw_files/sl/zb_router/ZBDongle%20E/fw%201.gbl"
        );
    }

    #[test]
    fn test_load_reads_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            "raw_content_base = \"https://example.org/raw/\"\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path(), None).unwrap();
        assert_eq!(settings.raw_content_base, "https://example.org/raw/");
        assert_eq!(settings.github_api_url, GITHUB_API_URL);
        assert_eq!(settings.root, dir.path());
        assert_eq!(
            settings.raw_link(Path::new("ti/router/a.hex")),
            "https://example.org/raw/ti/router/a.hex"
        );
    }
}
