use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::process::Command;
use std::sync::LazyLock;

use crate::config::{Settings, USER_AGENT};

static TREE_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/]+)/([^/]+)/tree/([^/]+)/?(.*)").expect("Invalid regex pattern")
});

/// GitHub REST client for listing repository folders
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

/// One item of a `contents` listing
#[derive(Debug, Deserialize, Clone)]
pub struct ContentEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Rate limit information from GitHub API
#[derive(Debug)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}

impl GitHubClient {
    /// Create a client against the configured API; a token is optional and
    /// only raises the anonymous rate limit.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            api_url: settings.github_api_url.trim_end_matches('/').to_string(),
            token: Self::resolve_token(),
        })
    }

    /// Token resolution:
    /// 1. `gh auth token` (for local dev)
    /// 2. `GITHUB_TOKEN` env var
    /// 3. `GH_TOKEN` env var
    fn resolve_token() -> Option<String> {
        // Clear GITHUB_TOKEN/GH_TOKEN when calling gh, otherwise gh echoes those back
        if let Ok(output) = Command::new("gh")
            .args(["auth", "token"])
            .env_remove("GITHUB_TOKEN")
            .env_remove("GH_TOKEN")
            .output()
        {
            if output.status.success() {
                let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !token.is_empty() {
                    return Some(token);
                }
            }
        }

        ["GITHUB_TOKEN", "GH_TOKEN"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|token| !token.is_empty())
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Translate a `github.com/<owner>/<repo>/tree/<branch>/<path>` folder URL
    /// into the matching `contents` API URL.
    pub fn directory_api_url(&self, web_url: &str) -> Option<String> {
        let caps = TREE_URL_PATTERN.captures(web_url)?;
        Some(format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_url, &caps[1], &caps[2], &caps[4], &caps[3]
        ))
    }

    /// List the entries of a repository folder given by its web URL.
    pub async fn list_directory(&self, web_url: &str) -> Result<Vec<ContentEntry>> {
        let api_url = self
            .directory_api_url(web_url)
            .with_context(|| format!("Could not parse folder URL {}", web_url))?;

        let response = self
            .get(&api_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", api_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "GitHub API error: {}. Response: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json::<Vec<ContentEntry>>()
            .await
            .with_context(|| format!("Failed to parse listing from {}", api_url))
    }

    /// Check remaining rate limit
    pub async fn check_rate_limit(&self) -> Result<RateLimitInfo> {
        let response = self
            .get(&format!("{}/rate_limit", self.api_url))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        let core = body
            .get("resources")
            .and_then(|r| r.get("core"))
            .context("No core rate limit in response")?;

        Ok(RateLimitInfo {
            limit: core["limit"].as_u64().unwrap_or(0) as u32,
            remaining: core["remaining"].as_u64().unwrap_or(0) as u32,
            reset: core["reset"].as_i64().unwrap_or(0),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

/// Keep listing entries that are firmware images and, when a mask is set, contain it.
pub fn is_listed_firmware(entry: &ContentEntry, mask: Option<&str>) -> bool {
    entry.kind == "file"
        && entry.download_url.is_some()
        && crate::firmware::is_firmware_image(&entry.name)
        && mask.map_or(true, |mask| entry.name.contains(mask))
}
