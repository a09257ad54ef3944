use regex::Regex;
use std::sync::LazyLock;

use fw_collector::config::{SONOFF_FLASHER_URL, SONOFF_HOST};
use fw_collector::models::{SlManifest, SlTask, TiTask};

static GITHUB_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)").expect("Invalid regex pattern")
});
static RAW_CONTENT_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://raw\.githubusercontent\.com/([^/]+)/([^/]+)").expect("Invalid regex pattern")
});

/// Occurrence counts that remember the order in which keys were first seen.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tally {
    entries: Vec<(String, usize)>,
}

impl Tally {
    pub fn add(&mut self, key: impl Into<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((key, 1)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by descending count; ties stay in first-seen order.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .entries
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Reduce a firmware link to the page of the project that publishes it.
pub fn repo_url(link: &str) -> Option<String> {
    if link.contains(SONOFF_HOST) {
        return Some(SONOFF_FLASHER_URL.to_string());
    }
    if let Some(caps) = GITHUB_REPO.captures(link) {
        return Some(format!("https://github.com/{}/{}", &caps[1], &caps[2]));
    }
    RAW_CONTENT_REPO
        .captures(link)
        .map(|caps| format!("https://github.com/{}/{}", &caps[1], &caps[2]))
}

pub fn ti_repos(tasks: &[TiTask]) -> Tally {
    let mut tally = Tally::default();
    for repo in tasks.iter().filter_map(|task| repo_url(&task.link)) {
        tally.add(repo);
    }
    tally
}

/// Projects linked from the SL manifest, leaving out files mirrored into `own_repository`.
pub fn sl_repos(manifest: &SlManifest, own_repository: &str) -> Tally {
    let mut tally = Tally::default();
    for entry in manifest.entries() {
        if entry.link.contains(own_repository) {
            continue;
        }
        if let Some(repo) = repo_url(&entry.link) {
            tally.add(repo);
        }
    }
    tally
}

/// Vendor feeds the SL builder downloads from.
pub fn sl_downloaded_sources(task: &SlTask) -> Tally {
    let mut tally = Tally::default();
    let feeds = task
        .values()
        .flat_map(|boards| boards.values())
        .flatten()
        .filter_map(|config| config.json.as_deref());

    for feed in feeds {
        if feed.contains(SONOFF_HOST) {
            tally.add(SONOFF_FLASHER_URL);
        } else {
            tally.add(feed);
        }
    }
    tally
}
