use regex::Regex;

use fw_collector::config::SONOFF_HOST;

use crate::sources::Tally;

const SONOFF_LABEL: &str = "SONOFF Dongle Flasher";
const DOWNLOADED_HEADER: &str = "Downloaded from:";

/// Rewrite one `## <name>` section of the README: refresh the file-count
/// badges and regenerate the source list that follows `header`.
///
/// Content outside the section is returned untouched, as is the whole
/// document when the section does not exist.
pub fn update_section(
    content: &str,
    name: &str,
    counts: &[(&str, usize)],
    repos: &Tally,
    header: &str,
    downloaded: Option<&Tally>,
) -> String {
    let Some(start) = content.find(&format!("## {}", name)) else {
        return content.to_string();
    };
    let end = content[start + 1..]
        .find("\n## ")
        .map_or(content.len(), |offset| start + 1 + offset);

    let mut section = content[start..end].to_string();

    for (badge, count) in counts {
        let pattern = format!(r"(badge/{}-)(\d+)(_files)", regex::escape(badge));
        if let Ok(re) = Regex::new(&pattern) {
            section = re
                .replace_all(&section, format!("${{1}}{}${{3}}", count))
                .into_owned();
        }
    }

    if let Some(at) = section.find(header) {
        let mut rebuilt = section[..at + header.len()].to_string();
        rebuilt.push_str("\n\n");
        rebuilt.push_str(&source_list(repos, repo_label));

        if let Some(downloaded) = downloaded.filter(|tally| !tally.is_empty()) {
            rebuilt.push('\n');
            rebuilt.push_str(DOWNLOADED_HEADER);
            rebuilt.push_str("\n\n");
            rebuilt.push_str(&source_list(downloaded, |url| url.to_string()));
        }

        rebuilt.push('\n');
        section = rebuilt;
    }

    format!("{}{}{}", &content[..start], section, &content[end..])
}

fn source_list(tally: &Tally, label: fn(&str) -> String) -> String {
    tally
        .ranked()
        .into_iter()
        .map(|(url, _)| {
            if url.contains(SONOFF_HOST) {
                format!("- [{}]({})\n", SONOFF_LABEL, url)
            } else {
                format!("- [{}]({})\n", label(url), url)
            }
        })
        .collect()
}

/// `owner/repo` for GitHub project URLs, the URL itself otherwise.
fn repo_label(url: &str) -> String {
    url.strip_prefix("https://github.com/")
        .and_then(|rest| {
            let mut parts = rest.splitn(3, '/');
            match (parts.next(), parts.next()) {
                (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                    Some(format!("{}/{}", owner, repo))
                }
                _ => None,
            }
        })
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = "# Firmware\n\nIntro\n\n\
## ♥️ Ti\n\n\
![](https://img.shields.io/badge/Zigbee_Router-42_files-red)\n\
![](https://img.shields.io/badge/OpenThread-3_files-red)\n\n\
Downloaded from:\n\n\
- [stale/repo](https://github.com/stale/repo)\n\n\
## 💚 Sl\n\n\
![](https://img.shields.io/badge/Zigbee_Router-7_files-green)\n";

    fn tally(keys: &[&str]) -> Tally {
        let mut tally = Tally::default();
        for key in keys {
            tally.add(*key);
        }
        tally
    }

    #[test]
    fn test_updates_badges_and_sources_within_section() {
        let repos = tally(&[
            "https://github.com/Koenkk/Z-Stack-firmware",
            "https://github.com/xyzroe/ZigStar",
            "https://github.com/xyzroe/ZigStar",
        ]);
        let updated = update_section(
            README,
            "♥️ Ti",
            &[("Zigbee_Router", 5), ("OpenThread", 0)],
            &repos,
            "Downloaded from:",
            None,
        );

        assert!(updated.contains("badge/Zigbee_Router-5_files-red"));
        assert!(updated.contains("badge/OpenThread-0_files-red"));
        // The next section keeps its own badge
        assert!(updated.contains("badge/Zigbee_Router-7_files-green"));
        assert!(!updated.contains("stale/repo"));
        assert!(updated.contains(
            "Downloaded from:\n\n\
- [xyzroe/ZigStar](https://github.com/xyzroe/ZigStar)\n\
- [Koenkk/Z-Stack-firmware](https://github.com/Koenkk/Z-Stack-firmware)\n\n\n\
## 💚 Sl"
        ));
        assert!(updated.starts_with("# Firmware\n\nIntro\n\n## ♥️ Ti"));
    }

    #[test]
    fn test_appends_downloaded_sources() {
        let readme = "## 💚 Sl\n\n![](https://img.shields.io/badge/Multi_PAN-1_files-green)\n\nIndexed from:\n- old\n";
        let repos = tally(&["https://github.com/darkxst/silabs-firmware-builder"]);
        let downloaded = tally(&[
            "https://dongle.sonoff.tech/sonoff-dongle-flasher/",
            "https://vendor.example/feed.json",
        ]);

        let updated = update_section(
            readme,
            "💚 Sl",
            &[("Multi_PAN", 4)],
            &repos,
            "Indexed from:",
            Some(&downloaded),
        );

        assert_eq!(
            updated,
            "## 💚 Sl\n\n![](https://img.shields.io/badge/Multi_PAN-4_files-green)\n\n\
Indexed from:\n\n\
- [darkxst/silabs-firmware-builder](https://github.com/darkxst/silabs-firmware-builder)\n\n\
Downloaded from:\n\n\
- [SONOFF Dongle Flasher](https://dongle.sonoff.tech/sonoff-dongle-flasher/)\n\
- [https://vendor.example/feed.json](https://vendor.example/feed.json)\n\n"
        );
    }

    #[test]
    fn test_missing_section_or_header() {
        let repos = Tally::default();
        assert_eq!(
            update_section(README, "Nope", &[("Zigbee_Router", 1)], &repos, "Downloaded from:", None),
            README
        );

        let readme = "## ♥️ Ti\nbadge/Zigbee_Router-1_files\n";
        assert_eq!(
            update_section(readme, "♥️ Ti", &[("Zigbee_Router", 2)], &repos, "Downloaded from:", None),
            "## ♥️ Ti\nbadge/Zigbee_Router-2_files\n"
        );
    }
}
