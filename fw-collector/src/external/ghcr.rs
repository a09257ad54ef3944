use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static ABBREVIATED_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]*\.?[0-9]+)\s*([KMkm])?").expect("Invalid regex pattern"));

const TOTAL_DOWNLOADS_LABEL: &str = "total downloads";

/// Public page of a container package
pub fn package_page_url(web_url: &str, owner: &str, repo: &str, image: &str) -> String {
    format!(
        "{}/{}/{}/pkgs/container/{}",
        web_url.trim_end_matches('/'),
        owner,
        repo,
        image
    )
}

/// Fetch the package page and read its total download counter.
///
/// Any HTTP failure is fatal; a page without a recognizable counter yields 0.
pub async fn fetch_total_downloads(client: &reqwest::Client, page_url: &str) -> Result<u64> {
    let html = client
        .get(page_url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", page_url))?
        .error_for_status()
        .with_context(|| format!("Package page request failed: {}", page_url))?
        .text()
        .await
        .context("Failed to read package page")?;

    Ok(parse_total_downloads(&html))
}

/// Find the card labelled "Total downloads" and read the count from its `<h3>`.
pub fn parse_total_downloads(html: &str) -> u64 {
    let document = Html::parse_document(html);
    let (Ok(heading), Ok(label)) = (Selector::parse("h3"), Selector::parse("span")) else {
        return 0;
    };

    for h3 in document.select(&heading) {
        let Some(card) = h3.parent().and_then(ElementRef::wrap) else {
            continue;
        };

        for span in card.select(&label) {
            let text = span.text().collect::<String>();
            if !text.trim().to_lowercase().contains(TOTAL_DOWNLOADS_LABEL) {
                continue;
            }
            if let Some(count) = heading_count(h3) {
                return count;
            }
        }
    }

    0
}

/// Exact count from the `title` attribute, else the abbreviated heading text.
fn heading_count(h3: ElementRef) -> Option<u64> {
    if let Some(title) = h3.value().attr("title") {
        if !title.is_empty() && title.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(count) = title.parse() {
                return Some(count);
            }
        }
    }

    parse_abbreviated_count(h3.text().collect::<String>().trim())
}

/// Parse counts such as `2.88K` or `1.2M`, truncating to an integer.
pub fn parse_abbreviated_count(text: &str) -> Option<u64> {
    let caps = ABBREVIATED_COUNT.captures(text)?;
    let mut value: f64 = caps[1].parse().ok()?;
    match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()).as_deref() {
        Some("K") => value *= 1_000.0,
        Some("M") => value *= 1_000_000.0,
        _ => {}
    }
    Some(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_abbreviated_count() {
        assert_eq!(parse_abbreviated_count("2.88K"), Some(2880));
        assert_eq!(parse_abbreviated_count("1.5m"), Some(1_500_000));
        assert_eq!(parse_abbreviated_count("742"), Some(742));
        assert_eq!(parse_abbreviated_count(".5K"), Some(500));
        assert_eq!(parse_abbreviated_count("n/a"), None);
    }

    #[test]
    fn test_prefers_exact_title_count() {
        let html = r#"
            <div class="card">
                <span>Downloads this week</span>
                <h3 title="99">99</h3>
            </div>
            <div class="card">
                <h3 title="2881">2.88K</h3>
                <span class="color-fg-muted">Total downloads</span>
            </div>"#;
        assert_eq!(parse_total_downloads(html), 2881);
    }

    #[test]
    fn test_falls_back_to_abbreviated_text() {
        let html = r#"<div><h3>1.2K</h3><span>TOTAL DOWNLOADS</span></div>"#;
        assert_eq!(parse_total_downloads(html), 1200);
    }

    #[test]
    fn test_missing_card_is_zero() {
        assert_eq!(parse_total_downloads("<html><body><h3>12</h3></body></html>"), 0);
        assert_eq!(parse_total_downloads(""), 0);
    }

    #[test]
    fn test_package_page_url() {
        assert_eq!(
            package_page_url("https://github.com/", "xyzroe", "XZG-MT", "xzg-mt"),
            "https://github.com/xyzroe/XZG-MT/pkgs/container/xzg-mt"
        );
    }
}
