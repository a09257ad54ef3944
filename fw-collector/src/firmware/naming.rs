//! Filename conventions used by upstream firmware publishers.
//!
//! Versions, baud rates and build dates are never declared anywhere except
//! in the filename, so everything here is a best-effort heuristic with a
//! fixed default.

use chrono::{DateTime, Local};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;

pub const DEFAULT_VERSION: &str = "0.0.0";
pub const DEFAULT_BAUD: &str = "115200";
pub const FAST_BAUD: &str = "460800";

/// Extensions of Silicon Labs images the directory listing keeps
pub const FIRMWARE_IMAGE_EXTENSIONS: &[&str] = &[".gbl", ".s37", ".ota"];

/// Extension of TI images
pub const TI_IMAGE_EXTENSION: &str = ".hex";

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+\.\d+(\.\d+)?)").expect("Invalid regex pattern"));
static BAUD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(115200|230400|460800)").expect("Invalid regex pattern"));
static EMBEDDED_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d{4}[01]\d[0-3]\d)").expect("Invalid regex pattern"));
static TRAILING_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\d{8}$").expect("Invalid regex pattern"));

/// First `N.N.N` or `N.N.N.N` run in the filename, `0.0.0` when there is none.
pub fn extract_version(file_name: &str) -> String {
    VERSION_PATTERN
        .find(file_name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// First standard baud rate mentioned in the filename, `115200` otherwise.
pub fn extract_baud(file_name: &str) -> String {
    BAUD_PATTERN
        .find(file_name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_BAUD.to_string())
}

/// TI builds only ever ship at 115200 or 460800.
pub fn ti_baud(file_name: &str) -> String {
    if file_name.contains(FAST_BAUD) {
        FAST_BAUD.to_string()
    } else {
        DEFAULT_BAUD.to_string()
    }
}

pub fn is_firmware_image(file_name: &str) -> bool {
    FIRMWARE_IMAGE_EXTENSIONS
        .iter()
        .any(|ext| file_name.ends_with(ext))
}

pub fn is_ti_image(file_name: &str) -> bool {
    file_name.ends_with(TI_IMAGE_EXTENSION)
}

/// Whether a filename stem already ends in `_YYYYMMDD`.
pub fn has_trailing_date(stem: &str) -> bool {
    TRAILING_DATE_PATTERN.is_match(stem)
}

/// First `_YYYYMMDD` token embedded anywhere in the name.
pub fn find_embedded_date(name: &str) -> Option<String> {
    EMBEDDED_DATE_PATTERN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Rebuild `file_name` as `<stem>_<date><ext>`, dropping any date tokens already in the stem.
pub fn dated_file_name(file_name: &str, date: &str) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stem = EMBEDDED_DATE_PATTERN.replace_all(&stem, "");
    format!("{}_{}{}", stem, date, ext)
}

/// Local calendar date of a timestamp as `YYYYMMDD`.
pub fn format_file_date(time: SystemTime) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y%m%d").to_string()
}

/// Board names become directory names of mirrored files.
pub fn sanitize_board_name(board: &str) -> String {
    board
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_version() {
        assert_eq!(extract_version("zigbee_ncp_6.7.10.gbl"), "6.7.10");
        assert_eq!(extract_version("ot-rcp_2.4.4.0_GitHub-7074a43e4_gsdk_4.4.gbl"), "2.4.4.0");
        assert_eq!(extract_version("v7.4.1_then_8.0.0.gbl"), "7.4.1");
        assert_eq!(extract_version("ncp-uart-hw.gbl"), "0.0.0");
    }

    #[test]
    fn test_extract_baud() {
        assert_eq!(extract_baud("ncp-uart-hw-460800_7.4.1.gbl"), "460800");
        assert_eq!(extract_baud("rcp_230400_baud.gbl"), "230400");
        assert_eq!(extract_baud("zigbee_ncp_6.7.10.gbl"), "115200");
        assert_eq!(ti_baud("CC2652P_E72_460800_20230101.hex"), "460800");
        assert_eq!(ti_baud("CC2652P_E72_230400_20230101.hex"), "115200");
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_firmware_image("a.gbl"));
        assert!(is_firmware_image("a.s37"));
        assert!(is_firmware_image("a.ota"));
        assert!(!is_firmware_image("a.hex"));
        assert!(!is_firmware_image("README.md"));
        assert!(is_ti_image("CC2652RB_router_20221102.hex"));
    }

    #[test]
    fn test_dates() {
        assert!(has_trailing_date("CC2652RB_router_20221102"));
        assert!(!has_trailing_date("CC2652RB_router_20221102_fix"));
        assert_eq!(
            find_embedded_date("CC1352P2_CC2652P_other_coordinator_20230507_fix").as_deref(),
            Some("20230507")
        );
        // Month 20 is not a date
        assert_eq!(find_embedded_date("fw_20232001_x"), None);
    }

    #[test]
    fn test_dated_file_name_moves_date_to_the_end() {
        assert_eq!(
            dated_file_name("CC2652R_router_20230507_fix.hex", "20230507"),
            "CC2652R_router_fix_20230507.hex"
        );
        assert_eq!(
            dated_file_name("CC2538_coordinator.hex", "20220219"),
            "CC2538_coordinator_20220219.hex"
        );
    }

    #[test]
    fn test_sanitize_board_name() {
        assert_eq!(sanitize_board_name("Sonoff ZBDongle-E"), "Sonoff_ZBDongle-E");
        assert_eq!(sanitize_board_name("SMLIGHT/SLZB-07"), "SMLIGHT_SLZB-07");
    }
}
