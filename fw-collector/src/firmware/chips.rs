/// Ordered substring rules mapping TI firmware filenames to a canonical chip.
/// The first rule whose pattern occurs in the chip token wins.
pub const CHIP_RULES: &[(&str, &str)] = &[
    ("CC2652P_launchpad", "CC2652P2_launchpad"),
    ("1352P_RFS", "CC2652P2_launchpad"),
    ("2652P_RFS", "CC2652P2_launchpad"),
    ("CC2652PSIP", "CC2652P2_launchpad"),
    ("SonoffZBPro", "CC2652P2_launchpad"),
    ("2652P_other", "CC2652P2_other"),
    ("1352P_E72", "CC2652P2_other"),
    ("2652P_E72", "CC2652P2_other"),
    ("1352P7_", "CC2652P7"),
    ("2652RB_", "CC2652RB"),
    ("2538", "CC2538"),
    ("2652R7_", "CC2652R7"),
    ("2652R_", "CC2652R"),
];

/// Map a chip token to its canonical chip name; unmatched tokens pass through.
pub fn classify_chip(token: &str) -> String {
    CHIP_RULES
        .iter()
        .find(|(pattern, _)| token.contains(pattern))
        .map(|(_, chip)| chip.to_string())
        .unwrap_or_else(|| token.to_string())
}

/// Split a dated TI filename into its chip token and version.
///
/// The chip token is everything before the last underscore; the version is
/// the last segment up to its first dot, i.e. the build date for names
/// produced by the rename stage.
pub fn split_ti_file_name(file_name: &str) -> (String, String) {
    let mut parts: Vec<&str> = file_name.split('_').collect();
    let last = parts.pop().unwrap_or_default();
    let version = last.split('.').next().unwrap_or_default().to_string();
    (parts.join("_"), version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_tokens() {
        assert_eq!(classify_chip("CC2652RB_coordinator"), "CC2652RB");
        assert_eq!(classify_chip("xx2652RB_yy"), "CC2652RB");
        assert_eq!(classify_chip("CC1352P7_router"), "CC2652P7");
        assert_eq!(classify_chip("CC2652R7_coordinator"), "CC2652R7");
        assert_eq!(classify_chip("CC2652R_router"), "CC2652R");
        assert_eq!(classify_chip("CC2538_CC2592_router"), "CC2538");
        assert_eq!(classify_chip("SonoffZBPro_coordinator"), "CC2652P2_launchpad");
        assert_eq!(classify_chip("CC1352P2_CC2652P_other_router"), "CC2652P2_other");
    }

    #[test]
    fn test_classify_first_match_wins() {
        // Both the launchpad and the 2538 rule occur; the earlier rule wins
        assert_eq!(classify_chip("CC2652P_launchpad_2538"), "CC2652P2_launchpad");
    }

    #[test]
    fn test_classify_passes_unknown_tokens_through() {
        assert_eq!(classify_chip("CC2674P10_router"), "CC2674P10_router");
    }

    #[test]
    fn test_split_ti_file_name() {
        let (chip, version) = split_ti_file_name("CC2652RB_router_20221102.hex");
        assert_eq!(chip, "CC2652RB_router");
        assert_eq!(version, "20221102");

        let (chip, version) = split_ti_file_name("firmware.hex");
        assert_eq!(chip, "");
        assert_eq!(version, "firmware");
    }
}
