use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Metadata for a single firmware file as published in a manifest
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct FirmwareEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Hand-added keys are kept as they are
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Resolve an entry already on disk against a freshly discovered one.
///
/// `link` always comes from the fresh entry. `ver`, `baud` and `notes` keep
/// whatever was already set, so hand edits survive re-runs. `signed` follows
/// the fresh entry when it carries one.
pub fn merge_entry(old: Option<FirmwareEntry>, new: FirmwareEntry) -> FirmwareEntry {
    let Some(old) = old else {
        return new;
    };

    FirmwareEntry {
        ver: old.ver.or(new.ver),
        link: new.link,
        baud: old.baud.or(new.baud),
        signed: new.signed.or(old.signed),
        notes: old.notes.or(new.notes),
        extra: old.extra,
    }
}

pub type FileEntries = BTreeMap<String, FirmwareEntry>;

/// firmware type -> chip family -> board -> filename -> entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct SlManifest(pub BTreeMap<String, BTreeMap<String, BTreeMap<String, FileEntries>>>);

impl SlManifest {
    /// Insert or overwrite the entry for `(fw_type, chip, board, file)`.
    pub fn insert(
        &mut self,
        fw_type: &str,
        chip: &str,
        board: &str,
        file: &str,
        entry: FirmwareEntry,
    ) {
        self.0
            .entry(fw_type.to_string())
            .or_default()
            .entry(chip.to_string())
            .or_default()
            .entry(board.to_string())
            .or_default()
            .insert(file.to_string(), entry);
    }

    pub fn get(&self, fw_type: &str, chip: &str, board: &str, file: &str) -> Option<&FirmwareEntry> {
        self.0.get(fw_type)?.get(chip)?.get(board)?.get(file)
    }

    /// Number of files listed under a firmware type, across all chips and boards.
    pub fn count(&self, fw_type: &str) -> usize {
        self.0
            .get(fw_type)
            .map(|chips| chips.values().flat_map(|boards| boards.values()).map(|files| files.len()).sum())
            .unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FirmwareEntry> {
        self.0
            .values()
            .flat_map(|chips| chips.values())
            .flat_map(|boards| boards.values())
            .flat_map(|files| files.values())
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self, b"  ")
    }
}

/// type -> chip -> filename -> entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct TiManifest(pub BTreeMap<String, BTreeMap<String, FileEntries>>);

impl TiManifest {
    /// Merge an entry into `(kind, chip, file)` following [`merge_entry`].
    pub fn merge(&mut self, kind: &str, chip: &str, file: &str, entry: FirmwareEntry) {
        let files = self
            .0
            .entry(kind.to_string())
            .or_default()
            .entry(chip.to_string())
            .or_default();
        let merged = merge_entry(files.remove(file), entry);
        files.insert(file.to_string(), merged);
    }

    pub fn get(&self, kind: &str, chip: &str, file: &str) -> Option<&FirmwareEntry> {
        self.0.get(kind)?.get(chip)?.get(file)
    }

    /// Number of files listed under a type, across all chips.
    pub fn count(&self, kind: &str) -> usize {
        self.0
            .get(kind)
            .map(|chips| chips.values().map(|files| files.len()).sum())
            .unwrap_or(0)
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self, b"    ")
    }
}

/// Read a JSON document, falling back to `T::default()` when the file does not exist yet.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    load_json(path)
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in file: {:?}", path))
}

/// Pretty-print `value` to `path` with the given indentation.
pub fn write_json<T: Serialize>(path: &Path, value: &T, indent: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .with_context(|| format!("Failed to serialize {:?}", path))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, buf).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ver: &str, link: &str, baud: &str) -> FirmwareEntry {
        FirmwareEntry {
            ver: Some(ver.to_string()),
            link: link.to_string(),
            baud: Some(baud.to_string()),
            notes: Some(String::new()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_keeps_existing_fields_and_refreshes_link() {
        let mut old = entry("20230101", "https://old/link.hex", "460800");
        old.notes = Some("tested on dongle".to_string());
        old.extra
            .insert("hidden".to_string(), serde_json::Value::Bool(true));

        let merged = merge_entry(Some(old), entry("20240101", "https://new/link.hex", "115200"));

        assert_eq!(merged.ver.as_deref(), Some("20230101"));
        assert_eq!(merged.baud.as_deref(), Some("460800"));
        assert_eq!(merged.notes.as_deref(), Some("tested on dongle"));
        assert_eq!(merged.link, "https://new/link.hex");
        assert_eq!(merged.extra.get("hidden"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_merge_fills_missing_fields() {
        let old: FirmwareEntry = serde_json::from_str(r#"{"link": "https://old"}"#).unwrap();
        let merged = merge_entry(Some(old), entry("20240101", "https://new", "115200"));
        assert_eq!(merged.ver.as_deref(), Some("20240101"));
        assert_eq!(merged.baud.as_deref(), Some("115200"));
        assert_eq!(merged.notes.as_deref(), Some(""));
    }

    #[test]
    fn test_counts() {
        let mut sl = SlManifest::default();
        sl.insert("zb_router", "EFR32MG21", "Dongle-E", "a.gbl", FirmwareEntry::default());
        sl.insert("zb_router", "EFR32MG21", "Dongle-M", "b.gbl", FirmwareEntry::default());
        sl.insert("zb_router", "EFR32MG24", "Dongle-P", "c.gbl", FirmwareEntry::default());
        sl.insert("zigbee_ncp", "EFR32MG21", "Dongle-E", "d.gbl", FirmwareEntry::default());
        assert_eq!(sl.count("zb_router"), 3);
        assert_eq!(sl.count("multipan"), 0);
        assert_eq!(sl.len(), 4);

        let mut ti = TiManifest::default();
        ti.merge("router", "CC2652RB", "a_20230101.hex", FirmwareEntry::default());
        ti.merge("router", "CC2652P7", "b_20230101.hex", FirmwareEntry::default());
        ti.merge("router", "CC2652P7", "b_20230101.hex", FirmwareEntry::default());
        assert_eq!(ti.count("router"), 2);
    }

    #[test]
    fn test_ti_manifest_roundtrip_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut ti = TiManifest::default();
        ti.merge("router", "CC2538", "r_20230101.hex", entry("20230101", "https://x", "115200"));
        ti.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n    \"router\""));
        assert_eq!(TiManifest::load(&path).unwrap(), ti);
    }
}
