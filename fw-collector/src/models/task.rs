use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// chip family -> board -> configuration records
pub type SlTask = BTreeMap<String, BTreeMap<String, Vec<SlConfig>>>;

/// One configuration record of the Silicon Labs task descriptor.
///
/// Known metadata keys are named fields; every other key is a firmware type
/// (`zigbee_ncp`, `zb_router`, `multipan`, ...) with its own settings.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SlConfig {
    /// GitHub folder URL shared by all firmware types of this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
    /// Vendor JSON feed; selects the feed flow instead of folder listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    /// Device tag a feed descriptor must carry to be picked up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub firmware: BTreeMap<String, FirmwareTypeConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareTypeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
    /// Substring a listed filename must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    /// Vendor firmware-type label(s) that map onto this firmware type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_type: Option<OneOrMany>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn values(&self) -> Vec<&str> {
        match self {
            OneOrMany::One(value) => vec![value.as_str()],
            OneOrMany::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// One archive (or bare file) to fetch for the Texas Instruments manifest
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TiTask {
    /// Target directory under `ti/`, also the manifest's top-level key
    #[serde(rename = "type")]
    pub kind: String,
    pub link: String,
}

/// Resolve the signed flag: firmware type override, then record default, then `false`.
pub fn resolve_signed(firmware: Option<bool>, config: Option<bool>) -> bool {
    firmware.or(config).unwrap_or(false)
}
