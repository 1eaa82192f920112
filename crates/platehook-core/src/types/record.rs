//! Per-file metadata record produced by the extraction engine.

use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Default value for text fields that were not found in the file.
pub const UNKNOWN: &str = "Unknown";

/// Default quality profile when no vendor block names one.
pub const DEFAULT_QUALITY_PROFILE: &str = "Standard";

/// Manufacturing technology of the target machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum MachineType {
    /// Filament deposition.
    #[default]
    Fdm,
    /// Resin (SLA/MSLA).
    Resin,
}

/// Preview image embedded by the slicer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Width declared in the block header.
    pub width: u32,
    /// Height declared in the block header.
    pub height: u32,
    /// Encoded length declared in the block header.
    pub declared_len: usize,
    /// Decoded image bytes (usually PNG).
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub bytes: Vec<u8>,
}

fn to_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

/// Metadata extracted from one slicer output file.
///
/// Every field has a safe default, so a record is always complete even when
/// nothing matched. Records are never patched after extraction; re-parsing
/// produces a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Filament mass in grams.
    pub mass_grams: f64,
    /// Estimated print time in whole minutes.
    pub time_minutes: u32,
    /// Filament material, e.g. "PLA".
    pub filament_type: String,
    /// FDM or resin.
    pub machine_type: MachineType,
    /// Quality profile (layer height) name.
    pub quality_profile: String,
    /// Printer model name.
    pub printer_model: String,
    /// Nozzle diameter as written by the slicer.
    pub nozzle_diameter: String,
    /// Total layer count.
    pub total_layers: u32,
    /// Filament length in metres.
    pub filament_length_m: f64,
    /// Number of tool changes.
    pub multicolor_changes: u32,
    /// Embedded preview image.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumbnail: Option<Thumbnail>,
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self {
            mass_grams: 0.0,
            time_minutes: 0,
            filament_type: UNKNOWN.to_string(),
            machine_type: MachineType::Fdm,
            quality_profile: DEFAULT_QUALITY_PROFILE.to_string(),
            printer_model: UNKNOWN.to_string(),
            nozzle_diameter: UNKNOWN.to_string(),
            total_layers: 0,
            filament_length_m: 0.0,
            multicolor_changes: 0,
            thumbnail: None,
        }
    }
}
