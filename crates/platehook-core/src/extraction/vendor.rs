//! Stage 2: vendor-override block.
//!
//! Users add these lines to their slicer's start G-code so the values are
//! known exactly:
//!
//! ```text
//! ; ddreams_layer_height = 0.20mm Standard
//! ; ddreams_filament_type = PETG
//! ; ddreams_printer_model = Bambu Lab X1 Carbon
//! ; ddreams_nozzle = 0.4
//! ```
//!
//! A present value always overwrites whatever the generic stage found.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{StageInput, StageResult};
use crate::patterns::{compile, first_capture};
use crate::types::MetadataRecord;

#[derive(Debug, Clone, Copy)]
enum VendorKey {
    LayerHeight,
    FilamentType,
    PrinterModel,
    Nozzle,
}

impl VendorKey {
    fn set(self, record: &mut MetadataRecord, value: &str) {
        let value = value.to_string();
        match self {
            Self::LayerHeight => record.quality_profile = value,
            Self::FilamentType => record.filament_type = value,
            Self::PrinterModel => record.printer_model = value,
            Self::Nozzle => record.nozzle_diameter = value,
        }
    }
}

static VENDOR_PATTERNS: Lazy<Vec<(VendorKey, Regex)>> = Lazy::new(|| {
    vec![
        (
            VendorKey::LayerHeight,
            compile(r"; ddreams_layer_height\s*=\s*([^\n\r]*)").unwrap(),
        ),
        (
            VendorKey::FilamentType,
            compile(r"; ddreams_filament_type\s*=\s*([^\n\r]*)").unwrap(),
        ),
        (
            VendorKey::PrinterModel,
            compile(r"; ddreams_printer_model\s*=\s*([^\n\r]*)").unwrap(),
        ),
        (
            VendorKey::Nozzle,
            compile(r"; ddreams_nozzle\s*=\s*([^\n\r]*)").unwrap(),
        ),
    ]
});

pub(crate) fn apply(input: &StageInput<'_>, record: &mut MetadataRecord) -> StageResult {
    for (key, regex) in VENDOR_PATTERNS.iter() {
        let Some(value) = first_capture(regex, input.content) else {
            continue;
        };
        // Slicer left the placeholder unexpanded, e.g. "{filament_type[0]}".
        if value.contains('{') || value.contains('}') {
            debug!("Ignoring unexpanded vendor placeholder for {:?}: {}", key, value);
            continue;
        }
        debug!("Vendor override for {:?}: '{}'", key, value);
        key.set(record, value);
    }
    Ok(())
}
