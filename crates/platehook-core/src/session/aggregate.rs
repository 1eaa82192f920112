//! Aggregate of every plate in a session.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{FileStamp, Plate};
use crate::types::{MachineType, Thumbnail, DEFAULT_QUALITY_PROFILE, UNKNOWN};

/// Job-level totals derived from the current plate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Ceiling of the summed plate masses.
    pub mass_grams: u64,
    pub time_minutes: u64,
    pub filament_length_m: f64,
    pub total_layers: u64,
    pub multicolor_changes: u64,
    /// Distinct plate materials, sorted, joined with `", "`.
    pub filament_type: String,
    pub machine_type: MachineType,
    pub printer_model: String,
    pub quality_profile: String,
    pub nozzle_diameter: String,
    /// Preview of the most recently added plate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thumbnail: Option<Thumbnail>,
    pub plate_count: usize,
    /// Plate file names in plate order.
    pub file_names: Vec<String>,
    /// Summed file sizes, when every plate file could be stamped.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_size: Option<u64>,
    /// Newest plate modification time (ms since the Unix epoch), when every
    /// plate file could be stamped.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_timestamp_ms: Option<u64>,
}

impl Default for AggregateRecord {
    fn default() -> Self {
        Self {
            mass_grams: 0,
            time_minutes: 0,
            filament_length_m: 0.0,
            total_layers: 0,
            multicolor_changes: 0,
            filament_type: UNKNOWN.to_string(),
            machine_type: MachineType::default(),
            printer_model: UNKNOWN.to_string(),
            quality_profile: DEFAULT_QUALITY_PROFILE.to_string(),
            nozzle_diameter: UNKNOWN.to_string(),
            thumbnail: None,
            plate_count: 0,
            file_names: Vec::new(),
            file_size: None,
            file_timestamp_ms: None,
        }
    }
}

impl AggregateRecord {
    /// Recompute from scratch over `plates` (in insertion order).
    pub fn from_plates(plates: &[Plate]) -> Self {
        let Some(first) = plates.first() else {
            return Self::default();
        };

        // Summed in integer sub-units so the total does not depend on plate order.
        let milligrams: u64 = plates
            .iter()
            .map(|p| fixed_point(p.record.mass_grams, 1_000.0))
            .sum();
        let micrometres: u64 = plates
            .iter()
            .map(|p| fixed_point(p.record.filament_length_m, 1_000_000.0))
            .sum();
        let stamps: Option<Vec<FileStamp>> = plates.iter().map(|p| p.stamp).collect();
        let materials: BTreeSet<&str> = plates
            .iter()
            .map(|p| p.record.filament_type.as_str())
            .collect();

        Self {
            mass_grams: milligrams.div_ceil(1_000),
            time_minutes: plates.iter().map(|p| u64::from(p.record.time_minutes)).sum(),
            filament_length_m: micrometres as f64 / 1_000_000.0,
            total_layers: plates.iter().map(|p| u64::from(p.record.total_layers)).sum(),
            multicolor_changes: plates
                .iter()
                .map(|p| u64::from(p.record.multicolor_changes))
                .sum(),
            filament_type: materials.into_iter().collect::<Vec<_>>().join(", "),
            machine_type: first.record.machine_type,
            printer_model: first.record.printer_model.clone(),
            quality_profile: first.record.quality_profile.clone(),
            nozzle_diameter: first.record.nozzle_diameter.clone(),
            thumbnail: plates.last().and_then(|p| p.record.thumbnail.clone()),
            plate_count: plates.len(),
            file_names: plates.iter().map(Plate::file_name).collect(),
            file_size: stamps.as_ref().map(|s| s.iter().map(|stamp| stamp.size).sum()),
            file_timestamp_ms: stamps
                .as_ref()
                .and_then(|s| s.iter().map(|stamp| stamp.modified_ms).max()),
        }
    }

    /// Whether no plate contributes.
    pub fn is_empty(&self) -> bool {
        self.plate_count == 0
    }
}

fn fixed_point(value: f64, scale: f64) -> u64 {
    (value.max(0.0) * scale).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataRecord;

    fn plate(path: &str, mass: f64, minutes: u32, material: &str) -> Plate {
        Plate::new(
            path,
            MetadataRecord {
                mass_grams: mass,
                time_minutes: minutes,
                filament_type: material.to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_empty_is_default() {
        assert_eq!(AggregateRecord::from_plates(&[]), AggregateRecord::default());
    }

    #[test]
    fn test_totals_and_joined_materials() {
        let plates = vec![
            plate("/jobs/a.gcode", 10.2, 30, "PLA"),
            plate("/jobs/b.gcode", 5.1, 45, "PETG"),
            plate("/jobs/c.gcode", 1.0, 5, "PLA"),
        ];
        let aggregate = AggregateRecord::from_plates(&plates);

        assert_eq!(aggregate.mass_grams, 17);
        assert_eq!(aggregate.time_minutes, 80);
        assert_eq!(aggregate.filament_type, "PETG, PLA");
        assert_eq!(aggregate.plate_count, 3);
        assert_eq!(aggregate.file_names, ["a.gcode", "b.gcode", "c.gcode"]);
    }

    #[test]
    fn test_totals_do_not_drift_with_plate_order() {
        let mut plates = vec![
            plate("/jobs/a.gcode", 0.6, 1, "PLA"),
            plate("/jobs/b.gcode", 0.56, 1, "PLA"),
            plate("/jobs/c.gcode", 1.84, 1, "PLA"),
        ];
        for (p, metres) in plates.iter_mut().zip([0.6, 0.56, 1.84]) {
            p.record.filament_length_m = metres;
        }

        let forward = AggregateRecord::from_plates(&plates);
        plates.reverse();
        let backward = AggregateRecord::from_plates(&plates);

        assert_eq!(forward.mass_grams, 3);
        assert_eq!(backward.mass_grams, 3);
        assert_eq!(forward.filament_length_m, 3.0);
        assert_eq!(backward.filament_length_m, 3.0);
    }

    #[test]
    fn test_mass_rounds_up_partial_grams() {
        let aggregate = AggregateRecord::from_plates(&[plate("/jobs/a.gcode", 3.001, 1, "PLA")]);
        assert_eq!(aggregate.mass_grams, 4);
    }

    #[test]
    fn test_file_stamps_need_every_plate() {
        let stamped = |path, size, modified_ms| {
            plate(path, 1.0, 1, "PLA").with_stamp(Some(FileStamp { size, modified_ms }))
        };
        let plates = vec![
            stamped("/jobs/a.gcode", 100, 5_000),
            stamped("/jobs/b.gcode", 250, 9_000),
        ];
        let aggregate = AggregateRecord::from_plates(&plates);
        assert_eq!(aggregate.file_size, Some(350));
        assert_eq!(aggregate.file_timestamp_ms, Some(9_000));

        let mut plates = plates;
        plates.push(plate("/jobs/c.gcode", 1.0, 1, "PLA"));
        let aggregate = AggregateRecord::from_plates(&plates);
        assert_eq!(aggregate.file_size, None);
        assert_eq!(aggregate.file_timestamp_ms, None);
    }

    #[test]
    fn test_first_plate_decides_machine_and_printer() {
        let mut resin = plate("/jobs/r.gcode", 1.0, 1, "Resin");
        resin.record.machine_type = MachineType::Resin;
        resin.record.printer_model = "Saturn SLA".to_string();
        let fdm = plate("/jobs/f.gcode", 1.0, 1, "PLA");

        let aggregate = AggregateRecord::from_plates(&[resin, fdm]);
        assert_eq!(aggregate.machine_type, MachineType::Resin);
        assert_eq!(aggregate.printer_model, "Saturn SLA");
    }

    #[test]
    fn test_thumbnail_from_last_plate_only() {
        let mut with_preview = plate("/jobs/a.gcode", 1.0, 1, "PLA");
        with_preview.record.thumbnail = Some(Thumbnail {
            width: 1,
            height: 1,
            declared_len: 4,
            bytes: vec![1, 2, 3],
        });
        let without = plate("/jobs/b.gcode", 1.0, 1, "PLA");

        let aggregate = AggregateRecord::from_plates(&[with_preview.clone(), without.clone()]);
        assert!(aggregate.thumbnail.is_none());

        let aggregate = AggregateRecord::from_plates(&[without, with_preview]);
        assert_eq!(aggregate.thumbnail.unwrap().bytes, vec![1, 2, 3]);
    }
}
