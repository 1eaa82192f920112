//! Integration tests for extraction over realistic slicer output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use platehook_core::{
    ExtractionEngine, LearnableField, MachineType, PatternStore, ReadPolicy, Stage,
};

const BAMBU_HEADER: &str = "\
; HEADER_BLOCK_START
; BambuStudio 01.09.00.70
; model printing time: 2h 5m 10s; total estimated time: 2h 12m 41s
; total layer number: 250
; total filament length [mm] : 12345.6
; total filament weight [g] : 36.82
; HEADER_BLOCK_END
; filament_type = PLA;PETG
; printer_model = Bambu Lab X1 Carbon
M620 S0A
T0
G1 X10
T1
G1 X20
T0
T255
";

const PRUSA_FOOTER: &str = "\
G1 X5 Y5
; filament used [mm] = 2032.45
; filament used [g] = 6.06
; total filament used [g] = 6.06
; estimated printing time (normal mode) = 41m 32s
; estimated printing time (silent mode) = 43m 2s
; total layers count = 97
; filament_type = PETG
; printer_model = MK3S
; ddreams_layer_height = 0.15mm QUALITY
; ddreams_nozzle = 0.4
";

fn engine() -> ExtractionEngine {
    ExtractionEngine::new(Arc::new(PatternStore::in_memory()))
        .with_read_policy(ReadPolicy::new(2, Duration::from_millis(10)))
}

fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_bambu_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "bambu.gcode", BAMBU_HEADER);

    let report = engine().parse_with_report(&path).await;
    let record = report.record;

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(record.time_minutes, 133);
    assert_eq!(record.total_layers, 250);
    assert!((record.mass_grams - 36.82).abs() < 1e-9);
    assert!((record.filament_length_m - 12.3456).abs() < 1e-9);
    assert_eq!(record.filament_type, "PLA;PETG");
    assert_eq!(record.printer_model, "Bambu Lab X1 Carbon");
    assert_eq!(record.multicolor_changes, 2);
    assert_eq!(record.machine_type, MachineType::Fdm);
}

#[tokio::test]
async fn test_prusa_file_with_vendor_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "prusa.gcode", PRUSA_FOOTER);

    let record = engine().parse(&path).await;

    assert_eq!(record.time_minutes, 42);
    assert_eq!(record.total_layers, 97);
    assert_eq!(record.quality_profile, "0.15mm QUALITY");
    assert_eq!(record.nozzle_diameter, "0.4");
    assert_eq!(record.printer_model, "MK3S");
    assert_eq!(record.multicolor_changes, 0);
}

#[tokio::test]
async fn test_vendor_block_wins_regardless_of_position() {
    let dir = tempfile::tempdir().unwrap();
    let before = write(
        &dir,
        "before.gcode",
        "; ddreams_printer_model = Custom Voron\n; printer_model = MK3S\n",
    );
    let after = write(
        &dir,
        "after.gcode",
        "; printer_model = MK3S\n; ddreams_printer_model = Custom Voron\n",
    );

    let engine = engine();
    assert_eq!(engine.parse(&before).await.printer_model, "Custom Voron");
    assert_eq!(engine.parse(&after).await.printer_model, "Custom Voron");
}

#[tokio::test]
async fn test_missing_file_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let report = engine().parse_with_report(dir.path().join("missing.gcode")).await;

    assert_eq!(report.record, Default::default());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Read);
}

#[tokio::test]
async fn test_scan_candidates_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "prusa.gcode", PRUSA_FOOTER);

    let candidates = engine().scan_candidates(&path).await;
    assert_eq!(candidates.get(LearnableField::Time).len(), 2);
    assert_eq!(
        candidates.get(LearnableField::TotalLayers),
        ["; total layers count = 97"]
    );
    assert_eq!(candidates.get(LearnableField::Mass).len(), 0);
}
