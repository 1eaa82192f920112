//! Built-in extraction patterns.
//!
//! These cover the comment dialects of the common slicers (PrusaSlicer,
//! OrcaSlicer, Bambu Studio). When a pattern has several alternatives the
//! first capture group that matched wins.

use crate::types::LearnableField;

/// Built-in pattern for each learnable field.
pub fn default_pattern(field: LearnableField) -> &'static str {
    match field {
        LearnableField::Time => {
            r"; estimated printing time \(normal mode\)\s*=\s*([^\n\r]*)|; model printing time:\s*([^\n\r;]*)"
        }
        LearnableField::Mass => {
            r"; filament used \[g\]\s*=\s*([^\n\r]*)|; total filament weight \[g\]\s*:\s*([^\n\r]*)"
        }
        LearnableField::FilamentType => r"; filament_type\s*=\s*([^\n\r]*)",
        LearnableField::PrinterModel => r"; printer_model\s*=\s*([^\n\r]*)",
        LearnableField::TotalLayers => {
            r"; total layers count\s*=\s*(\d+)|; total layer number:\s*(\d+)"
        }
        LearnableField::FilamentLength => {
            r"; filament used \[mm\]\s*=\s*([^\n\r]*)|; total filament length \[mm\]\s*:\s*([^\n\r]*)"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{compile, first_capture};
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_default_compiles() {
        for field in LearnableField::iter() {
            assert!(compile(default_pattern(field)).is_ok(), "{field}");
        }
    }

    #[test]
    fn test_prusa_dialect() {
        let content = "; filament used [mm] = 4123.45\n\
                       ; filament used [g] = 12.40\n\
                       ; estimated printing time (normal mode) = 1h 2m 3s\n\
                       ; filament_type = PLA\n\
                       ; printer_model = MK4\n\
                       ; total layers count = 210\n";

        let capture = |field| {
            let regex = compile(default_pattern(field)).unwrap();
            first_capture(&regex, content).map(str::to_string)
        };

        assert_eq!(capture(LearnableField::Mass).as_deref(), Some("12.40"));
        assert_eq!(capture(LearnableField::FilamentLength).as_deref(), Some("4123.45"));
        assert_eq!(capture(LearnableField::Time).as_deref(), Some("1h 2m 3s"));
        assert_eq!(capture(LearnableField::FilamentType).as_deref(), Some("PLA"));
        assert_eq!(capture(LearnableField::PrinterModel).as_deref(), Some("MK4"));
        assert_eq!(capture(LearnableField::TotalLayers).as_deref(), Some("210"));
    }

    #[test]
    fn test_bambu_dialect_uses_second_alternative() {
        let content = "; total layer number: 88\n\
                       ; total filament weight [g] : 31.07\n\
                       ; model printing time: 2h 5m 13s; total estimated time: 2h 12m 1s\n";

        let mass = compile(default_pattern(LearnableField::Mass)).unwrap();
        let layers = compile(default_pattern(LearnableField::TotalLayers)).unwrap();
        let time = compile(default_pattern(LearnableField::Time)).unwrap();

        assert_eq!(first_capture(&mass, content), Some("31.07"));
        assert_eq!(first_capture(&layers, content), Some("88"));
        assert_eq!(first_capture(&time, content), Some("2h 5m 13s"));
    }
}
