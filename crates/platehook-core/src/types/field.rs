//! The closed set of learnable fields and their setter table.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use super::record::MetadataRecord;

static FIRST_FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Fields that have a generic pattern and can be recalibrated by the user.
///
/// Keys serialize to snake_case and are the keys of the persisted override
/// document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LearnableField {
    /// Print time (resolved by the derived-time stage, not the setter table).
    Time,
    /// Filament mass in grams.
    Mass,
    /// Filament material.
    FilamentType,
    /// Printer model.
    PrinterModel,
    /// Layer count.
    TotalLayers,
    /// Filament length, captured in millimetres.
    FilamentLength,
}

/// Pure update applied to a record with a captured value.
pub type FieldSetter = fn(&mut MetadataRecord, &str);

impl LearnableField {
    /// All field keys as static strings.
    pub fn all_names() -> Vec<&'static str> {
        Self::iter().map(|f| f.into()).collect()
    }

    /// Key used in the persisted override document.
    pub fn key(self) -> &'static str {
        self.into()
    }

    /// Setter for this field, or `None` when the value is resolved by a
    /// later stage (time).
    pub fn setter(self) -> Option<FieldSetter> {
        match self {
            Self::Time => None,
            Self::Mass => Some(set_mass as FieldSetter),
            Self::FilamentType => Some(set_filament_type as FieldSetter),
            Self::PrinterModel => Some(set_printer_model as FieldSetter),
            Self::TotalLayers => Some(set_total_layers as FieldSetter),
            Self::FilamentLength => Some(set_filament_length as FieldSetter),
        }
    }
}

/// First integer or decimal substring of `text`, tolerating trailing units.
pub fn first_float(text: &str) -> Option<f64> {
    FIRST_FLOAT
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// First run of digits in `text`.
pub fn first_int(text: &str) -> Option<u32> {
    FIRST_INT.find(text).and_then(|m| m.as_str().parse::<u32>().ok())
}

fn set_mass(record: &mut MetadataRecord, value: &str) {
    record.mass_grams = first_float(value).unwrap_or(0.0);
}

fn set_filament_type(record: &mut MetadataRecord, value: &str) {
    record.filament_type = value.replace(&['"', '\''][..], "").trim().to_string();
}

fn set_printer_model(record: &mut MetadataRecord, value: &str) {
    record.printer_model = value.trim().to_string();
}

fn set_total_layers(record: &mut MetadataRecord, value: &str) {
    record.total_layers = first_int(value).unwrap_or(0);
}

fn set_filament_length(record: &mut MetadataRecord, value: &str) {
    record.filament_length_m = first_float(value).unwrap_or(0.0) / 1000.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_closed_and_snake_case() {
        assert_eq!(
            LearnableField::all_names(),
            vec![
                "time",
                "mass",
                "filament_type",
                "printer_model",
                "total_layers",
                "filament_length"
            ]
        );
        assert_eq!(
            "filament_length".parse::<LearnableField>().unwrap(),
            LearnableField::FilamentLength
        );
        assert!("nozzle".parse::<LearnableField>().is_err());
    }

    #[test]
    fn test_numeric_setters_tolerate_units() {
        let mut record = MetadataRecord::default();
        LearnableField::Mass.setter().unwrap()(&mut record, "12.34 g");
        LearnableField::TotalLayers.setter().unwrap()(&mut record, "about 250 layers");
        LearnableField::FilamentLength.setter().unwrap()(&mut record, "4100.5mm");

        assert!((record.mass_grams - 12.34).abs() < f64::EPSILON);
        assert_eq!(record.total_layers, 250);
        assert!((record.filament_length_m - 4.1005).abs() < 1e-9);
    }

    #[test]
    fn test_non_numeric_capture_degrades_to_default() {
        let mut record = MetadataRecord::default();
        LearnableField::Mass.setter().unwrap()(&mut record, "n/a");
        assert_eq!(record.mass_grams, 0.0);
    }

    #[test]
    fn test_filament_type_strips_quotes() {
        let mut record = MetadataRecord::default();
        LearnableField::FilamentType.setter().unwrap()(&mut record, "\"PETG\" ");
        assert_eq!(record.filament_type, "PETG");
    }

    #[test]
    fn test_time_has_no_setter() {
        assert!(LearnableField::Time.setter().is_none());
    }
}
