//! Candidate lines for calibration.
//!
//! Read-only: the scanner proposes lines per field, the user picks one and
//! hands it to [`crate::patterns::PatternStore::learn`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::LearnableField;

/// Longer comment lines are thumbnail chunks or binary noise.
pub const MAX_CANDIDATE_LINE_LEN: usize = 200;

/// Fields the scanner proposes lines for.
pub const SCANNED_FIELDS: [LearnableField; 5] = [
    LearnableField::Time,
    LearnableField::Mass,
    LearnableField::PrinterModel,
    LearnableField::FilamentType,
    LearnableField::TotalLayers,
];

/// Candidate lines per field, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Candidates(BTreeMap<LearnableField, Vec<String>>);

impl Candidates {
    /// Every scanned field with no lines.
    pub fn empty() -> Self {
        Self(
            SCANNED_FIELDS
                .iter()
                .map(|field| (*field, Vec::new()))
                .collect(),
        )
    }

    /// Lines proposed for `field`.
    pub fn get(&self, field: LearnableField) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate fields and their lines.
    pub fn iter(&self) -> impl Iterator<Item = (LearnableField, &[String])> {
        self.0.iter().map(|(field, lines)| (*field, lines.as_slice()))
    }

    /// Whether no field has any candidate.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

impl Default for Candidates {
    fn default() -> Self {
        Self::empty()
    }
}

/// Keyword heuristic over comment lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateScanner;

impl CandidateScanner {
    pub fn new() -> Self {
        Self
    }

    /// Flag candidate lines for every scanned field.
    ///
    /// A line may be proposed for several fields. Duplicated lines are kept.
    pub fn scan(&self, content: &str) -> Candidates {
        let mut candidates = Candidates::empty();

        for line in content.lines() {
            let line = line.trim();
            if !line.starts_with(';') || line.chars().count() > MAX_CANDIDATE_LINE_LEN {
                continue;
            }
            if !(line.contains(':') || line.contains('=')) {
                continue;
            }

            let lower = line.to_lowercase();
            for field in SCANNED_FIELDS {
                if Self::matches(field, &lower) {
                    candidates
                        .0
                        .entry(field)
                        .or_default()
                        .push(line.to_string());
                }
            }
        }

        candidates
    }

    fn matches(field: LearnableField, lower: &str) -> bool {
        match field {
            LearnableField::Time => lower.contains("time"),
            LearnableField::Mass => lower.contains("gram") || lower.contains("weight"),
            LearnableField::PrinterModel => lower.contains("model") && lower.contains("printer"),
            LearnableField::FilamentType => lower.contains("filament") && lower.contains("type"),
            LearnableField::TotalLayers => lower.contains("layer") && lower.contains("count"),
            LearnableField::FilamentLength => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
; generated by PrusaSlicer 2.7.1
G28
; estimated printing time (normal mode) = 1h 20m 45s
; total filament weight : 31.07
; printer_model = MK4
; filament_type = PETG
; total layers count = 120
; estimated printing time (silent mode) = 1h 30m 2s
; printer_model = MK4
";

    #[test]
    fn test_lines_grouped_per_field_in_file_order() {
        let candidates = CandidateScanner::new().scan(SAMPLE);

        assert_eq!(
            candidates.get(LearnableField::Time),
            [
                "; estimated printing time (normal mode) = 1h 20m 45s",
                "; estimated printing time (silent mode) = 1h 30m 2s",
            ]
        );
        assert_eq!(candidates.get(LearnableField::Mass), ["; total filament weight : 31.07"]);
        assert_eq!(candidates.get(LearnableField::FilamentType), ["; filament_type = PETG"]);
        assert_eq!(candidates.get(LearnableField::TotalLayers), ["; total layers count = 120"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let candidates = CandidateScanner::new().scan(SAMPLE);
        assert_eq!(candidates.get(LearnableField::PrinterModel).len(), 2);
    }

    #[test]
    fn test_requires_comment_separator_and_length() {
        let long = format!("; print time = {}", "9".repeat(200));
        let content = format!("M117 time: 5\n; time is money\n{}\n", long);

        let candidates = CandidateScanner::new().scan(&content);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_every_scanned_field_present() {
        let candidates = CandidateScanner::new().scan("");
        assert_eq!(candidates.iter().count(), SCANNED_FIELDS.len());
        assert!(candidates.get(LearnableField::FilamentLength).is_empty());
    }
}
