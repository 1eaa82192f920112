//! Extraction engine: turns one slicer output file into a [`MetadataRecord`].
//!
//! Content goes through a fixed sequence of stages, each writing into the
//! same record:
//!
//! 1. generic fields from the [`PatternStore`]
//! 2. vendor override block (`; ddreams_*`), overwriting stage 1
//! 3. derived fields: time, multicolor changes, thumbnail
//! 4. machine-type inference from the printer model
//!
//! A stage that fails is recorded in the [`ExtractionReport`] and the next
//! stage still runs, so one malformed block never costs the whole record.

mod candidates;
mod generic;
mod reader;
mod thumbnail;
mod time;
mod tools;
mod vendor;

pub use candidates::{CandidateScanner, Candidates, MAX_CANDIDATE_LINE_LEN, SCANNED_FIELDS};
pub use reader::read_lenient;
pub use thumbnail::extract_thumbnail;
pub use time::parse_time_minutes;
pub use tools::count_tool_changes;

use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ReadPolicy;
use crate::patterns::PatternStore;
use crate::types::{LearnableField, MachineType, MetadataRecord};

/// Extraction stage names, as reported in [`StageFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Read,
    Generic,
    Vendor,
    Time,
    Multicolor,
    Thumbnail,
    Inference,
}

/// Why a stage gave up.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("file could not be read: {0}")]
    Read(#[from] std::io::Error),

    #[error("unrecognized time value '{0}'")]
    UnparseableTime(String),

    #[error("malformed thumbnail header '{0}'")]
    ThumbnailHeader(String),

    #[error("thumbnail payload is not valid base64: {0}")]
    ThumbnailDecode(#[from] base64::DecodeError),
}

pub(crate) type StageResult = Result<(), StageError>;

/// What every stage reads from.
pub(crate) struct StageInput<'a> {
    pub content: &'a str,
    pub patterns: &'a [(LearnableField, Regex)],
}

type StageFn = fn(&StageInput<'_>, &mut MetadataRecord) -> StageResult;

fn stages() -> [(Stage, StageFn); 6] {
    [
        (Stage::Generic, generic::apply as StageFn),
        (Stage::Vendor, vendor::apply as StageFn),
        (Stage::Time, time::apply as StageFn),
        (Stage::Multicolor, tools::apply as StageFn),
        (Stage::Thumbnail, thumbnail::apply as StageFn),
        (Stage::Inference, infer_machine_type as StageFn),
    ]
}

/// A stage that failed during one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// Extracted record plus the failures reported on the side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    pub record: MetadataRecord,
    pub failures: Vec<StageFailure>,
}

impl ExtractionReport {
    /// Whether every stage succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Layered metadata extractor.
#[derive(Debug, Clone)]
pub struct ExtractionEngine {
    patterns: Arc<PatternStore>,
    read_policy: ReadPolicy,
    scanner: CandidateScanner,
}

impl ExtractionEngine {
    /// Create an engine reading rules from `patterns`.
    pub fn new(patterns: Arc<PatternStore>) -> Self {
        Self {
            patterns,
            read_policy: ReadPolicy::default(),
            scanner: CandidateScanner::new(),
        }
    }

    /// Replace the file read retry policy.
    pub fn with_read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    /// Pattern store this engine reads from.
    pub fn patterns(&self) -> &Arc<PatternStore> {
        &self.patterns
    }

    /// Extract metadata from the file at `path`.
    ///
    /// Never fails: unreadable files yield an all-defaults record.
    pub async fn parse(&self, path: impl AsRef<Path>) -> MetadataRecord {
        self.parse_with_report(path).await.record
    }

    /// Like [`parse`](Self::parse), keeping the stage failures.
    pub async fn parse_with_report(&self, path: impl AsRef<Path>) -> ExtractionReport {
        let path = path.as_ref();
        match read_lenient(path, &self.read_policy).await {
            Ok(content) => {
                if content.is_empty() {
                    warn!("{} is empty", path.display());
                }
                self.parse_content(&content)
            }
            Err(e) => {
                let error = StageError::from(e);
                warn!("Giving up on {}: {}", path.display(), error);
                ExtractionReport {
                    record: MetadataRecord::default(),
                    failures: vec![StageFailure {
                        stage: Stage::Read,
                        message: error.to_string(),
                    }],
                }
            }
        }
    }

    /// Run every stage over already-loaded content.
    pub fn parse_content(&self, content: &str) -> ExtractionReport {
        let patterns = self.patterns.snapshot();
        let input = StageInput {
            content,
            patterns: &patterns,
        };

        let mut report = ExtractionReport::default();
        for (stage, apply) in stages() {
            if let Err(e) = apply(&input, &mut report.record) {
                warn!("Extraction stage {} failed: {}", stage, e);
                report.failures.push(StageFailure {
                    stage,
                    message: e.to_string(),
                });
            }
        }

        debug!(
            "Extracted {:.2} g, {} min, {} layers, {} ({})",
            report.record.mass_grams,
            report.record.time_minutes,
            report.record.total_layers,
            report.record.filament_type,
            report.record.printer_model
        );
        report
    }

    /// Candidate lines per field for calibration. Unreadable files yield
    /// no candidates.
    pub async fn scan_candidates(&self, path: impl AsRef<Path>) -> Candidates {
        let path = path.as_ref();
        match read_lenient(path, &self.read_policy).await {
            Ok(content) => self.scanner.scan(&content),
            Err(e) => {
                warn!("Cannot scan {}: {}", path.display(), e);
                Candidates::empty()
            }
        }
    }
}

/// Stage 4: resin printers are recognised by name.
fn infer_machine_type(_input: &StageInput<'_>, record: &mut MetadataRecord) -> StageResult {
    let model = record.printer_model.to_lowercase();
    if model.contains("resin") || model.contains("sla") {
        record.machine_type = MachineType::Resin;
    }
    Ok(())
}
