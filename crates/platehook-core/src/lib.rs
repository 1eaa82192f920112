//! platehook-core - Core library for platehook.
//!
//! This crate extracts print metadata from slicer output, keeps the
//! user-taught extraction patterns, and aggregates several plates into one
//! production job.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use platehook_core::{ExtractionEngine, PatternStore, Session};
//!
//! let patterns = Arc::new(PatternStore::load("patterns.json")?);
//! let mut session = Session::new(ExtractionEngine::new(patterns));
//!
//! session.add_plate("plate_1.gcode").await;
//! session.add_plate("plate_2.gcode").await;
//! println!("{} g", session.aggregate().mass_grams);
//! ```

pub mod config;
pub mod error;
pub mod extraction;
pub mod patterns;
pub mod session;
pub mod submission;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{ApiSettings, CoordinatorSettings, HookConfig, ReadPolicy};
pub use error::{ErrorCode, LearnError, PlatehookError, PlatehookResult};
pub use extraction::{
    CandidateScanner, Candidates, ExtractionEngine, ExtractionReport, Stage, StageFailure,
};
pub use patterns::{LearnedPattern, PatternStore};
pub use session::{
    spawn_session_worker, AggregateRecord, FileStamp, Plate, Session, SessionHandle,
};
pub use submission::{submit_aggregate, SubmissionRequest};
pub use traits::{Product, ProductionApi, SubmissionId};
pub use types::{LearnableField, MachineType, MetadataRecord, Thumbnail};
