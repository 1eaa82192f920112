//! Core data types.

mod field;
mod record;

pub use field::{first_float, first_int, FieldSetter, LearnableField};
pub use record::{MachineType, MetadataRecord, Thumbnail, DEFAULT_QUALITY_PROFILE, UNKNOWN};
