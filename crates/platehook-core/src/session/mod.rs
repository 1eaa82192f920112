//! Aggregation session: the ordered plate list of one print job.
//!
//! Every mutation recomputes the [`AggregateRecord`] from the full plate
//! list. Nothing is patched incrementally.

mod aggregate;
mod worker;

pub use aggregate::AggregateRecord;
pub use worker::{spawn_session_worker, SessionHandle};

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::extraction::ExtractionEngine;
use crate::types::MetadataRecord;

/// Size and modification time of a plate file when it was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    pub modified_ms: u64,
}

impl FileStamp {
    /// Stamp of the file at `path`, if its metadata is readable.
    pub async fn read(path: &Path) -> Option<Self> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let modified = metadata.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
        Some(Self {
            size: metadata.len(),
            modified_ms: u64::try_from(modified.as_millis()).ok()?,
        })
    }
}

/// One parsed file within a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plate {
    pub path: PathBuf,
    pub record: MetadataRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamp: Option<FileStamp>,
}

impl Plate {
    pub fn new(path: impl Into<PathBuf>, record: MetadataRecord) -> Self {
        Self {
            path: path.into(),
            record,
            stamp: None,
        }
    }

    pub fn with_stamp(mut self, stamp: Option<FileStamp>) -> Self {
        self.stamp = stamp;
        self
    }

    /// Final path component, or the whole path if there is none.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or(self.path.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

/// Plates of the current job and their aggregate.
#[derive(Debug)]
pub struct Session {
    engine: ExtractionEngine,
    plates: Vec<Plate>,
    aggregate: AggregateRecord,
}

impl Session {
    pub fn new(engine: ExtractionEngine) -> Self {
        Self {
            engine,
            plates: Vec::new(),
            aggregate: AggregateRecord::default(),
        }
    }

    /// Parse `path` and append it as a plate.
    ///
    /// Returns `false` without parsing when the path is already a plate.
    pub async fn add_plate(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.contains(path) {
            debug!("{} is already in the session", path.display());
            return false;
        }
        let record = self.engine.parse(path).await;
        let stamp = FileStamp::read(path).await;
        self.push(Plate::new(path, record).with_stamp(stamp))
    }

    /// Append an already extracted record.
    pub fn add_record(&mut self, path: impl Into<PathBuf>, record: MetadataRecord) -> bool {
        self.push(Plate::new(path, record))
    }

    fn push(&mut self, plate: Plate) -> bool {
        if self.contains(&plate.path) {
            return false;
        }
        info!("Adding plate {}", plate.path.display());
        self.plates.push(plate);
        self.recompute();
        true
    }

    /// Drop the plate for `path`, if present.
    pub fn remove_plate(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let before = self.plates.len();
        self.plates.retain(|plate| plate.path != path);
        if self.plates.len() == before {
            return false;
        }
        info!("Removed plate {}", path.display());
        self.recompute();
        true
    }

    /// Drop every plate.
    pub fn clear(&mut self) {
        self.plates.clear();
        self.recompute();
    }

    /// Re-extract every plate with the current patterns, keeping plate order.
    pub async fn reparse(&mut self) {
        let mut plates = Vec::with_capacity(self.plates.len());
        for plate in &self.plates {
            let record = self.engine.parse(&plate.path).await;
            let stamp = FileStamp::read(&plate.path).await;
            plates.push(Plate::new(plate.path.clone(), record).with_stamp(stamp));
        }
        self.plates = plates;
        self.recompute();
    }

    /// Current aggregate.
    pub fn aggregate(&self) -> &AggregateRecord {
        &self.aggregate
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.plates.iter().any(|plate| plate.path == path)
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    fn recompute(&mut self) {
        self.aggregate = AggregateRecord::from_plates(&self.plates);
        debug!(
            "Aggregate: {} plates, {} g, {} min",
            self.aggregate.plate_count, self.aggregate.mass_grams, self.aggregate.time_minutes
        );
    }
}
