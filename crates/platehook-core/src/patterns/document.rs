//! Persisted pattern override document.
//!
//! A flat JSON object of field key to pattern string, always read and
//! written as a whole. Updates are read-modify-write so keys the caller does
//! not touch (including keys this version does not know) survive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PlatehookError, PlatehookResult};

/// Raw document contents, keyed by field name.
pub type DocumentEntries = BTreeMap<String, Value>;

/// Handle to the override document on disk.
#[derive(Debug, Clone)]
pub struct PatternDocument {
    path: PathBuf,
}

impl PatternDocument {
    /// Create a handle for the document at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document.
    ///
    /// A missing document reads as empty. A document that is not a JSON
    /// object is treated as empty with a warning, so one bad write cannot
    /// lock the user out of calibration.
    pub fn read(&self) -> PlatehookResult<DocumentEntries> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No pattern overrides at {}", self.path.display());
                return Ok(DocumentEntries::new());
            }
            Err(e) => {
                return Err(PlatehookError::pattern_store(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(DocumentEntries::new());
        }

        match serde_json::from_str::<DocumentEntries>(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    "Pattern overrides at {} are not a JSON object, ignoring: {}",
                    self.path.display(),
                    e
                );
                Ok(DocumentEntries::new())
            }
        }
    }

    /// Replace the whole document.
    ///
    /// Writes a sibling temporary file and renames it over the target.
    pub fn write(&self, entries: &DocumentEntries) -> PlatehookResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PlatehookError::pattern_store(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            PlatehookError::pattern_store(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            PlatehookError::pattern_store(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(
            "Wrote {} pattern overrides to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Set one key, preserving everything else currently persisted.
    pub fn upsert(&self, key: &str, pattern: &str) -> PlatehookResult<()> {
        let mut entries = self.read()?;
        entries.insert(key.to_string(), Value::String(pattern.to_string()));
        self.write(&entries)
    }

    /// Delete the document. Missing is fine.
    pub fn remove(&self) -> PlatehookResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PlatehookError::pattern_store(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
