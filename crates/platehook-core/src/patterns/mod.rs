//! Pattern store: named extraction rules with user overrides.
//!
//! Built-in defaults are constants. Overrides are merged on top at load
//! time, shadow the default for the same field, and are only changed by
//! [`PatternStore::learn`] and [`PatternStore::reset`]. A store created with
//! [`PatternStore::load`] persists every successful learn immediately.

mod defaults;
mod document;
mod learn;

pub use defaults::default_pattern;
pub use document::{DocumentEntries, PatternDocument};
pub use learn::{synthesize, SynthesizedPattern, MAX_LEARNED_VALUE_LEN};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::error::{LearnError, PlatehookError, PlatehookResult};
use crate::types::LearnableField;

/// Compile a pattern the way the extraction engine applies it
/// (case-insensitive).
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// First non-empty capture group of the first match, trimmed.
pub fn first_capture<'a>(regex: &Regex, content: &'a str) -> Option<&'a str> {
    let captures = regex.captures(content)?;
    captures
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str().trim())
        .find(|value| !value.is_empty())
}

/// Outcome of a successful learn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnedPattern {
    /// Field the pattern now serves.
    pub field: LearnableField,
    /// Generated pattern text.
    pub pattern: String,
    /// Value extracted from the example line.
    pub preview: String,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: compile(source)?,
        })
    }
}

/// Validate one persisted `key -> pattern` entry.
fn parse_override(key: &str, source: &str) -> PlatehookResult<(LearnableField, CompiledPattern)> {
    let field = key
        .parse::<LearnableField>()
        .map_err(|_| PlatehookError::UnknownField(key.to_string()))?;
    let compiled = CompiledPattern::new(source).map_err(|e| PlatehookError::InvalidPattern {
        field: key.to_string(),
        message: e.to_string(),
    })?;
    Ok((field, compiled))
}

static DEFAULTS: Lazy<HashMap<LearnableField, CompiledPattern>> = Lazy::new(|| {
    LearnableField::iter()
        .map(|field| (field, CompiledPattern::new(default_pattern(field)).unwrap()))
        .collect()
});

/// Extraction rules for every learnable field.
#[derive(Debug)]
pub struct PatternStore {
    overrides: RwLock<HashMap<LearnableField, CompiledPattern>>,
    document: Option<PatternDocument>,
    persist_lock: Mutex<()>,
}

impl PatternStore {
    /// Store with built-in defaults and no persistence.
    pub fn in_memory() -> Self {
        Self {
            overrides: RwLock::new(HashMap::new()),
            document: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Store backed by the override document at `path`.
    ///
    /// Persisted overrides are merged on top of the defaults. Unknown keys,
    /// non-string values and patterns that fail to compile are skipped with
    /// a warning; the default stays in effect for that field.
    pub fn load(path: impl AsRef<Path>) -> PlatehookResult<Self> {
        let document = PatternDocument::new(path.as_ref());
        let entries = document.read()?;

        let mut overrides = HashMap::new();
        for (key, value) in &entries {
            let Some(source) = value.as_str() else {
                warn!("Ignoring non-string pattern override for '{}'", key);
                continue;
            };
            match parse_override(key, source) {
                Ok((field, compiled)) => {
                    overrides.insert(field, compiled);
                }
                Err(e) => warn!("Ignoring pattern override: {}", e),
            }
        }

        info!(
            "Loaded {} pattern overrides from {}",
            overrides.len(),
            document.path().display()
        );

        Ok(Self {
            overrides: RwLock::new(overrides),
            document: Some(document),
            persist_lock: Mutex::new(()),
        })
    }

    /// Pattern text currently in effect for `field`.
    pub fn get(&self, field: LearnableField) -> String {
        self.effective(field).source
    }

    /// Compiled pattern currently in effect for `field`.
    pub fn regex(&self, field: LearnableField) -> Regex {
        self.effective(field).regex
    }

    /// Built-in pattern text for `field`, ignoring overrides.
    pub fn default_for(&self, field: LearnableField) -> &str {
        default_pattern(field)
    }

    /// Whether a user override shadows the default for `field`.
    pub fn is_overridden(&self, field: LearnableField) -> bool {
        self.read_overrides().contains_key(&field)
    }

    /// Current overrides as pattern text.
    pub fn overrides(&self) -> BTreeMap<LearnableField, String> {
        self.read_overrides()
            .iter()
            .map(|(field, compiled)| (*field, compiled.source.clone()))
            .collect()
    }

    /// Compiled patterns for every field, in field order.
    pub fn snapshot(&self) -> Vec<(LearnableField, Regex)> {
        let overrides = self.read_overrides();
        LearnableField::iter()
            .map(|field| {
                let compiled = overrides.get(&field).unwrap_or(&DEFAULTS[&field]);
                (field, compiled.regex.clone())
            })
            .collect()
    }

    /// Synthesize a pattern for `field` from an example line and adopt it.
    ///
    /// Nothing changes, in memory or on disk, unless the pattern matches
    /// its own line and the captured value is plausible. On success the
    /// override is written to the persisted document before it takes effect.
    pub fn learn(&self, field: LearnableField, line: &str) -> Result<LearnedPattern, LearnError> {
        let synthesized = synthesize(line)?;
        let compiled = CompiledPattern::new(&synthesized.pattern).map_err(|_| {
            LearnError::SelfMatchFailed {
                pattern: synthesized.pattern.clone(),
            }
        })?;

        // Serializes the read-modify-write of the document and the swap in memory.
        let _guard = self
            .persist_lock
            .lock()
            .map_err(|e| LearnError::Persist {
                pattern: synthesized.pattern.clone(),
                source: PlatehookError::lock_poisoned(format!("Failed to acquire lock: {}", e)),
            })?;

        if let Some(document) = &self.document {
            document
                .upsert(field.key(), &synthesized.pattern)
                .map_err(|source| LearnError::Persist {
                    pattern: synthesized.pattern.clone(),
                    source,
                })?;
        }

        self.overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field, compiled);

        info!(
            "Learned pattern for {}: {} (preview '{}')",
            field, synthesized.pattern, synthesized.preview
        );

        Ok(LearnedPattern {
            field,
            pattern: synthesized.pattern,
            preview: synthesized.preview,
        })
    }

    /// Drop every override so the built-in defaults apply again.
    ///
    /// The persisted document is removed as well, so a freshly loaded store
    /// also sees defaults only.
    pub fn reset(&self) -> PlatehookResult<()> {
        let _guard = self
            .persist_lock
            .lock()
            .map_err(|e| PlatehookError::lock_poisoned(format!("Failed to acquire lock: {}", e)))?;

        if let Some(document) = &self.document {
            document.remove()?;
        }
        self.overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        debug!("Pattern overrides reset to defaults");
        Ok(())
    }

    fn effective(&self, field: LearnableField) -> CompiledPattern {
        self.read_overrides()
            .get(&field)
            .unwrap_or(&DEFAULTS[&field])
            .clone()
    }

    fn read_overrides(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<LearnableField, CompiledPattern>> {
        self.overrides.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
