//! Stage 3c: embedded preview image.
//!
//! ```text
//! ; thumbnail begin 16x16 1024
//! ; iVBORw0KGgoAAAANSUhEUgAAABAAAAAQ...
//! ; ...
//! ; thumbnail end
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{StageError, StageInput, StageResult};
use crate::types::{MetadataRecord, Thumbnail};

static THUMBNAIL_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"; thumbnail begin (\d+)x(\d+) (\d+)\r?\n((?s:.)*?); thumbnail end").unwrap()
});

pub(crate) fn apply(input: &StageInput<'_>, record: &mut MetadataRecord) -> StageResult {
    record.thumbnail = extract_thumbnail(input.content)?;
    Ok(())
}

/// Decode the first thumbnail block, if any.
pub fn extract_thumbnail(content: &str) -> Result<Option<Thumbnail>, StageError> {
    let Some(caps) = THUMBNAIL_BLOCK.captures(content) else {
        return Ok(None);
    };

    let bad_header = || StageError::ThumbnailHeader(caps[0].lines().next().unwrap_or("").to_string());
    let width: u32 = caps[1].parse().map_err(|_| bad_header())?;
    let height: u32 = caps[2].parse().map_err(|_| bad_header())?;
    let declared_len: usize = caps[3].parse().map_err(|_| bad_header())?;

    let payload: String = caps[4]
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix(';').unwrap_or(line).trim()
        })
        .collect();

    let bytes = STANDARD.decode(payload.as_bytes())?;
    debug!(
        "Decoded {}x{} thumbnail ({} bytes, {} declared)",
        width,
        height,
        bytes.len(),
        declared_len
    );

    Ok(Some(Thumbnail {
        width,
        height,
        declared_len,
        bytes,
    }))
}
