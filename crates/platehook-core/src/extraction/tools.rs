//! Stage 3b: multicolor tool changes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{StageInput, StageResult};
use crate::types::MetadataRecord;

/// Virtual tool selected by some firmwares at the end of a print.
const END_OF_PRINT_TOOL: u64 = 255;

static TOOL_SELECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^T(\d+)\b").unwrap());

pub(crate) fn apply(input: &StageInput<'_>, record: &mut MetadataRecord) -> StageResult {
    record.multicolor_changes = count_tool_changes(input.content);
    Ok(())
}

/// Transitions between selected tools: N selections are N - 1 changes.
pub fn count_tool_changes(content: &str) -> u32 {
    let selections = TOOL_SELECT
        .captures_iter(content)
        .filter(|caps| caps[1].parse::<u64>().ok() != Some(END_OF_PRINT_TOOL))
        .count();
    u32::try_from(selections.saturating_sub(1)).unwrap_or(u32::MAX)
}
