//! Pattern synthesis from a user-selected example line.

use crate::error::LearnError;
use crate::patterns::{compile, first_capture};

/// Longest value a learned pattern may capture from its example line.
pub const MAX_LEARNED_VALUE_LEN: usize = 100;

const PREVIEW_LEN: usize = 50;

/// A pattern synthesized and verified against its example line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedPattern {
    /// Generated pattern text.
    pub pattern: String,
    /// Value the pattern captures from the example line.
    pub preview: String,
}

/// Build a pattern from `line` and check it against that same line.
///
/// The text before the first `:` or `=` becomes a literal prefix with
/// flexible whitespace; the rest of the line is captured.
pub fn synthesize(line: &str) -> Result<SynthesizedPattern, LearnError> {
    let separator = line
        .find(|c: char| c == ':' || c == '=')
        .ok_or(LearnError::NoSeparator)?;

    let prefix = line[..separator]
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s*");
    let pattern = format!(r"{}\s*[:=]\s*([^\n\r]*)", prefix);

    let regex = compile(&pattern).map_err(|_| LearnError::SelfMatchFailed {
        pattern: pattern.clone(),
    })?;
    let value = match first_capture(&regex, line) {
        Some(value) => value.to_string(),
        None if regex.is_match(line) => String::new(),
        None => return Err(LearnError::SelfMatchFailed { pattern }),
    };

    let length = value.chars().count();
    if length > MAX_LEARNED_VALUE_LEN {
        return Err(LearnError::ValueTooLong {
            length,
            preview: value.chars().take(PREVIEW_LEN).collect(),
            pattern,
        });
    }

    Ok(SynthesizedPattern {
        pattern,
        preview: value,
    })
}
