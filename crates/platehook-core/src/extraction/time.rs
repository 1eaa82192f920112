//! Stage 3a: print time.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{StageError, StageInput, StageResult};
use crate::patterns::{compile, first_capture};
use crate::types::{LearnableField, MetadataRecord};

/// Whole-job estimate; preferred over the per-model time when both exist.
static TOTAL_ESTIMATED: Lazy<Regex> =
    Lazy::new(|| compile(r"; total estimated time:\s*([^\n\r;]*)").unwrap());

static COMPONENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*([dhms])").unwrap());

/// The whole value is a run of whole-number components.
static COMPONENTS_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\s*[dhms]\s*)+$").unwrap());

pub(crate) fn apply(input: &StageInput<'_>, record: &mut MetadataRecord) -> StageResult {
    let raw = first_capture(&TOTAL_ESTIMATED, input.content).or_else(|| {
        input
            .patterns
            .iter()
            .find(|(field, _)| *field == LearnableField::Time)
            .and_then(|(_, regex)| first_capture(regex, input.content))
    });

    let Some(raw) = raw else {
        return Ok(());
    };

    match parse_time_minutes(raw) {
        Some(minutes) => {
            record.time_minutes = minutes;
            Ok(())
        }
        None => Err(StageError::UnparseableTime(raw.to_string())),
    }
}

/// Convert a slicer time string into whole minutes.
///
/// Accepted forms:
/// - components: `1d 2h 3m 4s`, any subset, any spacing (`1h20m`)
/// - clock: `HH:MM:SS` or `MM:SS`
/// - bare seconds: `4845`
///
/// One minute is added when the seconds part exceeds 30.
pub fn parse_time_minutes(raw: &str) -> Option<u32> {
    let text = raw.trim().to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }

    let total = if COMPONENTS_ONLY.is_match(&text) {
        from_components(&text)?
    } else if text.contains(':') {
        from_clock(&text)?
    } else {
        from_seconds(&text)?
    };

    u32::try_from(total).ok()
}

fn from_components(text: &str) -> Option<u64> {
    let mut minutes = 0u64;
    let mut matched = false;
    for caps in COMPONENT.captures_iter(text) {
        let value: u64 = caps[1].parse().ok()?;
        matched = true;
        minutes = minutes.checked_add(match &caps[2] {
            "d" => value.checked_mul(1440)?,
            "h" => value.checked_mul(60)?,
            "m" => value,
            _ => round_seconds(value),
        })?;
    }
    matched.then_some(minutes)
}

fn from_clock(text: &str) -> Option<u64> {
    let parts = text
        .split(':')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [h, m, s] => h.checked_mul(60)?.checked_add(*m)?.checked_add(round_seconds(*s)),
        [m, s] => m.checked_add(round_seconds(*s)),
        _ => None,
    }
}

fn from_seconds(text: &str) -> Option<u64> {
    let seconds: f64 = text.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let whole = seconds.floor() as u64;
    let remainder = seconds - (whole - whole % 60) as f64;
    Some(whole / 60 + u64::from(remainder > 30.0))
}

/// Seconds only contribute the rounding minute.
fn round_seconds(seconds: u64) -> u64 {
    u64::from(seconds > 30)
}
