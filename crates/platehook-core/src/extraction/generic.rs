//! Stage 1: generic fields from the pattern store.

use tracing::debug;

use super::{StageInput, StageResult};
use crate::patterns::first_capture;
use crate::types::MetadataRecord;

/// Apply every field's pattern through the setter table.
///
/// Time has no setter here; it is resolved by the derived-time stage.
pub(crate) fn apply(input: &StageInput<'_>, record: &mut MetadataRecord) -> StageResult {
    for (field, regex) in input.patterns {
        let Some(setter) = field.setter() else {
            continue;
        };
        if let Some(value) = first_capture(regex, input.content) {
            debug!("Generic match for {}: '{}'", field, value);
            setter(record, value);
        }
    }
    Ok(())
}
