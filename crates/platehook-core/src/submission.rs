//! Wire payload for the production submission endpoint.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PlatehookError, PlatehookResult};
use crate::session::AggregateRecord;
use crate::traits::{Product, ProductionApi, SubmissionId};
use crate::types::MachineType;

/// One job as the production backend expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub name: String,
    pub file_name: String,
    pub grams: u64,
    pub time: u64,
    pub machine_type: MachineType,
    pub filament_type: String,
    pub quality_profile: String,
    pub printer_model: String,
    pub nozzle_diameter: String,
    pub total_layers: u64,
    pub filament_length_meters: f64,
    pub multicolor_changes: u64,
    /// Backend dedup fingerprint inputs; sent only when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_timestamp: Option<u64>,
    pub script_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_product_id: Option<String>,
    #[serde(rename = "secret_token", skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}

impl SubmissionRequest {
    /// Build the payload for `aggregate`.
    ///
    /// `fileName` lists every plate file, comma separated.
    pub fn from_aggregate(
        aggregate: &AggregateRecord,
        product: Option<&Product>,
        name: impl Into<String>,
        client_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: aggregate.file_names.join(", "),
            grams: aggregate.mass_grams,
            time: aggregate.time_minutes,
            machine_type: aggregate.machine_type,
            filament_type: aggregate.filament_type.clone(),
            quality_profile: aggregate.quality_profile.clone(),
            printer_model: aggregate.printer_model.clone(),
            nozzle_diameter: aggregate.nozzle_diameter.clone(),
            total_layers: aggregate.total_layers,
            filament_length_meters: (aggregate.filament_length_m * 100.0).round() / 100.0,
            multicolor_changes: aggregate.multicolor_changes,
            file_size: aggregate.file_size,
            file_timestamp: aggregate.file_timestamp_ms,
            script_version: client_version.into(),
            linked_product_id: product.map(|p| p.id.clone()),
            secret_token: None,
        }
    }

    /// Attach the shared secret the backend checks.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.secret_token = Some(token.into());
        self
    }
}

/// Submit `aggregate` through `api`.
///
/// Empty sessions and blank names are rejected before anything is sent.
pub async fn submit_aggregate(
    api: &dyn ProductionApi,
    aggregate: &AggregateRecord,
    product: Option<&Product>,
    name: &str,
    client_version: &str,
) -> PlatehookResult<SubmissionId> {
    if aggregate.is_empty() {
        return Err(PlatehookError::empty_session());
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(PlatehookError::validation("Job name must not be empty"));
    }

    let request = SubmissionRequest::from_aggregate(aggregate, product, name, client_version);
    let id = api.submit(&request).await?;
    info!(
        "Submitted '{}' ({} plates, {} g) as {}",
        name, aggregate.plate_count, aggregate.mass_grams, id
    );
    Ok(id)
}
