//! Production API client.

use std::time::Duration;

use async_trait::async_trait;
use platehook_core::config::{ApiSettings, HookConfig};
use platehook_core::error::{PlatehookError, PlatehookResult};
use platehook_core::submission::SubmissionRequest;
use platehook_core::traits::{Product, ProductionApi, SubmissionId};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Client for the production backend.
#[derive(Debug, Clone)]
pub struct ProductionClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    client_version: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
}

impl ProductionClient {
    /// Create a client from API settings.
    pub fn new(settings: &ApiSettings) -> PlatehookResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PlatehookError::api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            client_version: settings.client_version.clone(),
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> PlatehookResult<Self> {
        Self::new(&HookConfig::from_env().api)
    }

    /// Version reported as `scriptVersion`.
    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl ProductionApi for ProductionClient {
    async fn list_products(&self) -> PlatehookResult<Vec<Product>> {
        let mut request = self.client.get(self.url("products-list"));
        if let Some(ref token) = self.token {
            request = request.query(&[("secret_token", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PlatehookError::api(format!("Failed to list products: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatehookError::api_rejected(status.as_u16(), &body));
        }

        let products: Vec<Product> = response
            .json()
            .await
            .map_err(|e| PlatehookError::api_invalid_response(format!("Failed to parse products: {}", e)))?;

        debug!("Fetched {} products", products.len());
        Ok(products)
    }

    async fn submit(&self, request: &SubmissionRequest) -> PlatehookResult<SubmissionId> {
        let mut body = request.clone();
        if body.secret_token.is_none() {
            body.secret_token = self.token.clone();
        }

        let response = self
            .client
            .post(self.url("slicer-hook"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatehookError::api(format!("Failed to submit job: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(PlatehookError::api_rejected(status.as_u16(), &error));
        }

        let result: SubmitResponse = response
            .json()
            .await
            .map_err(|e| PlatehookError::api_invalid_response(format!("Failed to parse response: {}", e)))?;

        match result.id {
            Some(id) if result.success => Ok(SubmissionId(id)),
            _ => Err(PlatehookError::api_invalid_response(
                "Submission response has no id",
            )),
        }
    }
}
