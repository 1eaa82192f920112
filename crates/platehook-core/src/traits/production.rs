//! Remote production API trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::error::PlatehookResult;
use crate::submission::SubmissionRequest;

/// Catalog product a submission can be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
}

/// Opaque identifier returned for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Production backend that receives finished jobs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProductionApi: Send + Sync {
    /// Products a job can be linked to.
    async fn list_products(&self) -> PlatehookResult<Vec<Product>>;

    /// Submit one aggregated job.
    async fn submit(&self, request: &SubmissionRequest) -> PlatehookResult<SubmissionId>;
}
