//! platehook-client - HTTP client for the production backend.
//!
//! # Example
//!
//! ```ignore
//! use platehook_client::ProductionClient;
//! use platehook_core::{submit_aggregate, ProductionApi};
//!
//! let client = ProductionClient::from_env()?;
//! let products = client.list_products().await?;
//! let id = submit_aggregate(&client, &aggregate, products.first(), "Vase", client.client_version()).await?;
//! ```

mod client;

pub use client::ProductionClient;
pub use platehook_core::traits::{Product, ProductionApi, SubmissionId};
