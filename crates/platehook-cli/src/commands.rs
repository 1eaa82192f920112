//! One-shot commands.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use platehook_client::ProductionClient;
use platehook_core::config::HookConfig;
use platehook_core::{
    submit_aggregate, LearnableField, PatternStore, Product, ProductionApi, Session,
};
use serde_json::json;
use tracing::{info, warn};

use crate::{build_engine, print_json};

pub async fn parse(config: &HookConfig, file: &Path) -> Result<()> {
    let report = build_engine(config)?.parse_with_report(file).await;
    for failure in &report.failures {
        warn!("{} stage failed: {}", failure.stage, failure.message);
    }
    print_json(&report)
}

pub async fn scan(config: &HookConfig, file: &Path) -> Result<()> {
    let candidates = build_engine(config)?.scan_candidates(file).await;
    if candidates.is_empty() {
        warn!("No candidate lines found in {}", file.display());
    }
    print_json(&candidates)
}

pub fn learn(config: &HookConfig, field: LearnableField, line: &str) -> Result<()> {
    let store = PatternStore::load(config.patterns_path())?;
    let learned = store.learn(field, line)?;
    print_json(&json!({
        "field": learned.field,
        "pattern": learned.pattern,
        "preview": learned.preview,
    }))
}

pub fn reset_patterns(config: &HookConfig) -> Result<()> {
    PatternStore::load(config.patterns_path())?.reset()?;
    info!("Pattern overrides removed");
    Ok(())
}

pub async fn products(config: &HookConfig) -> Result<()> {
    let client = ProductionClient::new(&config.api)?;
    print_json(&client.list_products().await?)
}

pub async fn submit(
    config: &HookConfig,
    name: &str,
    product_id: Option<&str>,
    files: &[PathBuf],
) -> Result<()> {
    let client = ProductionClient::new(&config.api)?;
    let product = match product_id {
        Some(id) => Some(find_product(&client, id).await?),
        None => None,
    };

    let mut session = Session::new(build_engine(config)?);
    for file in files {
        session.add_plate(file).await;
    }
    if session.is_empty() {
        bail!("No files to submit");
    }

    let id = submit_aggregate(
        &client,
        session.aggregate(),
        product.as_ref(),
        name,
        client.client_version(),
    )
    .await?;

    print_json(&json!({
        "id": id,
        "aggregate": session.aggregate(),
    }))
}

async fn find_product(api: &dyn ProductionApi, id: &str) -> Result<Product> {
    api.list_products()
        .await?
        .into_iter()
        .find(|product| product.id == id)
        .ok_or_else(|| anyhow!("Unknown product id '{}'", id))
}
