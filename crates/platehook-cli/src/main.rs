//! platehook - slicer post-processing hook.
//!
//! Configure the slicer to run `platehook <output file>` after export. The
//! first invocation owns the session; later ones forward their file to it.

mod cli;
mod commands;
mod open;

use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use platehook_core::config::HookConfig;
use platehook_core::{ExtractionEngine, PatternStore};
use serde::Serialize;
use tokio::signal;
use tracing::{error, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub(crate) fn build_engine(config: &HookConfig) -> Result<ExtractionEngine> {
    let patterns = Arc::new(PatternStore::load(config.patterns_path())?);
    Ok(ExtractionEngine::new(patterns).with_read_policy(config.read.clone()))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Logs go to stderr; stdout carries JSON only.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
                .add_directive(format!("platehook={}", level).parse().unwrap())
                .add_directive(format!("platehook_core={}", level).parse().unwrap())
                .add_directive(format!("platehook_ipc={}", level).parse().unwrap()),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<HookConfig> {
    let config = match &cli.config {
        Some(path) => HookConfig::from_file(path)?.with_env_overrides(),
        None => HookConfig::from_env(),
    };
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let Some(command) = cli.into_command() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Open { files } => open::run(&config, files).await,
        Command::Parse { file } => commands::parse(&config, &file).await,
        Command::Scan { file } => commands::scan(&config, &file).await,
        Command::Learn { field, line } => commands::learn(&config, field, &line),
        Command::ResetPatterns => commands::reset_patterns(&config),
        Command::Products => commands::products(&config).await,
        Command::Submit {
            name,
            product,
            files,
        } => commands::submit(&config, &name, product.as_deref(), &files).await,
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
