//! `open`: join the running session or become its owner.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use platehook_core::config::{CoordinatorSettings, HookConfig};
use platehook_core::{
    spawn_session_worker, AggregateRecord, ExtractionEngine, Session, SessionHandle,
};
use platehook_ipc::{CoordinatorConfig, InstanceCoordinator};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{build_engine, print_json, shutdown_signal};

fn coordinator_config(settings: &CoordinatorSettings) -> CoordinatorConfig {
    CoordinatorConfig::new(settings.port)
        .with_read_timeout(Duration::from_millis(settings.read_timeout_ms))
        .with_connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
        .with_max_message_bytes(settings.max_message_bytes)
}

/// The owner runs with a different working directory.
fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub async fn run(config: &HookConfig, files: Vec<PathBuf>) -> Result<()> {
    let mut files: Vec<PathBuf> = files.iter().map(|f| absolute(f)).collect();
    // Ready before claiming the port: the owner must start listening right away.
    let engine = build_engine(config)?;
    let coordinator = InstanceCoordinator::new(coordinator_config(&config.coordinator));

    if coordinator.try_acquire_ownership() {
        return run_owner(engine, coordinator, files).await;
    }

    let mut forwarded = 0;
    for file in &files {
        if !coordinator.send_to_owner(&file.to_string_lossy()).await {
            break;
        }
        forwarded += 1;
    }
    if forwarded == files.len() {
        info!("Forwarded {} file(s) to the running session", forwarded);
        return Ok(());
    }

    warn!("Running session unreachable, continuing standalone");
    run_standalone(engine, files.split_off(forwarded)).await
}

async fn run_owner(
    engine: ExtractionEngine,
    coordinator: InstanceCoordinator,
    files: Vec<PathBuf>,
) -> Result<()> {
    let (session, worker) = start_owner(engine, &coordinator)?;

    for file in files {
        session.add_plate(file).await?;
    }

    let mut updates = session.subscribe();
    print_aggregate(&updates.borrow_and_update())?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let aggregate = updates.borrow_and_update().clone();
                print_aggregate(&aggregate)?;
            }
        }
    }

    coordinator.stop().await;
    drop(updates);
    drop(session);
    worker.await?;
    info!("Session closed");
    Ok(())
}

/// Start the session worker and route forwarded paths into it.
fn start_owner(
    engine: ExtractionEngine,
    coordinator: &InstanceCoordinator,
) -> Result<(SessionHandle, JoinHandle<()>)> {
    let (session, worker) = spawn_session_worker(Session::new(engine));

    let forwarded = session.clone();
    coordinator.start_accept_loop(move |path| {
        info!("Received {}", path);
        forwarded.submit_path(path);
    })?;
    Ok((session, worker))
}

async fn run_standalone(engine: ExtractionEngine, files: Vec<PathBuf>) -> Result<()> {
    let mut session = Session::new(engine);
    for file in files {
        session.add_plate(file).await;
    }
    print_aggregate(session.aggregate())
}

fn print_aggregate(aggregate: &AggregateRecord) -> Result<()> {
    info!(
        "Session: {} plate(s), {} g, {} min, {}",
        aggregate.plate_count, aggregate.mass_grams, aggregate.time_minutes, aggregate.filament_type
    );
    print_json(aggregate)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use platehook_core::{PatternStore, ReadPolicy};

    use super::*;

    fn engine() -> ExtractionEngine {
        ExtractionEngine::new(Arc::new(PatternStore::in_memory()))
            .with_read_policy(ReadPolicy::new(1, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_owner_accepts_forwarded_paths_once_started() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let engine = engine();
        let owner = InstanceCoordinator::new(CoordinatorConfig::new(port));
        assert!(owner.try_acquire_ownership());

        let (session, worker) = start_owner(engine, &owner).unwrap();
        let mut updates = session.subscribe();

        let sender = InstanceCoordinator::new(CoordinatorConfig::new(port));
        assert!(sender.send_to_owner("/tmp/forwarded.gcode").await);

        tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updates.borrow().file_names, ["forwarded.gcode"]);

        owner.stop().await;
        drop(updates);
        drop(session);
        worker.await.unwrap();
    }
}
