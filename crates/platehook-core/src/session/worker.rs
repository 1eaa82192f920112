//! Session worker: runs a [`Session`] on its own task.
//!
//! Callers never touch the plate list directly. They send commands over a
//! channel and observe the aggregate through a `watch` receiver, so the
//! coordinator's accept loop can hand paths over without blocking on
//! extraction.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AggregateRecord, Plate, Session};
use crate::error::{PlatehookError, PlatehookResult};

enum Command {
    Add {
        path: PathBuf,
        reply: Option<oneshot::Sender<bool>>,
    },
    Remove {
        path: PathBuf,
        reply: oneshot::Sender<bool>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Reparse {
        reply: oneshot::Sender<()>,
    },
    Plates {
        reply: oneshot::Sender<Vec<Plate>>,
    },
}

/// Cloneable front end of a running session worker.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    aggregate: watch::Receiver<AggregateRecord>,
}

/// Move `session` onto a new task.
///
/// The worker stops once every [`SessionHandle`] has been dropped.
pub fn spawn_session_worker(session: Session) -> (SessionHandle, JoinHandle<()>) {
    let (commands, receiver) = mpsc::unbounded_channel();
    let (publisher, aggregate) = watch::channel(session.aggregate().clone());

    let task = tokio::spawn(run(session, receiver, publisher));
    (
        SessionHandle {
            commands,
            aggregate,
        },
        task,
    )
}

async fn run(
    mut session: Session,
    mut commands: mpsc::UnboundedReceiver<Command>,
    publisher: watch::Sender<AggregateRecord>,
) {
    info!("Session worker started");

    // Publish before replying so a caller sees its own change.
    while let Some(command) = commands.recv().await {
        match command {
            Command::Add { path, reply } => {
                let added = session.add_plate(&path).await;
                publish(&publisher, &session);
                if let Some(reply) = reply {
                    let _ = reply.send(added);
                }
            }
            Command::Remove { path, reply } => {
                let removed = session.remove_plate(&path);
                publish(&publisher, &session);
                let _ = reply.send(removed);
            }
            Command::Clear { reply } => {
                session.clear();
                publish(&publisher, &session);
                let _ = reply.send(());
            }
            Command::Reparse { reply } => {
                session.reparse().await;
                publish(&publisher, &session);
                let _ = reply.send(());
            }
            Command::Plates { reply } => {
                let _ = reply.send(session.plates().to_vec());
            }
        }
    }

    debug!("Session worker stopped");
}

impl SessionHandle {
    /// Queue `path` for extraction without waiting.
    ///
    /// Returns `false` if the worker has stopped.
    pub fn submit_path(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        let sent = self.commands.send(Command::Add {
            path: path.clone(),
            reply: None,
        });
        if sent.is_err() {
            warn!("Session worker gone, dropping {}", path.display());
        }
        sent.is_ok()
    }

    /// Extract and add `path`; `false` if it was already a plate.
    pub async fn add_plate(&self, path: impl Into<PathBuf>) -> PlatehookResult<bool> {
        let path = path.into();
        self.request(|reply| Command::Add {
            path,
            reply: Some(reply),
        })
        .await
    }

    /// Remove `path`; `false` if it was not a plate.
    pub async fn remove_plate(&self, path: impl Into<PathBuf>) -> PlatehookResult<bool> {
        let path = path.into();
        self.request(|reply| Command::Remove { path, reply }).await
    }

    pub async fn clear(&self) -> PlatehookResult<()> {
        self.request(|reply| Command::Clear { reply }).await
    }

    /// Re-extract every plate with the current patterns.
    pub async fn reparse(&self) -> PlatehookResult<()> {
        self.request(|reply| Command::Reparse { reply }).await
    }

    /// Current plates in order.
    pub async fn plates(&self) -> PlatehookResult<Vec<Plate>> {
        self.request(|reply| Command::Plates { reply }).await
    }

    /// Latest published aggregate.
    pub fn aggregate(&self) -> AggregateRecord {
        self.aggregate.borrow().clone()
    }

    /// Receiver notified whenever the aggregate changes.
    pub fn subscribe(&self) -> watch::Receiver<AggregateRecord> {
        self.aggregate.clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> PlatehookResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| worker_stopped())?;
        response.await.map_err(|_| worker_stopped())
    }
}

fn publish(publisher: &watch::Sender<AggregateRecord>, session: &Session) {
    publisher.send_if_modified(|current| {
        if *current == *session.aggregate() {
            return false;
        }
        *current = session.aggregate().clone();
        true
    });
}

fn worker_stopped() -> PlatehookError {
    PlatehookError::Internal("Session worker stopped".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionEngine;
    use crate::patterns::PatternStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn handle() -> (SessionHandle, JoinHandle<()>) {
        let engine = ExtractionEngine::new(Arc::new(PatternStore::in_memory()));
        spawn_session_worker(Session::new(engine))
    }

    fn write_plate(dir: &std::path::Path, name: &str, grams: f64) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("; filament used [g] = {}\n", grams)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_submitted_paths_are_processed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _task) = handle();
        let mut updates = session.subscribe();

        assert!(session.submit_path(write_plate(dir.path(), "a.gcode", 1.0)));
        assert!(session.submit_path(write_plate(dir.path(), "b.gcode", 2.0)));

        let aggregate = tokio::time::timeout(
            Duration::from_secs(5),
            updates.wait_for(|aggregate| aggregate.plate_count == 2),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();

        assert_eq!(aggregate.mass_grams, 3);
        assert_eq!(aggregate.file_names, ["a.gcode", "b.gcode"]);
    }

    #[tokio::test]
    async fn test_request_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _task) = handle();
        let path = write_plate(dir.path(), "a.gcode", 4.2);

        assert!(session.add_plate(&path).await.unwrap());
        assert!(!session.add_plate(&path).await.unwrap());
        assert_eq!(session.aggregate().mass_grams, 5);
        assert_eq!(session.plates().await.unwrap().len(), 1);

        assert!(session.remove_plate(&path).await.unwrap());
        assert!(session.aggregate().is_empty());

        session.add_plate(&path).await.unwrap();
        session.clear().await.unwrap();
        assert_eq!(session.aggregate(), AggregateRecord::default());
    }

    #[tokio::test]
    async fn test_worker_stops_when_handles_dropped() {
        let (session, task) = handle();
        drop(session);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
