//! Loopback instance coordinator.
//!
//! A fixed loopback TCP port doubles as a cross-process mutex and a
//! message channel. The first process to bind it owns the session; later
//! processes connect, write one file path and disconnect.
//!
//! The port is bound on acquisition but only listened on once the accept
//! loop starts, so a send that races ahead of the loop is refused instead
//! of sitting in the backlog.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CoordinatorError, CoordinatorResult};

/// Coordinator settings.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Fixed loopback port shared by every instance.
    pub port: u16,
    /// How long the owner waits for a sender to finish writing.
    pub read_timeout: Duration,
    /// How long a sender waits to connect.
    pub connect_timeout: Duration,
    /// Largest accepted message in bytes.
    pub max_message_bytes: usize,
}

impl CoordinatorConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            read_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            max_message_bytes: 64 * 1024,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max.max(1);
        self
    }

    fn addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.port))
    }
}

enum State {
    Idle,
    Bound(TcpSocket),
    Listening {
        shutdown: watch::Sender<bool>,
        task: JoinHandle<()>,
    },
    Stopped,
}

/// Single-owner election plus one-message-per-connection delivery.
pub struct InstanceCoordinator {
    config: CoordinatorConfig,
    state: Mutex<State>,
}

impl std::fmt::Debug for InstanceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCoordinator")
            .field("port", &self.config.port)
            .field("owner", &self.is_owner())
            .finish()
    }
}

impl InstanceCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::Idle),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Try to become the owner. `false` means another process already is.
    pub fn try_acquire_ownership(&self) -> bool {
        match self.acquire() {
            Ok(()) => true,
            Err(e) => {
                debug!("Not the owner: {}", e);
                false
            }
        }
    }

    /// Bind the port exclusively.
    ///
    /// Succeeds again without rebinding if this coordinator already owns it.
    pub fn acquire(&self) -> CoordinatorResult<()> {
        let mut state = self.lock_state()?;
        match *state {
            State::Bound(_) | State::Listening { .. } => return Ok(()),
            State::Idle | State::Stopped => {}
        }

        let port = self.config.port;
        let bind = || -> std::io::Result<TcpSocket> {
            let socket = TcpSocket::new_v4()?;
            socket.set_reuseaddr(false)?;
            socket.bind(self.config.addr())?;
            Ok(socket)
        };
        let socket = bind().map_err(|source| CoordinatorError::Bind { port, source })?;

        info!("Acquired coordination port {}", port);
        *state = State::Bound(socket);
        Ok(())
    }

    /// Whether this coordinator currently holds the port.
    pub fn is_owner(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(*state, State::Bound(_) | State::Listening { .. }))
            .unwrap_or(false)
    }

    /// Start accepting forwarded messages; owner only.
    ///
    /// Each connection carries one message. Messages are handed to
    /// `on_message` in arrival order on the accept task, so the callback
    /// should only enqueue work.
    pub fn start_accept_loop<F>(&self, on_message: F) -> CoordinatorResult<()>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let mut state = self.lock_state()?;
        let socket = match std::mem::replace(&mut *state, State::Idle) {
            State::Bound(socket) => socket,
            other @ State::Listening { .. } => {
                *state = other;
                return Err(CoordinatorError::AlreadyRunning);
            }
            other => {
                *state = other;
                return Err(CoordinatorError::NotOwner);
            }
        };

        let listener = socket.listen(128)?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(
            listener,
            self.config.clone(),
            Arc::new(on_message),
            shutdown_rx,
        ));

        info!("Accepting forwarded paths on port {}", self.config.port);
        *state = State::Listening { shutdown, task };
        Ok(())
    }

    /// Forward `message` to the owner. `false` on any failure.
    pub async fn send_to_owner(&self, message: &str) -> bool {
        match self.send(message).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Forwarding to owner failed: {}", e);
                false
            }
        }
    }

    /// Forward `message` to the owner.
    pub async fn send(&self, message: &str) -> CoordinatorResult<()> {
        validate(message, self.config.max_message_bytes)?;

        let timeout = self.config.connect_timeout;
        let mut stream = tokio::time::timeout(timeout, TcpStream::connect(self.config.addr()))
            .await
            .map_err(|_| CoordinatorError::Timeout(timeout))??;

        // With nobody bound, a loopback connect can pick the port itself.
        if stream.local_addr()? == stream.peer_addr()? {
            return Err(CoordinatorError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )));
        }

        stream.write_all(message.as_bytes()).await?;
        stream.shutdown().await?;
        debug!("Forwarded '{}' to owner", message);
        Ok(())
    }

    /// Stop the accept loop and release the port.
    ///
    /// A message already being read is delivered before the loop exits.
    pub async fn stop(&self) {
        let previous = match self.state.lock() {
            Ok(mut state) => std::mem::replace(&mut *state, State::Stopped),
            Err(e) => {
                warn!("Failed to acquire lock: {}", e);
                return;
            }
        };

        match previous {
            State::Listening { shutdown, task } => {
                let _ = shutdown.send(true);
                if let Err(e) = task.await {
                    warn!("Accept loop ended abnormally: {}", e);
                }
                info!("Released coordination port {}", self.config.port);
            }
            State::Bound(_) => info!("Released coordination port {}", self.config.port),
            State::Idle | State::Stopped => {}
        }
    }

    fn lock_state(&self) -> CoordinatorResult<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| {
            CoordinatorError::Io(std::io::Error::other(format!(
                "Failed to acquire lock: {}",
                e
            )))
        })
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: CoordinatorConfig,
    on_message: Arc<dyn Fn(String) + Send + Sync>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                debug!("Accept loop shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((mut stream, peer)) => {
                    // Read inline so delivery follows accept order.
                    match read_message(&mut stream, &config).await {
                        Ok(message) => {
                            debug!("Received '{}' from {}", message, peer);
                            on_message(message);
                        }
                        Err(e) => {
                            warn!("Dropped message from {}: {}", peer, e);
                            abort(&stream);
                        }
                    }
                }
                Err(e) => warn!("Accept failed: {}", e),
            }
        }
    }
}

/// Reset instead of closing, so no TIME_WAIT socket holds the port.
fn abort(stream: &TcpStream) {
    if let Err(e) = stream.set_linger(Some(Duration::ZERO)) {
        debug!("Failed to set linger: {}", e);
    }
}

async fn read_message(
    stream: &mut TcpStream,
    config: &CoordinatorConfig,
) -> CoordinatorResult<String> {
    let limit = config.max_message_bytes;
    let mut buf = Vec::new();

    // The sender closes first; the message ends at EOF.
    let mut limited = stream.take(limit as u64 + 1);
    let read = limited.read_to_end(&mut buf);
    tokio::time::timeout(config.read_timeout, read)
        .await
        .map_err(|_| CoordinatorError::Timeout(config.read_timeout))??;

    if buf.len() > limit {
        return Err(CoordinatorError::InvalidMessage(format!(
            "exceeds {} bytes",
            limit
        )));
    }
    let message = String::from_utf8(buf)
        .map_err(|e| CoordinatorError::InvalidMessage(e.to_string()))?;
    let message = message.trim();
    validate(message, limit)?;
    Ok(message.to_string())
}

fn validate(message: &str, limit: usize) -> CoordinatorResult<()> {
    if message.trim().is_empty() {
        return Err(CoordinatorError::InvalidMessage("empty".to_string()));
    }
    if message.contains(&['\n', '\r'][..]) {
        return Err(CoordinatorError::InvalidMessage(
            "contains a line break".to_string(),
        ));
    }
    if message.len() > limit {
        return Err(CoordinatorError::InvalidMessage(format!(
            "exceeds {} bytes",
            limit
        )));
    }
    Ok(())
}
