//! Configuration system for platehook.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PlatehookError, PlatehookResult};

/// Default loopback port used for owner election and path forwarding.
/// Below the usual ephemeral ranges so outgoing connections never take it.
pub const DEFAULT_COORDINATOR_PORT: u16 = 28411;

/// Loopback coordination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Fixed well-known loopback port.
    pub port: u16,
    /// How long the owner waits for a connected sender to finish writing.
    pub read_timeout_ms: u64,
    /// How long a sender waits for the owner to accept.
    pub connect_timeout_ms: u64,
    /// Largest accepted message in bytes.
    pub max_message_bytes: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_COORDINATOR_PORT,
            read_timeout_ms: 2_000,
            connect_timeout_ms: 1_000,
            max_message_bytes: 64 * 1024,
        }
    }
}

/// Bounded retry used when the slicer still holds the output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadPolicy {
    /// Total read attempts (first try included).
    pub attempts: u32,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl ReadPolicy {
    /// Create a policy with the given attempts and delay.
    pub fn new(attempts: u32, retry_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            retry_delay_ms: retry_delay.as_millis() as u64,
        }
    }

    /// Delay between attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Number of retries after the first attempt.
    pub fn retries(&self) -> usize {
        self.attempts.saturating_sub(1) as usize
    }
}

/// Remote production API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL, e.g. `http://localhost:3000/api/production`.
    pub base_url: String,
    /// Shared secret sent with each submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Version string reported with each submission.
    pub client_version: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/production".to_string(),
            token: None,
            timeout_secs: 10,
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Main platehook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Directory for persisted state.
    pub data_dir: PathBuf,
    /// Persisted pattern overrides. Defaults to `<data_dir>/patterns.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_file: Option<PathBuf>,
    /// Loopback coordination settings.
    pub coordinator: CoordinatorSettings,
    /// File read retry policy.
    pub read: ReadPolicy,
    /// Production API settings.
    pub api: ApiSettings,
}

impl Default for HookConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".platehook"))
            .unwrap_or_else(|| PathBuf::from(".platehook"));

        Self {
            data_dir,
            patterns_file: None,
            coordinator: CoordinatorSettings::default(),
            read: ReadPolicy::default(),
            api: ApiSettings::default(),
        }
    }
}

impl HookConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> PlatehookResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| PlatehookError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| PlatehookError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| PlatehookError::Configuration(e.to_string())),
            _ => Err(PlatehookError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides.
    ///
    /// Reads:
    /// - `PLATEHOOK_DATA_DIR`
    /// - `PLATEHOOK_PATTERNS_FILE`
    /// - `PLATEHOOK_PORT`
    /// - `PLATEHOOK_READ_ATTEMPTS`
    /// - `PLATEHOOK_READ_RETRY_DELAY_MS`
    /// - `PLATEHOOK_API_URL`
    /// - `PLATEHOOK_API_TOKEN`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("PLATEHOOK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(file) = std::env::var("PLATEHOOK_PATTERNS_FILE") {
            self.patterns_file = Some(PathBuf::from(file));
        }
        if let Ok(port) = std::env::var("PLATEHOOK_PORT") {
            match port.parse() {
                Ok(port) => self.coordinator.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PLATEHOOK_PORT: {}", port),
            }
        }
        if let Ok(attempts) = std::env::var("PLATEHOOK_READ_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse::<u32>() {
                self.read.attempts = attempts.max(1);
            }
        }
        if let Ok(delay) = std::env::var("PLATEHOOK_READ_RETRY_DELAY_MS") {
            if let Ok(delay) = delay.parse() {
                self.read.retry_delay_ms = delay;
            }
        }
        if let Ok(url) = std::env::var("PLATEHOOK_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(token) = std::env::var("PLATEHOOK_API_TOKEN") {
            self.api.token = Some(token);
        }
        self
    }

    /// Path of the persisted pattern override document.
    pub fn patterns_path(&self) -> PathBuf {
        self.patterns_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("patterns.json"))
    }
}
