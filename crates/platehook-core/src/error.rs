//! Error types for platehook operations.
//!
//! Extraction itself never fails the caller (failures degrade to field
//! defaults, see [`crate::extraction::ExtractionReport`]). The errors here
//! cover configuration, persistence, calibration and the production API.

use thiserror::Error;

/// Result type alias for platehook operations.
pub type PlatehookResult<T> = Result<T, PlatehookError>;

/// Main error type for platehook operations.
#[derive(Error, Debug)]
pub enum PlatehookError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// Field key outside the closed learnable set.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A stored or generated pattern failed to compile.
    #[error("Invalid pattern for {field}: {message}")]
    InvalidPattern { field: String, message: String },

    /// Persisted pattern document could not be read or written.
    #[error("Pattern store error: {message}")]
    PatternStore { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote production API failed.
    #[error("API error: {message}")]
    Api { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValEmptySession,

    // Patterns (PAT_xxx)
    PatUnknownField,
    PatInvalidRegex,
    PatPersistFailed,
    PatLockPoisoned,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // API (API_xxx)
    ApiRequestFailed,
    ApiRejected,
    ApiInvalidResponse,

    // IO (IO_xxx)
    IoFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValEmptySession => "VAL_002",
            ErrorCode::PatUnknownField => "PAT_001",
            ErrorCode::PatInvalidRegex => "PAT_002",
            ErrorCode::PatPersistFailed => "PAT_003",
            ErrorCode::PatLockPoisoned => "PAT_004",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::ApiRequestFailed => "API_001",
            ErrorCode::ApiRejected => "API_002",
            ErrorCode::ApiInvalidResponse => "API_003",
            ErrorCode::IoFailed => "IO_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl PlatehookError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
        }
    }

    /// Create the error returned when submitting a session without plates.
    pub fn empty_session() -> Self {
        Self::Validation {
            message: "session has no plates to submit".to_string(),
            code: ErrorCode::ValEmptySession,
        }
    }

    /// Create a pattern store persistence error.
    pub fn pattern_store(message: impl Into<String>) -> Self {
        Self::PatternStore {
            message: message.into(),
            code: ErrorCode::PatPersistFailed,
        }
    }

    /// Create a lock poisoning error.
    pub fn lock_poisoned(message: impl Into<String>) -> Self {
        Self::PatternStore {
            message: message.into(),
            code: ErrorCode::PatLockPoisoned,
        }
    }

    /// Create an API transport error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            code: ErrorCode::ApiRequestFailed,
        }
    }

    /// Create an API error for a response the server rejected.
    pub fn api_rejected(status: u16, body: &str) -> Self {
        Self::Api {
            message: format!("HTTP {}: {}", status, body),
            code: ErrorCode::ApiRejected,
        }
    }

    /// Create an API error for a response that could not be understood.
    pub fn api_invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            code: ErrorCode::ApiInvalidResponse,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::UnknownField(_) => ErrorCode::PatUnknownField,
            Self::InvalidPattern { .. } => ErrorCode::PatInvalidRegex,
            Self::PatternStore { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Api { code, .. } => *code,
            Self::Io(_) => ErrorCode::IoFailed,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnknownField(_) => Some(
                "Use one of: time, mass, filament_type, printer_model, total_layers, filament_length",
            ),
            Self::PatternStore { .. } => Some("Check permissions on the platehook data directory"),
            Self::Api { .. } => Some("Check the API base URL and token in your configuration"),
            _ => None,
        }
    }
}

/// Reasons a calibration attempt was rejected.
///
/// Every variant except [`LearnError::NoSeparator`] carries the generated
/// pattern so the user can see exactly what was tried.
#[derive(Error, Debug)]
pub enum LearnError {
    /// The example line has neither `:` nor `=`.
    #[error("No ':' or '=' separator found in the selected line")]
    NoSeparator,

    /// The generated pattern does not match its own example line.
    #[error("Generated pattern does not match the selected line.\nPattern: {pattern}")]
    SelfMatchFailed { pattern: String },

    /// The captured value is too long to be real metadata.
    #[error(
        "Extracted value is too long ({length} chars), probably garbage or a long comment.\nValue: {preview}...\nPattern: {pattern}"
    )]
    ValueTooLong {
        length: usize,
        preview: String,
        pattern: String,
    },

    /// The pattern was valid but could not be persisted.
    #[error("Pattern could not be saved: {source}\nPattern: {pattern}")]
    Persist {
        pattern: String,
        #[source]
        source: PlatehookError,
    },
}

impl LearnError {
    /// The generated pattern text, when one was produced.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::NoSeparator => None,
            Self::SelfMatchFailed { pattern }
            | Self::ValueTooLong { pattern, .. }
            | Self::Persist { pattern, .. } => Some(pattern),
        }
    }
}
