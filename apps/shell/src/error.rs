//! # Shell Error Types
//!
//! Errors raised while loading modules, plus the display form the error
//! panel renders.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Shell                              │
//! │                                                                         │
//! │  load_module("catalgo")                                                 │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  ModuleLoader                                                    │  │
//! │  │         │                                                        │  │
//! │  │  Registry miss? ─── CoreError::ModuleNotFound ──┐               │  │
//! │  │         │                                       │               │  │
//! │  │  Fetch failed?  ─── ShellError::ResourceLoad ───┼─► ErrorDisplay │  │
//! │  │         │                                       │   (container)  │  │
//! │  │  init failed?   ─── logged, module still current                 │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Container after a failure:                                            │
//! │    <div class="module-error" data-error-code="RESOURCE_LOAD_FAILURE">  │
//! │      <p>Could not load modules/catalog/catalog.html: ...</p>           │
//! │      <button data-action="reload">Reload</button>                      │
//! │    </div>                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use showroom_core::CoreError;
use showroom_store::StorageError;
use thiserror::Error;

use crate::document::escape_html;

/// Errors raised by the shell.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A resource (markup, script, seed document) could not be fetched.
    #[error("Could not load {path}: {reason}")]
    ResourceLoad { path: String, reason: String },

    /// A page module's `init` returned an error.
    #[error("Module '{module}' failed to initialize: {reason}")]
    ModuleInit { module: String, reason: String },

    /// A page module rejected input it was handed.
    #[error("{0}")]
    InvalidInput(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Contract violation (unknown module, malformed payload).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Durable storage could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Local I/O failure outside resource fetching.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellError {
    /// Creates a ResourceLoad error.
    pub fn resource(path: impl Into<String>, reason: impl ToString) -> Self {
        ShellError::ResourceLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an InvalidInput error.
    pub fn invalid(message: impl Into<String>) -> Self {
        ShellError::InvalidInput(message.into())
    }
}

impl From<toml::de::Error> for ShellError {
    fn from(err: toml::de::Error) -> Self {
        ShellError::Config(err.to_string())
    }
}

/// Result type for shell operations.
pub type ShellResult<T> = Result<T, ShellError>;

// =============================================================================
// Error Display
// =============================================================================

/// What the error panel shows.
///
/// ## Serialization
/// ```json
/// {
///   "code": "MODULE_NOT_FOUND",
///   "message": "Module not found: catalgo"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDisplay {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for the error panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Navigation target is not in the registry
    ModuleNotFound,

    /// Markup or script could not be fetched
    ResourceLoadFailure,

    /// Entry point failed
    ModuleInitFailure,

    /// Page module input was rejected
    ValidationError,

    /// Storage could not be used
    StorageFailure,

    /// Anything else
    Internal,
}

impl ErrorCode {
    /// The wire string, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ModuleNotFound => "MODULE_NOT_FOUND",
            ErrorCode::ResourceLoadFailure => "RESOURCE_LOAD_FAILURE",
            ErrorCode::ModuleInitFailure => "MODULE_INIT_FAILURE",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::StorageFailure => "STORAGE_FAILURE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl ErrorDisplay {
    /// Creates a display entry.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorDisplay {
            code,
            message: message.into(),
        }
    }

    /// Markup placed in the container: the message plus a reload control.
    pub fn to_markup(&self) -> String {
        format!(
            "<div class=\"module-error\" data-error-code=\"{}\">\n  <p>{}</p>\n  <button data-action=\"reload\">Reload</button>\n</div>",
            self.code.as_str(),
            escape_html(&self.message)
        )
    }
}

/// Converts shell errors to display entries.
impl From<&ShellError> for ErrorDisplay {
    fn from(err: &ShellError) -> Self {
        match err {
            ShellError::Core(CoreError::ModuleNotFound(_)) => {
                ErrorDisplay::new(ErrorCode::ModuleNotFound, err.to_string())
            }
            ShellError::Core(CoreError::Validation(e)) => {
                ErrorDisplay::new(ErrorCode::ValidationError, e.to_string())
            }
            ShellError::Core(_) => ErrorDisplay::new(ErrorCode::Internal, err.to_string()),
            ShellError::ResourceLoad { .. } => {
                ErrorDisplay::new(ErrorCode::ResourceLoadFailure, err.to_string())
            }
            ShellError::ModuleInit { .. } => {
                ErrorDisplay::new(ErrorCode::ModuleInitFailure, err.to_string())
            }
            ShellError::InvalidInput(message) => {
                ErrorDisplay::new(ErrorCode::ValidationError, message.clone())
            }
            ShellError::Storage(e) => {
                // Log the actual error but show a generic message
                tracing::error!("Storage failure: {}", e);
                ErrorDisplay::new(ErrorCode::StorageFailure, "Local storage is unavailable")
            }
            ShellError::Config(_) | ShellError::Io(_) => {
                ErrorDisplay::new(ErrorCode::Internal, err.to_string())
            }
        }
    }
}

impl std::fmt::Display for ErrorDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}
