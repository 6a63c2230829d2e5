//! # Error Types
//!
//! Domain-specific error types for showroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  showroom-core errors (this file)                                      │
//! │  ├── CoreError        - Registry and contract violations               │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  showroom-store errors (separate crate)                                │
//! │  └── StorageError     - Durable storage failures (never surfaced)      │
//! │                                                                         │
//! │  shell errors (in app)                                                 │
//! │  └── ShellError       - Load failures → error display state            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ShellError → ErrorDisplay         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by the contract layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Navigation target is absent from the module registry.
    ///
    /// ## When This Occurs
    /// - A page module publishes `navigate-to-module` with a typo
    /// - A role routes to a module that was never registered
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// Two descriptors in the table share a name.
    #[error("Module '{0}' is registered more than once")]
    DuplicateModule(String),

    /// A descriptor is missing a resource path or title.
    #[error("Module '{name}' has an invalid descriptor: {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// An event payload did not have the expected shape.
    #[error("Invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g. whitespace inside a state key).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
