//! # Validation Module
//!
//! Rules for the two identifiers the shell trusts page modules to supply:
//! state keys and module names.
//!
//! ## What Each Rule Protects
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  state key "cart"        ──► durable entry "showroomCart"               │
//! │  state key "categorías"  ──► durable entry "showroomCategorías"         │
//! │  state key "a\nb"        ──► rejected (control character)        ✗      │
//! │  module "../x"           ──► rejected (resource path escape)     ✗      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Module names become resource paths, so they are limited to letters,
//! digits, hyphens and underscores. State keys may be any printable text;
//! the storage backend is responsible for mapping them to entry names.
//!
//! ## Usage
//! ```rust
//! use showroom_core::validation::{validate_state_key, validate_module_name};
//!
//! validate_state_key("orders").unwrap();
//! validate_module_name("catalog").unwrap();
//! assert!(validate_state_key("").is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum identifier length for keys and module names.
pub const MAX_IDENTIFIER_LEN: usize = 64;

fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a state key.
///
/// ## Rules
/// - Must not be empty or whitespace only
/// - At most 64 bytes
/// - No control characters
pub fn validate_state_key(key: &str) -> ValidationResult<()> {
    let field = "state key";

    if key.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if key.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if key.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a module name.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - ASCII letters, digits, hyphens, underscores
pub fn validate_module_name(name: &str) -> ValidationResult<()> {
    validate_identifier("module name", name)
}

// =============================================================================
// Unit Tests
// =============================================================================
