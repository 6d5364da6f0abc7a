// crates/grc-core/src/error.rs
// ============================================================================
// Module: GRC Errors
// Description: Tagged error taxonomy shared by the store and request layer.
// Purpose: Classify failures by kind so callers never match on message text.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`GrcError`] pairs an [`ErrorKind`] with a human-readable message. The
//! request layer maps kinds to HTTP status codes; the message is only ever
//! shown to the caller, never inspected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Failure classification.
///
/// # Invariants
/// - Variants are stable for serialization and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Referenced entity does not exist.
    NotFound,
    /// Missing or invalid input, rejected before touching the store.
    Validation,
    /// Duplicate key or a referential constraint blocking the change.
    Conflict,
    /// Missing or invalid credentials.
    Unauthorized,
    /// Authenticated caller lacks the required role or ownership.
    Forbidden,
    /// Anything else, including unexpected store failures.
    Internal,
}

impl ErrorKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Domain error carrying a kind and a caller-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GrcError {
    /// Failure classification.
    kind: ErrorKind,
    /// Caller-facing description.
    message: String,
}

/// Result alias for domain operations.
pub type GrcResult<T> = Result<T, GrcError>;

impl GrcError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`ErrorKind::NotFound`] error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a [`ErrorKind::Validation`] error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates a [`ErrorKind::Conflict`] error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Creates a [`ErrorKind::Unauthorized`] error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Creates a [`ErrorKind::Forbidden`] error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Creates a [`ErrorKind::Internal`] error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the caller-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Rejects blank required text fields.
///
/// # Errors
///
/// Returns [`ErrorKind::Validation`] naming the field when `value` is blank.
pub fn require_text(field: &str, value: &str) -> GrcResult<()> {
    if value.trim().is_empty() {
        return Err(GrcError::validation(format!("{field} is required")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::ErrorKind;
    use super::GrcError;
    use super::require_text;

    #[test]
    fn display_includes_kind_and_message() {
        let err = GrcError::not_found("ticket not found");
        assert_eq!(err.to_string(), "not_found: ticket not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn require_text_rejects_whitespace() {
        let err = require_text("title", "   ").err();
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::Validation));
        assert!(require_text("title", "Quarterly review").is_ok());
    }
}
