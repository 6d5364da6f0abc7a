// crates/grc-core/src/users.rs
// ============================================================================
// Module: Users
// Description: Platform users, roles, and login input.
// Purpose: Describe who may act on the platform and with which role.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Users are seeded; there is no registration flow. Two roles exist: admins
//! manage catalog, tickets, risks, and DSRs, while users review the controls
//! they own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::error::GrcResult;
use crate::error::require_text;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authorization role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Standard compliance user.
    User,
}

impl Role {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Returns true for the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Platform user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Login email, unique.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Authorization role.
    pub role: Role,
}

/// Login request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Plain password.
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Validates that both credentials are present.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either field is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("email", &self.email)?;
        require_text("password", &self.password)
    }
}
