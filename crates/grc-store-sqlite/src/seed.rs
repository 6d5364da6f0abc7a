// crates/grc-store-sqlite/src/seed.rs
// ============================================================================
// Module: Seed Data
// Description: Built-in users and the bundled control catalog.
// Purpose: Populate a fresh database so the platform is usable immediately.
// Dependencies: grc-core, serde_json, time
// ============================================================================

//! ## Overview
//! Seeding is idempotent: users are inserted only when their email is new and
//! catalog entries only when their id is new. Existing rows are never
//! overwritten, so re-running the seed after edits is safe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ControlLibraryItem;
use grc_core::UserId;
use grc_core::users::Role;
use grc_core::users::User;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Bundled control catalog (CIS, NIST, ISO 27001 and SOC 2 entries).
const CONTROL_LIBRARY_JSON: &str = include_str!("../data/control_library.json");

/// Built-in account definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedUser {
    /// Fixed user id.
    pub id: &'static str,
    /// Login email.
    pub email: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Authorization role.
    pub role: Role,
}

impl SeedUser {
    /// Converts the definition into a user record.
    #[must_use]
    pub fn to_user(&self) -> User {
        User {
            id: UserId::new(self.id),
            email: self.email.to_string(),
            name: self.name.to_string(),
            role: self.role,
        }
    }
}

/// Accounts created by [`seed`].
pub const SEED_USERS: [SeedUser; 3] = [
    SeedUser {
        id: "00000000-0000-4000-8000-000000000001",
        email: "admin@company.com",
        name: "System Administrator",
        role: Role::Admin,
    },
    SeedUser {
        id: "00000000-0000-4000-8000-000000000002",
        email: "user@company.com",
        name: "Compliance User",
        role: Role::User,
    },
    SeedUser {
        id: "00000000-0000-4000-8000-000000000003",
        email: "john.doe@company.com",
        name: "John Doe",
        role: Role::User,
    },
];

/// Shared demo passwords accepted for any seeded account.
pub const SEED_PASSWORDS: [&str; 3] = ["admin123", "user123", "john123"];

// ============================================================================
// SECTION: Seeding
// ============================================================================

/// Outcome of a seed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    /// Users inserted by this run.
    pub users_inserted: u64,
    /// Catalog entries inserted by this run.
    pub controls_inserted: u64,
}

/// Parses the bundled control catalog.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Corrupt`] when the bundled JSON is malformed.
pub fn bundled_library() -> Result<Vec<ControlLibraryItem>, SqliteStoreError> {
    serde_json::from_str(CONTROL_LIBRARY_JSON)
        .map_err(|err| SqliteStoreError::Corrupt(format!("bundled control library: {err}")))
}

/// Inserts the built-in users and catalog entries that are missing.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the catalog cannot be parsed or on
/// engine failures.
pub fn seed(store: &SqliteGrcStore, now: OffsetDateTime) -> Result<SeedReport, SqliteStoreError> {
    let mut report = SeedReport::default();
    for seed_user in &SEED_USERS {
        if store.insert_user_if_absent(&seed_user.to_user(), now)? {
            report.users_inserted += 1;
        }
    }
    let library = bundled_library()?;
    report.controls_inserted = store.import_library(&library, false)?;
    Ok(report)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn bundled_library_parses_with_unique_ids() {
        let library = bundled_library().unwrap();
        assert!(!library.is_empty());
        let mut ids: Vec<_> = library.iter().map(|item| item.id.as_str().to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), library.len());
        assert!(library.iter().all(|item| item.validate().is_ok()));
    }

    #[test]
    fn exactly_one_seed_admin() {
        assert_eq!(SEED_USERS.iter().filter(|user| user.role.is_admin()).count(), 1);
    }
}
