// crates/grc-store-sqlite/src/users.rs
// ============================================================================
// Module: User Queries
// Description: User lookup and insertion.
// Purpose: Resolve login emails, profile ids, and admin recipients.
// Dependencies: grc-core, rusqlite
// ============================================================================

//! ## Overview
//! Users are only written by seeding; the request layer reads them for login,
//! ownership checks, and digest recipients.

use grc_core::Role;
use grc_core::User;
use grc_core::UserId;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::label_column;
use crate::store::require_row;
use crate::store::timestamp_param;

/// Column list shared by user queries.
const USER_COLUMNS: &str = "id, email, name, role";

/// Decodes a user row selected with [`USER_COLUMNS`].
fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get::<_, String>(0)?),
        email: row.get(1)?,
        name: row.get(2)?,
        role: label_column(row, 3, Role::parse)?,
    })
}

impl SqliteGrcStore {
    /// Looks up a user by login email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, SqliteStoreError> {
        self.with_connection(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)"),
                params![email.trim()],
                user_from_row,
            )
            .optional()
            .map_err(db_error)
        })
    }

    /// Loads a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_user(&self, user_id: &UserId) -> Result<User, SqliteStoreError> {
        self.with_connection(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    params![user_id.as_str()],
                    user_from_row,
                )
                .optional()
                .map_err(db_error)?;
            require_row(user, "user")
        })
    }

    /// Lists every admin user.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_admins(&self) -> Result<Vec<User>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE role = 'admin' ORDER BY email"
                ))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], user_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Inserts a user unless the email already exists; returns true when inserted.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn insert_user_if_absent(
        &self,
        user: &User,
        now: OffsetDateTime,
    ) -> Result<bool, SqliteStoreError> {
        let created_at = timestamp_param(now)?;
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "INSERT INTO users (id, email, name, role, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT DO NOTHING",
                    params![
                        user.id.as_str(),
                        user.email,
                        user.name,
                        user.role.as_str(),
                        created_at
                    ],
                )
                .map_err(db_error)?;
            Ok(changed > 0)
        })
    }
}
