// crates/grc-store-sqlite/src/notifications.rs
// ============================================================================
// Module: Notification Queries
// Description: Notification insert, listing, and read marking.
// Purpose: Persist per-user in-app notifications.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Inserts are never de-duplicated. Marking read is scoped to the owner and
//! idempotent: `SQLite` counts a matched row as changed even when the flag
//! already holds the new value.

use grc_core::NewNotification;
use grc_core::Notification;
use grc_core::NotificationId;
use grc_core::UserId;
use grc_core::dates::normalize_instant;
use rusqlite::Row;
use rusqlite::params;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::new_id;
use crate::store::require_changed;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

/// Decodes a notification row.
fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: NotificationId::new(row.get::<_, String>(0)?),
        user_id: UserId::new(row.get::<_, String>(1)?),
        message: row.get(2)?,
        link_url: row.get(3)?,
        is_read: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

impl SqliteGrcStore {
    /// Inserts a notification.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the recipient does not exist or on
    /// engine failures.
    pub fn create_notification(
        &self,
        notification: &NewNotification,
        now: OffsetDateTime,
    ) -> Result<Notification, SqliteStoreError> {
        let now = normalize_instant(now);
        let created_at = timestamp_param(now)?;
        let id = NotificationId::new(new_id());
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, message, link_url, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    id.as_str(),
                    notification.user_id.as_str(),
                    notification.message,
                    notification.link_url,
                    created_at
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(Notification {
            id,
            user_id: notification.user_id.clone(),
            message: notification.message.clone(),
            link_url: notification.link_url.clone(),
            is_read: false,
            created_at: now,
        })
    }

    /// Lists a user's notifications newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_notifications(
        &self,
        user_id: &UserId,
        only_unread: bool,
    ) -> Result<Vec<Notification>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, message, link_url, is_read, created_at
                     FROM notifications
                     WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
                     ORDER BY created_at DESC, rowid DESC",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![user_id.as_str(), only_unread], notification_from_row)
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Marks one of the user's notifications read.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the id does not belong to
    /// the user.
    pub fn mark_notification_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                    params![notification_id.as_str(), user_id.as_str()],
                )
                .map_err(db_error)?;
            require_changed(changed, "notification")
        })
    }
}
