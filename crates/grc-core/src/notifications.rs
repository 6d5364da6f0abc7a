// crates/grc-core/src/notifications.rs
// ============================================================================
// Module: Notifications
// Description: Per-user in-app notifications.
// Purpose: Carry scheduler and handler messages to individual users.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Notifications are inserted without de-duplication and mutated only when the
//! owning user marks them read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::identifiers::NotificationId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification id.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// Message text.
    pub message: String,
    /// Front-end route to open.
    pub link_url: Option<String>,
    /// Read flag.
    pub is_read: bool,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Notification to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Recipient.
    pub user_id: UserId,
    /// Message text.
    pub message: String,
    /// Front-end route to open.
    pub link_url: Option<String>,
}

impl NewNotification {
    /// Builds a notification with a link.
    #[must_use]
    pub fn with_link(user_id: UserId, message: impl Into<String>, link_url: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            link_url: Some(link_url.into()),
        }
    }
}
