// crates/grc-server/src/notify.rs
// ============================================================================
// Module: Notification Writer
// Description: In-app notification fan-out and message texts.
// Purpose: Insert per-user notifications for scheduled jobs.
// Dependencies: grc-core, grc-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! Notifications are plain inserts; repeated scans produce repeated rows.
//! Write failures are logged and reported as `false` so a job keeps going
//! through the rest of its hits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::ControlLibraryId;
use grc_core::DashboardSummary;
use grc_core::NewNotification;
use grc_core::UserId;
use grc_store_sqlite::SqliteGrcStore;
use time::OffsetDateTime;
use tracing::warn;

// ============================================================================
// SECTION: Message Texts
// ============================================================================

/// Link target for dashboard notifications.
pub const DASHBOARD_LINK: &str = "/dashboard";

/// Front-end path of an activated control.
#[must_use]
pub fn control_link(control_id: &ActivatedControlId) -> String {
    format!("/controls/activated/{control_id}")
}

/// Text for a control whose review is due.
#[must_use]
pub fn due_message(library_id: &ControlLibraryId) -> String {
    format!("Control {library_id} is due for review")
}

/// Text for a control past its grace period.
#[must_use]
pub fn overdue_message(library_id: &ControlLibraryId) -> String {
    format!("URGENT: Control {library_id} is overdue for review")
}

/// Text for the daily admin summary.
#[must_use]
pub fn daily_summary_message(summary: &DashboardSummary) -> String {
    format!(
        "Daily Summary - Controls: {} total, {} compliant, {} overdue. Tickets: {} total, {} open.",
        summary.controls.total,
        summary.controls.compliant,
        summary.controls.overdue,
        summary.tickets.total,
        summary.tickets.open,
    )
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Inserts notifications, logging instead of failing.
#[derive(Clone)]
pub struct NotificationWriter {
    /// Backing store.
    store: SqliteGrcStore,
}

impl NotificationWriter {
    /// Creates a writer for `store`.
    #[must_use]
    pub const fn new(store: SqliteGrcStore) -> Self {
        Self {
            store,
        }
    }

    /// Inserts one notification and reports whether it was written.
    pub fn notify(
        &self,
        user_id: &UserId,
        message: impl Into<String>,
        link_url: impl Into<String>,
        now: OffsetDateTime,
    ) -> bool {
        let notification = NewNotification::with_link(user_id.clone(), message, link_url);
        match self.store.create_notification(&notification, now) {
            Ok(_) => true,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "notification write failed");
                false
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use grc_core::AssetStats;
    use grc_core::ControlStats;
    use grc_core::TicketStats;

    use super::*;

    #[test]
    fn message_texts_match_front_end_contract() {
        let library_id = ControlLibraryId::new("CIS-1.1");
        assert_eq!(due_message(&library_id), "Control CIS-1.1 is due for review");
        assert_eq!(overdue_message(&library_id), "URGENT: Control CIS-1.1 is overdue for review");
        assert_eq!(
            control_link(&ActivatedControlId::new("abc")),
            "/controls/activated/abc"
        );
    }

    #[test]
    fn daily_summary_lists_control_and_ticket_counts() {
        let summary = DashboardSummary {
            controls: ControlStats::new(61, 4, 2, 1, 1),
            tickets: TicketStats {
                total: 9,
                open: 3,
                resolved_this_month: 2,
            },
            assets: AssetStats {
                total: 0,
            },
        };
        assert_eq!(
            daily_summary_message(&summary),
            "Daily Summary - Controls: 61 total, 2 compliant, 1 overdue. Tickets: 9 total, 3 open."
        );
    }
}
