// crates/grc-store-sqlite/src/dashboard.rs
// ============================================================================
// Module: Dashboard Aggregates
// Description: Counters for the dashboard summary and digest emails.
// Purpose: Compute compliance and ticket statistics in SQL.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Compliance counts use the latest evidence row of each active control.
//! Dashboard overdue counts controls whose due date has passed; the scheduler
//! scan applies the seven-day grace period separately.

use grc_core::AssetStats;
use grc_core::ControlStats;
use grc_core::DashboardSummary;
use grc_core::TicketStats;
use grc_core::WeeklyStats;
use grc_core::dashboard::compliance_rate;
use grc_core::dates::normalize_instant;
use grc_core::dates::start_of_month;
use rusqlite::Connection;
use rusqlite::params;
use time::Date;
use time::Duration;
use time::OffsetDateTime;
use time::Time;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::date_param;
use crate::store::query_count;
use crate::store::timestamp_param;

/// Counts active controls whose latest evidence carries `status`.
const LATEST_STATUS_SQL: &str = "
    SELECT COUNT(*) FROM activated_controls ac
    WHERE ac.status = 'active'
      AND (SELECT e.compliance_status FROM control_evidence_log e
           WHERE e.activated_control_id = ac.id
           ORDER BY e.performed_at DESC, e.rowid DESC
           LIMIT 1) = ?1";

/// Builds control counters on an open connection.
fn control_stats(conn: &Connection, today: Date) -> Result<ControlStats, SqliteStoreError> {
    let total = query_count(conn, "SELECT COUNT(*) FROM control_library", params![])?;
    let activated = query_count(
        conn,
        "SELECT COUNT(*) FROM activated_controls WHERE status = 'active'",
        params![],
    )?;
    let compliant = query_count(conn, LATEST_STATUS_SQL, params!["compliant"])?;
    let non_compliant = query_count(conn, LATEST_STATUS_SQL, params!["non-compliant"])?;
    let overdue = query_count(
        conn,
        "SELECT COUNT(*) FROM activated_controls
         WHERE status = 'active' AND next_review_due_date < ?1",
        params![date_param(today)],
    )?;
    Ok(ControlStats::new(total, activated, compliant, non_compliant, overdue))
}

impl SqliteGrcStore {
    /// Computes the dashboard summary as of `today`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn dashboard_summary(&self, today: Date) -> Result<DashboardSummary, SqliteStoreError> {
        let month_start =
            timestamp_param(start_of_month(today).with_time(Time::MIDNIGHT).assume_utc())?;
        self.with_connection(|conn| {
            let controls = control_stats(conn, today)?;
            let tickets = TicketStats {
                total: query_count(conn, "SELECT COUNT(*) FROM tickets", params![])?,
                open: query_count(
                    conn,
                    "SELECT COUNT(*) FROM tickets WHERE status IN ('new', 'in_progress')",
                    params![],
                )?,
                resolved_this_month: query_count(
                    conn,
                    "SELECT COUNT(*) FROM tickets
                     WHERE resolved_at IS NOT NULL AND resolved_at >= ?1",
                    params![month_start],
                )?,
            };
            let assets = AssetStats {
                total: query_count(conn, "SELECT COUNT(*) FROM assets", params![])?,
            };
            Ok(DashboardSummary {
                controls,
                tickets,
                assets,
            })
        })
    }

    /// Computes digest statistics for the seven days ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn weekly_stats(&self, now: OffsetDateTime) -> Result<WeeklyStats, SqliteStoreError> {
        let now = normalize_instant(now);
        let since = timestamp_param(now - Duration::days(7))?;
        let today = now.date();
        self.with_connection(|conn| {
            let controls = control_stats(conn, today)?;
            Ok(WeeklyStats {
                total_controls: controls.activated,
                compliance_rate: compliance_rate(controls.compliant, controls.activated),
                overdue_controls: controls.overdue,
                evidence_submissions: query_count(
                    conn,
                    "SELECT COUNT(*) FROM control_evidence_log WHERE performed_at >= ?1",
                    params![since],
                )?,
                tickets_resolved: query_count(
                    conn,
                    "SELECT COUNT(*) FROM tickets
                     WHERE resolved_at IS NOT NULL AND resolved_at >= ?1",
                    params![since],
                )?,
            })
        })
    }
}
