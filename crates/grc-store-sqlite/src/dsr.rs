// crates/grc-store-sqlite/src/dsr.rs
// ============================================================================
// Module: Data-Subject Request Queries
// Description: DSR intake, triage updates, completion, and metrics.
// Purpose: Persist GDPR requests against their statutory deadline.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! The deadline is fixed at intake and no later write touches it. Completion
//! stamps the completion instant and the response summary in one transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::DataSubjectRequest;
use grc_core::DsrId;
use grc_core::DsrMetrics;
use grc_core::DsrPriority;
use grc_core::DsrRequestType;
use grc_core::DsrStatus;
use grc_core::DsrUpdate;
use grc_core::NewDsr;
use grc_core::UserId;
use grc_core::dates::dsr_deadline;
use grc_core::dates::normalize_instant;
use grc_core::dsr::percentage;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use time::Date;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::date_column;
use crate::store::date_param;
use crate::store::db_error;
use crate::store::label_column;
use crate::store::new_id;
use crate::store::optional_timestamp_column;
use crate::store::query_count;
use crate::store::require_row;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Column list shared by DSR queries.
const DSR_COLUMNS: &str = "id, request_type, requester_name, requester_email, requester_phone, \
                           data_subject_info, request_details, status, priority, \
                           assigned_to_user_id, deadline_date, completed_date, response_summary, \
                           rejection_reason, created_at, updated_at";

/// Decodes a DSR row.
fn dsr_from_row(row: &Row<'_>) -> rusqlite::Result<DataSubjectRequest> {
    Ok(DataSubjectRequest {
        id: DsrId::new(row.get::<_, String>(0)?),
        request_type: label_column(row, 1, DsrRequestType::parse)?,
        requester_name: row.get(2)?,
        requester_email: row.get(3)?,
        requester_phone: row.get(4)?,
        data_subject_info: row.get(5)?,
        request_details: row.get(6)?,
        status: label_column(row, 7, DsrStatus::parse)?,
        priority: label_column(row, 8, DsrPriority::parse)?,
        assigned_to_user_id: row.get::<_, Option<String>>(9)?.map(UserId::new),
        deadline_date: date_column(row, 10)?,
        completed_date: optional_timestamp_column(row, 11)?,
        response_summary: row.get(12)?,
        rejection_reason: row.get(13)?,
        created_at: timestamp_column(row, 14)?,
        updated_at: timestamp_column(row, 15)?,
    })
}

/// Loads a DSR on an open connection.
fn load_dsr(conn: &Connection, dsr_id: &DsrId) -> Result<DataSubjectRequest, SqliteStoreError> {
    let dsr = conn
        .query_row(
            &format!("SELECT {DSR_COLUMNS} FROM gdpr_dsr WHERE id = ?1"),
            params![dsr_id.as_str()],
            dsr_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(dsr, "data subject request")
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl SqliteGrcStore {
    /// Records a new request with a 30-day deadline.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for incomplete submissions and
    /// [`SqliteStoreError`] on engine failures.
    pub fn create_dsr(
        &self,
        request: &NewDsr,
        now: OffsetDateTime,
    ) -> Result<DataSubjectRequest, SqliteStoreError> {
        let request_type = request.validate()?;
        let now = normalize_instant(now);
        let dsr = DataSubjectRequest {
            id: DsrId::new(new_id()),
            request_type,
            requester_name: request.requester_name.trim().to_string(),
            requester_email: request.requester_email.trim().to_string(),
            requester_phone: request.requester_phone.clone(),
            data_subject_info: request.data_subject_info.clone(),
            request_details: request.request_details.clone(),
            status: DsrStatus::Submitted,
            priority: request.priority.unwrap_or_default(),
            assigned_to_user_id: None,
            deadline_date: dsr_deadline(now),
            completed_date: None,
            response_summary: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO gdpr_dsr (id, request_type, requester_name, requester_email,
                    requester_phone, data_subject_info, request_details, status, priority,
                    deadline_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    dsr.id.as_str(),
                    dsr.request_type.as_str(),
                    dsr.requester_name,
                    dsr.requester_email,
                    dsr.requester_phone,
                    dsr.data_subject_info,
                    dsr.request_details,
                    dsr.status.as_str(),
                    dsr.priority.as_str(),
                    date_param(dsr.deadline_date),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(dsr)
    }

    /// Lists requests by nearest deadline.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_dsrs(&self) -> Result<Vec<DataSubjectRequest>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {DSR_COLUMNS} FROM gdpr_dsr ORDER BY deadline_date, created_at, id"
                ))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], dsr_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads one request.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_dsr(&self, dsr_id: &DsrId) -> Result<DataSubjectRequest, SqliteStoreError> {
        self.with_connection(|conn| load_dsr(conn, dsr_id))
    }

    /// Applies a triage update.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn update_dsr(
        &self,
        dsr_id: &DsrId,
        update: &DsrUpdate,
        now: OffsetDateTime,
    ) -> Result<DataSubjectRequest, SqliteStoreError> {
        let now = normalize_instant(now);
        let stamp = timestamp_param(now)?;
        self.with_transaction(|tx| {
            let mut dsr = load_dsr(tx, dsr_id)?;
            if let Some(status) = update.status {
                dsr.status = status;
            }
            if let Some(priority) = update.priority {
                dsr.priority = priority;
            }
            if let Some(user) = &update.assigned_to_user_id {
                dsr.assigned_to_user_id = Some(user.clone());
            }
            if let Some(details) = &update.request_details {
                dsr.request_details = Some(details.clone());
            }
            if let Some(reason) = &update.rejection_reason {
                dsr.rejection_reason = Some(reason.clone());
            }
            dsr.updated_at = now;
            tx.execute(
                "UPDATE gdpr_dsr SET status = ?2, priority = ?3, assigned_to_user_id = ?4,
                    request_details = ?5, rejection_reason = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    dsr_id.as_str(),
                    dsr.status.as_str(),
                    dsr.priority.as_str(),
                    dsr.assigned_to_user_id.as_ref().map(UserId::as_str),
                    dsr.request_details,
                    dsr.rejection_reason,
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(dsr)
        })
    }

    /// Marks a request completed with a response summary.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn complete_dsr(
        &self,
        dsr_id: &DsrId,
        response_summary: &str,
        now: OffsetDateTime,
    ) -> Result<DataSubjectRequest, SqliteStoreError> {
        let now = normalize_instant(now);
        let stamp = timestamp_param(now)?;
        self.with_transaction(|tx| {
            let mut dsr = load_dsr(tx, dsr_id)?;
            dsr.status = DsrStatus::Completed;
            dsr.completed_date = Some(now);
            dsr.response_summary = Some(response_summary.to_string());
            dsr.updated_at = now;
            tx.execute(
                "UPDATE gdpr_dsr SET status = ?2, completed_date = ?3, response_summary = ?4,
                    updated_at = ?3
                 WHERE id = ?1",
                params![dsr_id.as_str(), dsr.status.as_str(), stamp, response_summary],
            )
            .map_err(db_error)?;
            Ok(dsr)
        })
    }

    /// Computes request counters as of `today`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn dsr_metrics(&self, today: Date) -> Result<DsrMetrics, SqliteStoreError> {
        self.with_connection(|conn| {
            let by_status = |status: DsrStatus| {
                query_count(
                    conn,
                    "SELECT COUNT(*) FROM gdpr_dsr WHERE status = ?1",
                    params![status.as_str()],
                )
            };
            let submitted = by_status(DsrStatus::Submitted)?;
            let under_review = by_status(DsrStatus::UnderReview)?;
            let in_progress = by_status(DsrStatus::InProgress)?;
            let completed = by_status(DsrStatus::Completed)?;
            let rejected = by_status(DsrStatus::Rejected)?;
            let total = query_count(conn, "SELECT COUNT(*) FROM gdpr_dsr", params![])?;
            let overdue = query_count(
                conn,
                "SELECT COUNT(*) FROM gdpr_dsr
                 WHERE deadline_date < ?1 AND status NOT IN ('completed', 'rejected')",
                params![date_param(today)],
            )?;
            let avg_response_days: Option<f64> = conn
                .query_row(
                    "SELECT AVG(julianday(completed_date) - julianday(created_at))
                     FROM gdpr_dsr
                     WHERE status = 'completed' AND completed_date IS NOT NULL",
                    params![],
                    |row| row.get(0),
                )
                .map_err(db_error)?;
            Ok(DsrMetrics {
                total,
                submitted,
                under_review,
                in_progress,
                completed,
                rejected,
                overdue,
                avg_response_days: avg_response_days.unwrap_or(0.0),
                completion_rate: percentage(completed, total),
            })
        })
    }
}
