// crates/grc-store-sqlite/src/ropa.rs
// ============================================================================
// Module: Processing Register Queries
// Description: Record of processing activities CRUD, archival, and metrics.
// Purpose: Persist the Article 30 register.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Rows are never deleted; archival flips the status and the register listing
//! filters archived rows out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::NewProcessingActivity;
use grc_core::ProcessingActivity;
use grc_core::ProcessingActivityUpdate;
use grc_core::RopaId;
use grc_core::RopaMetrics;
use grc_core::RopaStatus;
use grc_core::dates::normalize_instant;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::db_error;
use crate::store::label_column;
use crate::store::new_id;
use crate::store::query_count;
use crate::store::require_changed;
use crate::store::require_row;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Column list shared by register queries.
const ROPA_COLUMNS: &str = "id, activity_name, department, data_controller_details, \
                            data_categories, data_subject_categories, recipients, \
                            third_country_transfers, retention_period, security_measures, \
                            status, created_at, updated_at";

/// Decodes a register row.
fn ropa_from_row(row: &Row<'_>) -> rusqlite::Result<ProcessingActivity> {
    Ok(ProcessingActivity {
        id: RopaId::new(row.get::<_, String>(0)?),
        activity_name: row.get(1)?,
        department: row.get(2)?,
        data_controller_details: row.get(3)?,
        data_categories: row.get(4)?,
        data_subject_categories: row.get(5)?,
        recipients: row.get(6)?,
        third_country_transfers: row.get(7)?,
        retention_period: row.get(8)?,
        security_measures: row.get(9)?,
        status: label_column(row, 10, RopaStatus::parse)?,
        created_at: timestamp_column(row, 11)?,
        updated_at: timestamp_column(row, 12)?,
    })
}

/// Loads a register entry on an open connection.
fn load_ropa(conn: &Connection, ropa_id: &RopaId) -> Result<ProcessingActivity, SqliteStoreError> {
    let entry = conn
        .query_row(
            &format!("SELECT {ROPA_COLUMNS} FROM gdpr_ropa WHERE id = ?1"),
            params![ropa_id.as_str()],
            ropa_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(entry, "processing activity")
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl SqliteGrcStore {
    /// Records a processing activity, in draft unless a status is given.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for blank required text.
    pub fn create_ropa(
        &self,
        request: &NewProcessingActivity,
        now: OffsetDateTime,
    ) -> Result<ProcessingActivity, SqliteStoreError> {
        request.validate()?;
        let now = normalize_instant(now);
        let entry = ProcessingActivity {
            id: RopaId::new(new_id()),
            activity_name: request.activity_name.trim().to_string(),
            department: request.department.clone(),
            data_controller_details: request.data_controller_details.clone(),
            data_categories: request.data_categories.clone(),
            data_subject_categories: request.data_subject_categories.clone(),
            recipients: request.recipients.clone(),
            third_country_transfers: request.third_country_transfers.clone(),
            retention_period: request.retention_period.clone(),
            security_measures: request.security_measures.clone(),
            status: request.status.unwrap_or(RopaStatus::Draft),
            created_at: now,
            updated_at: now,
        };
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO gdpr_ropa ({ROPA_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)"
                ),
                params![
                    entry.id.as_str(),
                    entry.activity_name,
                    entry.department,
                    entry.data_controller_details,
                    entry.data_categories,
                    entry.data_subject_categories,
                    entry.recipients,
                    entry.third_country_transfers,
                    entry.retention_period,
                    entry.security_measures,
                    entry.status.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(entry)
    }

    /// Lists draft and active entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_ropa(&self) -> Result<Vec<ProcessingActivity>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ROPA_COLUMNS} FROM gdpr_ropa
                     WHERE status <> ?1
                     ORDER BY created_at DESC, id"
                ))
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![RopaStatus::Archived.as_str()], ropa_from_row)
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads one entry, archived included.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_ropa(&self, ropa_id: &RopaId) -> Result<ProcessingActivity, SqliteStoreError> {
        self.with_connection(|conn| load_ropa(conn, ropa_id))
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids and
    /// [`SqliteStoreError::Invalid`] when required text becomes blank.
    pub fn update_ropa(
        &self,
        ropa_id: &RopaId,
        update: &ProcessingActivityUpdate,
        now: OffsetDateTime,
    ) -> Result<ProcessingActivity, SqliteStoreError> {
        let now = normalize_instant(now);
        let stamp = timestamp_param(now)?;
        self.with_transaction(|tx| {
            let mut entry = load_ropa(tx, ropa_id)?;
            update.apply(&mut entry)?;
            entry.updated_at = now;
            tx.execute(
                "UPDATE gdpr_ropa SET activity_name = ?2, department = ?3,
                    data_controller_details = ?4, data_categories = ?5,
                    data_subject_categories = ?6, recipients = ?7, third_country_transfers = ?8,
                    retention_period = ?9, security_measures = ?10, status = ?11, updated_at = ?12
                 WHERE id = ?1",
                params![
                    ropa_id.as_str(),
                    entry.activity_name,
                    entry.department,
                    entry.data_controller_details,
                    entry.data_categories,
                    entry.data_subject_categories,
                    entry.recipients,
                    entry.third_country_transfers,
                    entry.retention_period,
                    entry.security_measures,
                    entry.status.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(entry)
        })
    }

    /// Archives an entry, hiding it from the register listing.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn archive_ropa(&self, ropa_id: &RopaId, now: OffsetDateTime) -> Result<(), SqliteStoreError> {
        let stamp = timestamp_param(normalize_instant(now))?;
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE gdpr_ropa SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![ropa_id.as_str(), RopaStatus::Archived.as_str(), stamp],
                )
                .map_err(db_error)?;
            require_changed(changed, "processing activity")
        })
    }

    /// Counts entries by status.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn ropa_metrics(&self) -> Result<RopaMetrics, SqliteStoreError> {
        self.with_connection(|conn| {
            let by_status = |status: RopaStatus| {
                query_count(
                    conn,
                    "SELECT COUNT(*) FROM gdpr_ropa WHERE status = ?1",
                    params![status.as_str()],
                )
            };
            Ok(RopaMetrics {
                total_processing_activities: query_count(
                    conn,
                    "SELECT COUNT(*) FROM gdpr_ropa",
                    params![],
                )?,
                active: by_status(RopaStatus::Active)?,
                draft: by_status(RopaStatus::Draft)?,
                archived: by_status(RopaStatus::Archived)?,
            })
        })
    }
}
