// crates/grc-store-sqlite/src/controls.rs
// ============================================================================
// Module: Control Queries
// Description: Control catalog, activation, evidence, and review scans.
// Purpose: Persist the control review lifecycle.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Evidence submission is the one read-then-write operation with a
//! correctness requirement: the interval read, evidence insert, and due date
//! update run in a single transaction so concurrent submissions cannot use a
//! stale interval or double-advance the due date.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActiveControlView;
use grc_core::ActivatedControl;
use grc_core::ActivatedControlId;
use grc_core::ComplianceStatus;
use grc_core::ControlDetail;
use grc_core::ControlLibraryId;
use grc_core::ControlLibraryItem;
use grc_core::ControlScanHit;
use grc_core::ControlStatus;
use grc_core::EvidenceId;
use grc_core::EvidenceRecord;
use grc_core::UserId;
use grc_core::dates::next_review_due;
use grc_core::dates::normalize_instant;
use grc_core::dates::overdue_cutoff;
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
use crate::store::require_changed;
use crate::store::require_row;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Column list for catalog queries.
const LIBRARY_COLUMNS: &str = "id, standard, family, name, description";

/// Joined column list for activated control views.
const VIEW_SELECT: &str = "SELECT ac.id, ac.control_library_id, cl.name, cl.standard, ac.owner_id,
        u.name, ac.status, ac.review_interval_days, ac.next_review_due_date, ac.last_reviewed_at
     FROM activated_controls ac
     JOIN control_library cl ON cl.id = ac.control_library_id
     JOIN users u ON u.id = ac.owner_id";

/// Joined column list for scan hits.
const SCAN_SELECT: &str = "SELECT ac.id, ac.control_library_id, cl.name, ac.owner_id, u.name,
        u.email, ac.next_review_due_date
     FROM activated_controls ac
     JOIN control_library cl ON cl.id = ac.control_library_id
     JOIN users u ON u.id = ac.owner_id";

/// Column list for evidence queries.
const EVIDENCE_COLUMNS: &str =
    "id, activated_control_id, performed_by_id, performed_at, compliance_status, notes, evidence_link";

/// Decodes a catalog row.
fn library_from_row(row: &Row<'_>) -> rusqlite::Result<ControlLibraryItem> {
    Ok(ControlLibraryItem {
        id: ControlLibraryId::new(row.get::<_, String>(0)?),
        standard: row.get(1)?,
        family: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
    })
}

/// Decodes a joined activated control view.
fn view_from_row(row: &Row<'_>) -> rusqlite::Result<ActiveControlView> {
    Ok(ActiveControlView {
        id: ActivatedControlId::new(row.get::<_, String>(0)?),
        control_library_id: ControlLibraryId::new(row.get::<_, String>(1)?),
        control_name: row.get(2)?,
        standard: row.get(3)?,
        owner_id: UserId::new(row.get::<_, String>(4)?),
        owner_name: row.get(5)?,
        status: label_column(row, 6, ControlStatus::parse)?,
        review_interval_days: row.get(7)?,
        next_review_due_date: date_column(row, 8)?,
        last_reviewed_at: optional_timestamp_column(row, 9)?,
    })
}

/// Decodes a scan hit.
fn scan_hit_from_row(row: &Row<'_>) -> rusqlite::Result<ControlScanHit> {
    let email: String = row.get(5)?;
    Ok(ControlScanHit {
        activated_control_id: ActivatedControlId::new(row.get::<_, String>(0)?),
        control_library_id: ControlLibraryId::new(row.get::<_, String>(1)?),
        control_name: row.get(2)?,
        owner_id: UserId::new(row.get::<_, String>(3)?),
        owner_name: row.get(4)?,
        owner_email: Some(email).filter(|email| !email.trim().is_empty()),
        next_review_due_date: date_column(row, 6)?,
    })
}

/// Decodes an evidence row.
fn evidence_from_row(row: &Row<'_>) -> rusqlite::Result<EvidenceRecord> {
    Ok(EvidenceRecord {
        id: EvidenceId::new(row.get::<_, String>(0)?),
        activated_control_id: ActivatedControlId::new(row.get::<_, String>(1)?),
        performed_by_id: UserId::new(row.get::<_, String>(2)?),
        performed_at: timestamp_column(row, 3)?,
        compliance_status: label_column(row, 4, ComplianceStatus::parse)?,
        notes: row.get(5)?,
        evidence_link: row.get(6)?,
    })
}

/// Runs a scan query with a single date bound.
fn scan(conn: &Connection, filter: &str, bound: Date) -> Result<Vec<ControlScanHit>, SqliteStoreError> {
    let mut stmt = conn
        .prepare(&format!(
            "{SCAN_SELECT} WHERE ac.status = 'active' AND {filter}
             ORDER BY ac.next_review_due_date ASC, ac.id ASC"
        ))
        .map_err(db_error)?;
    let rows = stmt.query_map(params![date_param(bound)], scan_hit_from_row).map_err(db_error)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

impl SqliteGrcStore {
    /// Lists the catalog ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_library(&self) -> Result<Vec<ControlLibraryItem>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {LIBRARY_COLUMNS} FROM control_library ORDER BY id"))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], library_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads one catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_library_item(
        &self,
        id: &ControlLibraryId,
    ) -> Result<ControlLibraryItem, SqliteStoreError> {
        self.with_connection(|conn| {
            let item = conn
                .query_row(
                    &format!("SELECT {LIBRARY_COLUMNS} FROM control_library WHERE id = ?1"),
                    params![id.as_str()],
                    library_from_row,
                )
                .optional()
                .map_err(db_error)?;
            require_row(item, "control")
        })
    }

    /// Inserts a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Conflict`] when the id already exists.
    pub fn create_library_item(&self, item: &ControlLibraryItem) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO control_library (id, standard, family, name, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![item.id.as_str(), item.standard, item.family, item.name, item.description],
            )
            .map_err(|err| match db_error(err) {
                SqliteStoreError::Conflict(_) => {
                    SqliteStoreError::Conflict(format!("control {} already exists", item.id))
                }
                other => other,
            })?;
            Ok(())
        })
    }

    /// Replaces the descriptive fields of a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn update_library_item(&self, item: &ControlLibraryItem) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE control_library SET standard = ?2, family = ?3, name = ?4, description = ?5
                     WHERE id = ?1",
                    params![item.id.as_str(), item.standard, item.family, item.name, item.description],
                )
                .map_err(db_error)?;
            require_changed(changed, "control")
        })
    }

    /// Deletes a catalog entry that no activated control references.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids and
    /// [`SqliteStoreError::Conflict`] when the entry has been activated.
    pub fn delete_library_item(&self, id: &ControlLibraryId) -> Result<(), SqliteStoreError> {
        self.with_transaction(|tx| {
            let exists = query_count(
                tx,
                "SELECT COUNT(*) FROM control_library WHERE id = ?1",
                params![id.as_str()],
            )?;
            if exists == 0 {
                return Err(SqliteStoreError::NotFound("control not found".to_string()));
            }
            let references = query_count(
                tx,
                "SELECT COUNT(*) FROM activated_controls WHERE control_library_id = ?1",
                params![id.as_str()],
            )?;
            if references > 0 {
                return Err(SqliteStoreError::Conflict(format!(
                    "cannot delete control {id}: it has {references} activated instance(s)"
                )));
            }
            tx.execute("DELETE FROM control_library WHERE id = ?1", params![id.as_str()])
                .map_err(db_error)?;
            Ok(())
        })
    }

    /// Imports catalog entries in one transaction and returns how many rows changed.
    ///
    /// With `replace_existing` existing ids are overwritten; otherwise they are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures; nothing is written then.
    pub fn import_library(
        &self,
        items: &[ControlLibraryItem],
        replace_existing: bool,
    ) -> Result<u64, SqliteStoreError> {
        let sql = if replace_existing {
            "INSERT INTO control_library (id, standard, family, name, description)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET standard = excluded.standard,
                family = excluded.family, name = excluded.name, description = excluded.description"
        } else {
            "INSERT INTO control_library (id, standard, family, name, description)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO NOTHING"
        };
        self.with_transaction(|tx| {
            let mut stmt = tx.prepare(sql).map_err(db_error)?;
            let mut imported = 0_u64;
            for item in items {
                let changed = stmt
                    .execute(params![
                        item.id.as_str(),
                        item.standard,
                        item.family,
                        item.name,
                        item.description
                    ])
                    .map_err(db_error)?;
                if changed > 0 {
                    imported += 1;
                }
            }
            Ok(imported)
        })
    }

    // ========================================================================
    // SECTION: Activated Controls
    // ========================================================================

    /// Activates a catalog control for an owner; the first review falls due
    /// `interval_days` after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for a bad interval and
    /// [`SqliteStoreError::Db`] when the catalog id or owner does not exist.
    pub fn activate_control(
        &self,
        library_id: &ControlLibraryId,
        owner_id: &UserId,
        interval_days: u32,
        now: OffsetDateTime,
    ) -> Result<ActivatedControl, SqliteStoreError> {
        let now = normalize_instant(now);
        let due = next_review_due(now.date(), interval_days)?;
        let control = ActivatedControl {
            id: ActivatedControlId::new(new_id()),
            control_library_id: library_id.clone(),
            owner_id: owner_id.clone(),
            status: ControlStatus::Active,
            review_interval_days: interval_days,
            next_review_due_date: due,
            last_reviewed_at: None,
            created_at: now,
        };
        let created_at = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO activated_controls (id, control_library_id, owner_id, status,
                    review_interval_days, next_review_due_date, last_reviewed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
                params![
                    control.id.as_str(),
                    library_id.as_str(),
                    owner_id.as_str(),
                    control.status.as_str(),
                    interval_days,
                    date_param(due),
                    created_at
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(control)
    }

    /// Records evidence for an active control and advances its due date.
    ///
    /// Atomically inserts the evidence row, sets `last_reviewed_at = now`, and
    /// sets `next_review_due_date = now + interval`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the id does not resolve to
    /// an active control; no evidence row is written in that case.
    pub fn submit_evidence(
        &self,
        control_id: &ActivatedControlId,
        author_id: &UserId,
        status: ComplianceStatus,
        notes: &str,
        evidence_link: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<EvidenceRecord, SqliteStoreError> {
        let now = normalize_instant(now);
        let performed_at = timestamp_param(now)?;
        let evidence_link = evidence_link.map(str::trim).filter(|link| !link.is_empty());
        self.with_transaction(|tx| {
            let interval: Option<u32> = tx
                .query_row(
                    "SELECT review_interval_days FROM activated_controls
                     WHERE id = ?1 AND status = 'active'",
                    params![control_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?;
            let interval = require_row(interval, "activated control")?;
            let due = next_review_due(now.date(), interval)?;
            let record = EvidenceRecord {
                id: EvidenceId::new(new_id()),
                activated_control_id: control_id.clone(),
                performed_by_id: author_id.clone(),
                performed_at: now,
                compliance_status: status,
                notes: notes.to_string(),
                evidence_link: evidence_link.map(str::to_string),
            };
            tx.execute(
                "INSERT INTO control_evidence_log (id, activated_control_id, performed_by_id,
                    performed_at, compliance_status, notes, evidence_link)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.as_str(),
                    control_id.as_str(),
                    author_id.as_str(),
                    performed_at,
                    status.as_str(),
                    record.notes,
                    record.evidence_link
                ],
            )
            .map_err(db_error)?;
            tx.execute(
                "UPDATE activated_controls SET last_reviewed_at = ?2, next_review_due_date = ?3
                 WHERE id = ?1",
                params![control_id.as_str(), performed_at, date_param(due)],
            )
            .map_err(db_error)?;
            Ok(record)
        })
    }

    /// Loads an activated control row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_activated_control(
        &self,
        control_id: &ActivatedControlId,
    ) -> Result<ActivatedControl, SqliteStoreError> {
        self.with_connection(|conn| {
            let control = conn
                .query_row(
                    "SELECT id, control_library_id, owner_id, status, review_interval_days,
                        next_review_due_date, last_reviewed_at, created_at
                     FROM activated_controls WHERE id = ?1",
                    params![control_id.as_str()],
                    |row| {
                        Ok(ActivatedControl {
                            id: ActivatedControlId::new(row.get::<_, String>(0)?),
                            control_library_id: ControlLibraryId::new(row.get::<_, String>(1)?),
                            owner_id: UserId::new(row.get::<_, String>(2)?),
                            status: label_column(row, 3, ControlStatus::parse)?,
                            review_interval_days: row.get(4)?,
                            next_review_due_date: date_column(row, 5)?,
                            last_reviewed_at: optional_timestamp_column(row, 6)?,
                            created_at: timestamp_column(row, 7)?,
                        })
                    },
                )
                .optional()
                .map_err(db_error)?;
            require_row(control, "activated control")
        })
    }

    /// Lists active controls ordered by due date.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_active_controls(&self) -> Result<Vec<ActiveControlView>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "{VIEW_SELECT} WHERE ac.status = 'active'
                     ORDER BY ac.next_review_due_date ASC, ac.id ASC"
                ))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], view_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads an activated control with its evidence history, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_control_detail(
        &self,
        control_id: &ActivatedControlId,
    ) -> Result<ControlDetail, SqliteStoreError> {
        self.with_connection(|conn| {
            let control = conn
                .query_row(
                    &format!("{VIEW_SELECT} WHERE ac.id = ?1"),
                    params![control_id.as_str()],
                    view_from_row,
                )
                .optional()
                .map_err(db_error)?;
            let control = require_row(control, "activated control")?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {EVIDENCE_COLUMNS} FROM control_evidence_log
                     WHERE activated_control_id = ?1 ORDER BY performed_at DESC, rowid DESC"
                ))
                .map_err(db_error)?;
            let rows =
                stmt.query_map(params![control_id.as_str()], evidence_from_row).map_err(db_error)?;
            let evidence = rows.collect::<Result<Vec<_>, _>>().map_err(db_error)?;
            Ok(ControlDetail {
                control,
                evidence,
            })
        })
    }

    /// Counts evidence rows for a control.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn count_evidence(&self, control_id: &ActivatedControlId) -> Result<u64, SqliteStoreError> {
        self.with_connection(|conn| {
            query_count(
                conn,
                "SELECT COUNT(*) FROM control_evidence_log WHERE activated_control_id = ?1",
                params![control_id.as_str()],
            )
        })
    }

    /// Retires an active control; it is kept for history but no longer scanned.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when no active control has the id.
    pub fn retire_control(&self, control_id: &ActivatedControlId) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE activated_controls SET status = 'retired'
                     WHERE id = ?1 AND status = 'active'",
                    params![control_id.as_str()],
                )
                .map_err(db_error)?;
            require_changed(changed, "activated control")
        })
    }

    // ========================================================================
    // SECTION: Review Scans
    // ========================================================================

    /// Returns active controls whose review is due on or before `today`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn scan_due_controls(&self, today: Date) -> Result<Vec<ControlScanHit>, SqliteStoreError> {
        self.with_connection(|conn| scan(conn, "ac.next_review_due_date <= ?1", today))
    }

    /// Returns active controls at least seven days past their due date.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn scan_overdue_controls(
        &self,
        today: Date,
    ) -> Result<Vec<ControlScanHit>, SqliteStoreError> {
        self.with_connection(|conn| scan(conn, "ac.next_review_due_date <= ?1", overdue_cutoff(today)))
    }
}
