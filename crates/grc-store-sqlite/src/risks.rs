// crates/grc-store-sqlite/src/risks.rs
// ============================================================================
// Module: Risk Queries
// Description: Risk register CRUD, control mappings, and severity counts.
// Purpose: Persist scored risks and the controls that mitigate them.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Scores are computed before every write and stored alongside the ratings.
//! Severity is derived from the stored score on read and is never persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::ControlLibraryId;
use grc_core::NewRisk;
use grc_core::Risk;
use grc_core::RiskControlView;
use grc_core::RiskId;
use grc_core::RiskStatus;
use grc_core::RiskUpdate;
use grc_core::Severity;
use grc_core::SeverityCount;
use grc_core::UserId;
use grc_core::dates::normalize_instant;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::date_param;
use crate::store::db_error;
use crate::store::label_column;
use crate::store::new_id;
use crate::store::optional_date_column;
use crate::store::require_changed;
use crate::store::require_row;
use crate::store::timestamp_column;
use crate::store::timestamp_param;

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Column list shared by risk queries.
const RISK_COLUMNS: &str = "id, title, description, category, likelihood, impact, risk_score, \
                            status, owner_id, mitigation_plan, residual_likelihood, \
                            residual_impact, residual_risk_score, review_date, created_by_id, \
                            created_at, updated_at";

/// Decodes a risk row.
fn risk_from_row(row: &Row<'_>) -> rusqlite::Result<Risk> {
    let risk_score: u8 = row.get(6)?;
    Ok(Risk {
        id: RiskId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        likelihood: row.get(4)?,
        impact: row.get(5)?,
        risk_score,
        severity: Severity::from_score(risk_score),
        status: label_column(row, 7, RiskStatus::parse)?,
        owner_id: row.get::<_, Option<String>>(8)?.map(UserId::new),
        mitigation_plan: row.get(9)?,
        residual_likelihood: row.get(10)?,
        residual_impact: row.get(11)?,
        residual_risk_score: row.get(12)?,
        review_date: optional_date_column(row, 13)?,
        created_by_id: row.get::<_, Option<String>>(14)?.map(UserId::new),
        created_at: timestamp_column(row, 15)?,
        updated_at: timestamp_column(row, 16)?,
    })
}

/// Loads a risk on an open connection.
fn load_risk(conn: &Connection, risk_id: &RiskId) -> Result<Risk, SqliteStoreError> {
    let risk = conn
        .query_row(
            &format!("SELECT {RISK_COLUMNS} FROM risk_assessments WHERE id = ?1"),
            params![risk_id.as_str()],
            risk_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(risk, "risk")
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl SqliteGrcStore {
    /// Validates ratings and creates a scored risk.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for out-of-range ratings and
    /// [`SqliteStoreError`] on engine failures.
    pub fn create_risk(
        &self,
        created_by: &UserId,
        request: &NewRisk,
        now: OffsetDateTime,
    ) -> Result<Risk, SqliteStoreError> {
        let ratings = request.validate()?;
        let now = normalize_instant(now);
        let risk_score = ratings.score();
        let risk = Risk {
            id: RiskId::new(new_id()),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            category: request.category.clone(),
            likelihood: ratings.likelihood,
            impact: ratings.impact,
            risk_score,
            severity: Severity::from_score(risk_score),
            status: request.status.unwrap_or(RiskStatus::Identified),
            owner_id: request.owner_id.clone(),
            mitigation_plan: request.mitigation_plan.clone(),
            residual_likelihood: ratings.residual_likelihood,
            residual_impact: ratings.residual_impact,
            residual_risk_score: ratings.residual(),
            review_date: request.review_date,
            created_by_id: Some(created_by.clone()),
            created_at: now,
            updated_at: now,
        };
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO risk_assessments (id, title, description, category, likelihood, impact,
                    risk_score, status, owner_id, mitigation_plan, residual_likelihood,
                    residual_impact, residual_risk_score, review_date, created_by_id, created_at,
                    updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
                params![
                    risk.id.as_str(),
                    risk.title,
                    risk.description,
                    risk.category,
                    risk.likelihood,
                    risk.impact,
                    risk.risk_score,
                    risk.status.as_str(),
                    risk.owner_id.as_ref().map(UserId::as_str),
                    risk.mitigation_plan,
                    risk.residual_likelihood,
                    risk.residual_impact,
                    risk.residual_risk_score,
                    risk.review_date.map(date_param),
                    created_by.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(risk)
    }

    /// Lists risks by descending score.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_risks(&self) -> Result<Vec<Risk>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {RISK_COLUMNS} FROM risk_assessments
                     ORDER BY risk_score DESC, created_at DESC, id"
                ))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], risk_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads one risk.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_risk(&self, risk_id: &RiskId) -> Result<Risk, SqliteStoreError> {
        self.with_connection(|conn| load_risk(conn, risk_id))
    }

    /// Applies a partial update and recomputes scores.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids and
    /// [`SqliteStoreError::Invalid`] for out-of-range ratings.
    pub fn update_risk(
        &self,
        risk_id: &RiskId,
        update: &RiskUpdate,
        now: OffsetDateTime,
    ) -> Result<Risk, SqliteStoreError> {
        let now = normalize_instant(now);
        let stamp = timestamp_param(now)?;
        self.with_transaction(|tx| {
            let mut risk = load_risk(tx, risk_id)?;
            update.apply(&mut risk)?;
            risk.updated_at = now;
            tx.execute(
                "UPDATE risk_assessments SET title = ?2, description = ?3, category = ?4,
                    likelihood = ?5, impact = ?6, risk_score = ?7, status = ?8, owner_id = ?9,
                    mitigation_plan = ?10, residual_likelihood = ?11, residual_impact = ?12,
                    residual_risk_score = ?13, review_date = ?14, updated_at = ?15
                 WHERE id = ?1",
                params![
                    risk_id.as_str(),
                    risk.title,
                    risk.description,
                    risk.category,
                    risk.likelihood,
                    risk.impact,
                    risk.risk_score,
                    risk.status.as_str(),
                    risk.owner_id.as_ref().map(UserId::as_str),
                    risk.mitigation_plan,
                    risk.residual_likelihood,
                    risk.residual_impact,
                    risk.residual_risk_score,
                    risk.review_date.map(date_param),
                    stamp
                ],
            )
            .map_err(db_error)?;
            Ok(risk)
        })
    }

    /// Deletes a risk and its control mappings.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn delete_risk(&self, risk_id: &RiskId) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM risk_assessments WHERE id = ?1", params![risk_id.as_str()])
                .map_err(db_error)?;
            require_changed(changed, "risk")
        })
    }

    /// Links a risk to a mitigating control; repeated links are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when either id does not exist.
    pub fn map_risk_control(
        &self,
        risk_id: &RiskId,
        control_id: &ActivatedControlId,
        now: OffsetDateTime,
    ) -> Result<(), SqliteStoreError> {
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO risk_control_mappings (risk_id, activated_control_id, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING",
                params![risk_id.as_str(), control_id.as_str(), stamp],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Removes a risk to control link.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the link does not exist.
    pub fn unmap_risk_control(
        &self,
        risk_id: &RiskId,
        control_id: &ActivatedControlId,
    ) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "DELETE FROM risk_control_mappings
                     WHERE risk_id = ?1 AND activated_control_id = ?2",
                    params![risk_id.as_str(), control_id.as_str()],
                )
                .map_err(db_error)?;
            require_changed(changed, "mapping")
        })
    }

    /// Lists controls linked to a risk.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown risks.
    pub fn list_risk_controls(
        &self,
        risk_id: &RiskId,
    ) -> Result<Vec<RiskControlView>, SqliteStoreError> {
        self.with_connection(|conn| {
            load_risk(conn, risk_id)?;
            let mut stmt = conn
                .prepare(
                    "SELECT m.activated_control_id, ac.control_library_id, cl.name
                     FROM risk_control_mappings m
                     JOIN activated_controls ac ON ac.id = m.activated_control_id
                     JOIN control_library cl ON cl.id = ac.control_library_id
                     WHERE m.risk_id = ?1
                     ORDER BY ac.control_library_id",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![risk_id.as_str()], |row| {
                    Ok(RiskControlView {
                        activated_control_id: ActivatedControlId::new(row.get::<_, String>(0)?),
                        control_library_id: ControlLibraryId::new(row.get::<_, String>(1)?),
                        control_name: row.get(2)?,
                    })
                })
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Counts open risks per severity, always returning all four buckets.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn risk_distribution(&self) -> Result<Vec<SeverityCount>, SqliteStoreError> {
        let scores: Vec<u8> = self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT risk_score FROM risk_assessments WHERE status <> 'closed'")
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], |row| row.get(0)).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })?;
        Ok(Severity::ALL
            .into_iter()
            .map(|severity| SeverityCount {
                severity,
                count: u64::try_from(
                    scores.iter().filter(|score| Severity::from_score(**score) == severity).count(),
                )
                .unwrap_or(u64::MAX),
            })
            .collect())
    }
}
