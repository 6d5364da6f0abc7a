// crates/grc-store-sqlite/src/vendors.rs
// ============================================================================
// Module: Vendor Queries
// Description: Vendor CRUD, assessments, and control mappings.
// Purpose: Persist third parties and their periodic risk assessments.
// Dependencies: grc-core, rusqlite, time
// ============================================================================

//! ## Overview
//! Recording an assessment advances the vendor's `last_assessment_date` in the
//! same transaction, never moving it backwards for back-dated assessments.
//! Deleting a vendor cascades to its assessments and control mappings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::AssessmentStatus;
use grc_core::ControlLibraryId;
use grc_core::NewVendor;
use grc_core::NewVendorAssessment;
use grc_core::RiskTier;
use grc_core::UserId;
use grc_core::Vendor;
use grc_core::VendorAssessment;
use grc_core::VendorAssessmentId;
use grc_core::VendorControlView;
use grc_core::VendorId;
use grc_core::VendorStatus;
use grc_core::VendorUpdate;
use grc_core::dates::normalize_instant;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use time::OffsetDateTime;

use crate::store::SqliteGrcStore;
use crate::store::SqliteStoreError;
use crate::store::date_column;
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

/// Column list shared by vendor queries.
const VENDOR_COLUMNS: &str = "id, name, description, category, risk_tier, status, contact_name, \
                              contact_email, contact_phone, website, contract_start_date, \
                              contract_end_date, contract_value, last_assessment_date, \
                              next_assessment_due, owner_id, notes, created_at, updated_at";

/// Column list shared by assessment queries.
const ASSESSMENT_COLUMNS: &str = "id, vendor_id, assessment_date, assessor_id, overall_risk_score, \
                                  data_security_score, compliance_score, \
                                  financial_stability_score, operational_capability_score, \
                                  findings, recommendations, status, created_at, updated_at";

/// Decodes a vendor row.
fn vendor_from_row(row: &Row<'_>) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: VendorId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        risk_tier: label_column(row, 4, RiskTier::parse)?,
        status: label_column(row, 5, VendorStatus::parse)?,
        contact_name: row.get(6)?,
        contact_email: row.get(7)?,
        contact_phone: row.get(8)?,
        website: row.get(9)?,
        contract_start_date: optional_date_column(row, 10)?,
        contract_end_date: optional_date_column(row, 11)?,
        contract_value: row.get(12)?,
        last_assessment_date: optional_date_column(row, 13)?,
        next_assessment_due: optional_date_column(row, 14)?,
        owner_id: row.get::<_, Option<String>>(15)?.map(UserId::new),
        notes: row.get(16)?,
        created_at: timestamp_column(row, 17)?,
        updated_at: timestamp_column(row, 18)?,
    })
}

/// Decodes an assessment row.
fn assessment_from_row(row: &Row<'_>) -> rusqlite::Result<VendorAssessment> {
    Ok(VendorAssessment {
        id: VendorAssessmentId::new(row.get::<_, String>(0)?),
        vendor_id: VendorId::new(row.get::<_, String>(1)?),
        assessment_date: date_column(row, 2)?,
        assessor_id: UserId::new(row.get::<_, String>(3)?),
        overall_risk_score: row.get(4)?,
        data_security_score: row.get(5)?,
        compliance_score: row.get(6)?,
        financial_stability_score: row.get(7)?,
        operational_capability_score: row.get(8)?,
        findings: row.get(9)?,
        recommendations: row.get(10)?,
        status: label_column(row, 11, AssessmentStatus::parse)?,
        created_at: timestamp_column(row, 12)?,
        updated_at: timestamp_column(row, 13)?,
    })
}

/// Loads a vendor on an open connection.
fn load_vendor(conn: &Connection, vendor_id: &VendorId) -> Result<Vendor, SqliteStoreError> {
    let vendor = conn
        .query_row(
            &format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = ?1"),
            params![vendor_id.as_str()],
            vendor_from_row,
        )
        .optional()
        .map_err(db_error)?;
    require_row(vendor, "vendor")
}

/// Drops blank optional text.
fn clean(value: Option<&String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

/// Writes every mutable vendor column.
fn write_vendor(conn: &Connection, vendor: &Vendor) -> Result<(), SqliteStoreError> {
    let updated_at = timestamp_param(vendor.updated_at)?;
    conn.execute(
        "UPDATE vendors SET name = ?2, description = ?3, category = ?4, risk_tier = ?5,
            status = ?6, contact_name = ?7, contact_email = ?8, contact_phone = ?9, website = ?10,
            contract_start_date = ?11, contract_end_date = ?12, contract_value = ?13,
            next_assessment_due = ?14, owner_id = ?15, notes = ?16, updated_at = ?17
         WHERE id = ?1",
        params![
            vendor.id.as_str(),
            vendor.name,
            vendor.description,
            vendor.category,
            vendor.risk_tier.as_str(),
            vendor.status.as_str(),
            vendor.contact_name,
            vendor.contact_email,
            vendor.contact_phone,
            vendor.website,
            vendor.contract_start_date.map(date_param),
            vendor.contract_end_date.map(date_param),
            vendor.contract_value,
            vendor.next_assessment_due.map(date_param),
            vendor.owner_id.as_ref().map(UserId::as_str),
            vendor.notes,
            updated_at
        ],
    )
    .map_err(db_error)?;
    Ok(())
}

// ============================================================================
// SECTION: Queries
// ============================================================================

impl SqliteGrcStore {
    /// Creates a vendor, defaulting to medium tier and active status.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for invalid fields and
    /// [`SqliteStoreError`] when the owner does not exist.
    pub fn create_vendor(
        &self,
        request: &NewVendor,
        now: OffsetDateTime,
    ) -> Result<Vendor, SqliteStoreError> {
        request.validate()?;
        let now = normalize_instant(now);
        let vendor = Vendor {
            id: VendorId::new(new_id()),
            name: request.name.trim().to_string(),
            description: clean(request.description.as_ref()),
            category: request.category.trim().to_string(),
            risk_tier: request.risk_tier.unwrap_or(RiskTier::Medium),
            status: request.status.unwrap_or(VendorStatus::Active),
            contact_name: clean(request.contact_name.as_ref()),
            contact_email: clean(request.contact_email.as_ref()),
            contact_phone: clean(request.contact_phone.as_ref()),
            website: clean(request.website.as_ref()),
            contract_start_date: request.contract_start_date,
            contract_end_date: request.contract_end_date,
            contract_value: request.contract_value,
            last_assessment_date: None,
            next_assessment_due: request.next_assessment_due,
            owner_id: request.owner_id.clone(),
            notes: clean(request.notes.as_ref()),
            created_at: now,
            updated_at: now,
        };
        let stamp = timestamp_param(now)?;
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO vendors (id, name, category, risk_tier, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    vendor.id.as_str(),
                    vendor.name,
                    vendor.category,
                    vendor.risk_tier.as_str(),
                    vendor.status.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            write_vendor(tx, &vendor)?;
            Ok(())
        })?;
        Ok(vendor)
    }

    /// Lists vendors ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failures.
    pub fn list_vendors(&self) -> Result<Vec<Vendor>, SqliteStoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {VENDOR_COLUMNS} FROM vendors ORDER BY name, id"))
                .map_err(db_error)?;
            let rows = stmt.query_map(params![], vendor_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Loads one vendor.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn get_vendor(&self, vendor_id: &VendorId) -> Result<Vendor, SqliteStoreError> {
        self.with_connection(|conn| load_vendor(conn, vendor_id))
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids and
    /// [`SqliteStoreError::Invalid`] for invalid fields.
    pub fn update_vendor(
        &self,
        vendor_id: &VendorId,
        update: &VendorUpdate,
        now: OffsetDateTime,
    ) -> Result<Vendor, SqliteStoreError> {
        let now = normalize_instant(now);
        self.with_transaction(|tx| {
            let mut vendor = load_vendor(tx, vendor_id)?;
            update.apply(&mut vendor)?;
            vendor.updated_at = now;
            write_vendor(tx, &vendor)?;
            Ok(vendor)
        })
    }

    /// Deletes a vendor with its assessments and mappings.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown ids.
    pub fn delete_vendor(&self, vendor_id: &VendorId) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute("DELETE FROM vendors WHERE id = ?1", params![vendor_id.as_str()])
                .map_err(db_error)?;
            require_changed(changed, "vendor")
        })
    }

    /// Records an assessment and advances the vendor's last assessment day.
    ///
    /// `assessor` is used when the request names none; the assessment day
    /// defaults to the UTC date of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown vendors and
    /// [`SqliteStoreError::Invalid`] for out-of-range scores.
    pub fn create_vendor_assessment(
        &self,
        vendor_id: &VendorId,
        assessor: &UserId,
        request: &NewVendorAssessment,
        now: OffsetDateTime,
    ) -> Result<VendorAssessment, SqliteStoreError> {
        let scores = request.validate()?;
        let now = normalize_instant(now);
        let assessment = VendorAssessment {
            id: VendorAssessmentId::new(new_id()),
            vendor_id: vendor_id.clone(),
            assessment_date: request.assessment_date.unwrap_or_else(|| now.date()),
            assessor_id: request
                .assessor_id
                .clone()
                .filter(|id| !id.is_blank())
                .unwrap_or_else(|| assessor.clone()),
            overall_risk_score: scores.overall,
            data_security_score: scores.data_security,
            compliance_score: scores.compliance,
            financial_stability_score: scores.financial_stability,
            operational_capability_score: scores.operational_capability,
            findings: clean(request.findings.as_ref()),
            recommendations: clean(request.recommendations.as_ref()),
            status: request.status.unwrap_or(AssessmentStatus::Draft),
            created_at: now,
            updated_at: now,
        };
        let stamp = timestamp_param(now)?;
        let day = date_param(assessment.assessment_date);
        self.with_transaction(|tx| {
            load_vendor(tx, vendor_id)?;
            tx.execute(
                &format!(
                    "INSERT INTO vendor_assessments ({ASSESSMENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)"
                ),
                params![
                    assessment.id.as_str(),
                    vendor_id.as_str(),
                    day,
                    assessment.assessor_id.as_str(),
                    assessment.overall_risk_score,
                    assessment.data_security_score,
                    assessment.compliance_score,
                    assessment.financial_stability_score,
                    assessment.operational_capability_score,
                    assessment.findings,
                    assessment.recommendations,
                    assessment.status.as_str(),
                    stamp
                ],
            )
            .map_err(db_error)?;
            tx.execute(
                "UPDATE vendors
                 SET last_assessment_date = MAX(COALESCE(last_assessment_date, ''), ?2),
                     updated_at = ?3
                 WHERE id = ?1",
                params![vendor_id.as_str(), day, stamp],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(assessment)
    }

    /// Lists a vendor's assessments, latest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown vendors.
    pub fn list_vendor_assessments(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Vec<VendorAssessment>, SqliteStoreError> {
        self.with_connection(|conn| {
            load_vendor(conn, vendor_id)?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ASSESSMENT_COLUMNS} FROM vendor_assessments
                     WHERE vendor_id = ?1
                     ORDER BY assessment_date DESC, created_at DESC"
                ))
                .map_err(db_error)?;
            let rows =
                stmt.query_map(params![vendor_id.as_str()], assessment_from_row).map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }

    /// Maps a vendor to an activated control; repeats are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when either id does not exist.
    pub fn map_vendor_control(
        &self,
        vendor_id: &VendorId,
        control_id: &ActivatedControlId,
        now: OffsetDateTime,
    ) -> Result<(), SqliteStoreError> {
        let stamp = timestamp_param(now)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO vendor_control_mappings (vendor_id, activated_control_id, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (vendor_id, activated_control_id) DO NOTHING",
                params![vendor_id.as_str(), control_id.as_str(), stamp],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Removes a vendor to control mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] when the mapping does not exist.
    pub fn unmap_vendor_control(
        &self,
        vendor_id: &VendorId,
        control_id: &ActivatedControlId,
    ) -> Result<(), SqliteStoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "DELETE FROM vendor_control_mappings
                     WHERE vendor_id = ?1 AND activated_control_id = ?2",
                    params![vendor_id.as_str(), control_id.as_str()],
                )
                .map_err(db_error)?;
            require_changed(changed, "mapping")
        })
    }

    /// Lists the controls mapped to a vendor.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::NotFound`] for unknown vendors.
    pub fn list_vendor_controls(
        &self,
        vendor_id: &VendorId,
    ) -> Result<Vec<VendorControlView>, SqliteStoreError> {
        self.with_connection(|conn| {
            load_vendor(conn, vendor_id)?;
            let mut stmt = conn
                .prepare(
                    "SELECT m.activated_control_id, ac.control_library_id, cl.name
                     FROM vendor_control_mappings m
                     JOIN activated_controls ac ON ac.id = m.activated_control_id
                     JOIN control_library cl ON cl.id = ac.control_library_id
                     WHERE m.vendor_id = ?1
                     ORDER BY ac.control_library_id",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![vendor_id.as_str()], |row| {
                    Ok(VendorControlView {
                        activated_control_id: ActivatedControlId::new(row.get::<_, String>(0)?),
                        control_library_id: ControlLibraryId::new(row.get::<_, String>(1)?),
                        control_name: row.get(2)?,
                    })
                })
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
        })
    }
}
