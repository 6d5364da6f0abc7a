// crates/grc-core/src/controls.rs
// ============================================================================
// Module: Control Lifecycle Types
// Description: Control catalog entries, activated controls, and evidence.
// Purpose: Model the review lifecycle and validate its inputs.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`ControlLibraryItem`] is catalog reference data. Activating one creates
//! an [`ActivatedControl`] with an owner and a review interval; each evidence
//! submission appends an [`EvidenceRecord`] and moves the control's next
//! review due date forward by the interval.
//!
//! Invariant: `next_review_due_date` equals the last review day (or the
//! activation day) plus `review_interval_days`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::OffsetDateTime;

use crate::error::GrcError;
use crate::error::GrcResult;
use crate::error::require_text;
use crate::identifiers::ActivatedControlId;
use crate::identifiers::ControlLibraryId;
use crate::identifiers::EvidenceId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version tag written into library exports.
pub const LIBRARY_EXPORT_VERSION: &str = "1.0";

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Control catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlLibraryItem {
    /// Catalog code.
    pub id: ControlLibraryId,
    /// Standard the control belongs to.
    #[serde(default)]
    pub standard: String,
    /// Control family or domain.
    #[serde(default)]
    pub family: String,
    /// Short control name.
    #[serde(default)]
    pub name: String,
    /// Full control description.
    #[serde(default)]
    pub description: String,
}

impl ControlLibraryItem {
    /// Validates a catalog entry for create or update.
    ///
    /// # Errors
    ///
    /// Returns a validation error when any field is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("id", self.id.as_str())?;
        require_text("standard", &self.standard)?;
        require_text("family", &self.family)?;
        require_text("name", &self.name)?;
        require_text("description", &self.description)
    }

    /// Validates a catalog entry received through bulk import.
    ///
    /// Imports only require the id, standard, and name.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a required field is blank.
    pub fn validate_for_import(&self) -> GrcResult<()> {
        require_text("id", self.id.as_str())?;
        require_text("standard", &self.standard)?;
        require_text("name", &self.name)
    }
}

/// Catalog fields replaced by an update; the id comes from the path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LibraryItemFields {
    /// Standard the control belongs to.
    pub standard: String,
    /// Control family or domain.
    pub family: String,
    /// Short control name.
    pub name: String,
    /// Full control description.
    pub description: String,
}

impl LibraryItemFields {
    /// Attaches the fields to a catalog id.
    #[must_use]
    pub fn into_item(self, id: ControlLibraryId) -> ControlLibraryItem {
        ControlLibraryItem {
            id,
            standard: self.standard,
            family: self.family,
            name: self.name,
            description: self.description,
        }
    }
}

/// Bulk import request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibraryImportRequest {
    /// Entries to import.
    #[serde(default)]
    pub controls: Vec<ControlLibraryItem>,
    /// Overwrite entries whose id already exists.
    #[serde(default)]
    pub replace_existing: bool,
}

impl LibraryImportRequest {
    /// Validates the batch before any row is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty batch or the first invalid entry.
    pub fn validate(&self) -> GrcResult<()> {
        if self.controls.is_empty() {
            return Err(GrcError::validation("no controls provided"));
        }
        for (index, control) in self.controls.iter().enumerate() {
            control.validate_for_import().map_err(|err| {
                GrcError::validation(format!("invalid control at index {index}: {}", err.message()))
            })?;
        }
        Ok(())
    }
}

/// Result of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows inserted or replaced.
    pub imported_count: u64,
    /// Rows in the request.
    pub total_sent: u64,
}

/// Full catalog export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryExport {
    /// Every catalog entry ordered by id.
    pub controls: Vec<ControlLibraryItem>,
    /// Export instant.
    #[serde(with = "time::serde::rfc3339")]
    pub exported_at: OffsetDateTime,
    /// Number of entries.
    pub total_count: u64,
    /// Export format version.
    pub export_version: String,
}

// ============================================================================
// SECTION: Activated Controls
// ============================================================================

/// Lifecycle status of an activated control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    /// Control is under periodic review.
    Active,
    /// Control no longer applies; kept for history.
    Retired,
}

impl ControlStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Retired => "retired",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "retired" => Some(Self::Retired),
            _ => None,
        }
    }
}

/// Organization instance of a catalog control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedControl {
    /// Activated control id.
    pub id: ActivatedControlId,
    /// Catalog entry this control instantiates.
    pub control_library_id: ControlLibraryId,
    /// Responsible user.
    pub owner_id: UserId,
    /// Lifecycle status.
    pub status: ControlStatus,
    /// Days between reviews.
    pub review_interval_days: u32,
    /// Day the next review is due.
    pub next_review_due_date: Date,
    /// Instant of the most recent evidence submission.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_reviewed_at: Option<OffsetDateTime>,
    /// Activation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Activated control joined with its catalog name and owner name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveControlView {
    /// Activated control id.
    pub id: ActivatedControlId,
    /// Catalog code.
    pub control_library_id: ControlLibraryId,
    /// Catalog name.
    pub control_name: String,
    /// Standard of the catalog entry.
    pub standard: String,
    /// Responsible user.
    pub owner_id: UserId,
    /// Responsible user's display name.
    pub owner_name: String,
    /// Lifecycle status.
    pub status: ControlStatus,
    /// Days between reviews.
    pub review_interval_days: u32,
    /// Day the next review is due.
    pub next_review_due_date: Date,
    /// Instant of the most recent evidence submission.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_reviewed_at: Option<OffsetDateTime>,
}

/// Activated control with its evidence history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlDetail {
    /// Control summary.
    pub control: ActiveControlView,
    /// Evidence history.
    pub evidence: Vec<EvidenceRecord>,
}

/// Activation request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivateControlRequest {
    /// Catalog entry to activate.
    pub control_library_id: ControlLibraryId,
    /// Responsible user.
    pub owner_id: UserId,
    /// Days between reviews; must be positive.
    pub review_interval_days: i64,
}

impl ActivateControlRequest {
    /// Validates the request and returns the interval as an unsigned count.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank ids or a non-positive interval.
    pub fn validate(&self) -> GrcResult<u32> {
        require_text("control_library_id", self.control_library_id.as_str())?;
        require_text("owner_id", self.owner_id.as_str())?;
        if self.review_interval_days <= 0 {
            return Err(GrcError::validation("review_interval_days must be positive"));
        }
        u32::try_from(self.review_interval_days)
            .map_err(|_| GrcError::validation("review_interval_days out of range"))
    }
}

/// Control found by a due or overdue scan, with the owner's contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlScanHit {
    /// Activated control id.
    pub activated_control_id: ActivatedControlId,
    /// Catalog code.
    pub control_library_id: ControlLibraryId,
    /// Catalog name.
    pub control_name: String,
    /// Responsible user.
    pub owner_id: UserId,
    /// Responsible user's display name.
    pub owner_name: String,
    /// Responsible user's email address, when known.
    pub owner_email: Option<String>,
    /// Day the review was due.
    pub next_review_due_date: Date,
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Compliance verdict recorded with evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    /// Control operates as intended.
    Compliant,
    /// Control does not operate as intended.
    NonCompliant,
    /// Control operates with gaps.
    PartiallyCompliant,
    /// Control does not apply in the review period.
    NotApplicable,
}

impl ComplianceStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non-compliant",
            Self::PartiallyCompliant => "partially-compliant",
            Self::NotApplicable => "not-applicable",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "compliant" => Some(Self::Compliant),
            "non-compliant" => Some(Self::NonCompliant),
            "partially-compliant" => Some(Self::PartiallyCompliant),
            "not-applicable" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Evidence submission request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvidenceSubmission {
    /// Verdict label.
    #[serde(default)]
    pub compliance_status: String,
    /// Reviewer notes.
    #[serde(default)]
    pub notes: String,
    /// Optional link to supporting material.
    #[serde(default)]
    pub evidence_link: Option<String>,
}

impl EvidenceSubmission {
    /// Validates the submission and returns the parsed verdict.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank or unknown status or blank notes.
    pub fn validate(&self) -> GrcResult<ComplianceStatus> {
        require_text("compliance_status", &self.compliance_status)?;
        require_text("notes", &self.notes)?;
        ComplianceStatus::parse(self.compliance_status.trim()).ok_or_else(|| {
            GrcError::validation(format!("unknown compliance_status {}", self.compliance_status))
        })
    }
}

/// Append-only compliance attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Evidence id.
    pub id: EvidenceId,
    /// Control the evidence attests.
    pub activated_control_id: ActivatedControlId,
    /// Author.
    pub performed_by_id: UserId,
    /// Submission instant.
    #[serde(with = "time::serde::rfc3339")]
    pub performed_at: OffsetDateTime,
    /// Verdict.
    pub compliance_status: ComplianceStatus,
    /// Reviewer notes.
    pub notes: String,
    /// Optional link to supporting material.
    pub evidence_link: Option<String>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, standard: &str, name: &str) -> ControlLibraryItem {
        ControlLibraryItem {
            id: ControlLibraryId::new(id),
            standard: standard.to_string(),
            family: String::new(),
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn update_fields_take_path_id() {
        let fields: LibraryItemFields = serde_json::from_str(
            r#"{"standard":"CIS v8","family":"Inventory","name":"Asset list","description":"Keep it"}"#,
        )
        .unwrap_or_default();
        let item = fields.into_item(ControlLibraryId::new("CIS-1.1"));
        assert_eq!(item.id, ControlLibraryId::new("CIS-1.1"));
        assert!(item.validate().is_ok());
        let blank = LibraryItemFields::default().into_item(ControlLibraryId::new("CIS-1.1"));
        assert!(blank.validate().is_err());
    }

    #[test]
    fn import_requires_only_id_standard_and_name() {
        let request = LibraryImportRequest {
            controls: vec![item("X-1", "Custom", "Backups")],
            replace_existing: false,
        };
        assert!(request.validate().is_ok());
        assert!(item("X-1", "Custom", "Backups").validate().is_err());
    }

    #[test]
    fn import_reports_the_failing_index() {
        let request = LibraryImportRequest {
            controls: vec![item("X-1", "Custom", "Backups"), item("X-2", "", "Patching")],
            replace_existing: true,
        };
        let message = request.validate().err().map(|err| err.message().to_string());
        assert_eq!(message.as_deref(), Some("invalid control at index 1: standard is required"));
    }

    #[test]
    fn activation_rejects_non_positive_intervals() {
        let mut request = ActivateControlRequest {
            control_library_id: ControlLibraryId::new("CIS-1.1"),
            owner_id: UserId::new("u-1"),
            review_interval_days: 0,
        };
        assert!(request.validate().is_err());
        request.review_interval_days = 90;
        assert_eq!(request.validate().ok(), Some(90));
    }

    #[test]
    fn evidence_status_labels_parse() {
        let submission = EvidenceSubmission {
            compliance_status: "non-compliant".to_string(),
            notes: "Firewall rules drifted".to_string(),
            evidence_link: None,
        };
        assert_eq!(submission.validate().ok(), Some(ComplianceStatus::NonCompliant));
        let unknown = EvidenceSubmission {
            compliance_status: "maybe".to_string(),
            ..submission
        };
        assert!(unknown.validate().is_err());
    }
}
