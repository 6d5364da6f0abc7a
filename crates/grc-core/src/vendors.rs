// crates/grc-core/src/vendors.rs
// ============================================================================
// Module: Vendor Management
// Description: Third-party vendors, their assessments, and control mappings.
// Purpose: Track supplier risk tiers, contracts, and periodic assessments.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A vendor carries a risk tier, a lifecycle status, and contract metadata.
//! Assessments score a vendor across four 1..=5 dimensions plus an overall
//! 1..=25 score; recording one advances the vendor's last assessment date.

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
use crate::identifiers::UserId;
use crate::identifiers::VendorAssessmentId;
use crate::identifiers::VendorId;
use crate::risks::validate_rating;

/// Highest overall assessment score (5 x 5).
pub const MAX_OVERALL_SCORE: u8 = 25;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Inherent risk a vendor poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
    /// Critical.
    Critical,
}

impl RiskTier {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Vendor relationship status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorStatus {
    /// Engaged.
    Active,
    /// Paused.
    Inactive,
    /// Being evaluated.
    UnderReview,
    /// Relationship ended.
    Terminated,
}

impl VendorStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::UnderReview => "under_review",
            Self::Terminated => "terminated",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "under_review" => Some(Self::UnderReview),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// Assessment workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Still being filled in.
    Draft,
    /// Signed off.
    Completed,
}

impl AssessmentStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Completed => "completed",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Stored vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    /// Vendor id.
    pub id: VendorId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Category such as `saas` or `hosting`.
    pub category: String,
    /// Inherent risk tier.
    pub risk_tier: RiskTier,
    /// Relationship status.
    pub status: VendorStatus,
    /// Primary contact.
    pub contact_name: Option<String>,
    /// Contact email.
    pub contact_email: Option<String>,
    /// Contact phone.
    pub contact_phone: Option<String>,
    /// Website.
    pub website: Option<String>,
    /// Contract start.
    pub contract_start_date: Option<Date>,
    /// Contract end.
    pub contract_end_date: Option<Date>,
    /// Annual contract value.
    pub contract_value: Option<f64>,
    /// Day of the latest assessment.
    pub last_assessment_date: Option<Date>,
    /// Day the next assessment is due.
    pub next_assessment_due: Option<Date>,
    /// Responsible user.
    pub owner_id: Option<UserId>,
    /// Notes.
    pub notes: Option<String>,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update instant.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Stored vendor assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorAssessment {
    /// Assessment id.
    pub id: VendorAssessmentId,
    /// Assessed vendor.
    pub vendor_id: VendorId,
    /// Day of the assessment.
    pub assessment_date: Date,
    /// Assessor.
    pub assessor_id: UserId,
    /// Overall score, 1..=25.
    pub overall_risk_score: u8,
    /// Data security score.
    pub data_security_score: Option<u8>,
    /// Compliance score.
    pub compliance_score: Option<u8>,
    /// Financial stability score.
    pub financial_stability_score: Option<u8>,
    /// Operational capability score.
    pub operational_capability_score: Option<u8>,
    /// Findings.
    pub findings: Option<String>,
    /// Recommendations.
    pub recommendations: Option<String>,
    /// Workflow status.
    pub status: AssessmentStatus,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update instant.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Vendor creation body.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct NewVendor {
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Category.
    pub category: String,
    /// Risk tier, default medium.
    pub risk_tier: Option<RiskTier>,
    /// Status, default active.
    pub status: Option<VendorStatus>,
    /// Primary contact.
    pub contact_name: Option<String>,
    /// Contact email.
    pub contact_email: Option<String>,
    /// Contact phone.
    pub contact_phone: Option<String>,
    /// Website.
    pub website: Option<String>,
    /// Contract start.
    pub contract_start_date: Option<Date>,
    /// Contract end.
    pub contract_end_date: Option<Date>,
    /// Annual contract value.
    pub contract_value: Option<f64>,
    /// Day the next assessment is due.
    pub next_assessment_due: Option<Date>,
    /// Responsible user.
    pub owner_id: Option<UserId>,
    /// Notes.
    pub notes: Option<String>,
}

impl NewVendor {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank name or category, a negative
    /// contract value, or a contract ending before it starts.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("name", &self.name)?;
        require_text("category", &self.category)?;
        validate_contract(self.contract_start_date, self.contract_end_date, self.contract_value)
    }
}

/// Partial vendor update; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct VendorUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New risk tier.
    pub risk_tier: Option<RiskTier>,
    /// New status.
    pub status: Option<VendorStatus>,
    /// New contact.
    pub contact_name: Option<String>,
    /// New contact email.
    pub contact_email: Option<String>,
    /// New contact phone.
    pub contact_phone: Option<String>,
    /// New website.
    pub website: Option<String>,
    /// New contract start.
    pub contract_start_date: Option<Date>,
    /// New contract end.
    pub contract_end_date: Option<Date>,
    /// New contract value.
    pub contract_value: Option<f64>,
    /// New next assessment day.
    pub next_assessment_due: Option<Date>,
    /// New owner.
    pub owner_id: Option<UserId>,
    /// New notes.
    pub notes: Option<String>,
}

impl VendorUpdate {
    /// Applies the update to a stored vendor.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank name or category, or contract
    /// fields that are inconsistent after the update.
    pub fn apply(&self, vendor: &mut Vendor) -> GrcResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
            vendor.name.clone_from(name);
        }
        if let Some(category) = &self.category {
            require_text("category", category)?;
            vendor.category.clone_from(category);
        }
        if let Some(risk_tier) = self.risk_tier {
            vendor.risk_tier = risk_tier;
        }
        if let Some(status) = self.status {
            vendor.status = status;
        }
        replace(&mut vendor.description, &self.description);
        replace(&mut vendor.contact_name, &self.contact_name);
        replace(&mut vendor.contact_email, &self.contact_email);
        replace(&mut vendor.contact_phone, &self.contact_phone);
        replace(&mut vendor.website, &self.website);
        replace(&mut vendor.notes, &self.notes);
        replace(&mut vendor.owner_id, &self.owner_id);
        replace(&mut vendor.contract_start_date, &self.contract_start_date);
        replace(&mut vendor.contract_end_date, &self.contract_end_date);
        replace(&mut vendor.contract_value, &self.contract_value);
        replace(&mut vendor.next_assessment_due, &self.next_assessment_due);
        validate_contract(vendor.contract_start_date, vendor.contract_end_date, vendor.contract_value)
    }
}

/// Assessment creation body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewVendorAssessment {
    /// Day of the assessment, default today.
    pub assessment_date: Option<Date>,
    /// Assessor, default the caller.
    pub assessor_id: Option<UserId>,
    /// Overall score, 1..=25.
    pub overall_risk_score: i64,
    /// Data security score, 1..=5.
    pub data_security_score: Option<i64>,
    /// Compliance score, 1..=5.
    pub compliance_score: Option<i64>,
    /// Financial stability score, 1..=5.
    pub financial_stability_score: Option<i64>,
    /// Operational capability score, 1..=5.
    pub operational_capability_score: Option<i64>,
    /// Findings.
    pub findings: Option<String>,
    /// Recommendations.
    pub recommendations: Option<String>,
    /// Status, default draft.
    pub status: Option<AssessmentStatus>,
}

/// Assessment scores after range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentScores {
    /// Overall score.
    pub overall: u8,
    /// Data security score.
    pub data_security: Option<u8>,
    /// Compliance score.
    pub compliance: Option<u8>,
    /// Financial stability score.
    pub financial_stability: Option<u8>,
    /// Operational capability score.
    pub operational_capability: Option<u8>,
}

impl NewVendorAssessment {
    /// Validates every score and returns them narrowed.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first score out of range.
    pub fn validate(&self) -> GrcResult<AssessmentScores> {
        let overall = u8::try_from(self.overall_risk_score)
            .ok()
            .filter(|score| (1..=MAX_OVERALL_SCORE).contains(score))
            .ok_or_else(|| GrcError::validation("overall_risk_score must be between 1 and 25"))?;
        Ok(AssessmentScores {
            overall,
            data_security: optional_score("data_security_score", self.data_security_score)?,
            compliance: optional_score("compliance_score", self.compliance_score)?,
            financial_stability: optional_score("financial_stability_score", self.financial_stability_score)?,
            operational_capability: optional_score(
                "operational_capability_score",
                self.operational_capability_score,
            )?,
        })
    }
}

/// Vendor to control mapping body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct VendorControlLink {
    /// Vendor.
    pub vendor_id: String,
    /// Activated control.
    pub activated_control_id: String,
}

impl VendorControlLink {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either id is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("vendor_id", &self.vendor_id)?;
        require_text("activated_control_id", &self.activated_control_id)
    }
}

/// Control mapped to a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorControlView {
    /// Activated control id.
    pub activated_control_id: ActivatedControlId,
    /// Catalog code.
    pub control_library_id: ControlLibraryId,
    /// Catalog name.
    pub control_name: String,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Overwrites `target` when the update carries a value.
fn replace<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

/// Checks an optional 1..=5 score.
fn optional_score(field: &str, value: Option<i64>) -> GrcResult<Option<u8>> {
    value.map(|score| validate_rating(field, score)).transpose()
}

/// Checks contract dates and value for consistency.
fn validate_contract(start: Option<Date>, end: Option<Date>, value: Option<f64>) -> GrcResult<()> {
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        return Err(GrcError::validation("contract_end_date must not precede contract_start_date"));
    }
    if value.is_some_and(|value| !value.is_finite() || value < 0.0) {
        return Err(GrcError::validation("contract_value must be a non-negative number"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions are permitted.")]

    use time::macros::date;

    use super::*;

    #[test]
    fn overall_score_is_bounded_by_twenty_five() {
        let mut request = NewVendorAssessment {
            overall_risk_score: 25,
            data_security_score: Some(5),
            ..NewVendorAssessment::default()
        };
        let scores = request.validate().expect("valid");
        assert_eq!(scores.overall, 25);
        assert_eq!(scores.data_security, Some(5));

        request.overall_risk_score = 26;
        assert!(request.validate().is_err());
        request.overall_risk_score = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn dimension_scores_use_five_point_scale() {
        let request = NewVendorAssessment {
            overall_risk_score: 10,
            compliance_score: Some(6),
            ..NewVendorAssessment::default()
        };
        let error = request.validate().expect_err("out of range");
        assert!(error.to_string().contains("compliance_score"));
    }

    #[test]
    fn contract_must_not_end_before_it_starts() {
        let request = NewVendor {
            name: "Acme".to_string(),
            category: "saas".to_string(),
            contract_start_date: Some(date!(2025 - 06 - 01)),
            contract_end_date: Some(date!(2025 - 01 - 01)),
            ..NewVendor::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn status_labels_round_trip() {
        for status in
            [VendorStatus::Active, VendorStatus::Inactive, VendorStatus::UnderReview, VendorStatus::Terminated]
        {
            assert_eq!(VendorStatus::parse(status.as_str()), Some(status));
        }
        for tier in [RiskTier::Low, RiskTier::Medium, RiskTier::High, RiskTier::Critical] {
            assert_eq!(RiskTier::parse(tier.as_str()), Some(tier));
        }
    }
}
