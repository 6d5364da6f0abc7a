// crates/grc-core/src/risks.rs
// ============================================================================
// Module: Risks
// Description: Risk assessments, scoring, and severity buckets.
// Purpose: Score risks as likelihood times impact and bucket them by severity.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Likelihood and impact are each rated 1 to 5, so a risk score lies in
//! 1..=25. Residual ratings describe the risk after mitigation; the residual
//! score is their product, or 0 when either is unrated.

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
use crate::identifiers::RiskId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lowest rating.
pub const MIN_RATING: u8 = 1;

/// Highest rating.
pub const MAX_RATING: u8 = 5;

// ============================================================================
// SECTION: Scoring
// ============================================================================

/// Validates a 1..=5 rating.
///
/// # Errors
///
/// Returns a validation error naming the field when out of range.
pub fn validate_rating(field: &str, value: i64) -> GrcResult<u8> {
    u8::try_from(value)
        .ok()
        .filter(|rating| (MIN_RATING..=MAX_RATING).contains(rating))
        .ok_or_else(|| GrcError::validation(format!("{field} must be between 1 and 5")))
}

/// Returns likelihood times impact.
#[must_use]
pub const fn risk_score(likelihood: u8, impact: u8) -> u8 {
    likelihood.saturating_mul(impact)
}

/// Returns the residual score, or 0 unless both residual ratings exist.
#[must_use]
pub fn residual_score(likelihood: Option<u8>, impact: Option<u8>) -> u8 {
    match (likelihood, impact) {
        (Some(likelihood), Some(impact)) => risk_score(likelihood, impact),
        _ => 0,
    }
}

/// Severity bucket derived from a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Score 15 and above.
    Critical,
    /// Score 10 to 14.
    High,
    /// Score 6 to 9.
    Medium,
    /// Score 5 and below.
    Low,
}

impl Severity {
    /// Buckets in report order, most severe first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Buckets a risk score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            15.. => Self::Critical,
            10..=14 => Self::High,
            6..=9 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Returns the display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Open risks per severity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCount {
    /// Bucket.
    pub severity: Severity,
    /// Open risks in the bucket.
    pub count: u64,
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Risk workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    /// Recorded, not yet assessed.
    Identified,
    /// Assessed.
    Assessed,
    /// Mitigation in place.
    Mitigated,
    /// Accepted by the business.
    Accepted,
    /// No longer relevant.
    Closed,
}

impl RiskStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identified => "identified",
            Self::Assessed => "assessed",
            Self::Mitigated => "mitigated",
            Self::Accepted => "accepted",
            Self::Closed => "closed",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "identified" => Some(Self::Identified),
            "assessed" => Some(Self::Assessed),
            "mitigated" => Some(Self::Mitigated),
            "accepted" => Some(Self::Accepted),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Stored risk assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    /// Risk id.
    pub id: RiskId,
    /// Short summary.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Free-form category.
    pub category: Option<String>,
    /// Likelihood rating.
    pub likelihood: u8,
    /// Impact rating.
    pub impact: u8,
    /// Likelihood times impact.
    pub risk_score: u8,
    /// Severity bucket of the score.
    pub severity: Severity,
    /// Workflow status.
    pub status: RiskStatus,
    /// Responsible user.
    pub owner_id: Option<UserId>,
    /// Planned mitigation.
    pub mitigation_plan: Option<String>,
    /// Likelihood after mitigation.
    pub residual_likelihood: Option<u8>,
    /// Impact after mitigation.
    pub residual_impact: Option<u8>,
    /// Residual score, 0 when unrated.
    pub residual_risk_score: u8,
    /// Next review day.
    pub review_date: Option<Date>,
    /// Creator.
    pub created_by_id: Option<UserId>,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update instant.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Risk creation body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewRisk {
    /// Short summary.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Free-form category.
    pub category: Option<String>,
    /// Likelihood rating.
    pub likelihood: i64,
    /// Impact rating.
    pub impact: i64,
    /// Workflow status, default identified.
    pub status: Option<RiskStatus>,
    /// Responsible user.
    pub owner_id: Option<UserId>,
    /// Planned mitigation.
    pub mitigation_plan: Option<String>,
    /// Likelihood after mitigation.
    pub residual_likelihood: Option<i64>,
    /// Impact after mitigation.
    pub residual_impact: Option<i64>,
    /// Next review day.
    pub review_date: Option<Date>,
}

/// Ratings of a validated risk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskRatings {
    /// Likelihood rating.
    pub likelihood: u8,
    /// Impact rating.
    pub impact: u8,
    /// Residual likelihood rating.
    pub residual_likelihood: Option<u8>,
    /// Residual impact rating.
    pub residual_impact: Option<u8>,
}

impl RiskRatings {
    /// Returns the inherent score.
    #[must_use]
    pub const fn score(&self) -> u8 {
        risk_score(self.likelihood, self.impact)
    }

    /// Returns the residual score.
    #[must_use]
    pub fn residual(&self) -> u8 {
        residual_score(self.residual_likelihood, self.residual_impact)
    }
}

/// Validates an optional rating.
fn optional_rating(field: &str, value: Option<i64>) -> GrcResult<Option<u8>> {
    value.map(|value| validate_rating(field, value)).transpose()
}

impl NewRisk {
    /// Validates the request and returns its ratings.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank text or out-of-range ratings.
    pub fn validate(&self) -> GrcResult<RiskRatings> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        Ok(RiskRatings {
            likelihood: validate_rating("likelihood", self.likelihood)?,
            impact: validate_rating("impact", self.impact)?,
            residual_likelihood: optional_rating("residual_likelihood", self.residual_likelihood)?,
            residual_impact: optional_rating("residual_impact", self.residual_impact)?,
        })
    }
}

/// Partial risk update; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RiskUpdate {
    /// New summary.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New likelihood rating.
    pub likelihood: Option<i64>,
    /// New impact rating.
    pub impact: Option<i64>,
    /// New status.
    pub status: Option<RiskStatus>,
    /// New owner.
    pub owner_id: Option<UserId>,
    /// New mitigation plan.
    pub mitigation_plan: Option<String>,
    /// New residual likelihood.
    pub residual_likelihood: Option<i64>,
    /// New residual impact.
    pub residual_impact: Option<i64>,
    /// New review day.
    pub review_date: Option<Date>,
}

impl RiskUpdate {
    /// Applies the update to a stored risk and recomputes both scores.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank text or out-of-range ratings.
    pub fn apply(&self, risk: &mut Risk) -> GrcResult<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
            risk.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            require_text("description", description)?;
            risk.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            risk.category = Some(category.clone());
        }
        if let Some(likelihood) = self.likelihood {
            risk.likelihood = validate_rating("likelihood", likelihood)?;
        }
        if let Some(impact) = self.impact {
            risk.impact = validate_rating("impact", impact)?;
        }
        if let Some(status) = self.status {
            risk.status = status;
        }
        if let Some(owner_id) = &self.owner_id {
            risk.owner_id = Some(owner_id.clone());
        }
        if let Some(plan) = &self.mitigation_plan {
            risk.mitigation_plan = Some(plan.clone());
        }
        if self.residual_likelihood.is_some() {
            risk.residual_likelihood = optional_rating("residual_likelihood", self.residual_likelihood)?;
        }
        if self.residual_impact.is_some() {
            risk.residual_impact = optional_rating("residual_impact", self.residual_impact)?;
        }
        if let Some(review_date) = self.review_date {
            risk.review_date = Some(review_date);
        }
        risk.risk_score = risk_score(risk.likelihood, risk.impact);
        risk.severity = Severity::from_score(risk.risk_score);
        risk.residual_risk_score = residual_score(risk.residual_likelihood, risk.residual_impact);
        Ok(())
    }
}

/// Risk to control mapping body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RiskControlLink {
    /// Risk.
    pub risk_id: String,
    /// Activated control.
    pub activated_control_id: String,
}

impl RiskControlLink {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either id is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("risk_id", &self.risk_id)?;
        require_text("activated_control_id", &self.activated_control_id)
    }
}

/// Control mapped to a risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskControlView {
    /// Activated control id.
    pub activated_control_id: ActivatedControlId,
    /// Catalog code.
    pub control_library_id: ControlLibraryId,
    /// Catalog name.
    pub control_name: String,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn severity_thresholds() {
        assert_eq!(Severity::from_score(25), Severity::Critical);
        assert_eq!(Severity::from_score(15), Severity::Critical);
        assert_eq!(Severity::from_score(14), Severity::High);
        assert_eq!(Severity::from_score(10), Severity::High);
        assert_eq!(Severity::from_score(9), Severity::Medium);
        assert_eq!(Severity::from_score(6), Severity::Medium);
        assert_eq!(Severity::from_score(5), Severity::Low);
        assert_eq!(Severity::from_score(1), Severity::Low);
    }

    #[test]
    fn residual_score_needs_both_ratings() {
        assert_eq!(residual_score(Some(2), None), 0);
        assert_eq!(residual_score(Some(2), Some(3)), 6);
    }

    #[test]
    fn new_risk_rejects_out_of_range_ratings() {
        let risk = NewRisk {
            title: "Ransomware".to_string(),
            description: "Encrypted file shares".to_string(),
            likelihood: 6,
            impact: 4,
            ..NewRisk::default()
        };
        assert!(risk.validate().is_err());
        let risk = NewRisk {
            likelihood: 4,
            ..risk
        };
        assert_eq!(risk.validate().map(|ratings| ratings.score()).ok(), Some(16));
    }

    proptest! {
        #[test]
        fn score_is_product_for_all_valid_ratings(likelihood in 1_i64..=5, impact in 1_i64..=5) {
            let l = validate_rating("likelihood", likelihood).unwrap_or(0);
            let i = validate_rating("impact", impact).unwrap_or(0);
            prop_assert_eq!(i64::from(risk_score(l, i)), likelihood * impact);
        }
    }
}
