// crates/grc-core/src/dsr.rs
// ============================================================================
// Module: GDPR Data-Subject Requests
// Description: DSR records, lifecycle enums, completion, and metrics.
// Purpose: Track statutory requests against their 30-day deadline.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A request receives a deadline 30 days after submission. Completing it
//! records the completion instant and a response summary; the deadline never
//! moves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::OffsetDateTime;

use crate::error::GrcResult;
use crate::error::require_text;
use crate::identifiers::DsrId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// GDPR right being exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsrRequestType {
    /// Article 15 access.
    Access,
    /// Article 17 erasure.
    Erasure,
    /// Article 16 rectification.
    Rectification,
    /// Article 20 portability.
    Portability,
    /// Article 18 restriction.
    Restriction,
    /// Article 21 objection.
    Objection,
}

impl DsrRequestType {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Erasure => "erasure",
            Self::Rectification => "rectification",
            Self::Portability => "portability",
            Self::Restriction => "restriction",
            Self::Objection => "objection",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access" => Some(Self::Access),
            "erasure" => Some(Self::Erasure),
            "rectification" => Some(Self::Rectification),
            "portability" => Some(Self::Portability),
            "restriction" => Some(Self::Restriction),
            "objection" => Some(Self::Objection),
            _ => None,
        }
    }
}

/// Request workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsrStatus {
    /// Received.
    Submitted,
    /// Identity and scope being verified.
    UnderReview,
    /// Being fulfilled.
    InProgress,
    /// Fulfilled.
    Completed,
    /// Refused.
    Rejected,
}

impl DsrStatus {
    /// Every status in workflow order.
    pub const ALL: [Self; 5] =
        [Self::Submitted, Self::UnderReview, Self::InProgress, Self::Completed, Self::Rejected];

    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(Self::Submitted),
            "under_review" => Some(Self::UnderReview),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once no further work is expected.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

/// Request priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsrPriority {
    /// Low.
    Low,
    /// Normal.
    #[default]
    Normal,
    /// High.
    High,
    /// Urgent.
    Urgent,
}

impl DsrPriority {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Stored data-subject request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSubjectRequest {
    /// Request id.
    pub id: DsrId,
    /// Right being exercised.
    pub request_type: DsrRequestType,
    /// Requester name.
    pub requester_name: String,
    /// Requester email.
    pub requester_email: String,
    /// Requester phone.
    pub requester_phone: Option<String>,
    /// Information identifying the data subject.
    pub data_subject_info: String,
    /// Free-form request details.
    pub request_details: Option<String>,
    /// Workflow status.
    pub status: DsrStatus,
    /// Priority.
    pub priority: DsrPriority,
    /// Assignee.
    pub assigned_to_user_id: Option<UserId>,
    /// Statutory deadline.
    pub deadline_date: Date,
    /// Completion instant.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_date: Option<OffsetDateTime>,
    /// Summary sent to the requester.
    pub response_summary: Option<String>,
    /// Reason for rejection.
    pub rejection_reason: Option<String>,
    /// Submission instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update instant.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Request submission body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewDsr {
    /// Right being exercised.
    pub request_type: Option<DsrRequestType>,
    /// Requester name.
    pub requester_name: String,
    /// Requester email.
    pub requester_email: String,
    /// Requester phone.
    pub requester_phone: Option<String>,
    /// Information identifying the data subject.
    pub data_subject_info: String,
    /// Free-form request details.
    pub request_details: Option<String>,
    /// Priority, default normal.
    pub priority: Option<DsrPriority>,
}

impl NewDsr {
    /// Validates the request and returns its type.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing type or blank required text.
    pub fn validate(&self) -> GrcResult<DsrRequestType> {
        let request_type = self
            .request_type
            .ok_or_else(|| crate::error::GrcError::validation("request_type is required"))?;
        require_text("requester_name", &self.requester_name)?;
        require_text("requester_email", &self.requester_email)?;
        require_text("data_subject_info", &self.data_subject_info)?;
        Ok(request_type)
    }
}

/// Admin update body; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct DsrUpdate {
    /// New status.
    pub status: Option<DsrStatus>,
    /// New priority.
    pub priority: Option<DsrPriority>,
    /// New assignee.
    pub assigned_to_user_id: Option<UserId>,
    /// New details.
    pub request_details: Option<String>,
    /// Rejection reason.
    pub rejection_reason: Option<String>,
}

/// Completion body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct DsrCompletion {
    /// Summary sent to the requester.
    pub response_summary: String,
}

impl DsrCompletion {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the summary is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("response_summary", &self.response_summary)
    }
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Aggregate DSR metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsrMetrics {
    /// All requests.
    pub total: u64,
    /// Requests in `submitted`.
    pub submitted: u64,
    /// Requests in `under_review`.
    pub under_review: u64,
    /// Requests in `in_progress`.
    pub in_progress: u64,
    /// Requests in `completed`.
    pub completed: u64,
    /// Requests in `rejected`.
    pub rejected: u64,
    /// Open requests past their deadline.
    pub overdue: u64,
    /// Mean days from submission to completion.
    pub avg_response_days: f64,
    /// Completed share of all requests, in percent.
    pub completion_rate: f64,
}

/// Returns `part / total * 100`, or 0 when `total` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Counts are far below 2^52.")]
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_request_type_is_rejected() {
        let request = NewDsr {
            requester_name: "Ada".to_string(),
            requester_email: "ada@example.com".to_string(),
            data_subject_info: "Customer 42".to_string(),
            ..NewDsr::default()
        };
        assert!(request.validate().is_err());
        let request = NewDsr {
            request_type: Some(DsrRequestType::Erasure),
            ..request
        };
        assert_eq!(request.validate().ok(), Some(DsrRequestType::Erasure));
    }

    #[test]
    fn percentage_handles_empty_totals() {
        assert!(percentage(3, 0).abs() < f64::EPSILON);
        assert!((percentage(1, 4) - 25.0).abs() < f64::EPSILON);
    }
}
