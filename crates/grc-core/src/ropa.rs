// crates/grc-core/src/ropa.rs
// ============================================================================
// Module: Records of Processing Activities
// Description: Article 30 processing register entries and their metrics.
// Purpose: Describe what personal data is processed, by whom, and for how long.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Each entry documents one processing activity. Entries are never deleted:
//! removing one archives it, which hides it from the register listing while
//! keeping it counted in the metrics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::GrcResult;
use crate::error::require_text;
use crate::identifiers::RopaId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Register entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RopaStatus {
    /// Being drafted.
    Draft,
    /// In force.
    Active,
    /// Removed from the register.
    Archived,
}

impl RopaStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Stored processing activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingActivity {
    /// Entry id.
    pub id: RopaId,
    /// Activity name.
    pub activity_name: String,
    /// Owning department.
    pub department: Option<String>,
    /// Controller identity and contact details.
    pub data_controller_details: String,
    /// Categories of personal data.
    pub data_categories: String,
    /// Categories of data subjects.
    pub data_subject_categories: String,
    /// Recipients of the data.
    pub recipients: Option<String>,
    /// Transfers outside the EEA.
    pub third_country_transfers: Option<String>,
    /// Retention period.
    pub retention_period: Option<String>,
    /// Technical and organisational measures.
    pub security_measures: Option<String>,
    /// Register status.
    pub status: RopaStatus,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update instant.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Entry creation body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewProcessingActivity {
    /// Activity name.
    pub activity_name: String,
    /// Owning department.
    pub department: Option<String>,
    /// Controller details.
    pub data_controller_details: String,
    /// Categories of personal data.
    pub data_categories: String,
    /// Categories of data subjects.
    pub data_subject_categories: String,
    /// Recipients.
    pub recipients: Option<String>,
    /// Transfers outside the EEA.
    pub third_country_transfers: Option<String>,
    /// Retention period.
    pub retention_period: Option<String>,
    /// Security measures.
    pub security_measures: Option<String>,
    /// Status, default draft.
    pub status: Option<RopaStatus>,
}

impl NewProcessingActivity {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a required description is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("activity_name", &self.activity_name)?;
        require_text("data_controller_details", &self.data_controller_details)?;
        require_text("data_categories", &self.data_categories)?;
        require_text("data_subject_categories", &self.data_subject_categories)
    }
}

/// Partial entry update; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ProcessingActivityUpdate {
    /// New name.
    pub activity_name: Option<String>,
    /// New department.
    pub department: Option<String>,
    /// New controller details.
    pub data_controller_details: Option<String>,
    /// New data categories.
    pub data_categories: Option<String>,
    /// New subject categories.
    pub data_subject_categories: Option<String>,
    /// New recipients.
    pub recipients: Option<String>,
    /// New transfer description.
    pub third_country_transfers: Option<String>,
    /// New retention period.
    pub retention_period: Option<String>,
    /// New security measures.
    pub security_measures: Option<String>,
    /// New status.
    pub status: Option<RopaStatus>,
}

impl ProcessingActivityUpdate {
    /// Applies the update to a stored entry.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a required description becomes blank.
    pub fn apply(&self, entry: &mut ProcessingActivity) -> GrcResult<()> {
        for (field, value, target) in [
            ("activity_name", &self.activity_name, &mut entry.activity_name),
            ("data_controller_details", &self.data_controller_details, &mut entry.data_controller_details),
            ("data_categories", &self.data_categories, &mut entry.data_categories),
            ("data_subject_categories", &self.data_subject_categories, &mut entry.data_subject_categories),
        ] {
            if let Some(value) = value {
                require_text(field, value)?;
                target.clone_from(value);
            }
        }
        for (value, target) in [
            (&self.department, &mut entry.department),
            (&self.recipients, &mut entry.recipients),
            (&self.third_country_transfers, &mut entry.third_country_transfers),
            (&self.retention_period, &mut entry.retention_period),
            (&self.security_measures, &mut entry.security_measures),
        ] {
            if value.is_some() {
                target.clone_from(value);
            }
        }
        if let Some(status) = self.status {
            entry.status = status;
        }
        Ok(())
    }
}

/// Register counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RopaMetrics {
    /// All entries, archived included.
    pub total_processing_activities: u64,
    /// Entries in force.
    pub active: u64,
    /// Entries being drafted.
    pub draft: u64,
    /// Archived entries.
    pub archived: u64,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
