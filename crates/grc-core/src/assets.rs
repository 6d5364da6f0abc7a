// crates/grc-core/src/assets.rs
// ============================================================================
// Module: Assets
// Description: Asset inventory records and asset to control mappings.
// Purpose: Track what the organization protects and which controls cover it.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Assets are plain inventory rows. A mapping ties an asset to an activated
//! control with a free-form mapping type (for example `implements`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::GrcResult;
use crate::error::require_text;
use crate::identifiers::ActivatedControlId;
use crate::identifiers::AssetId;
use crate::identifiers::ControlLibraryId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Mapping type used when the request omits one.
pub const DEFAULT_MAPPING_TYPE: &str = "implements";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Asset lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// In service.
    Active,
    /// Temporarily out of service.
    Inactive,
    /// Permanently removed.
    Decommissioned,
}

impl AssetStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Decommissioned => "decommissioned",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "decommissioned" => Some(Self::Decommissioned),
            _ => None,
        }
    }
}

/// Stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Asset id.
    pub id: AssetId,
    /// Asset name.
    pub name: String,
    /// Asset description.
    pub description: Option<String>,
    /// Asset type (server, application, dataset, ...).
    pub asset_type: String,
    /// Responsible user.
    pub owner_id: UserId,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update instant.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Asset creation body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewAsset {
    /// Asset name.
    pub name: String,
    /// Asset description.
    pub description: Option<String>,
    /// Asset type.
    pub asset_type: String,
    /// Responsible user.
    pub owner_id: String,
}

impl NewAsset {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when name, type, or owner is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("name", &self.name)?;
        require_text("asset_type", &self.asset_type)?;
        require_text("owner_id", &self.owner_id)
    }
}

/// Partial asset update; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AssetUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New type.
    pub asset_type: Option<String>,
    /// New owner.
    pub owner_id: Option<UserId>,
    /// New status.
    pub status: Option<AssetStatus>,
}

impl AssetUpdate {
    /// Rejects blank replacements for required fields.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a provided required field is blank.
    pub fn validate(&self) -> GrcResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(asset_type) = &self.asset_type {
            require_text("asset_type", asset_type)?;
        }
        Ok(())
    }
}

/// Asset to control mapping body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AssetControlLink {
    /// Asset.
    pub asset_id: String,
    /// Activated control.
    pub activated_control_id: String,
    /// Mapping type, defaulting to [`DEFAULT_MAPPING_TYPE`].
    pub mapping_type: Option<String>,
}

impl AssetControlLink {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either id is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("asset_id", &self.asset_id)?;
        require_text("activated_control_id", &self.activated_control_id)
    }

    /// Returns the effective mapping type.
    #[must_use]
    pub fn mapping_type(&self) -> &str {
        self.mapping_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_MAPPING_TYPE)
    }
}

/// Control mapped to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetControlView {
    /// Activated control id.
    pub activated_control_id: ActivatedControlId,
    /// Catalog code.
    pub control_library_id: ControlLibraryId,
    /// Catalog name.
    pub control_name: String,
    /// Mapping type.
    pub mapping_type: String,
}

/// Labelled count used by breakdown analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBucket {
    /// Bucket label.
    pub label: String,
    /// Rows in the bucket.
    pub count: u64,
}

/// Asset counts by type and by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBreakdown {
    /// Counts per asset type.
    pub by_type: Vec<CountBucket>,
    /// Counts per status.
    pub by_status: Vec<CountBucket>,
}
