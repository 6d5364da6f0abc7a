// crates/grc-core/src/documents.rs
// ============================================================================
// Module: Policy Documents
// Description: Versioned policy documents, read acknowledgements, mappings.
// Purpose: Describe documents whose published text evolves through versions.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A document is a titled container of numbered versions. New versions start
//! as drafts. Publishing a version archives whichever version was published
//! before and points the document at the new one, so at most one version per
//! document is published at a time. Users acknowledge having read a specific
//! version; acknowledging twice records nothing new.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::GrcResult;
use crate::error::require_text;
use crate::identifiers::ActivatedControlId;
use crate::identifiers::ControlLibraryId;
use crate::identifiers::DocumentId;
use crate::identifiers::DocumentVersionId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle of one document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentVersionStatus {
    /// Editable, not yet in force.
    Draft,
    /// The version currently in force.
    Published,
    /// Superseded by a later publication.
    Archived,
}

impl DocumentVersionStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Stored document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id.
    pub id: DocumentId,
    /// Title.
    pub title: String,
    /// Category such as `policy` or `procedure`.
    pub category: String,
    /// Responsible user.
    pub owner_id: Option<UserId>,
    /// Version currently in force.
    pub published_version_id: Option<DocumentVersionId>,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last change instant, including publication.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Stored document version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Version id.
    pub id: DocumentVersionId,
    /// Owning document.
    pub document_id: DocumentId,
    /// 1-based number, increasing per document.
    pub version_number: u32,
    /// Full text of the version.
    pub body_content: String,
    /// What changed relative to the previous version.
    pub change_description: Option<String>,
    /// Lifecycle status.
    pub status: DocumentVersionStatus,
    /// Author.
    pub created_by_user_id: UserId,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Users who acknowledged reading this version.
    pub acknowledgement_count: u64,
}

/// Document with its versions, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDetail {
    /// Document header.
    pub document: Document,
    /// Versions ordered by descending number.
    pub versions: Vec<DocumentVersion>,
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Document creation body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewDocument {
    /// Title.
    pub title: String,
    /// Category.
    pub category: String,
    /// Responsible user.
    pub owner_id: String,
}

impl NewDocument {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when title, category, or owner is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("title", &self.title)?;
        require_text("category", &self.category)?;
        require_text("owner_id", &self.owner_id)
    }
}

/// Draft version body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewDocumentVersion {
    /// Full text.
    pub body_content: String,
    /// Optional change note.
    pub change_description: Option<String>,
}

impl NewDocumentVersion {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the body is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("body_content", &self.body_content)
    }
}

/// Document to control mapping body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct DocumentControlLink {
    /// Document.
    pub document_id: String,
    /// Activated control.
    pub activated_control_id: String,
}

impl DocumentControlLink {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either id is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("document_id", &self.document_id)?;
        require_text("activated_control_id", &self.activated_control_id)
    }
}

/// Control mapped to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentControlView {
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
    use super::*;

    #[test]
    fn version_status_labels_round_trip() {
        for status in
            [DocumentVersionStatus::Draft, DocumentVersionStatus::Published, DocumentVersionStatus::Archived]
        {
            assert_eq!(DocumentVersionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocumentVersionStatus::parse("retired"), None);
    }

    #[test]
    fn blank_version_body_is_rejected() {
        let request = NewDocumentVersion {
            body_content: " \n".to_string(),
            change_description: None,
        };
        assert!(request.validate().is_err());
    }
}
