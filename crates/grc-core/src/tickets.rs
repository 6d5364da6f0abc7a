// crates/grc-core/src/tickets.rs
// ============================================================================
// Module: Tickets
// Description: Internal and external tickets with comments.
// Purpose: Model ticket lifecycle and validate ticket inputs.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Internal tickets are raised by authenticated users; external tickets come
//! from customer systems holding the shared API key. Every ticket carries a
//! monotonic `sequential_id` assigned by the store at insert time.

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
use crate::identifiers::CommentId;
use crate::identifiers::DocumentId;
use crate::identifiers::TicketId;
use crate::identifiers::UserId;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Ticket origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    /// Raised by a platform user.
    Internal,
    /// Raised by an external customer system.
    External,
}

impl TicketType {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "internal" => Some(Self::Internal),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

/// Ticket workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Newly raised.
    New,
    /// Being worked.
    InProgress,
    /// Fix delivered.
    Resolved,
    /// No further work.
    Closed,
}

impl TicketStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Returns true while the ticket still needs work.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::New | Self::InProgress)
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Stored ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket id.
    pub id: TicketId,
    /// Human-facing ticket number.
    pub sequential_id: i64,
    /// Origin.
    pub ticket_type: TicketType,
    /// Short summary.
    pub title: String,
    /// Long description.
    pub description: Option<String>,
    /// Workflow status.
    pub status: TicketStatus,
    /// Free-form category.
    pub category: Option<String>,
    /// Creator, absent for external tickets.
    pub created_by_id: Option<UserId>,
    /// Assignee.
    pub assigned_to_user_id: Option<UserId>,
    /// Customer reference for external tickets.
    pub external_customer_ref: Option<String>,
    /// Linked control.
    pub activated_control_id: Option<ActivatedControlId>,
    /// Linked policy document.
    pub document_id: Option<DocumentId>,
    /// Linked asset.
    pub asset_id: Option<AssetId>,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update instant.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Instant the ticket was last resolved.
    #[serde(with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
}

/// Stored ticket comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketComment {
    /// Comment id.
    pub id: CommentId,
    /// Parent ticket.
    pub ticket_id: TicketId,
    /// Author.
    pub user_id: UserId,
    /// Author display name.
    pub author_name: String,
    /// Comment text.
    pub body: String,
    /// Hidden from external requesters.
    pub is_internal_note: bool,
    /// Creation instant.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Ticket with its comments in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetail {
    /// Ticket.
    pub ticket: Ticket,
    /// Visible comments.
    pub comments: Vec<TicketComment>,
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Internal ticket request body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewInternalTicket {
    /// Short summary.
    pub title: String,
    /// Long description.
    pub description: Option<String>,
    /// Free-form category.
    pub category: Option<String>,
    /// Linked control.
    pub activated_control_id: Option<ActivatedControlId>,
    /// Linked policy document.
    pub document_id: Option<DocumentId>,
    /// Linked asset.
    pub asset_id: Option<AssetId>,
}

impl NewInternalTicket {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the title is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("title", &self.title)
    }
}

/// External ticket request body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewExternalTicket {
    /// Short summary.
    pub title: String,
    /// Long description.
    pub description: Option<String>,
    /// Free-form category.
    pub category: Option<String>,
    /// Customer reference used for lookups.
    pub external_customer_ref: String,
}

impl NewExternalTicket {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the title or customer reference is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("title", &self.title)?;
        require_text("external_customer_ref", &self.external_customer_ref)
    }
}

/// Admin ticket update body; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct TicketUpdate {
    /// New workflow status.
    pub status: Option<TicketStatus>,
    /// New assignee.
    pub assigned_to_user_id: Option<UserId>,
    /// New category.
    pub category: Option<String>,
}

/// Comment request body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct NewComment {
    /// Comment text.
    pub body: String,
    /// Hide from external requesters.
    pub is_internal_note: bool,
}

impl NewComment {
    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the body is blank.
    pub fn validate(&self) -> GrcResult<()> {
        require_text("body", &self.body)
    }
}
