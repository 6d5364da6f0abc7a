// crates/grc-core/src/audit.rs
// ============================================================================
// Module: Audit Events
// Description: Audit action vocabulary, audit rows, and audit queries.
// Purpose: Describe the append-only record of every mutating action.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! One [`NewAuditEntry`] is written per mutating action. The `changes` payload
//! is an opaque JSON object because each action records a different diff.
//! Audit rows are never updated or deleted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::identifiers::UserId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default page size for audit queries.
pub const DEFAULT_AUDIT_LIMIT: u32 = 100;

/// Largest accepted page size for audit queries.
pub const MAX_AUDIT_LIMIT: u32 = 1_000;

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

/// Audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Successful login.
    UserLoginSuccess,
    /// Rejected login.
    UserLoginFailure,
    /// Control activated.
    ControlActivated,
    /// Control retired.
    ControlRetired,
    /// Evidence submitted.
    EvidenceSubmitted,
    /// Catalog entry created.
    ControlLibraryCreated,
    /// Catalog entry updated.
    ControlLibraryUpdated,
    /// Catalog entry deleted.
    ControlLibraryDeleted,
    /// Catalog bulk import.
    ControlLibraryBulkImport,
    /// Internal ticket created.
    TicketCreated,
    /// External ticket created.
    TicketCreatedExternal,
    /// Ticket updated.
    TicketUpdated,
    /// Ticket comment added.
    TicketCommentAdded,
    /// Asset created.
    AssetCreated,
    /// Asset updated.
    AssetUpdated,
    /// Asset deleted.
    AssetDeleted,
    /// Asset mapped to a control.
    AssetControlMapped,
    /// Asset unmapped from a control.
    AssetControlUnmapped,
    /// Risk created.
    RiskCreated,
    /// Risk updated.
    RiskUpdated,
    /// Risk deleted.
    RiskDeleted,
    /// Risk mapped to a control.
    RiskControlMapped,
    /// Risk unmapped from a control.
    RiskControlUnmapped,
    /// Data-subject request created.
    DsrCreated,
    /// Data-subject request updated.
    DsrUpdated,
    /// Data-subject request completed.
    DsrCompleted,
    /// Processing activity recorded.
    RopaCreated,
    /// Processing activity updated.
    RopaUpdated,
    /// Processing activity archived.
    RopaArchived,
    /// Document created.
    DocumentCreated,
    /// Draft document version created.
    DocumentVersionCreated,
    /// Document version published.
    DocumentVersionPublished,
    /// Document version acknowledged by a reader.
    DocumentAcknowledged,
    /// Document mapped to a control.
    DocumentControlMapped,
    /// Document unmapped from a control.
    DocumentControlUnmapped,
    /// Vendor created.
    VendorCreated,
    /// Vendor updated.
    VendorUpdated,
    /// Vendor deleted.
    VendorDeleted,
    /// Vendor assessment recorded.
    VendorAssessmentCreated,
    /// Vendor mapped to a control.
    VendorControlMapped,
    /// Vendor unmapped from a control.
    VendorControlUnmapped,
}

impl AuditAction {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserLoginSuccess => "USER_LOGIN_SUCCESS",
            Self::UserLoginFailure => "USER_LOGIN_FAILURE",
            Self::ControlActivated => "CONTROL_ACTIVATED",
            Self::ControlRetired => "CONTROL_RETIRED",
            Self::EvidenceSubmitted => "EVIDENCE_SUBMITTED",
            Self::ControlLibraryCreated => "CONTROL_LIBRARY_CREATED",
            Self::ControlLibraryUpdated => "CONTROL_LIBRARY_UPDATED",
            Self::ControlLibraryDeleted => "CONTROL_LIBRARY_DELETED",
            Self::ControlLibraryBulkImport => "CONTROL_LIBRARY_BULK_IMPORT",
            Self::TicketCreated => "TICKET_CREATED",
            Self::TicketCreatedExternal => "TICKET_CREATED_EXTERNAL",
            Self::TicketUpdated => "TICKET_UPDATED",
            Self::TicketCommentAdded => "TICKET_COMMENT_ADDED",
            Self::AssetCreated => "ASSET_CREATED",
            Self::AssetUpdated => "ASSET_UPDATED",
            Self::AssetDeleted => "ASSET_DELETED",
            Self::AssetControlMapped => "ASSET_CONTROL_MAPPED",
            Self::AssetControlUnmapped => "ASSET_CONTROL_UNMAPPED",
            Self::RiskCreated => "RISK_CREATED",
            Self::RiskUpdated => "RISK_UPDATED",
            Self::RiskDeleted => "RISK_DELETED",
            Self::RiskControlMapped => "RISK_CONTROL_MAPPED",
            Self::RiskControlUnmapped => "RISK_CONTROL_UNMAPPED",
            Self::DsrCreated => "DSR_CREATED",
            Self::DsrUpdated => "DSR_UPDATED",
            Self::DsrCompleted => "DSR_COMPLETED",
            Self::RopaCreated => "ROPA_CREATED",
            Self::RopaUpdated => "ROPA_UPDATED",
            Self::RopaArchived => "ROPA_ARCHIVED",
            Self::DocumentCreated => "DOCUMENT_CREATED",
            Self::DocumentVersionCreated => "DOCUMENT_VERSION_CREATED",
            Self::DocumentVersionPublished => "DOCUMENT_VERSION_PUBLISHED",
            Self::DocumentAcknowledged => "DOCUMENT_ACKNOWLEDGED",
            Self::DocumentControlMapped => "DOCUMENT_CONTROL_MAPPED",
            Self::DocumentControlUnmapped => "DOCUMENT_CONTROL_UNMAPPED",
            Self::VendorCreated => "VENDOR_CREATED",
            Self::VendorUpdated => "VENDOR_UPDATED",
            Self::VendorDeleted => "VENDOR_DELETED",
            Self::VendorAssessmentCreated => "VENDOR_ASSESSMENT_CREATED",
            Self::VendorControlMapped => "VENDOR_CONTROL_MAPPED",
            Self::VendorControlUnmapped => "VENDOR_CONTROL_UNMAPPED",
        }
    }
}

/// Entity type an audit row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Platform user.
    User,
    /// Catalog entry.
    ControlLibrary,
    /// Activated control.
    ActivatedControl,
    /// Evidence log row.
    ControlEvidence,
    /// Ticket.
    Ticket,
    /// Ticket comment.
    TicketComment,
    /// Asset.
    Asset,
    /// Asset to control mapping.
    AssetControlMapping,
    /// Risk assessment.
    RiskAssessment,
    /// Risk to control mapping.
    RiskControlMapping,
    /// Data-subject request.
    GdprDsr,
    /// Record of processing activities entry.
    GdprRopa,
    /// Policy document.
    Document,
    /// Document version.
    DocumentVersion,
    /// Read acknowledgement of a document version.
    DocumentReadAcknowledgement,
    /// Document to control mapping.
    DocumentControlMapping,
    /// Third-party vendor.
    Vendor,
    /// Vendor assessment.
    VendorAssessment,
    /// Vendor to control mapping.
    VendorControlMapping,
}

impl EntityType {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::ControlLibrary => "control_library",
            Self::ActivatedControl => "activated_control",
            Self::ControlEvidence => "control_evidence",
            Self::Ticket => "ticket",
            Self::TicketComment => "ticket_comment",
            Self::Asset => "asset",
            Self::AssetControlMapping => "asset_control_mapping",
            Self::RiskAssessment => "risk_assessment",
            Self::RiskControlMapping => "risk_control_mapping",
            Self::GdprDsr => "gdpr_dsr",
            Self::GdprRopa => "gdpr_ropa",
            Self::Document => "document",
            Self::DocumentVersion => "document_version",
            Self::DocumentReadAcknowledgement => "document_read_acknowledgement",
            Self::DocumentControlMapping => "document_control_mapping",
            Self::Vendor => "vendor",
            Self::VendorAssessment => "vendor_assessment",
            Self::VendorControlMapping => "vendor_control_mapping",
        }
    }
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Audit row to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// Acting user, absent for anonymous and API-key callers.
    pub user_id: Option<UserId>,
    /// Audited action.
    pub action: AuditAction,
    /// Target entity type.
    pub entity_type: Option<EntityType>,
    /// Target entity id.
    pub entity_id: Option<String>,
    /// Per-action diff payload.
    pub changes: Option<Value>,
    /// Caller IP address.
    pub ip_address: Option<String>,
}

impl NewAuditEntry {
    /// Starts an entry for the given action with no actor or target.
    #[must_use]
    pub const fn new(action: AuditAction) -> Self {
        Self {
            user_id: None,
            action,
            entity_type: None,
            entity_id: None,
            changes: None,
            ip_address: None,
        }
    }

    /// Sets the acting user.
    #[must_use]
    pub fn actor(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Sets the target entity.
    #[must_use]
    pub fn entity(mut self, entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Sets the diff payload.
    #[must_use]
    pub fn changes(mut self, changes: Value) -> Self {
        self.changes = if changes.is_null() { None } else { Some(changes) };
        self
    }

    /// Sets the caller IP address.
    #[must_use]
    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

/// Stored audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Row id.
    pub id: i64,
    /// Action instant.
    #[serde(with = "time::serde::rfc3339")]
    pub performed_at: OffsetDateTime,
    /// Acting user.
    pub user_id: Option<UserId>,
    /// Action label.
    pub action_type: String,
    /// Target entity type label.
    pub target_entity_type: Option<String>,
    /// Target entity id.
    pub target_entity_id: Option<String>,
    /// Diff payload.
    pub changes: Option<Value>,
    /// Caller IP address.
    pub ip_address: Option<String>,
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Audit log filter with paging.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    /// Only rows by this user.
    pub user_id: Option<String>,
    /// Only rows with this action label.
    pub action_type: Option<String>,
    /// Only rows targeting this entity type label.
    pub entity_type: Option<String>,
    /// Requested page size.
    pub limit: Option<i64>,
    /// Requested offset.
    pub offset: Option<i64>,
}

impl AuditQuery {
    /// Returns the effective page size: the request when in range, else the default.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .and_then(|limit| u32::try_from(limit).ok())
            .filter(|limit| (1..=MAX_AUDIT_LIMIT).contains(limit))
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
    }

    /// Returns the effective offset; negative offsets become zero.
    #[must_use]
    pub fn effective_offset(&self) -> u64 {
        self.offset.and_then(|offset| u64::try_from(offset).ok()).unwrap_or(0)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn limits_outside_range_fall_back_to_default() {
        let mut query = AuditQuery::default();
        assert_eq!(query.effective_limit(), DEFAULT_AUDIT_LIMIT);
        query.limit = Some(0);
        assert_eq!(query.effective_limit(), DEFAULT_AUDIT_LIMIT);
        query.limit = Some(1_001);
        assert_eq!(query.effective_limit(), DEFAULT_AUDIT_LIMIT);
        query.limit = Some(250);
        assert_eq!(query.effective_limit(), 250);
        query.offset = Some(-5);
        assert_eq!(query.effective_offset(), 0);
    }

    #[test]
    fn action_labels_match_serde_names() {
        for action in [
            AuditAction::UserLoginFailure,
            AuditAction::ControlLibraryBulkImport,
            AuditAction::DsrCompleted,
            AuditAction::DocumentVersionPublished,
            AuditAction::VendorAssessmentCreated,
        ] {
            let json = serde_json::to_value(action).unwrap_or(Value::Null);
            assert_eq!(json, Value::String(action.as_str().to_string()));
        }
        for entity in [EntityType::DocumentReadAcknowledgement, EntityType::GdprRopa, EntityType::VendorControlMapping] {
            let json = serde_json::to_value(entity).unwrap_or(Value::Null);
            assert_eq!(json, Value::String(entity.as_str().to_string()));
        }
    }

    #[test]
    fn null_changes_are_dropped() {
        let entry = NewAuditEntry::new(AuditAction::UserLoginFailure).changes(Value::Null);
        assert!(entry.changes.is_none());
        let entry = entry.changes(json!({"email": "a@b.c"}));
        assert!(entry.changes.is_some());
    }
}
