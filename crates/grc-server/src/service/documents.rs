// crates/grc-server/src/service/documents.rs
// ============================================================================
// Module: Document Operations
// Description: Policy documents, versioning, publication, acknowledgements.
// Purpose: Let admins author and publish policies and users attest to them.
// Dependencies: grc-core, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::AuditAction;
use grc_core::Document;
use grc_core::DocumentControlLink;
use grc_core::DocumentControlView;
use grc_core::DocumentDetail;
use grc_core::DocumentId;
use grc_core::DocumentVersion;
use grc_core::DocumentVersionId;
use grc_core::EntityType;
use grc_core::GrcResult;
use grc_core::NewAuditEntry;
use grc_core::NewDocument;
use grc_core::NewDocumentVersion;
use serde_json::json;

use super::GrcService;
use super::StatusResponse;
use crate::auth::RequestContext;

// ============================================================================
// SECTION: Documents
// ============================================================================

impl GrcService {
    /// Lists documents, newest first.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_documents(&self, ctx: &RequestContext) -> GrcResult<Vec<Document>> {
        ctx.require_user()?;
        Ok(self.store.list_documents()?)
    }

    /// Fetches a document with every version.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_document(&self, ctx: &RequestContext, id: &DocumentId) -> GrcResult<DocumentDetail> {
        ctx.require_user()?;
        Ok(self.store.get_document(id)?)
    }

    /// Creates a document.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for blank
    /// fields.
    pub fn create_document(&self, ctx: &RequestContext, request: &NewDocument) -> GrcResult<Document> {
        ctx.require_admin()?;
        request.validate()?;
        let document = self.store.create_document(request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DocumentCreated)
                .entity(EntityType::Document, document.id.as_str())
                .changes(json!({ "title": document.title, "category": document.category })),
        );
        Ok(document)
    }

    /// Adds a draft version to a document.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for a blank body,
    /// and not found for unknown documents.
    pub fn create_document_version(
        &self,
        ctx: &RequestContext,
        id: &DocumentId,
        request: &NewDocumentVersion,
    ) -> GrcResult<DocumentVersion> {
        let user = ctx.require_admin()?;
        request.validate()?;
        let version = self.store.create_document_version(id, &user.id, request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DocumentVersionCreated)
                .entity(EntityType::DocumentVersion, version.id.as_str())
                .changes(json!({
                    "document_id": id,
                    "version_number": version.version_number,
                })),
        );
        Ok(version)
    }

    /// Publishes a version and archives the one it replaces.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found when the version does
    /// not belong to the document.
    pub fn publish_document_version(
        &self,
        ctx: &RequestContext,
        id: &DocumentId,
        version_id: &DocumentVersionId,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        let version = self.store.publish_document_version(id, version_id, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DocumentVersionPublished)
                .entity(EntityType::DocumentVersion, version.id.as_str())
                .changes(json!({
                    "document_id": id,
                    "version_number": version.version_number,
                })),
        );
        Ok(StatusResponse::new("published"))
    }

    /// Records that the caller read a version.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session and not found for unknown
    /// versions.
    pub fn acknowledge_document_version(
        &self,
        ctx: &RequestContext,
        version_id: &DocumentVersionId,
    ) -> GrcResult<StatusResponse> {
        let user = ctx.require_user()?;
        self.store.acknowledge_document_version(version_id, &user.id, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DocumentAcknowledged)
                .entity(EntityType::DocumentReadAcknowledgement, version_id.as_str()),
        );
        Ok(StatusResponse::new("acknowledged"))
    }

    /// Lists the controls a document supports.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown documents.
    pub fn list_document_controls(
        &self,
        ctx: &RequestContext,
        id: &DocumentId,
    ) -> GrcResult<Vec<DocumentControlView>> {
        ctx.require_user()?;
        Ok(self.store.list_document_controls(id)?)
    }

    /// Maps a document to an activated control; repeating is a no-op.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for blank ids.
    pub fn map_document_control(
        &self,
        ctx: &RequestContext,
        link: &DocumentControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        link.validate()?;
        let document_id = DocumentId::new(link.document_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.map_document_control(&document_id, &control_id, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DocumentControlMapped)
                .entity(EntityType::DocumentControlMapping, document_id.as_str())
                .changes(json!({ "activated_control_id": control_id })),
        );
        Ok(StatusResponse::new("created"))
    }

    /// Removes a document-to-control mapping.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found when the mapping does
    /// not exist.
    pub fn unmap_document_control(
        &self,
        ctx: &RequestContext,
        link: &DocumentControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        link.validate()?;
        let document_id = DocumentId::new(link.document_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.unmap_document_control(&document_id, &control_id)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DocumentControlUnmapped)
                .entity(EntityType::DocumentControlMapping, document_id.as_str())
                .changes(json!({ "activated_control_id": control_id })),
        );
        Ok(StatusResponse::new("deleted"))
    }
}
