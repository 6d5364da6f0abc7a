// crates/grc-server/src/service/controls.rs
// ============================================================================
// Module: Control Operations
// Description: Control catalog and activated-control lifecycle.
// Purpose: Manage the catalog, activate controls, and record evidence.
// Dependencies: grc-core, serde_json, tracing
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivateControlRequest;
use grc_core::ActivatedControl;
use grc_core::ActivatedControlId;
use grc_core::ActiveControlView;
use grc_core::AuditAction;
use grc_core::ControlDetail;
use grc_core::ControlLibraryId;
use grc_core::ControlLibraryItem;
use grc_core::EntityType;
use grc_core::EvidenceRecord;
use grc_core::EvidenceSubmission;
use grc_core::GrcResult;
use grc_core::ImportSummary;
use grc_core::LibraryExport;
use grc_core::LibraryImportRequest;
use grc_core::LibraryItemFields;
use grc_core::NewAuditEntry;
use grc_core::controls::LIBRARY_EXPORT_VERSION;
use serde_json::json;
use tracing::info;

use super::GrcService;
use super::StatusResponse;
use crate::auth::RequestContext;

// ============================================================================
// SECTION: Catalog
// ============================================================================

impl GrcService {
    /// Lists the control catalog.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_library(&self, ctx: &RequestContext) -> GrcResult<Vec<ControlLibraryItem>> {
        ctx.require_user()?;
        Ok(self.store.list_library()?)
    }

    /// Fetches one catalog entry.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_library_item(
        &self,
        ctx: &RequestContext,
        id: &ControlLibraryId,
    ) -> GrcResult<ControlLibraryItem> {
        ctx.require_user()?;
        Ok(self.store.get_library_item(id)?)
    }

    /// Adds a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for blank fields,
    /// and conflict for a duplicate id.
    pub fn create_library_item(
        &self,
        ctx: &RequestContext,
        item: ControlLibraryItem,
    ) -> GrcResult<ControlLibraryItem> {
        ctx.require_admin()?;
        item.validate()?;
        self.store.create_library_item(&item)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::ControlLibraryCreated)
                .entity(EntityType::ControlLibrary, item.id.as_str())
                .changes(json!({ "standard": item.standard, "name": item.name })),
        );
        Ok(item)
    }

    /// Replaces the fields of a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for blank fields,
    /// and not found for unknown ids.
    pub fn update_library_item(
        &self,
        ctx: &RequestContext,
        id: ControlLibraryId,
        fields: LibraryItemFields,
    ) -> GrcResult<ControlLibraryItem> {
        ctx.require_admin()?;
        let item = fields.into_item(id);
        item.validate()?;
        self.store.update_library_item(&item)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::ControlLibraryUpdated)
                .entity(EntityType::ControlLibrary, item.id.as_str())
                .changes(json!({ "control_id": item.id, "standard": item.standard })),
        );
        Ok(item)
    }

    /// Removes a catalog entry that has never been activated.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, not found for unknown ids, and
    /// conflict when activated controls reference the entry.
    pub fn delete_library_item(
        &self,
        ctx: &RequestContext,
        id: &ControlLibraryId,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        self.store.delete_library_item(id)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::ControlLibraryDeleted)
                .entity(EntityType::ControlLibrary, id.as_str()),
        );
        Ok(StatusResponse::new("deleted"))
    }

    /// Imports a batch of catalog entries.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for an empty
    /// batch or an incomplete entry; nothing is written in that case.
    pub fn import_library(
        &self,
        ctx: &RequestContext,
        request: &LibraryImportRequest,
    ) -> GrcResult<ImportSummary> {
        ctx.require_admin()?;
        request.validate()?;
        let imported_count = self.store.import_library(&request.controls, request.replace_existing)?;
        let summary = ImportSummary {
            imported_count,
            total_sent: u64::try_from(request.controls.len()).unwrap_or(u64::MAX),
        };
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::ControlLibraryBulkImport)
                .entity(EntityType::ControlLibrary, "bulk")
                .changes(json!({
                    "imported_count": summary.imported_count,
                    "total_sent": summary.total_sent,
                    "replace_existing": request.replace_existing,
                })),
        );
        info!(imported = summary.imported_count, sent = summary.total_sent, "control library imported");
        Ok(summary)
    }

    /// Exports the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn export_library(&self, ctx: &RequestContext) -> GrcResult<LibraryExport> {
        ctx.require_user()?;
        let controls = self.store.list_library()?;
        Ok(LibraryExport {
            total_count: u64::try_from(controls.len()).unwrap_or(u64::MAX),
            controls,
            exported_at: ctx.now,
            export_version: LIBRARY_EXPORT_VERSION.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Activated Controls
// ============================================================================

impl GrcService {
    /// Lists active controls ordered by due date.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_active_controls(&self, ctx: &RequestContext) -> GrcResult<Vec<ActiveControlView>> {
        ctx.require_user()?;
        Ok(self.store.list_active_controls()?)
    }

    /// Fetches an activated control with its evidence history.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_control_detail(
        &self,
        ctx: &RequestContext,
        id: &ActivatedControlId,
    ) -> GrcResult<ControlDetail> {
        ctx.require_user()?;
        Ok(self.store.get_control_detail(id)?)
    }

    /// Activates a catalog entry for an owner.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for blank ids or a
    /// non-positive interval, and store errors for unknown references.
    pub fn activate_control(
        &self,
        ctx: &RequestContext,
        request: &ActivateControlRequest,
    ) -> GrcResult<ActivatedControl> {
        ctx.require_admin()?;
        let interval_days = request.validate()?;
        let control = self.store.activate_control(
            &request.control_library_id,
            &request.owner_id,
            interval_days,
            ctx.now,
        )?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::ControlActivated)
                .entity(EntityType::ActivatedControl, control.id.as_str())
                .changes(json!({
                    "control_library_id": control.control_library_id,
                    "owner_id": control.owner_id,
                    "review_interval_days": control.review_interval_days,
                })),
        );
        Ok(control)
    }

    /// Retires an active control.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found when no active control
    /// has the id.
    pub fn retire_control(
        &self,
        ctx: &RequestContext,
        id: &ActivatedControlId,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        self.store.retire_control(id)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::ControlRetired)
                .entity(EntityType::ActivatedControl, id.as_str()),
        );
        Ok(StatusResponse::new("retired"))
    }

    /// Records a review and advances the control's due date.
    ///
    /// # Errors
    ///
    /// Returns validation errors for missing notes or an unknown status and
    /// not found when the control is missing or retired.
    pub fn submit_evidence(
        &self,
        ctx: &RequestContext,
        id: &ActivatedControlId,
        submission: &EvidenceSubmission,
    ) -> GrcResult<EvidenceRecord> {
        let user = ctx.require_user()?;
        let status = submission.validate()?;
        let evidence_link =
            submission.evidence_link.as_deref().map(str::trim).filter(|link| !link.is_empty());
        let record = self.store.submit_evidence(
            id,
            &user.id,
            status,
            submission.notes.trim(),
            evidence_link,
            ctx.now,
        )?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::EvidenceSubmitted)
                .entity(EntityType::ControlEvidence, record.id.as_str())
                .changes(json!({
                    "activated_control_id": id,
                    "compliance_status": status.as_str(),
                })),
        );
        Ok(record)
    }
}
