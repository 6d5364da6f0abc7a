// crates/grc-server/src/service/records.rs
// ============================================================================
// Module: Register Operations
// Description: Asset inventory, risk register, and the GDPR registers.
// Purpose: CRUD and control mappings for the compliance registers.
// Dependencies: grc-core, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::Asset;
use grc_core::AssetControlLink;
use grc_core::AssetControlView;
use grc_core::AssetId;
use grc_core::AssetUpdate;
use grc_core::AuditAction;
use grc_core::DataSubjectRequest;
use grc_core::DsrCompletion;
use grc_core::DsrId;
use grc_core::DsrUpdate;
use grc_core::EntityType;
use grc_core::GrcResult;
use grc_core::NewAsset;
use grc_core::NewAuditEntry;
use grc_core::NewDsr;
use grc_core::NewProcessingActivity;
use grc_core::NewRisk;
use grc_core::ProcessingActivity;
use grc_core::ProcessingActivityUpdate;
use grc_core::Risk;
use grc_core::RiskControlLink;
use grc_core::RiskControlView;
use grc_core::RiskId;
use grc_core::RiskUpdate;
use grc_core::RopaId;
use serde_json::json;

use super::GrcService;
use super::StatusResponse;
use crate::auth::RequestContext;

// ============================================================================
// SECTION: Assets
// ============================================================================

impl GrcService {
    /// Lists assets.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_assets(&self, ctx: &RequestContext) -> GrcResult<Vec<Asset>> {
        ctx.require_user()?;
        Ok(self.store.list_assets()?)
    }

    /// Fetches one asset.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_asset(&self, ctx: &RequestContext, id: &AssetId) -> GrcResult<Asset> {
        ctx.require_user()?;
        Ok(self.store.get_asset(id)?)
    }

    /// Registers an asset.
    ///
    /// # Errors
    ///
    /// Returns validation errors for a blank name, type, or owner.
    pub fn create_asset(&self, ctx: &RequestContext, request: &NewAsset) -> GrcResult<Asset> {
        ctx.require_user()?;
        request.validate()?;
        let asset = self.store.create_asset(request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::AssetCreated)
                .entity(EntityType::Asset, asset.id.as_str())
                .changes(json!({ "name": asset.name, "asset_type": asset.asset_type })),
        );
        Ok(asset)
    }

    /// Updates an asset.
    ///
    /// # Errors
    ///
    /// Returns validation errors for blank replacements and not found for
    /// unknown ids.
    pub fn update_asset(
        &self,
        ctx: &RequestContext,
        id: &AssetId,
        update: &AssetUpdate,
    ) -> GrcResult<Asset> {
        ctx.require_user()?;
        update.validate()?;
        let asset = self.store.update_asset(id, update, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::AssetUpdated)
                .entity(EntityType::Asset, asset.id.as_str())
                .changes(json!({ "name": asset.name, "status": asset.status.as_str() })),
        );
        Ok(asset)
    }

    /// Deletes an asset.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn delete_asset(&self, ctx: &RequestContext, id: &AssetId) -> GrcResult<StatusResponse> {
        ctx.require_user()?;
        self.store.delete_asset(id)?;
        self.record(ctx, NewAuditEntry::new(AuditAction::AssetDeleted).entity(EntityType::Asset, id.as_str()));
        Ok(StatusResponse::new("deleted"))
    }

    /// Lists the controls mapped to an asset.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_asset_controls(
        &self,
        ctx: &RequestContext,
        id: &AssetId,
    ) -> GrcResult<Vec<AssetControlView>> {
        ctx.require_user()?;
        Ok(self.store.list_asset_controls(id)?)
    }

    /// Maps an asset to an activated control.
    ///
    /// # Errors
    ///
    /// Returns validation errors for blank ids and store errors for unknown
    /// references.
    pub fn map_asset_control(
        &self,
        ctx: &RequestContext,
        link: &AssetControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_user()?;
        link.validate()?;
        let asset_id = AssetId::new(link.asset_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.map_asset_control(&asset_id, &control_id, link.mapping_type(), ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::AssetControlMapped)
                .entity(EntityType::AssetControlMapping, asset_id.as_str())
                .changes(json!({
                    "activated_control_id": control_id,
                    "mapping_type": link.mapping_type(),
                })),
        );
        Ok(StatusResponse::new("created"))
    }

    /// Removes an asset-to-control mapping.
    ///
    /// # Errors
    ///
    /// Returns validation errors for blank ids and not found when the mapping
    /// does not exist.
    pub fn unmap_asset_control(
        &self,
        ctx: &RequestContext,
        link: &AssetControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_user()?;
        link.validate()?;
        let asset_id = AssetId::new(link.asset_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.unmap_asset_control(&asset_id, &control_id)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::AssetControlUnmapped)
                .entity(EntityType::AssetControlMapping, asset_id.as_str())
                .changes(json!({ "activated_control_id": control_id })),
        );
        Ok(StatusResponse::new("deleted"))
    }
}

// ============================================================================
// SECTION: Risks
// ============================================================================

impl GrcService {
    /// Lists risks.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_risks(&self, ctx: &RequestContext) -> GrcResult<Vec<Risk>> {
        ctx.require_user()?;
        Ok(self.store.list_risks()?)
    }

    /// Fetches one risk.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_risk(&self, ctx: &RequestContext, id: &RiskId) -> GrcResult<Risk> {
        ctx.require_user()?;
        Ok(self.store.get_risk(id)?)
    }

    /// Records a new risk assessment.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for blank text
    /// or ratings outside 1..=5.
    pub fn create_risk(&self, ctx: &RequestContext, request: &NewRisk) -> GrcResult<Risk> {
        let user = ctx.require_admin()?;
        request.validate()?;
        let risk = self.store.create_risk(&user.id, request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::RiskCreated)
                .entity(EntityType::RiskAssessment, risk.id.as_str())
                .changes(json!({
                    "title": risk.title,
                    "risk_score": risk.risk_score,
                    "severity": risk.severity.as_str(),
                })),
        );
        Ok(risk)
    }

    /// Updates a risk and recomputes its scores.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for bad ratings,
    /// and not found for unknown ids.
    pub fn update_risk(
        &self,
        ctx: &RequestContext,
        id: &RiskId,
        update: &RiskUpdate,
    ) -> GrcResult<Risk> {
        ctx.require_admin()?;
        let risk = self.store.update_risk(id, update, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::RiskUpdated)
                .entity(EntityType::RiskAssessment, risk.id.as_str())
                .changes(json!({
                    "risk_score": risk.risk_score,
                    "residual_risk_score": risk.residual_risk_score,
                    "status": risk.status.as_str(),
                })),
        );
        Ok(risk)
    }

    /// Deletes a risk.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found for unknown ids.
    pub fn delete_risk(&self, ctx: &RequestContext, id: &RiskId) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        self.store.delete_risk(id)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::RiskDeleted).entity(EntityType::RiskAssessment, id.as_str()),
        );
        Ok(StatusResponse::new("deleted"))
    }

    /// Lists the controls mitigating a risk.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_risk_controls(
        &self,
        ctx: &RequestContext,
        id: &RiskId,
    ) -> GrcResult<Vec<RiskControlView>> {
        ctx.require_user()?;
        Ok(self.store.list_risk_controls(id)?)
    }

    /// Maps a risk to a mitigating control; repeating a mapping is a no-op.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for blank ids.
    pub fn map_risk_control(
        &self,
        ctx: &RequestContext,
        link: &RiskControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        link.validate()?;
        let risk_id = RiskId::new(link.risk_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.map_risk_control(&risk_id, &control_id, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::RiskControlMapped)
                .entity(EntityType::RiskControlMapping, risk_id.as_str())
                .changes(json!({ "activated_control_id": control_id })),
        );
        Ok(StatusResponse::new("created"))
    }

    /// Removes a risk-to-control mapping.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found when the mapping does
    /// not exist.
    pub fn unmap_risk_control(
        &self,
        ctx: &RequestContext,
        link: &RiskControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        link.validate()?;
        let risk_id = RiskId::new(link.risk_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.unmap_risk_control(&risk_id, &control_id)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::RiskControlUnmapped)
                .entity(EntityType::RiskControlMapping, risk_id.as_str())
                .changes(json!({ "activated_control_id": control_id })),
        );
        Ok(StatusResponse::new("deleted"))
    }
}

// ============================================================================
// SECTION: Data-Subject Requests
// ============================================================================

impl GrcService {
    /// Lists data-subject requests.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_dsrs(&self, ctx: &RequestContext) -> GrcResult<Vec<DataSubjectRequest>> {
        ctx.require_user()?;
        Ok(self.store.list_dsrs()?)
    }

    /// Fetches one data-subject request.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_dsr(&self, ctx: &RequestContext, id: &DsrId) -> GrcResult<DataSubjectRequest> {
        ctx.require_user()?;
        Ok(self.store.get_dsr(id)?)
    }

    /// Registers a data-subject request entered by an administrator.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for missing
    /// requester details.
    pub fn create_dsr(&self, ctx: &RequestContext, request: &NewDsr) -> GrcResult<DataSubjectRequest> {
        ctx.require_admin()?;
        self.insert_dsr(ctx, request)
    }

    /// Accepts a data-subject request from the public form.
    ///
    /// # Errors
    ///
    /// Returns validation errors for missing requester details.
    pub fn submit_public_dsr(
        &self,
        ctx: &RequestContext,
        request: &NewDsr,
    ) -> GrcResult<DataSubjectRequest> {
        self.insert_dsr(ctx, request)
    }

    /// Validates, inserts, and audits a request.
    fn insert_dsr(&self, ctx: &RequestContext, request: &NewDsr) -> GrcResult<DataSubjectRequest> {
        request.validate()?;
        let dsr = self.store.create_dsr(request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DsrCreated)
                .entity(EntityType::GdprDsr, dsr.id.as_str())
                .changes(json!({
                    "request_type": dsr.request_type.as_str(),
                    "deadline_date": grc_core::dates::format_date(dsr.deadline_date),
                })),
        );
        Ok(dsr)
    }

    /// Updates workflow fields of a request.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found for unknown ids.
    pub fn update_dsr(
        &self,
        ctx: &RequestContext,
        id: &DsrId,
        update: &DsrUpdate,
    ) -> GrcResult<DataSubjectRequest> {
        ctx.require_admin()?;
        let dsr = self.store.update_dsr(id, update, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DsrUpdated)
                .entity(EntityType::GdprDsr, dsr.id.as_str())
                .changes(json!({
                    "status": dsr.status.as_str(),
                    "priority": dsr.priority.as_str(),
                })),
        );
        Ok(dsr)
    }

    /// Completes a request with a response summary.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for a blank
    /// summary, and not found for unknown ids.
    pub fn complete_dsr(
        &self,
        ctx: &RequestContext,
        id: &DsrId,
        completion: &DsrCompletion,
    ) -> GrcResult<DataSubjectRequest> {
        ctx.require_admin()?;
        completion.validate()?;
        let dsr = self.store.complete_dsr(id, completion.response_summary.trim(), ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::DsrCompleted)
                .entity(EntityType::GdprDsr, dsr.id.as_str())
                .changes(json!({ "response_summary": dsr.response_summary })),
        );
        Ok(dsr)
    }
}

// ============================================================================
// SECTION: Processing Register
// ============================================================================

impl GrcService {
    /// Lists draft and active processing activities.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_ropa(&self, ctx: &RequestContext) -> GrcResult<Vec<ProcessingActivity>> {
        ctx.require_user()?;
        Ok(self.store.list_ropa()?)
    }

    /// Fetches one processing activity.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_ropa(&self, ctx: &RequestContext, id: &RopaId) -> GrcResult<ProcessingActivity> {
        ctx.require_user()?;
        Ok(self.store.get_ropa(id)?)
    }

    /// Records a processing activity.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for blank
    /// required text.
    pub fn create_ropa(
        &self,
        ctx: &RequestContext,
        request: &NewProcessingActivity,
    ) -> GrcResult<ProcessingActivity> {
        ctx.require_admin()?;
        request.validate()?;
        let entry = self.store.create_ropa(request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::RopaCreated)
                .entity(EntityType::GdprRopa, entry.id.as_str())
                .changes(json!({ "activity_name": entry.activity_name, "status": entry.status.as_str() })),
        );
        Ok(entry)
    }

    /// Updates a processing activity.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for blank
    /// replacements, and not found for unknown ids.
    pub fn update_ropa(
        &self,
        ctx: &RequestContext,
        id: &RopaId,
        update: &ProcessingActivityUpdate,
    ) -> GrcResult<ProcessingActivity> {
        ctx.require_admin()?;
        let entry = self.store.update_ropa(id, update, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::RopaUpdated)
                .entity(EntityType::GdprRopa, entry.id.as_str())
                .changes(json!({ "activity_name": entry.activity_name, "status": entry.status.as_str() })),
        );
        Ok(entry)
    }

    /// Archives a processing activity.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found for unknown ids.
    pub fn archive_ropa(&self, ctx: &RequestContext, id: &RopaId) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        self.store.archive_ropa(id, ctx.now)?;
        self.record(ctx, NewAuditEntry::new(AuditAction::RopaArchived).entity(EntityType::GdprRopa, id.as_str()));
        Ok(StatusResponse::new("archived"))
    }
}
