// crates/grc-server/src/service/vendors.rs
// ============================================================================
// Module: Vendor Operations
// Description: Vendor register, assessments, and control mappings.
// Purpose: Track third-party risk alongside the internal control set.
// Dependencies: grc-core, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::ActivatedControlId;
use grc_core::AuditAction;
use grc_core::EntityType;
use grc_core::GrcResult;
use grc_core::NewAuditEntry;
use grc_core::NewVendor;
use grc_core::NewVendorAssessment;
use grc_core::Vendor;
use grc_core::VendorAssessment;
use grc_core::VendorControlLink;
use grc_core::VendorControlView;
use grc_core::VendorId;
use grc_core::VendorUpdate;
use serde_json::json;

use super::GrcService;
use super::StatusResponse;
use crate::auth::RequestContext;

// ============================================================================
// SECTION: Vendors
// ============================================================================

impl GrcService {
    /// Lists vendors by name.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_vendors(&self, ctx: &RequestContext) -> GrcResult<Vec<Vendor>> {
        ctx.require_user()?;
        Ok(self.store.list_vendors()?)
    }

    /// Fetches one vendor.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_vendor(&self, ctx: &RequestContext, id: &VendorId) -> GrcResult<Vendor> {
        ctx.require_user()?;
        Ok(self.store.get_vendor(id)?)
    }

    /// Registers a vendor.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for invalid
    /// fields.
    pub fn create_vendor(&self, ctx: &RequestContext, request: &NewVendor) -> GrcResult<Vendor> {
        ctx.require_admin()?;
        request.validate()?;
        let vendor = self.store.create_vendor(request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::VendorCreated)
                .entity(EntityType::Vendor, vendor.id.as_str())
                .changes(json!({ "name": vendor.name, "risk_tier": vendor.risk_tier.as_str() })),
        );
        Ok(vendor)
    }

    /// Updates a vendor.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, validation errors for invalid
    /// replacements, and not found for unknown ids.
    pub fn update_vendor(
        &self,
        ctx: &RequestContext,
        id: &VendorId,
        update: &VendorUpdate,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        let vendor = self.store.update_vendor(id, update, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::VendorUpdated)
                .entity(EntityType::Vendor, vendor.id.as_str())
                .changes(json!({
                    "name": vendor.name,
                    "risk_tier": vendor.risk_tier.as_str(),
                    "status": vendor.status.as_str(),
                })),
        );
        Ok(StatusResponse::new("updated"))
    }

    /// Deletes a vendor with its assessments and mappings.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found for unknown ids.
    pub fn delete_vendor(&self, ctx: &RequestContext, id: &VendorId) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        self.store.delete_vendor(id)?;
        self.record(ctx, NewAuditEntry::new(AuditAction::VendorDeleted).entity(EntityType::Vendor, id.as_str()));
        Ok(StatusResponse::new("deleted"))
    }

    /// Lists a vendor's assessments, latest first.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown vendors.
    pub fn list_vendor_assessments(
        &self,
        ctx: &RequestContext,
        id: &VendorId,
    ) -> GrcResult<Vec<VendorAssessment>> {
        ctx.require_user()?;
        Ok(self.store.list_vendor_assessments(id)?)
    }

    /// Records an assessment; the caller is the assessor unless one is named.
    ///
    /// # Errors
    ///
    /// Returns validation errors for out-of-range scores and not found for
    /// unknown vendors.
    pub fn create_vendor_assessment(
        &self,
        ctx: &RequestContext,
        id: &VendorId,
        request: &NewVendorAssessment,
    ) -> GrcResult<VendorAssessment> {
        let user = ctx.require_user()?;
        request.validate()?;
        let assessment = self.store.create_vendor_assessment(id, &user.id, request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::VendorAssessmentCreated)
                .entity(EntityType::VendorAssessment, assessment.id.as_str())
                .changes(json!({
                    "vendor_id": id,
                    "overall_risk_score": assessment.overall_risk_score,
                })),
        );
        Ok(assessment)
    }

    /// Lists the controls mapped to a vendor.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown vendors.
    pub fn list_vendor_controls(
        &self,
        ctx: &RequestContext,
        id: &VendorId,
    ) -> GrcResult<Vec<VendorControlView>> {
        ctx.require_user()?;
        Ok(self.store.list_vendor_controls(id)?)
    }

    /// Maps a vendor to an activated control; repeating is a no-op.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and validation errors for blank ids.
    pub fn map_vendor_control(
        &self,
        ctx: &RequestContext,
        link: &VendorControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        link.validate()?;
        let vendor_id = VendorId::new(link.vendor_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.map_vendor_control(&vendor_id, &control_id, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::VendorControlMapped)
                .entity(EntityType::VendorControlMapping, vendor_id.as_str())
                .changes(json!({ "activated_control_id": control_id })),
        );
        Ok(StatusResponse::new("created"))
    }

    /// Removes a vendor-to-control mapping.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found when the mapping does
    /// not exist.
    pub fn unmap_vendor_control(
        &self,
        ctx: &RequestContext,
        link: &VendorControlLink,
    ) -> GrcResult<StatusResponse> {
        ctx.require_admin()?;
        link.validate()?;
        let vendor_id = VendorId::new(link.vendor_id.trim());
        let control_id = ActivatedControlId::new(link.activated_control_id.trim());
        self.store.unmap_vendor_control(&vendor_id, &control_id)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::VendorControlUnmapped)
                .entity(EntityType::VendorControlMapping, vendor_id.as_str())
                .changes(json!({ "activated_control_id": control_id })),
        );
        Ok(StatusResponse::new("deleted"))
    }
}
