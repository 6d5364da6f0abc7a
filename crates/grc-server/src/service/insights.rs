// crates/grc-server/src/service/insights.rs
// ============================================================================
// Module: Reporting Operations
// Description: Dashboard, notifications, audit trail, and analytics reads.
// Purpose: Read-only views plus notification acknowledgement.
// Dependencies: grc-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::AssetBreakdown;
use grc_core::AuditLogEntry;
use grc_core::AuditQuery;
use grc_core::DashboardSummary;
use grc_core::DsrMetrics;
use grc_core::GrcResult;
use grc_core::Notification;
use grc_core::NotificationId;
use grc_core::RopaMetrics;
use grc_core::SeverityCount;

use super::GrcService;
use super::StatusResponse;
use crate::auth::RequestContext;

// ============================================================================
// SECTION: Operations
// ============================================================================

impl GrcService {
    /// Returns control, ticket, and asset counters as of the request date.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn dashboard_summary(&self, ctx: &RequestContext) -> GrcResult<DashboardSummary> {
        ctx.require_user()?;
        Ok(self.store.dashboard_summary(ctx.now.date())?)
    }

    /// Lists the caller's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn list_notifications(
        &self,
        ctx: &RequestContext,
        only_unread: bool,
    ) -> GrcResult<Vec<Notification>> {
        let user = ctx.require_user()?;
        Ok(self.store.list_notifications(&user.id, only_unread)?)
    }

    /// Marks one of the caller's notifications read; repeating is harmless.
    ///
    /// # Errors
    ///
    /// Returns not found when the notification belongs to someone else or
    /// does not exist.
    pub fn mark_notification_read(
        &self,
        ctx: &RequestContext,
        id: &NotificationId,
    ) -> GrcResult<StatusResponse> {
        let user = ctx.require_user()?;
        self.store.mark_notification_read(&user.id, id)?;
        Ok(StatusResponse::new("marked as read"))
    }

    /// Queries the audit trail, newest first.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins, or store errors.
    pub fn audit_log(&self, ctx: &RequestContext, query: &AuditQuery) -> GrcResult<Vec<AuditLogEntry>> {
        ctx.require_admin()?;
        Ok(self.store.query_audit(query)?)
    }

    /// Counts open risks per severity band.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn risk_distribution(&self, ctx: &RequestContext) -> GrcResult<Vec<SeverityCount>> {
        ctx.require_user()?;
        Ok(self.store.risk_distribution()?)
    }

    /// Summarizes data-subject request handling as of the request date.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn dsr_metrics(&self, ctx: &RequestContext) -> GrcResult<DsrMetrics> {
        ctx.require_user()?;
        Ok(self.store.dsr_metrics(ctx.now.date())?)
    }

    /// Counts processing activities per status.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn ropa_metrics(&self, ctx: &RequestContext) -> GrcResult<RopaMetrics> {
        ctx.require_user()?;
        Ok(self.store.ropa_metrics()?)
    }

    /// Counts assets per type and status.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session, or store errors.
    pub fn asset_breakdown(&self, ctx: &RequestContext) -> GrcResult<AssetBreakdown> {
        ctx.require_user()?;
        Ok(self.store.asset_breakdown()?)
    }
}
