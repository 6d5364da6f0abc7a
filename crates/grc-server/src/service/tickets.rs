// crates/grc-server/src/service/tickets.rs
// ============================================================================
// Module: Ticket Operations
// Description: Internal and customer-facing tickets with comments.
// Purpose: Enforce ticket visibility, commenting rights, and API-key access.
// Dependencies: grc-core, serde_json
// ============================================================================

//! ## Overview
//! Internal tickets are created by signed-in users. External tickets come from
//! partner systems that authenticate with a shared API key and are recorded
//! without an actor. Internal notes on external tickets are visible to admins
//! only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::AuditAction;
use grc_core::EntityType;
use grc_core::GrcError;
use grc_core::GrcResult;
use grc_core::NewAuditEntry;
use grc_core::NewComment;
use grc_core::NewExternalTicket;
use grc_core::NewInternalTicket;
use grc_core::Ticket;
use grc_core::TicketComment;
use grc_core::TicketDetail;
use grc_core::TicketId;
use grc_core::TicketType;
use grc_core::TicketUpdate;
use serde_json::json;

use super::GrcService;
use crate::auth::RequestContext;
use crate::auth::check_api_key;

// ============================================================================
// SECTION: Operations
// ============================================================================

impl GrcService {
    /// Opens an internal ticket for the caller.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session and validation errors for a
    /// blank title.
    pub fn create_internal_ticket(
        &self,
        ctx: &RequestContext,
        request: &NewInternalTicket,
    ) -> GrcResult<Ticket> {
        let user = ctx.require_user()?;
        request.validate()?;
        let ticket = self.store.create_internal_ticket(&user.id, request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::TicketCreated)
                .entity(EntityType::Ticket, ticket.id.as_str())
                .changes(json!({ "title": ticket.title, "sequential_id": ticket.sequential_id })),
        );
        Ok(ticket)
    }

    /// Opens a ticket on behalf of an external customer.
    ///
    /// # Errors
    ///
    /// Returns unauthorized for a missing or wrong API key and validation
    /// errors for a blank title or customer reference.
    pub fn create_external_ticket(
        &self,
        ctx: &RequestContext,
        api_key: Option<&str>,
        request: &NewExternalTicket,
    ) -> GrcResult<Ticket> {
        check_api_key(api_key, &self.external_api_key)?;
        request.validate()?;
        let ticket = self.store.create_external_ticket(request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::TicketCreatedExternal)
                .entity(EntityType::Ticket, ticket.id.as_str())
                .changes(json!({
                    "title": ticket.title,
                    "external_customer_ref": ticket.external_customer_ref,
                })),
        );
        Ok(ticket)
    }

    /// Lists the tickets raised for one customer reference.
    ///
    /// # Errors
    ///
    /// Returns unauthorized for a missing or wrong API key.
    pub fn list_customer_tickets(
        &self,
        api_key: Option<&str>,
        customer_ref: &str,
    ) -> GrcResult<Vec<Ticket>> {
        check_api_key(api_key, &self.external_api_key)?;
        Ok(self.store.list_tickets_by_customer(customer_ref.trim())?)
    }

    /// Lists tickets, optionally filtered by type.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session and validation errors for an
    /// unknown type filter.
    pub fn list_tickets(
        &self,
        ctx: &RequestContext,
        ticket_type: Option<&str>,
    ) -> GrcResult<Vec<Ticket>> {
        ctx.require_user()?;
        let filter = match ticket_type.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Some(
                TicketType::parse(value)
                    .ok_or_else(|| GrcError::validation(format!("unknown ticket type: {value}")))?,
            ),
            None => None,
        };
        Ok(self.store.list_tickets(filter)?)
    }

    /// Fetches a ticket with the comments the caller may see.
    ///
    /// # Errors
    ///
    /// Returns not found for unknown ids.
    pub fn get_ticket(&self, ctx: &RequestContext, id: &TicketId) -> GrcResult<TicketDetail> {
        let user = ctx.require_user()?;
        let ticket = self.store.get_ticket(id)?;
        let include_internal = user.is_admin() || ticket.ticket_type == TicketType::Internal;
        let comments = self.store.list_comments(id, include_internal)?;
        Ok(TicketDetail {
            ticket,
            comments,
        })
    }

    /// Adds a comment to a ticket.
    ///
    /// # Errors
    ///
    /// Returns validation errors for a blank body, not found for unknown
    /// tickets, and forbidden when a non-admin is neither creator nor
    /// assignee.
    pub fn add_comment(
        &self,
        ctx: &RequestContext,
        id: &TicketId,
        request: &NewComment,
    ) -> GrcResult<TicketComment> {
        let user = ctx.require_user()?;
        request.validate()?;
        let ticket = self.store.get_ticket(id)?;
        if !user.is_admin() {
            let involved = ticket.created_by_id.as_ref() == Some(&user.id)
                || ticket.assigned_to_user_id.as_ref() == Some(&user.id);
            if !involved {
                return Err(GrcError::forbidden("only the creator or assignee may comment"));
            }
        }
        let comment = self.store.add_comment(id, &user.id, request, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::TicketCommentAdded)
                .entity(EntityType::TicketComment, comment.id.as_str())
                .changes(json!({
                    "ticket_id": id,
                    "is_internal_note": comment.is_internal_note,
                })),
        );
        Ok(comment)
    }

    /// Updates status, assignee, or category of a ticket.
    ///
    /// # Errors
    ///
    /// Returns forbidden for non-admins and not found for unknown tickets.
    pub fn update_ticket(
        &self,
        ctx: &RequestContext,
        id: &TicketId,
        update: &TicketUpdate,
    ) -> GrcResult<Ticket> {
        ctx.require_admin()?;
        let ticket = self.store.update_ticket(id, update, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::TicketUpdated)
                .entity(EntityType::Ticket, ticket.id.as_str())
                .changes(json!({
                    "status": update.status.map(|status| status.as_str()),
                    "assigned_to_user_id": update.assigned_to_user_id,
                    "category": update.category,
                })),
        );
        Ok(ticket)
    }
}
