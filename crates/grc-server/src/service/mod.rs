// crates/grc-server/src/service/mod.rs
// ============================================================================
// Module: GRC Service
// Description: Transport-agnostic business operations.
// Purpose: Validate, authorize, persist, and audit every API operation.
// Dependencies: grc-core, grc-store-sqlite, crate::{audit, auth, email, notify}
// ============================================================================

//! ## Overview
//! [`GrcService`] owns the store handle, the audit sink, the notification
//! writer, the email dispatcher, and the session keys. Every operation takes
//! a [`RequestContext`], checks the caller's role, validates input before
//! touching the store, and records an audit event after a successful write.
//! Operations are synchronous; the HTTP layer moves them off the async
//! executor.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod controls;
mod documents;
mod insights;
mod records;
mod session;
mod tickets;
mod vendors;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use grc_core::GrcResult;
use grc_core::NewAuditEntry;
use grc_store_sqlite::SqliteGrcStore;
use serde::Serialize;

pub use self::session::LoginResponse;
use crate::audit::AuditSink;
use crate::audit::StoreAuditSink;
use crate::auth::AuthUser;
use crate::auth::RequestContext;
use crate::auth::SessionKeys;
use crate::auth::parse_bearer_token;
use crate::email::EmailDispatcher;
use crate::notify::NotificationWriter;

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Acknowledgement body for operations without a record to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    /// Short outcome label.
    pub status: &'static str,
}

impl StatusResponse {
    /// Builds an acknowledgement.
    #[must_use]
    pub const fn new(status: &'static str) -> Self {
        Self {
            status,
        }
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Business operations over one store.
pub struct GrcService {
    /// Persistence gateway.
    store: SqliteGrcStore,
    /// Audit event destination.
    audit: Arc<dyn AuditSink>,
    /// In-app notification writer.
    notifier: NotificationWriter,
    /// Outbound email dispatcher.
    email: EmailDispatcher,
    /// Session token keys.
    keys: SessionKeys,
    /// Shared key for external ticket endpoints.
    external_api_key: String,
}

impl GrcService {
    /// Creates a service auditing into the store itself.
    #[must_use]
    pub fn new(
        store: SqliteGrcStore,
        keys: SessionKeys,
        external_api_key: impl Into<String>,
        email: EmailDispatcher,
    ) -> Self {
        Self {
            audit: Arc::new(StoreAuditSink::new(store.clone())),
            notifier: NotificationWriter::new(store.clone()),
            store,
            email,
            keys,
            external_api_key: external_api_key.into(),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the store handle.
    #[must_use]
    pub const fn store(&self) -> &SqliteGrcStore {
        &self.store
    }

    /// Returns the email dispatcher.
    #[must_use]
    pub const fn email(&self) -> &EmailDispatcher {
        &self.email
    }

    /// Returns the notification writer.
    pub(crate) const fn notifier(&self) -> &NotificationWriter {
        &self.notifier
    }

    /// Resolves an optional `Authorization` header into a caller.
    ///
    /// # Errors
    ///
    /// Returns unauthorized when a header is present but malformed, forged,
    /// or expired. A missing header yields `Ok(None)`.
    pub fn authenticate(&self, authorization: Option<&str>) -> GrcResult<Option<AuthUser>> {
        let Some(header) = authorization else {
            return Ok(None);
        };
        let token = parse_bearer_token(header)?;
        self.keys.verify(token).map(Some)
    }

    /// Records an audit event, filling the peer address and, when unset, the
    /// caller as actor.
    fn record(&self, ctx: &RequestContext, entry: NewAuditEntry) {
        let actor = entry.user_id.clone().or_else(|| ctx.actor());
        let entry = entry.actor(actor).ip(ctx.ip_address.clone());
        self.audit.record(entry, ctx.now);
    }
}
