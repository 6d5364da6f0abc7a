// crates/grc-server/src/lib.rs
// ============================================================================
// Module: GRC Server Library
// Description: Service layer, background jobs, and HTTP API for GRC.
// Purpose: Expose the server entry points used by the CLI and tests.
// Dependencies: crate::{audit, auth, email, handlers, notify, scheduler, server, service}
// ============================================================================

//! ## Overview
//! The server crate turns the GRC store into a running back office: a
//! [`GrcService`] enforcing roles and recording audit events, an axum router
//! exposing it as JSON over HTTP, a [`Scheduler`] running review scans and
//! digests, and an [`EmailDispatcher`] for outbound mail.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod email;
mod handlers;
pub mod notify;
pub mod scheduler;
pub mod server;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::NoopAuditSink;
pub use audit::StoreAuditSink;
pub use auth::AuthUser;
pub use auth::RequestContext;
pub use auth::SessionKeys;
pub use email::EmailDispatcher;
pub use email::MailTransport;
pub use email::OutgoingEmail;
pub use scheduler::JobKind;
pub use scheduler::JobReport;
pub use scheduler::Scheduler;
pub use scheduler::run_job;
pub use server::GrcServer;
pub use server::GrcServerError;
pub use server::build_router;
pub use server::open_store;
pub use service::GrcService;
pub use service::LoginResponse;
pub use service::StatusResponse;
