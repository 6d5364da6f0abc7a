// crates/grc-server/src/service/session.rs
// ============================================================================
// Module: Session Operations
// Description: Password login and token issuance.
// Purpose: Authenticate users against the seeded credentials.
// Dependencies: grc-core, crate::auth
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::AuditAction;
use grc_core::EntityType;
use grc_core::GrcError;
use grc_core::GrcResult;
use grc_core::LoginRequest;
use grc_core::NewAuditEntry;
use grc_core::User;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::GrcService;
use crate::auth::RequestContext;
use crate::auth::is_accepted_password;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Successful login body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Authenticated user.
    pub user: User,
    /// Bearer token for subsequent requests.
    pub token: String,
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl GrcService {
    /// Exchanges credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns validation errors for blank fields and unauthorized
    /// "invalid email or password" for any credential mismatch, after writing
    /// one failure audit row.
    pub fn login(&self, ctx: &RequestContext, request: &LoginRequest) -> GrcResult<LoginResponse> {
        request.validate()?;
        let email = request.email.trim();
        let user = self.store.find_user_by_email(email)?;
        let Some(user) = user.filter(|_| is_accepted_password(&request.password)) else {
            self.record(
                ctx,
                NewAuditEntry::new(AuditAction::UserLoginFailure).changes(json!({ "email": email })),
            );
            return Err(GrcError::unauthorized("invalid email or password"));
        };
        let token = self.keys.issue(&user, ctx.now)?;
        self.record(
            ctx,
            NewAuditEntry::new(AuditAction::UserLoginSuccess)
                .actor(Some(user.id.clone()))
                .entity(EntityType::User, user.id.as_str()),
        );
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            user,
            token,
        })
    }
}
