// crates/grc-server/src/auth.rs
// ============================================================================
// Module: Authentication
// Description: Session tokens, request context, and shared-key checks.
// Purpose: Authenticate callers and carry their identity into the service.
// Dependencies: grc-core, jsonwebtoken, subtle, time
// ============================================================================

//! ## Overview
//! Session tokens are HS256 JWTs carrying the user id, email, and role. The
//! HTTP layer turns the `Authorization` header into an [`AuthUser`] and wraps
//! it in a [`RequestContext`] together with the peer address and the request
//! instant; service operations enforce roles against that context. External
//! ticket endpoints use a shared API key compared in constant time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use grc_core::GrcError;
use grc_core::GrcResult;
use grc_core::Role;
use grc_core::User;
use grc_core::UserId;
use grc_store_sqlite::SEED_PASSWORDS;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;
use subtle::ConstantTimeEq;
use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest accepted `Authorization` header.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Session Tokens
// ============================================================================

/// JWT claims for a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id.
    pub user_id: String,
    /// Login email.
    pub email: String,
    /// Authorization role.
    pub role: Role,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
    /// Issue time, seconds since the epoch.
    pub iat: u64,
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    /// HMAC signing key.
    encoding: EncodingKey,
    /// HMAC verification key.
    decoding: DecodingKey,
    /// Token lifetime.
    ttl: Duration,
}

impl SessionKeys {
    /// Builds keys from a shared secret and a lifetime in days.
    #[must_use]
    pub fn new(secret: &str, ttl_days: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(i64::from(ttl_days)),
        }
    }

    /// Issues a token for `user` valid from `now`.
    ///
    /// # Errors
    ///
    /// Returns an internal error when signing fails.
    pub fn issue(&self, user: &User, now: OffsetDateTime) -> GrcResult<String> {
        let claims = Claims {
            user_id: user.id.as_str().to_string(),
            email: user.email.clone(),
            role: user.role,
            exp: epoch_seconds(now + self.ttl),
            iat: epoch_seconds(now),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| GrcError::internal(format!("token signing failed: {err}")))
    }

    /// Verifies a token signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error for malformed, forged, or expired tokens.
    pub fn verify(&self, token: &str) -> GrcResult<AuthUser> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| GrcError::unauthorized("invalid or expired token"))?;
        Ok(AuthUser {
            id: UserId::new(data.claims.user_id),
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

/// Converts an instant to whole seconds since the epoch, clamping negatives.
fn epoch_seconds(instant: OffsetDateTime) -> u64 {
    u64::try_from(instant.unix_timestamp()).unwrap_or(0)
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Identity recovered from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// User id.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Authorization role.
    pub role: Role,
}

impl AuthUser {
    /// Returns true for administrators.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Per-request context handed to service operations.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated caller, if any.
    pub user: Option<AuthUser>,
    /// Peer address recorded in audit rows.
    pub ip_address: Option<String>,
    /// Request instant.
    pub now: OffsetDateTime,
}

impl RequestContext {
    /// Builds an unauthenticated context at `now`.
    #[must_use]
    pub const fn anonymous(now: OffsetDateTime) -> Self {
        Self {
            user: None,
            ip_address: None,
            now,
        }
    }

    /// Builds a context for an authenticated caller at `now`.
    #[must_use]
    pub const fn for_user(user: AuthUser, now: OffsetDateTime) -> Self {
        Self {
            user: Some(user),
            ip_address: None,
            now,
        }
    }

    /// Returns a copy with the peer address set.
    #[must_use]
    pub fn with_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Returns the caller id for audit rows.
    #[must_use]
    pub fn actor(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| user.id.clone())
    }

    /// Returns the authenticated caller.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error when the request carried no session.
    pub fn require_user(&self) -> GrcResult<&AuthUser> {
        self.user.as_ref().ok_or_else(|| GrcError::unauthorized("authorization header required"))
    }

    /// Returns the caller when it is an administrator.
    ///
    /// # Errors
    ///
    /// Returns unauthorized without a session and forbidden for non-admins.
    pub fn require_admin(&self) -> GrcResult<&AuthUser> {
        let user = self.require_user()?;
        if !user.is_admin() {
            return Err(GrcError::forbidden("admin access required"));
        }
        Ok(user)
    }
}

// ============================================================================
// SECTION: Header Parsing
// ============================================================================

/// Extracts the token from a `Bearer` authorization header.
///
/// # Errors
///
/// Returns an unauthorized error for oversized, non-bearer, or empty headers.
pub fn parse_bearer_token(header: &str) -> GrcResult<&str> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(GrcError::unauthorized("authorization header too large"));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(GrcError::unauthorized("invalid authorization header"));
    }
    Ok(token)
}

/// Checks a caller-supplied API key against the configured key.
///
/// # Errors
///
/// Returns unauthorized "API key required" when absent and "invalid API key"
/// on mismatch.
pub fn check_api_key(provided: Option<&str>, expected: &str) -> GrcResult<()> {
    let provided = provided.map(str::trim).filter(|key| !key.is_empty());
    let Some(provided) = provided else {
        return Err(GrcError::unauthorized("API key required"));
    };
    if !constant_time_eq_str(provided, expected) {
        return Err(GrcError::unauthorized("invalid API key"));
    }
    Ok(())
}

/// Returns true when `password` is one of the shared demo passwords.
#[must_use]
pub fn is_accepted_password(password: &str) -> bool {
    SEED_PASSWORDS.iter().fold(false, |matched, candidate| {
        constant_time_eq_str(password, candidate) | matched
    })
}

/// Compares two strings in constant time.
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use grc_core::ErrorKind;
    use time::macros::datetime;

    use super::*;

    fn admin() -> User {
        User {
            id: UserId::new("u-1"),
            email: "admin@company.com".to_string(),
            name: "System Administrator".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let keys = SessionKeys::new("0123456789abcdef-secret", 7);
        let token = keys.issue(&admin(), OffsetDateTime::now_utc()).unwrap();
        let user = keys.verify(&token).unwrap();
        assert_eq!(user.id, UserId::new("u-1"));
        assert!(user.is_admin());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = SessionKeys::new("0123456789abcdef-secret", 7);
        let verifier = SessionKeys::new("fedcba9876543210-secret", 7);
        let token = issuer.issue(&admin(), OffsetDateTime::now_utc()).unwrap();
        let err = verifier.verify(&token).err().map(|err| err.kind());
        assert_eq!(err, Some(ErrorKind::Unauthorized));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new("0123456789abcdef-secret", 1);
        let token = keys.issue(&admin(), datetime!(2020-01-01 00:00 UTC)).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(parse_bearer_token("Bearer abc").unwrap(), "abc");
        assert_eq!(parse_bearer_token("bearer   abc ").unwrap(), "abc");
        assert!(parse_bearer_token("Basic abc").is_err());
        assert!(parse_bearer_token("Bearer ").is_err());
    }

    #[test]
    fn api_key_messages_distinguish_missing_and_wrong() {
        let missing = check_api_key(None, "key").err().unwrap();
        assert_eq!(missing.message(), "API key required");
        let wrong = check_api_key(Some("nope"), "key").err().unwrap();
        assert_eq!(wrong.message(), "invalid API key");
        assert!(check_api_key(Some("key"), "key").is_ok());
    }

    #[test]
    fn only_seed_passwords_are_accepted() {
        assert!(is_accepted_password("admin123"));
        assert!(is_accepted_password("john123"));
        assert!(!is_accepted_password("password123"));
        assert!(!is_accepted_password(""));
    }

    #[test]
    fn non_admin_context_is_forbidden() {
        let user = AuthUser {
            id: UserId::new("u-2"),
            email: "user@company.com".to_string(),
            role: Role::User,
        };
        let ctx = RequestContext::for_user(user, OffsetDateTime::now_utc());
        assert_eq!(ctx.require_admin().err().map(|err| err.kind()), Some(ErrorKind::Forbidden));
        let anonymous = RequestContext::anonymous(OffsetDateTime::now_utc());
        assert_eq!(
            anonymous.require_user().err().map(|err| err.kind()),
            Some(ErrorKind::Unauthorized)
        );
    }
}
