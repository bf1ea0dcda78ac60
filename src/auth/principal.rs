//! Per-request principal and the extractors handlers use to read it.
//!
//! The gate inserts a `Principal` into the request's extensions once a token
//! has been verified in that request. Nothing else writes it, and it is
//! dropped with the request.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use super::errors::{AuthError, AuthErrorKind};
use crate::jwt::AccessClaims;

/// Authority required by `AdminOnly`.
pub const ADMIN_AUTHORITY: &str = "ADMIN";

/// The authenticated member for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Identity (member email)
    pub email: String,
    /// Credentials (member id)
    pub member_id: i64,
    /// Authorities, in the order the token listed them
    #[serde(rename = "roles")]
    pub authorities: Vec<String>,
}

impl Principal {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

impl From<&AccessClaims> for Principal {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            email: claims.email.clone(),
            member_id: claims.member_id,
            authorities: claims.roles.clone(),
        }
    }
}

/// The verified access token behind the principal, used to revoke it on logout.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub access_token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

/// Authorization rule checked by the `Auth` extractor.
pub trait RoleConstraint {
    fn allows(principal: &Principal) -> bool;
}

/// Any authenticated member.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_: &Principal) -> bool {
        true
    }
}

/// Members holding the `ADMIN` authority.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(principal: &Principal) -> bool {
        principal.has_authority(ADMIN_AUTHORITY)
    }
}

/// Extractor for handlers that require an authenticated principal.
/// Rejects with 401 when the gate did not authenticate the request, and 403
/// when the principal fails the role constraint.
pub struct Auth<R: RoleConstraint = AnyRole>(pub Principal, PhantomData<R>);

impl<R: RoleConstraint> Auth<R> {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: Send + Sync,
    R: RoleConstraint,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::new(AuthErrorKind::NotAuthenticated))?;

        if !R::allows(&principal) {
            return Err(AuthError::new(AuthErrorKind::InsufficientRole));
        }

        Ok(Auth(principal, PhantomData))
    }
}
