//! The authentication gate: per-request verification, renewal and rejection.
//!
//! For a request carrying `Authorization: Bearer <token>`:
//! 1. A revoked token is rejected before its signature is even looked at.
//! 2. A valid token authenticates the request.
//! 3. An expired token gets exactly one renewal attempt; the newly minted
//!    token is verified again and its claims, not the expired ones, become the
//!    principal. New credentials are returned in response headers.
//! 4. Malformed or forged tokens are rejected without renewal.
//!
//! Requests without a bearer credential pass through untouched; handlers that
//! need a principal enforce that with the `Auth` extractor.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use super::cookie::{REFRESH_COOKIE_NAME, REFRESH_HEADER_NAME, bearer_token};
use super::errors::{AuthError, AuthErrorKind};
use super::principal::{AuthenticatedSession, Principal};
use crate::jwt::{AccessClaims, JwtConfig, JwtError};
use crate::renewal::{RenewalCoordinator, RenewalError, RenewalSource, Renewed};
use crate::store::RevocationStore;

/// A request that passed the gate.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Claims of the token the request is authenticated with
    pub claims: AccessClaims,
    /// That token (the renewed one if renewal happened)
    pub access_token: String,
    /// New credentials to hand back to the client
    pub renewed: Option<Renewed>,
}

impl Authenticated {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.claims)
    }
}

/// Orchestrates the codec, revocation store and renewal coordinator.
pub struct AuthGate<S> {
    jwt: Arc<JwtConfig>,
    store: S,
    coordinator: RenewalCoordinator<S>,
    secure_cookies: bool,
}

impl<S: RevocationStore> AuthGate<S> {
    pub fn new(jwt: Arc<JwtConfig>, store: S, renewal_ttl: Duration, secure_cookies: bool) -> Self {
        let coordinator = RenewalCoordinator::new(jwt.clone(), store.clone(), renewal_ttl);
        Self {
            jwt,
            store,
            coordinator,
            secure_cookies,
        }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn coordinator(&self) -> &RenewalCoordinator<S> {
        &self.coordinator
    }

    /// Run the gate over a request's headers.
    ///
    /// `Ok(None)` means the request carried no bearer credential and is not
    /// the gate's concern.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Authenticated>, AuthError> {
        let Some(token) = bearer_token(headers) else {
            return Ok(None);
        };

        match self.store.is_blacklisted(token).await {
            Ok(false) => {}
            Ok(true) => {
                info!("Rejected revoked access token");
                return Err(AuthErrorKind::TokenRevoked.into());
            }
            Err(e) => {
                error!(error = %e, "Failed to check revoked tokens");
                return Err(AuthErrorKind::AuthenticationFailed.into());
            }
        }

        match self.jwt.verify(token) {
            Ok(claims) => Ok(Some(Authenticated {
                claims,
                access_token: token.to_string(),
                renewed: None,
            })),
            Err(JwtError::Expired) => self.renew(token, headers).await.map(Some),
            Err(JwtError::Malformed) => {
                warn!("Rejected malformed access token");
                Err(AuthErrorKind::TokenFormatInvalid.into())
            }
            Err(JwtError::SignatureInvalid) => {
                warn!("Rejected access token with invalid signature, possible tampering");
                Err(AuthErrorKind::SignatureInvalid.into())
            }
            Err(
                e @ (JwtError::MissingSecret
                | JwtError::Encoding(_)
                | JwtError::Decoding(_)
                | JwtError::TimeError),
            ) => {
                error!(error = %e, "Access token verification failed");
                Err(AuthErrorKind::AuthenticationFailed.into())
            }
        }
    }

    async fn renew(&self, token: &str, headers: &HeaderMap) -> Result<Authenticated, AuthError> {
        info!("Access token expired, attempting renewal");

        let renewed = match self.coordinator.renew(token, headers).await {
            Ok(renewed) => renewed,
            Err(RenewalError::NoRenewalCredential) => {
                info!("Renewal credential not found, session expired");
                return Err(AuthErrorKind::SessionExpired.into());
            }
            Err(RenewalError::Token(JwtError::Malformed)) => {
                warn!("Rejected malformed access token during renewal");
                return Err(AuthErrorKind::TokenFormatInvalid.into());
            }
            Err(RenewalError::Token(JwtError::SignatureInvalid)) => {
                warn!("Rejected access token with invalid signature during renewal");
                return Err(AuthErrorKind::SignatureInvalid.into());
            }
            Err(e) => {
                error!(error = %e, "Access token renewal failed");
                return Err(AuthErrorKind::AuthenticationFailed.into());
            }
        };

        // The renewed token must verify on its own; it is never renewed again.
        let claims = self.jwt.verify(&renewed.pair.access.token).map_err(|e| {
            error!(error = %e, "Renewed access token failed verification");
            AuthError::new(AuthErrorKind::AuthenticationFailed)
        })?;

        Ok(Authenticated {
            claims,
            access_token: renewed.pair.access.token.clone(),
            renewed: Some(renewed),
        })
    }

    /// Write renewed credentials onto a response.
    fn write_renewed(&self, headers: &mut HeaderMap, renewed: &Renewed) {
        let bearer = format!("Bearer {}", renewed.pair.access.token);
        if let Ok(value) = HeaderValue::from_str(&bearer) {
            headers.insert(header::AUTHORIZATION, value);
        }
        if let Ok(value) = HeaderValue::from_str(&renewed.pair.renewal_token) {
            headers.insert(REFRESH_HEADER_NAME, value);
        }

        if renewed.source == RenewalSource::Cookie {
            let secure = if self.secure_cookies { "; Secure" } else { "" };
            let cookie = format!(
                "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
                REFRESH_COOKIE_NAME, renewed.pair.renewal_token, renewed.pair.renewal_duration, secure
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.append(header::SET_COOKIE, value);
            }
        }
    }
}

/// Middleware running the gate in front of the wrapped routes.
///
/// On success the principal and session are inserted into the request's
/// extensions before the next handler runs. On failure the request ends here
/// with a structured error.
pub async fn authenticate_request<S: RevocationStore>(
    State(gate): State<Arc<AuthGate<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let result = gate.authenticate(request.headers()).await;
    let authenticated = match result {
        Ok(Some(authenticated)) => authenticated,
        Ok(None) => return next.run(request).await,
        Err(e) => return e.into_response(),
    };

    let extensions = request.extensions_mut();
    extensions.insert(authenticated.principal());
    extensions.insert(AuthenticatedSession {
        access_token: authenticated.access_token,
        expires_at: authenticated.claims.exp,
    });

    let mut response = next.run(request).await;
    if let Some(renewed) = &authenticated.renewed {
        gate.write_renewed(response.headers_mut(), renewed);
    }
    response
}
