//! Renewal of expired access tokens.
//!
//! A member holds one live renewal credential at a time. Renewing consumes it:
//! the stored credential is swapped for a new one only if it still equals the
//! one the client presented, so a credential can be used at most once.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::auth::{REFRESH_COOKIE_NAME, REFRESH_HEADER_NAME, get_cookie};
use crate::jwt::{AccessTokenResult, JwtConfig, JwtError};
use crate::store::{RevocationStore, StoreError};

/// Default renewal credential lifetime: 2 weeks
pub const RENEWAL_TOKEN_DURATION_SECS: u64 = 14 * 24 * 60 * 60;

/// A freshly minted access token and its paired renewal credential.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: AccessTokenResult,
    pub renewal_token: String,
    /// Renewal credential duration in seconds
    pub renewal_duration: u64,
}

/// Where the client supplied its renewal credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalSource {
    Header,
    Cookie,
}

/// Outcome of a successful renewal.
#[derive(Debug, Clone)]
pub struct Renewed {
    pub pair: TokenPair,
    pub source: RenewalSource,
}

#[derive(Debug)]
pub enum RenewalError {
    /// No usable renewal credential: missing, unknown, expired or already rotated
    NoRenewalCredential,
    /// The expired token could not be decoded, or a new one could not be signed
    Token(JwtError),
    Store(StoreError),
}

impl From<JwtError> for RenewalError {
    fn from(e: JwtError) -> Self {
        RenewalError::Token(e)
    }
}

impl From<StoreError> for RenewalError {
    fn from(e: StoreError) -> Self {
        RenewalError::Store(e)
    }
}

impl std::fmt::Display for RenewalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenewalError::NoRenewalCredential => write!(f, "No renewal credential"),
            RenewalError::Token(e) => write!(f, "{}", e),
            RenewalError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RenewalError {}

/// Issues token pairs and renews expired access tokens.
#[derive(Clone)]
pub struct RenewalCoordinator<S> {
    jwt: Arc<JwtConfig>,
    store: S,
    renewal_ttl: Duration,
}

impl<S: RevocationStore> RenewalCoordinator<S> {
    pub fn new(jwt: Arc<JwtConfig>, store: S, renewal_ttl: Duration) -> Self {
        Self {
            jwt,
            store,
            renewal_ttl,
        }
    }

    /// Mint a token pair for a member and record the renewal credential.
    /// This is what a login flow calls once the member has proven who they are.
    pub async fn issue(
        &self,
        email: &str,
        member_id: i64,
        roles: &[String],
    ) -> Result<TokenPair, RenewalError> {
        let access = self.jwt.generate_access_token(email, member_id, roles)?;
        let renewal_token = generate_renewal_token();
        self.store
            .store_renewal_credential(member_id, &renewal_token, self.renewal_ttl)
            .await?;

        tracing::debug!(member_id, "Issued token pair");

        Ok(TokenPair {
            access,
            renewal_token,
            renewal_duration: self.renewal_ttl.as_secs(),
        })
    }

    /// Exchange an expired access token plus the request's renewal credential for a new pair.
    ///
    /// The new access token carries the same email, id and roles with fresh
    /// `iat`/`exp`. Fails with `NoRenewalCredential` if the presented credential
    /// does not match the stored one, including when a concurrent renewal
    /// rotated it first.
    pub async fn renew(&self, expired_token: &str, headers: &HeaderMap) -> Result<Renewed, RenewalError> {
        let claims = self.jwt.decode_expired(expired_token)?;

        let (presented, source) =
            renewal_credential(headers).ok_or(RenewalError::NoRenewalCredential)?;

        let stored = self
            .store
            .get_renewal_credential(claims.member_id)
            .await?
            .ok_or(RenewalError::NoRenewalCredential)?;

        if !bool::from(stored.as_bytes().ct_eq(presented.as_bytes())) {
            return Err(RenewalError::NoRenewalCredential);
        }

        let access = self
            .jwt
            .generate_access_token(&claims.email, claims.member_id, &claims.roles)?;
        let renewal_token = generate_renewal_token();

        let rotated = self
            .store
            .rotate_renewal_credential(claims.member_id, presented, &renewal_token, self.renewal_ttl)
            .await?;
        if !rotated {
            tracing::warn!(
                member_id = claims.member_id,
                "Renewal credential rotated concurrently"
            );
            return Err(RenewalError::NoRenewalCredential);
        }

        tracing::info!(member_id = claims.member_id, "Renewed access token");

        Ok(Renewed {
            pair: TokenPair {
                access,
                renewal_token,
                renewal_duration: self.renewal_ttl.as_secs(),
            },
            source,
        })
    }
}

/// Read the renewal credential from the `Refresh` header, falling back to the cookie.
pub fn renewal_credential(headers: &HeaderMap) -> Option<(&str, RenewalSource)> {
    let from_header = headers
        .get(REFRESH_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match from_header {
        Some(value) => Some((value, RenewalSource::Header)),
        None => get_cookie(headers, REFRESH_COOKIE_NAME)
            .filter(|v| !v.is_empty())
            .map(|v| (v, RenewalSource::Cookie)),
    }
}

/// Generate a random 256-bit renewal credential as URL-safe base64.
pub fn generate_renewal_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
