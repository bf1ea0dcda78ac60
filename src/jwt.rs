//! Access token signing and verification.
//!
//! Access tokens are HS256 JWTs carrying the member's email, id and roles.
//! Verification distinguishes expiry from structural damage and from a bad
//! signature, because only an expired token may be renewed.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default access token lifetime: 5 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 5 * 60;

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Member email, used as the principal's identity
    pub email: String,
    /// Member id
    #[serde(rename = "memberId")]
    pub member_id: i64,
    /// Role names, order preserved
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Result of generating an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and access token lifetime.
    pub fn new(secret: &[u8], access_ttl: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign the given claims as-is.
    pub fn sign(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Generate a fresh access token valid for the configured lifetime.
    pub fn generate_access_token(
        &self,
        email: &str,
        member_id: i64,
        roles: &[String],
    ) -> Result<AccessTokenResult, JwtError> {
        let now = unix_now()?;
        let duration = self.access_ttl.as_secs();
        let exp = now.checked_add(duration).ok_or(JwtError::TimeError)?;

        let claims = AccessClaims {
            email: email.to_string(),
            member_id,
            roles: roles.to_vec(),
            iat: now,
            exp,
        };

        Ok(AccessTokenResult {
            token: self.sign(&claims)?,
            expires_at: exp,
            duration,
        })
    }

    /// Validate and decode an access token.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.decode(token, true)
    }

    /// Decode an access token whose only permitted defect is expiry.
    /// The signature is still checked.
    pub fn decode_expired(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.decode(token, false)
    }

    fn decode(&self, token: &str, validate_exp: bool) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;

        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from_decoding)
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Token was valid but its `exp` has passed
    Expired,
    /// Token is not a well-formed JWT with the expected claims
    Malformed,
    /// Signature does not match the token contents
    SignatureInvalid,
    /// No signing secret configured
    MissingSecret,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Any other decoding failure
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl JwtError {
    fn from_decoding(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::SignatureInvalid,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName => JwtError::Malformed,
            _ => JwtError::Decoding(e),
        }
    }
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::Malformed => write!(f, "Malformed token"),
            JwtError::SignatureInvalid => write!(f, "Token signature invalid"),
            JwtError::MissingSecret => write!(f, "JWT secret is missing"),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
