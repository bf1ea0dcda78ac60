//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why a request was not authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Access token expired and could not be renewed
    SessionExpired,
    /// Access token is not a well-formed JWT
    TokenFormatInvalid,
    /// Access token signature does not match; possibly forged
    SignatureInvalid,
    /// Access token was revoked by logout
    TokenRevoked,
    /// Anything else: store outage, signing failure
    AuthenticationFailed,
    /// Handler requires a principal but the request carried no credential
    NotAuthenticated,
    /// Principal lacks a required authority
    InsufficientRole,
}

impl AuthErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::TokenFormatInvalid => "TOKEN_FORMAT_INVALID",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::InsufficientRole => "INSUFFICIENT_ROLE",
        }
    }

    fn status_code(self) -> StatusCode {
        match self {
            Self::InsufficientRole => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::SessionExpired => "Session expired, please log in again",
            Self::TokenFormatInvalid => "Invalid token format",
            Self::SignatureInvalid => "Invalid token signature",
            Self::TokenRevoked => "Token has been revoked",
            Self::AuthenticationFailed => "Authentication failed",
            Self::NotAuthenticated => "Not authenticated",
            Self::InsufficientRole => "Insufficient permissions",
        }
    }
}

/// Authentication rejection rendered as `{status, errorCode, message}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthError {
    pub kind: AuthErrorKind,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

impl From<AuthErrorKind> for AuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status: u16,
    error_code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        (
            status,
            Json(ErrorResponse {
                status: status.as_u16(),
                error_code: self.kind.code(),
                message: self.kind.message(),
            }),
        )
            .into_response()
    }
}
