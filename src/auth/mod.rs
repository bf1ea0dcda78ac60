//! Bearer token authentication with transparent renewal.
//!
//! Short-lived access tokens (stateless JWTs) are checked on every request
//! against the revocation store and the signing key. An expired access token
//! is renewed once using the member's renewal credential, which is rotated on
//! use.

mod cookie;
mod errors;
mod gate;
mod principal;

pub use cookie::{REFRESH_COOKIE_NAME, REFRESH_HEADER_NAME, bearer_token, get_cookie};
pub use errors::{AuthError, AuthErrorKind};
pub use gate::{AuthGate, Authenticated, authenticate_request};
pub use principal::{
    ADMIN_AUTHORITY, AdminOnly, AnyRole, Auth, AuthenticatedSession, Principal, RoleConstraint,
};
