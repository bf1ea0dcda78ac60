//! Session endpoints.
//!
//! - POST `/logout` - Revoke the current access token and the renewal credential
//! - DELETE `/{member_id}` - Revoke another member's renewal credential (admin)

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{delete, post},
};
use serde::Serialize;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, Auth, AuthGate, AuthenticatedSession, REFRESH_COOKIE_NAME};
use crate::jwt::unix_now;
use crate::store::RevocationStore;

pub fn router<S: RevocationStore>(gate: Arc<AuthGate<S>>) -> Router {
    Router::new()
        .route("/logout", post(logout::<S>))
        .route("/{member_id}", delete(revoke_member::<S>))
        .with_state(gate)
}

/// Logout - blacklist the access token for the rest of its lifetime and drop
/// the renewal credential, so neither can be used again.
async fn logout<S: RevocationStore>(
    State(gate): State<Arc<AuthGate<S>>>,
    auth: Auth,
    Extension(session): Extension<AuthenticatedSession>,
) -> Result<impl IntoResponse, ApiError> {
    let member_id = auth.principal().member_id;

    let now = unix_now().map_err(ApiError::clock_error)?;
    let remaining = session.expires_at.saturating_sub(now);
    if remaining > 0 {
        gate.store()
            .blacklist(&session.access_token, Duration::from_secs(remaining))
            .await
            .store_err("Failed to revoke access token")?;
    }

    gate.store()
        .delete_renewal_credential(member_id)
        .await
        .store_err("Failed to delete renewal credential")?;

    info!(member_id, "Member logged out");

    let clear_refresh = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        REFRESH_COOKIE_NAME
    );
    Ok((StatusCode::NO_CONTENT, AppendHeaders([(SET_COOKIE, clear_refresh)])))
}

#[derive(Serialize)]
struct RevokeResponse {
    revoked: bool,
}

/// Revoke a member's renewal credential. Their current access token stays
/// valid until it expires, after which renewal fails.
async fn revoke_member<S: RevocationStore>(
    State(gate): State<Arc<AuthGate<S>>>,
    auth: Auth<AdminOnly>,
    Path(member_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = gate
        .store()
        .delete_renewal_credential(member_id)
        .await
        .store_err("Failed to delete renewal credential")?;

    info!(
        admin_id = auth.principal().member_id,
        member_id, revoked, "Revoked member renewal credential"
    );

    Ok((StatusCode::OK, Json(RevokeResponse { revoked })))
}
