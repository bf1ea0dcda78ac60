//! Member endpoints backed only by the principal.
//!
//! - GET `/me` - The authenticated principal

use axum::{Json, Router, routing::get};

use crate::auth::{Auth, Principal};

pub fn router() -> Router {
    Router::new().route("/me", get(me))
}

async fn me(auth: Auth) -> Json<Principal> {
    Json(auth.0)
}
