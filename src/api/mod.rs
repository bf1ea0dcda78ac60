mod error;
mod members;
mod sessions;

use std::sync::Arc;

use axum::{Router, http::StatusCode, middleware, routing::get};
use tower::ServiceBuilder;

use crate::auth::{AuthGate, authenticate_request};
use crate::store::RevocationStore;

pub use error::ApiError;

/// Create the API router. Every route sits behind the authentication gate.
pub fn create_api_router<S: RevocationStore>(gate: Arc<AuthGate<S>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/members", members::router())
        .nest("/sessions", sessions::router(gate.clone()))
        .layer(
            ServiceBuilder::new().layer(middleware::from_fn_with_state(
                gate,
                authenticate_request::<S>,
            )),
        )
}

async fn health() -> StatusCode {
    StatusCode::OK
}
