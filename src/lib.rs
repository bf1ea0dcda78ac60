pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod jwt;
pub mod renewal;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::create_api_router;
use auth::AuthGate;
use axum::Router;
use jwt::{JwtConfig, JwtError};
use store::RevocationStore;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// JWT secret for signing access tokens
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Renewal credential lifetime
    pub renewal_ttl: Duration,
    /// Whether to set Secure flag on renewal cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
}

/// Build the authentication gate for the given configuration and store.
pub fn create_gate<S: RevocationStore>(
    config: &ServerConfig,
    store: S,
) -> Result<Arc<AuthGate<S>>, JwtError> {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret, config.access_ttl)?);
    Ok(Arc::new(AuthGate::new(
        jwt,
        store,
        config.renewal_ttl,
        config.secure_cookies,
    )))
}

/// Create the application router around an existing gate.
pub fn create_app<S: RevocationStore>(gate: Arc<AuthGate<S>>) -> Router {
    Router::new().nest("/api", create_api_router(gate))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup<S: RevocationStore>(store: &S) {
    cleanup::run_cleanup(store).await;
    cleanup::spawn_cleanup_scheduler(store.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), std::io::Error> {
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
