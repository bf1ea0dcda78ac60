#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use tollgate::auth::{AuthGate, REFRESH_HEADER_NAME};
use tollgate::jwt::{AccessClaims, unix_now};
use tollgate::renewal::TokenPair;
use tollgate::store::{MemoryStore, RevocationStore, SqliteStore};
use tollgate::{ServerConfig, create_app, create_gate};

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

pub struct TestApp<S> {
    pub app: Router,
    pub gate: Arc<AuthGate<S>>,
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        jwt_secret: JWT_SECRET.to_vec(),
        access_ttl: Duration::from_secs(300),
        renewal_ttl: Duration::from_secs(3600),
        secure_cookies: false,
    }
}

pub fn create_test_app() -> TestApp<MemoryStore> {
    build(MemoryStore::new())
}

pub async fn create_sqlite_test_app() -> TestApp<SqliteStore> {
    let store = SqliteStore::open(":memory:")
        .await
        .expect("Failed to open test store");
    build(store)
}

fn build<S: RevocationStore>(store: S) -> TestApp<S> {
    let gate = create_gate(&test_config(), store).expect("Failed to create gate");
    TestApp {
        app: create_app(gate.clone()),
        gate,
    }
}

pub fn roles(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Issue a token pair as a login flow would.
pub async fn login<S: RevocationStore>(
    gate: &AuthGate<S>,
    email: &str,
    member_id: i64,
    role_names: &[&str],
) -> TokenPair {
    gate.coordinator()
        .issue(email, member_id, &roles(role_names))
        .await
        .expect("Failed to issue tokens")
}

/// Sign an access token for the member that expired a while ago.
pub fn expired_token<S: RevocationStore>(
    gate: &AuthGate<S>,
    email: &str,
    member_id: i64,
    role_names: &[&str],
) -> (String, AccessClaims) {
    let now = unix_now().unwrap();
    let claims = AccessClaims {
        email: email.to_string(),
        member_id,
        roles: roles(role_names),
        iat: now - 600,
        exp: now - 300,
    };
    (gate.jwt().sign(&claims).unwrap(), claims)
}

pub fn request(method: &str, uri: &str, access: Option<&str>, refresh: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(access) = access {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", access));
    }
    if let Some(refresh) = refresh {
        builder = builder.header(REFRESH_HEADER_NAME, refresh);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The errorCode of an error response.
pub async fn error_code(response: Response<Body>) -> String {
    body_json(response).await["errorCode"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// Access token from a renewed response's Authorization header.
pub fn renewed_access_token(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

pub fn renewed_refresh_token(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(REFRESH_HEADER_NAME)?
        .to_str()
        .ok()
        .map(str::to_string)
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}
