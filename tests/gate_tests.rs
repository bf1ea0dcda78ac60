//! Tests for the authentication gate through the HTTP router.
//!
//! Tests cover:
//! - Valid access tokens authenticate and populate the principal
//! - Requests without a bearer credential pass through
//! - Expired access tokens are renewed once with the renewal credential
//! - Stale renewal credentials, malformed and forged tokens are rejected
//! - The same behavior on the SQLite store

mod common;

use axum::http::{StatusCode, header};
use common::*;
use tollgate::jwt::JwtConfig;
use tollgate::store::RevocationStore;
use tower::ServiceExt;

// =============================================================================
// Access Token Tests
// =============================================================================

#[tokio::test]
async fn test_valid_access_token_authenticates() {
    let TestApp { app, gate } = create_test_app();
    let pair = login(&gate, "alice@example.com", 7, &["USER", "ADMIN"]).await;

    let response = app
        .oneshot(request("GET", "/api/members/me", Some(&pair.access.token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(renewed_access_token(&response).is_none());

    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["memberId"], 7);
    assert_eq!(body["roles"], serde_json::json!(["USER", "ADMIN"]));
}

#[tokio::test]
async fn test_no_bearer_passes_through_gate() {
    let TestApp { app, .. } = create_test_app();

    let response = app
        .clone()
        .oneshot(request("GET", "/api/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Protected handler enforces its own requirement
    let response = app
        .oneshot(request("GET", "/api/members/me", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn test_non_bearer_authorization_passes_through() {
    let TestApp { app, .. } = create_test_app();

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/health")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_blacklisted_token_rejected() {
    let TestApp { app, gate } = create_test_app();
    let pair = login(&gate, "alice@example.com", 7, &["USER"]).await;
    gate.store()
        .blacklist(&pair.access.token, std::time::Duration::from_secs(300))
        .await
        .unwrap();

    let response = app
        .oneshot(request("GET", "/api/members/me", Some(&pair.access.token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "TOKEN_REVOKED");
}

// =============================================================================
// Renewal Tests
// =============================================================================

#[tokio::test]
async fn test_expired_token_renewed_with_header() {
    let TestApp { app, gate } = create_test_app();
    let pair = login(&gate, "alice@example.com", 7, &["USER"]).await;
    let (expired, old_claims) = expired_token(&gate, "alice@example.com", 7, &["USER"]);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&expired),
            Some(&pair.renewal_token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let new_access = renewed_access_token(&response).expect("new access token header");
    let new_refresh = renewed_refresh_token(&response).expect("new refresh header");
    assert_ne!(new_refresh, pair.renewal_token);
    assert!(extract_set_cookies(&response).is_empty());

    let body = body_json(response).await;
    assert_eq!(body["memberId"], 7);

    let new_claims = gate.jwt().verify(&new_access).unwrap();
    assert_eq!(new_claims.member_id, old_claims.member_id);
    assert_eq!(new_claims.email, old_claims.email);
    assert!(new_claims.exp > old_claims.exp);

    // The new access token works on its own
    let response = app
        .oneshot(request("GET", "/api/members/me", Some(&new_access), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(renewed_access_token(&response).is_none());
}

#[tokio::test]
async fn test_expired_token_renewed_with_cookie() {
    let TestApp { app, gate } = create_test_app();
    let pair = login(&gate, "alice@example.com", 7, &["USER"]).await;
    let (expired, _) = expired_token(&gate, "alice@example.com", 7, &["USER"]);

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/members/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", expired))
                .header(
                    header::COOKIE,
                    format!("theme=dark; refresh_token={}", pair.renewal_token),
                )
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let new_refresh = renewed_refresh_token(&response).unwrap();
    let cookies = extract_set_cookies(&response);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with(&format!("refresh_token={};", new_refresh))),
        "renewal cookie should carry the rotated credential: {:?}",
        cookies
    );
}

#[tokio::test]
async fn test_stale_renewal_credential_rejected() {
    let TestApp { app, gate } = create_test_app();
    let pair = login(&gate, "alice@example.com", 7, &["USER"]).await;
    let (expired, _) = expired_token(&gate, "alice@example.com", 7, &["USER"]);

    let first = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&expired),
            Some(&pair.renewal_token),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let replay = app
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&expired),
            Some(&pair.renewal_token),
        ))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert!(renewed_access_token(&replay).is_none());
    assert_eq!(error_code(replay).await, "SESSION_EXPIRED");
}

#[tokio::test]
async fn test_expired_token_without_renewal_credential() {
    let TestApp { app, gate } = create_test_app();
    let (expired, _) = expired_token(&gate, "alice@example.com", 7, &["USER"]);

    let response = app
        .oneshot(request("GET", "/api/health", Some(&expired), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "SESSION_EXPIRED");
}

#[tokio::test]
async fn test_renewal_credential_of_another_member_rejected() {
    let TestApp { app, gate } = create_test_app();
    let bob = login(&gate, "bob@example.com", 8, &["USER"]).await;
    let (expired, _) = expired_token(&gate, "alice@example.com", 7, &["USER"]);

    let response = app
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&expired),
            Some(&bob.renewal_token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "SESSION_EXPIRED");
    assert_eq!(
        gate.store().get_renewal_credential(8).await.unwrap(),
        Some(bob.renewal_token)
    );
}

// =============================================================================
// Terminal Rejection Tests
// =============================================================================

#[tokio::test]
async fn test_malformed_token_rejected_without_renewal() {
    let TestApp { app, gate } = create_test_app();
    let pair = login(&gate, "alice@example.com", 7, &["USER"]).await;
    let two_segments = pair.access.token.rsplit_once('.').unwrap().0.to_string();

    let response = app
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&two_segments),
            Some(&pair.renewal_token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(renewed_access_token(&response).is_none());
    let body = body_json(response).await;
    assert_eq!(body["status"], 401);
    assert_eq!(body["errorCode"], "TOKEN_FORMAT_INVALID");

    assert_eq!(
        gate.store().get_renewal_credential(7).await.unwrap(),
        Some(pair.renewal_token)
    );
}

#[tokio::test]
async fn test_foreign_signature_rejected_without_renewal() {
    let TestApp { app, gate } = create_test_app();
    let pair = login(&gate, "alice@example.com", 7, &["USER"]).await;
    let other = JwtConfig::new(b"some-other-secret", std::time::Duration::from_secs(300)).unwrap();
    let forged = other
        .generate_access_token("alice@example.com", 7, &roles(&["ADMIN"]))
        .unwrap()
        .token;

    let response = app
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&forged),
            Some(&pair.renewal_token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "SIGNATURE_INVALID");
    assert_eq!(
        gate.store().get_renewal_credential(7).await.unwrap(),
        Some(pair.renewal_token)
    );
}

#[tokio::test]
async fn test_empty_bearer_is_malformed() {
    let TestApp { app, .. } = create_test_app();

    let response = app
        .oneshot(request("GET", "/api/health", Some(""), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "TOKEN_FORMAT_INVALID");
}

// =============================================================================
// SQLite Store
// =============================================================================

#[tokio::test]
async fn test_sqlite_store_renewal_and_revocation() {
    let TestApp { app, gate } = create_sqlite_test_app().await;
    let pair = login(&gate, "alice@example.com", 7, &["USER"]).await;
    let (expired, _) = expired_token(&gate, "alice@example.com", 7, &["USER"]);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&expired),
            Some(&pair.renewal_token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let new_access = renewed_access_token(&response).unwrap();

    let replay = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/members/me",
            Some(&expired),
            Some(&pair.renewal_token),
        ))
        .await
        .unwrap();
    assert_eq!(error_code(replay).await, "SESSION_EXPIRED");

    gate.store()
        .blacklist(&new_access, std::time::Duration::from_secs(300))
        .await
        .unwrap();
    let response = app
        .oneshot(request("GET", "/api/members/me", Some(&new_access), None))
        .await
        .unwrap();
    assert_eq!(error_code(response).await, "TOKEN_REVOKED");
}
