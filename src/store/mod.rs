//! Revocation store: blacklisted access tokens and live renewal credentials.
//!
//! Entries carry their own expiry and are treated as absent once it passes,
//! so callers never need to clean up. `purge_expired` only reclaims space.

mod memory;
mod sqlite;

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Longest lifetime any entry is kept for (ten years). Longer TTLs are clamped.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;
const MAX_TTL: Duration = Duration::from_secs(MAX_TTL_SECS);

/// Storage for revoked access tokens and per-member renewal credentials.
///
/// Implementations must be safe to share between concurrent requests. Every
/// operation is atomic for its key.
pub trait RevocationStore: Clone + Send + Sync + 'static {
    /// Whether the access token was revoked and its revocation has not expired yet.
    fn is_blacklisted(&self, token: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Revoke an access token for `ttl`. Re-revoking keeps the later expiry.
    fn blacklist(
        &self,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The live renewal credential for a member, if any.
    fn get_renewal_credential(
        &self,
        member_id: i64,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Record a renewal credential, replacing whatever the member had.
    fn store_renewal_credential(
        &self,
        member_id: i64,
        credential: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace the member's renewal credential only if the live one equals `expected`.
    /// Returns false when it did not (missing, expired, or already rotated).
    fn rotate_renewal_credential(
        &self,
        member_id: i64,
        expected: &str,
        new_credential: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Remove the member's renewal credential. Returns true if one existed.
    fn delete_renewal_credential(
        &self,
        member_id: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Drop expired entries. Returns how many were removed.
    fn purge_expired(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Errors raised by a revocation store backend.
#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Revocation store error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Current Unix time in milliseconds.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Absolute expiry in Unix milliseconds for an entry living `ttl` from now.
fn expiry_millis(ttl: Duration) -> i64 {
    now_millis().saturating_add(ttl.min(MAX_TTL).as_millis() as i64)
}
