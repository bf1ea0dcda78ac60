//! In-process revocation store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::{MAX_TTL, RevocationStore, StoreError};

#[derive(Debug, Clone)]
struct RenewalEntry {
    credential: String,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    revoked: RwLock<HashMap<String, Instant>>,
    renewals: Mutex<HashMap<i64, RenewalEntry>>,
}

/// Revocation store backed by in-memory maps. Clones share state.
///
/// Locks are held only for the duration of a single map operation and never
/// across an await point.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

/// Deadline `ttl` after `now`, clamped to the maximum entry lifetime.
fn deadline(now: Instant, ttl: Duration) -> Instant {
    now + ttl.min(MAX_TTL)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn renewals(&self) -> MutexGuard<'_, HashMap<i64, RenewalEntry>> {
        self.inner
            .renewals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl RevocationStore for MemoryStore {
    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        let revoked = self
            .inner
            .revoked
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(revoked
            .get(token)
            .is_some_and(|expires_at| *expires_at > Instant::now()))
    }

    async fn blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = deadline(Instant::now(), ttl);
        let mut revoked = self
            .inner
            .revoked
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        revoked
            .entry(token.to_string())
            .and_modify(|existing| *existing = (*existing).max(expires_at))
            .or_insert(expires_at);
        Ok(())
    }

    async fn get_renewal_credential(&self, member_id: i64) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self
            .renewals()
            .get(&member_id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.credential.clone()))
    }

    async fn store_renewal_credential(
        &self,
        member_id: i64,
        credential: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let entry = RenewalEntry {
            credential: credential.to_string(),
            expires_at: deadline(Instant::now(), ttl),
        };
        self.renewals().insert(member_id, entry);
        Ok(())
    }

    async fn rotate_renewal_credential(
        &self,
        member_id: i64,
        expected: &str,
        new_credential: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut renewals = self.renewals();
        match renewals.get_mut(&member_id) {
            Some(entry) if entry.expires_at > now && entry.credential == expected => {
                entry.credential = new_credential.to_string();
                entry.expires_at = deadline(now, ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_renewal_credential(&self, member_id: i64) -> Result<bool, StoreError> {
        Ok(self.renewals().remove(&member_id).is_some())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut removed = 0;

        {
            let mut revoked = self
                .inner
                .revoked
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let before = revoked.len();
            revoked.retain(|_, expires_at| *expires_at > now);
            removed += before - revoked.len();
        }

        let mut renewals = self.renewals();
        let before = renewals.len();
        renewals.retain(|_, entry| entry.expires_at > now);
        removed += before - renewals.len();

        Ok(removed as u64)
    }
}
