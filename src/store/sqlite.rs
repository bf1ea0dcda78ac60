//! SQLite-backed revocation store.
//!
//! Each operation is a single SQL statement, so per-key updates are atomic
//! without any explicit transaction. Expiry is stored as Unix milliseconds and
//! every read filters on it.

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::{RevocationStore, StoreError, expiry_millis, now_millis};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        if self.get_version().await? < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in [
            "CREATE TABLE revoked_tokens (
                token TEXT PRIMARY KEY NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            "CREATE INDEX idx_revoked_tokens_expires_at ON revoked_tokens(expires_at)",
            "CREATE TABLE renewal_credentials (
                member_id INTEGER PRIMARY KEY NOT NULL,
                credential TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            "CREATE INDEX idx_renewal_credentials_expires_at ON renewal_credentials(expires_at)",
            "DELETE FROM schema_version",
            "INSERT INTO schema_version (version) VALUES (1)",
        ] {
            sqlx::query(query).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl RevocationStore for SqliteStore {
    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE token = ? AND expires_at > ?")
                .bind(token)
                .bind(now_millis())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token, expires_at) VALUES (?, ?)
             ON CONFLICT(token) DO UPDATE SET expires_at = MAX(expires_at, excluded.expires_at)",
        )
        .bind(token)
        .bind(expiry_millis(ttl))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_renewal_credential(&self, member_id: i64) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT credential FROM renewal_credentials WHERE member_id = ? AND expires_at > ?",
        )
        .bind(member_id)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(credential,)| credential))
    }

    async fn store_renewal_credential(
        &self,
        member_id: i64,
        credential: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO renewal_credentials (member_id, credential, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(member_id) DO UPDATE SET credential = excluded.credential, expires_at = excluded.expires_at",
        )
        .bind(member_id)
        .bind(credential)
        .bind(expiry_millis(ttl))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rotate_renewal_credential(
        &self,
        member_id: i64,
        expected: &str,
        new_credential: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE renewal_credentials SET credential = ?, expires_at = ?
             WHERE member_id = ? AND credential = ? AND expires_at > ?",
        )
        .bind(new_credential)
        .bind(expiry_millis(ttl))
        .bind(member_id)
        .bind(expected)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_renewal_credential(&self, member_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM renewal_credentials WHERE member_id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = now_millis();
        let revoked = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        let renewals = sqlx::query("DELETE FROM renewal_credentials WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(revoked.rows_affected() + renewals.rows_affected())
    }
}
