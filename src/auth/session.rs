use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// A live login. The bearer token itself is never kept.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct LiveSession {
    id: String,
    user_id: String,
    expires_at: NaiveDateTime,
}

impl TryFrom<LiveSession> for Session {
    type Error = AppError;

    fn try_from(row: LiveSession) -> Result<Self> {
        Ok(Self {
            user_id: Uuid::parse_str(&row.user_id)
                .map_err(|e| AppError::Database(format!("Corrupt session owner: {}", e)))?,
            id: row.id,
            expires_at: DateTime::from_naive_utc_and_offset(row.expires_at, Utc),
        })
    }
}

/// Lookup key for a token: hex SHA-256 of the plaintext.
fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Server-side session records keyed by token digest.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let now = Utc::now().naive_utc();

        let row: LiveSession = sqlx::query_as(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at, last_used_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, expires_at
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(digest(token))
        .bind(expires_at.naive_utc())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Touches `last_used_at` on an unexpired session and returns it.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Session>> {
        let now = Utc::now().naive_utc();

        let row: Option<LiveSession> = sqlx::query_as(
            r#"
            UPDATE sessions SET last_used_at = ?1
            WHERE token_hash = ?2 AND expires_at > ?1
            RETURNING id, user_id, expires_at
            "#
        )
        .bind(now)
        .bind(digest(token))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    pub async fn delete_by_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(digest(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Signs the user out everywhere except on `keep`, if given.
    pub async fn delete_other_sessions(&self, user_id: Uuid, keep: Option<&str>) -> Result<u64> {
        let removed = sqlx::query(
            "DELETE FROM sessions WHERE user_id = ? AND (? IS NULL OR token_hash <> ?)"
        )
        .bind(user_id.to_string())
        .bind(keep.map(digest))
        .bind(keep.map(digest))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(removed)
    }

    pub async fn cleanup_expired(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().naive_utc())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_hex() {
        let a = digest("token");
        assert_eq!(a.len(), 64);
        assert_eq!(a, digest("token"));
        assert_ne!(a, digest("token "));
    }
}
