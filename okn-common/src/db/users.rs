//! Site users and login sessions

use crate::auth::{generate_session_token, verify_password};
use crate::{Error, Result};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Create a user from an already hashed password
pub async fn create_user(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::InvalidInput("username is empty".to_string()));
    }

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(Error::InvalidInput(format!("user '{}' already exists", username)));
    }

    let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        username: username.to_string(),
    })
}

/// Look up a user and check the password; `None` on any mismatch
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> Result<Option<User>> {
    let row: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username.trim())
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(|(id, username, hash)| {
        verify_password(password, &hash).then_some(User { id, username })
    }))
}

/// Open a session for the user, returning its token
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    now: NaiveDateTime,
    ttl: Duration,
) -> Result<String> {
    let token = generate_session_token();
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now + ttl)
        .execute(pool)
        .await?;

    Ok(token)
}

/// User owning an unexpired session
pub async fn session_user(pool: &SqlitePool, token: &str, now: NaiveDateTime) -> Result<Option<User>> {
    let row: Option<(i64, String)> = sqlx::query_as(
        "SELECT u.id, u.username FROM sessions s JOIN users u ON u.id = s.user_id \
         WHERE s.token = ? AND s.expires_at > ?",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, username)| User { id, username }))
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Drop expired sessions, returning how many were removed
pub async fn purge_expired_sessions(pool: &SqlitePool, now: NaiveDateTime) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password_with_cost;
    use crate::db::init::init_memory_database;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let pool = init_memory_database().await.unwrap();
        let hash = hash_password_with_cost("secret", 4).unwrap();
        let user = create_user(&pool, "dana", &hash).await.unwrap();

        assert_eq!(authenticate(&pool, "dana", "secret").await.unwrap(), Some(user));
        assert_eq!(authenticate(&pool, "dana", "wrong").await.unwrap(), None);
        assert_eq!(authenticate(&pool, "nobody", "secret").await.unwrap(), None);
        assert!(create_user(&pool, "dana", &hash).await.is_err());
    }

    #[tokio::test]
    async fn test_sessions_expire() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, "dana", "x").await.unwrap();
        let token = create_session(&pool, user.id, now(), Duration::hours(1)).await.unwrap();

        assert_eq!(session_user(&pool, &token, now()).await.unwrap(), Some(user.clone()));
        let later = now() + Duration::hours(2);
        assert_eq!(session_user(&pool, &token, later).await.unwrap(), None);
        assert_eq!(purge_expired_sessions(&pool, later).await.unwrap(), 1);

        let token = create_session(&pool, user.id, now(), Duration::hours(1)).await.unwrap();
        delete_session(&pool, &token).await.unwrap();
        assert_eq!(session_user(&pool, &token, now()).await.unwrap(), None);
    }
}
