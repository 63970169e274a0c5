mod common;

use chrono::{Duration, Utc};
use lectern::{auth::session::SessionStore, domain::UserRole};

#[tokio::test]
async fn test_session_lifecycle() -> anyhow::Result<()> {
    let database = common::memory_database().await?;
    let user = common::create_user(&database, "sam@example.com", UserRole::Student).await?;
    let store = SessionStore::new(database.pool().clone());

    let expires_at = Utc::now() + Duration::hours(1);
    let created = store.create(user.id, "laptop-token", expires_at).await?;
    assert_eq!(created.user_id, user.id);

    let found = store.find_by_token("laptop-token").await?
        .ok_or_else(|| anyhow::anyhow!("session missing"))?;
    assert_eq!(found.id, created.id);
    assert!(store.find_by_token("LAPTOP-TOKEN").await?.is_none());

    store.delete_by_token("laptop-token").await?;
    assert!(store.find_by_token("laptop-token").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_expired_sessions_are_invisible_and_swept() -> anyhow::Result<()> {
    let database = common::memory_database().await?;
    let user = common::create_user(&database, "sam@example.com", UserRole::Student).await?;
    let store = SessionStore::new(database.pool().clone());

    store.create(user.id, "stale", Utc::now() - Duration::minutes(1)).await?;
    store.create(user.id, "fresh", Utc::now() + Duration::hours(1)).await?;

    assert!(store.find_by_token("stale").await?.is_none());
    assert_eq!(store.cleanup_expired().await?, 1);
    assert!(store.find_by_token("fresh").await?.is_some());

    Ok(())
}

#[tokio::test]
async fn test_delete_other_sessions_keeps_current() -> anyhow::Result<()> {
    let database = common::memory_database().await?;
    let user = common::create_user(&database, "sam@example.com", UserRole::Student).await?;
    let other = common::create_user(&database, "ira@example.com", UserRole::Instructor).await?;
    let store = SessionStore::new(database.pool().clone());
    let expires_at = Utc::now() + Duration::hours(1);

    for token in ["phone", "laptop", "tablet"] {
        store.create(user.id, token, expires_at).await?;
    }
    store.create(other.id, "someone-else", expires_at).await?;

    assert_eq!(store.delete_other_sessions(user.id, Some("laptop")).await?, 2);
    assert!(store.find_by_token("laptop").await?.is_some());
    assert!(store.find_by_token("phone").await?.is_none());

    // Without a session to keep, everything goes
    assert_eq!(store.delete_other_sessions(user.id, None).await?, 1);
    assert!(store.find_by_token("laptop").await?.is_none());
    assert!(store.find_by_token("someone-else").await?.is_some());

    Ok(())
}
