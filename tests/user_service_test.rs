mod common;

use std::path::PathBuf;
use std::sync::Arc;

use lectern::{
    config::Settings,
    domain::{ProfileUpdate, UserRole},
    error::AppError,
    media::LocalMediaStore,
    repository::UserRepository,
    service::{ServiceContext, UploadedFile},
};

fn uploads_dir() -> PathBuf {
    std::env::temp_dir().join(format!("lectern-users-{}", uuid::Uuid::new_v4()))
}

async fn context(uploads: &PathBuf) -> anyhow::Result<ServiceContext> {
    let database = common::memory_database().await?;
    let settings = Settings::default();
    let media_store = Arc::new(LocalMediaStore::new(uploads.clone(), &settings.server.base_url));
    Ok(ServiceContext::new(database, &settings, media_store))
}

fn rename(name: &str) -> ProfileUpdate {
    ProfileUpdate {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_rejected_avatar_leaves_profile_untouched() -> anyhow::Result<()> {
    let uploads = uploads_dir();
    let ctx = context(&uploads).await?;
    let user = common::create_user(&ctx.database, "sam@example.com", UserRole::Student).await?;

    let video = UploadedFile { filename: "intro.mp4".to_string(), data: vec![0u8; 16] };
    let result = ctx.user_service.update_profile(user.id, rename("Renamed"), Some(video)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let stored = ctx.user_repo.find_by_id(user.id).await?
        .ok_or_else(|| anyhow::anyhow!("user missing"))?;
    assert_eq!(stored.name, user.name);
    assert!(stored.avatar_url.is_none());

    // Nothing reached the media store
    assert!(!uploads.exists());

    Ok(())
}

#[tokio::test]
async fn test_avatar_swap_removes_previous_file() -> anyhow::Result<()> {
    let uploads = uploads_dir();
    let ctx = context(&uploads).await?;
    let user = common::create_user(&ctx.database, "sam@example.com", UserRole::Student).await?;

    let first = UploadedFile { filename: "me.png".to_string(), data: b"first".to_vec() };
    let updated = ctx.user_service.update_profile(user.id, rename("Sam S"), Some(first)).await?;
    assert_eq!(updated.name, "Sam S");
    let first_id = updated.avatar_public_id.clone().ok_or_else(|| anyhow::anyhow!("no avatar"))?;
    assert!(uploads.join(&first_id).exists());

    let second = UploadedFile { filename: "me2.jpg".to_string(), data: b"second".to_vec() };
    let updated = ctx.user_service.update_profile(user.id, ProfileUpdate::default(), Some(second)).await?;
    let second_id = updated.avatar_public_id.clone().ok_or_else(|| anyhow::anyhow!("no avatar"))?;

    assert_ne!(first_id, second_id);
    assert!(!uploads.join(&first_id).exists());
    assert!(uploads.join(&second_id).exists());
    assert_eq!(updated.name, "Sam S");

    Ok(())
}
