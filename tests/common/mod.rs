#![allow(dead_code)]

use std::sync::Arc;

use lectern::{
    auth::AuthService,
    database::DatabaseManager,
    domain::{Course, CourseLevel, CreateCourseRequest, NewUser, User, UserRole},
    repository::{CourseRepository, SqliteCourseRepository, SqliteUserRepository, UserRepository},
};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;

pub const TEST_PASSWORD: &str = "password123";

/// Fresh in-memory database with migrations applied. One connection, so
/// every query sees the same memory database.
pub async fn memory_database() -> anyhow::Result<DatabaseManager> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    let database = DatabaseManager::from_pool(pool);
    database.migrate().await?;
    Ok(database)
}

pub async fn create_user(
    database: &DatabaseManager,
    email: &str,
    role: UserRole,
) -> anyhow::Result<User> {
    let repo = SqliteUserRepository::new(database.pool().clone());
    let password_hash = AuthService::hash_password(TEST_PASSWORD).await?;

    let user = repo.create(NewUser {
        name: email.split('@').next().unwrap_or("user").to_string(),
        email: email.to_string(),
        password_hash,
        role,
    }).await?;

    Ok(user)
}

pub async fn create_course(
    database: &DatabaseManager,
    instructor: &User,
    price: Decimal,
    published: bool,
) -> anyhow::Result<Course> {
    let repo: Arc<dyn CourseRepository> = Arc::new(SqliteCourseRepository::new(database.pool().clone()));

    let course = CreateCourseRequest {
        title: "Practical Rust".to_string(),
        subtitle: Some("Services that stay up".to_string()),
        description: Some("Build and ship an HTTP service".to_string()),
        category: "programming".to_string(),
        level: CourseLevel::Intermediate,
        price,
        thumbnail: "https://cdn.example.com/thumb.png".to_string(),
        total_duration: 3600,
        total_lectures: 4,
    }
    .into_course(instructor.id);

    let course = repo.create(course).await?;
    if published {
        return Ok(repo.set_published(course.id, true).await?);
    }
    Ok(course)
}
