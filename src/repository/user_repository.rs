use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{normalize_email, Enrollment, NewUser, ProfileUpdate, User, UserRole},
    error::{AppError, Result},
    repository::UserRepository,
};

// Database row struct that matches SQLite schema
#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    role: String,
    avatar_url: Option<String>,
    avatar_public_id: Option<String>,
    bio: Option<String>,
    last_active: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct EnrollmentRow {
    course_id: String,
    title: String,
    description: Option<String>,
    thumbnail: String,
    enrolled_at: NaiveDateTime,
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            email: row.email,
            role: Self::parse_role(&row.role)?,
            avatar_url: row.avatar_url,
            avatar_public_id: row.avatar_public_id,
            bio: row.bio,
            last_active: DateTime::from_naive_utc_and_offset(row.last_active, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_role(s: &str) -> Result<UserRole> {
        match s {
            "Student" => Ok(UserRole::Student),
            "Instructor" => Ok(UserRole::Instructor),
            "Admin" => Ok(UserRole::Admin),
            _ => Err(AppError::Database(format!("Invalid user role: {}", s))),
        }
    }

    fn role_to_str(role: UserRole) -> &'static str {
        match role {
            UserRole::Student => "Student",
            UserRole::Instructor => "Instructor",
            UserRole::Admin => "Admin",
        }
    }

    fn map_unique_violation(e: sqlx::Error) -> AppError {
        match e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                AppError::Conflict("User already exists".to_string())
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role,
                last_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(user.name.trim())
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(Self::role_to_str(user.role))
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Self::map_unique_violation)?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created user".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, avatar_url, avatar_public_id, bio,
                   last_active, created_at, updated_at
            FROM users
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, role, avatar_url, avatar_public_id, bio,
                   last_active, created_at, updated_at
            FROM users
            WHERE email = ?
            "#
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_user).transpose()
    }

    async fn get_password_hash(&self, email: &str) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE email = ?"
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(hash)
    }

    async fn get_password_hash_by_id(&self, id: Uuid) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE id = ?"
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(hash)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User> {
        let now = Utc::now().naive_utc();
        let email = update.email.as_deref().map(normalize_email);

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?, name),
                email = COALESCE(?, email),
                bio = COALESCE(?, bio),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(update.name.as_deref().map(str::trim))
        .bind(email)
        .bind(&update.bio)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Self::map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated user".to_string())
        })
    }

    async fn set_avatar(&self, id: Uuid, url: &str, public_id: &str) -> Result<User> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "UPDATE users SET avatar_url = ?, avatar_public_id = ?, updated_at = ? WHERE id = ?"
        )
        .bind(url)
        .bind(public_id)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let now = Utc::now().naive_utc();

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn touch_last_active(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = ? WHERE id = ?")
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (user_id, course_id, enrolled_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, course_id) DO NOTHING
            "#
        )
        .bind(user_id.to_string())
        .bind(course_id.to_string())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM enrollments WHERE user_id = ? AND course_id = ?")
            .bind(user_id.to_string())
            .bind(course_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE user_id = ? AND course_id = ?"
        )
        .bind(user_id.to_string())
        .bind(course_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn list_enrollments(&self, user_id: Uuid) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT e.course_id, c.title, c.description, c.thumbnail, e.enrolled_at
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = ?
            ORDER BY e.enrolled_at DESC
            "#
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Enrollment {
                    course_id: Uuid::parse_str(&row.course_id)
                        .map_err(|e| AppError::Database(e.to_string()))?,
                    title: row.title,
                    description: row.description,
                    thumbnail: row.thumbnail,
                    enrolled_at: DateTime::from_naive_utc_and_offset(row.enrolled_at, Utc),
                })
            })
            .collect()
    }
}
