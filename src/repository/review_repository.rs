use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::Review,
    error::{AppError, Result},
    repository::ReviewRepository,
};

#[derive(FromRow)]
struct ReviewRow {
    id: String,
    course_id: String,
    user_id: String,
    rating: i64,
    comment: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_review(row: ReviewRow) -> Result<Review> {
        Ok(Review {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            course_id: Uuid::parse_str(&row.course_id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            rating: u8::try_from(row.rating)
                .map_err(|_| AppError::Database(format!("Invalid rating: {}", row.rating)))?,
            comment: row.comment,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn create(&self, review: Review) -> Result<Review> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, course_id, user_id, rating, comment, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(review.id.to_string())
        .bind(review.course_id.to_string())
        .bind(review.user_id.to_string())
        .bind(review.rating as i64)
        .bind(&review.comment)
        .bind(review.created_at.naive_utc())
        .bind(review.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
                AppError::Conflict("You have already reviewed this course".to_string())
            }
            other => AppError::Database(other.to_string()),
        })?;

        Ok(review)
    }

    async fn list_for_course(&self, course_id: Uuid) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, course_id, user_id, rating, comment, created_at, updated_at
            FROM reviews
            WHERE course_id = ?
            ORDER BY created_at DESC
            "#
        )
        .bind(course_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_review)
            .collect()
    }

    async fn ratings_for_course(&self, course_id: Uuid) -> Result<Vec<u8>> {
        let ratings = sqlx::query_scalar::<_, i64>(
            "SELECT rating FROM reviews WHERE course_id = ?"
        )
        .bind(course_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings.into_iter().map(|r| r.clamp(1, 5) as u8).collect())
    }
}
