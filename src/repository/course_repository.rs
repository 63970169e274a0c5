use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Course, CourseLevel},
    error::{AppError, Result},
    repository::CourseRepository,
};

#[derive(FromRow)]
struct CourseRow {
    id: String,
    title: String,
    subtitle: Option<String>,
    description: Option<String>,
    category: String,
    level: String,
    price: String,
    thumbnail: String,
    instructor_id: String,
    is_published: i32,
    total_duration: i64,
    total_lectures: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteCourseRepository {
    pool: SqlitePool,
}

impl SqliteCourseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_course(row: CourseRow) -> Result<Course> {
        Ok(Course {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            subtitle: row.subtitle,
            description: row.description,
            category: row.category,
            level: Self::parse_level(&row.level)?,
            price: Decimal::from_str(&row.price)
                .map_err(|e| AppError::Database(format!("Invalid course price: {}", e)))?,
            thumbnail: row.thumbnail,
            instructor_id: Uuid::parse_str(&row.instructor_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            is_published: row.is_published != 0,
            total_duration: row.total_duration,
            total_lectures: row.total_lectures,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_level(s: &str) -> Result<CourseLevel> {
        match s {
            "Beginner" => Ok(CourseLevel::Beginner),
            "Intermediate" => Ok(CourseLevel::Intermediate),
            "Advanced" => Ok(CourseLevel::Advanced),
            _ => Err(AppError::Database(format!("Invalid course level: {}", s))),
        }
    }

    fn level_to_str(level: CourseLevel) -> &'static str {
        match level {
            CourseLevel::Beginner => "Beginner",
            CourseLevel::Intermediate => "Intermediate",
            CourseLevel::Advanced => "Advanced",
        }
    }
}

#[async_trait]
impl CourseRepository for SqliteCourseRepository {
    async fn create(&self, course: Course) -> Result<Course> {
        sqlx::query(
            r#"
            INSERT INTO courses (
                id, title, subtitle, description, category, level, price,
                thumbnail, instructor_id, is_published, total_duration,
                total_lectures, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(course.id.to_string())
        .bind(&course.title)
        .bind(&course.subtitle)
        .bind(&course.description)
        .bind(&course.category)
        .bind(Self::level_to_str(course.level))
        .bind(course.price.to_string())
        .bind(&course.thumbnail)
        .bind(course.instructor_id.to_string())
        .bind(if course.is_published { 1i32 } else { 0i32 })
        .bind(course.total_duration)
        .bind(course.total_lectures)
        .bind(course.created_at.naive_utc())
        .bind(course.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(course.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created course".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, title, subtitle, description, category, level, price,
                   thumbnail, instructor_id, is_published, total_duration,
                   total_lectures, created_at, updated_at
            FROM courses
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_course).transpose()
    }

    async fn list_published(&self, limit: i64, offset: i64) -> Result<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, title, subtitle, description, category, level, price,
                   thumbnail, instructor_id, is_published, total_duration,
                   total_lectures, created_at, updated_at
            FROM courses
            WHERE is_published = 1
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_course)
            .collect()
    }

    async fn set_published(&self, id: Uuid, published: bool) -> Result<Course> {
        let result = sqlx::query(
            "UPDATE courses SET is_published = ?, updated_at = ? WHERE id = ?"
        )
        .bind(if published { 1i32 } else { 0i32 })
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Course not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated course".to_string())
        })
    }

    async fn count_enrolled(&self, id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = ?"
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
