use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CourseProgress, LectureProgress},
    error::{AppError, Result},
    repository::ProgressRepository,
};

#[derive(FromRow)]
struct ProgressRow {
    is_completed: i32,
    completion_percentage: i64,
    last_accessed: NaiveDateTime,
}

#[derive(FromRow)]
struct LectureRow {
    lecture_id: String,
    is_completed: i32,
    watch_time: i64,
    last_watched: NaiveDateTime,
}

pub struct SqliteProgressRepository {
    pool: SqlitePool,
}

impl SqliteProgressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_lecture(row: LectureRow) -> Result<LectureProgress> {
        Ok(LectureProgress {
            lecture_id: Uuid::parse_str(&row.lecture_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            is_completed: row.is_completed != 0,
            watch_time: row.watch_time,
            last_watched: DateTime::from_naive_utc_and_offset(row.last_watched, Utc),
        })
    }
}

#[async_trait]
impl ProgressRepository for SqliteProgressRepository {
    async fn find(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<CourseProgress>> {
        let user_str = user_id.to_string();
        let course_str = course_id.to_string();

        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT is_completed, completion_percentage, last_accessed
            FROM course_progress
            WHERE user_id = ? AND course_id = ?
            "#
        )
        .bind(&user_str)
        .bind(&course_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lectures = sqlx::query_as::<_, LectureRow>(
            r#"
            SELECT lecture_id, is_completed, watch_time, last_watched
            FROM lecture_progress
            WHERE user_id = ? AND course_id = ?
            ORDER BY rowid
            "#
        )
        .bind(&user_str)
        .bind(&course_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let lecture_progress = lectures
            .into_iter()
            .map(Self::row_to_lecture)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(CourseProgress {
            user_id,
            course_id,
            is_completed: row.is_completed != 0,
            completion_percentage: row.completion_percentage.clamp(0, 100) as u8,
            lecture_progress,
            last_accessed: DateTime::from_naive_utc_and_offset(row.last_accessed, Utc),
        }))
    }

    async fn save(&self, progress: &CourseProgress) -> Result<CourseProgress> {
        let mut progress = progress.clone();
        progress.recompute();

        let user_str = progress.user_id.to_string();
        let course_str = progress.course_id.to_string();
        let now = Utc::now().naive_utc();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO course_progress (
                user_id, course_id, is_completed, completion_percentage,
                last_accessed, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                is_completed = excluded.is_completed,
                completion_percentage = excluded.completion_percentage,
                last_accessed = excluded.last_accessed,
                updated_at = excluded.updated_at
            "#
        )
        .bind(&user_str)
        .bind(&course_str)
        .bind(if progress.is_completed { 1i32 } else { 0i32 })
        .bind(progress.completion_percentage as i64)
        .bind(progress.last_accessed.naive_utc())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for lecture in &progress.lecture_progress {
            sqlx::query(
                r#"
                INSERT INTO lecture_progress (
                    user_id, course_id, lecture_id, is_completed, watch_time, last_watched
                ) VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(user_id, course_id, lecture_id) DO UPDATE SET
                    is_completed = excluded.is_completed,
                    watch_time = excluded.watch_time,
                    last_watched = excluded.last_watched
                "#
            )
            .bind(&user_str)
            .bind(&course_str)
            .bind(lecture.lecture_id.to_string())
            .bind(if lecture.is_completed { 1i32 } else { 0i32 })
            .bind(lecture.watch_time)
            .bind(lecture.last_watched.naive_utc())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(progress)
    }
}
