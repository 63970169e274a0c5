use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub is_completed: bool,
    pub completion_percentage: u8,
    pub lecture_progress: Vec<LectureProgress>,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LectureProgress {
    pub lecture_id: Uuid,
    pub is_completed: bool,
    /// Seconds watched.
    pub watch_time: i64,
    pub last_watched: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LectureUpdate {
    pub is_completed: Option<bool>,
    #[validate(range(min = 0, message = "Watch time must be non-negative"))]
    pub watch_time: Option<i64>,
}

impl CourseProgress {
    pub fn new(user_id: Uuid, course_id: Uuid) -> Self {
        Self {
            user_id,
            course_id,
            is_completed: false,
            completion_percentage: 0,
            lecture_progress: Vec::new(),
            last_accessed: Utc::now(),
        }
    }

    /// Applies an update to one lecture, tracking it if it is new, then
    /// recomputes completion.
    pub fn apply(&mut self, lecture_id: Uuid, update: &LectureUpdate) {
        let now = Utc::now();
        let idx = match self.lecture_progress.iter().position(|lp| lp.lecture_id == lecture_id) {
            Some(idx) => idx,
            None => {
                self.lecture_progress.push(LectureProgress {
                    lecture_id,
                    is_completed: false,
                    watch_time: 0,
                    last_watched: now,
                });
                self.lecture_progress.len() - 1
            }
        };
        let entry = &mut self.lecture_progress[idx];

        if let Some(done) = update.is_completed {
            entry.is_completed = done;
        }
        if let Some(seconds) = update.watch_time {
            entry.watch_time = seconds;
        }
        entry.last_watched = now;
        self.last_accessed = now;
        self.recompute();
    }

    /// Percentage of tracked lectures completed, rounded half away from zero.
    /// Untracked progress keeps its previous values.
    pub fn recompute(&mut self) {
        let total = self.lecture_progress.len();
        if total == 0 {
            return;
        }
        let completed = self.lecture_progress.iter().filter(|lp| lp.is_completed).count();
        let pct = ((completed * 200 + total) / (total * 2)) as u8;
        self.completion_percentage = pct.min(100);
        self.is_completed = self.completion_percentage == 100;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(done: bool) -> LectureUpdate {
        LectureUpdate { is_completed: Some(done), watch_time: None }
    }

    #[test]
    fn test_completion_percentage_rounds() {
        let mut progress = CourseProgress::new(Uuid::new_v4(), Uuid::new_v4());
        let lectures: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        progress.apply(lectures[0], &completed(true));
        assert_eq!(progress.completion_percentage, 100);
        assert!(progress.is_completed);

        progress.apply(lectures[1], &completed(false));
        progress.apply(lectures[2], &completed(false));
        assert_eq!(progress.completion_percentage, 33);
        assert!(!progress.is_completed);

        progress.apply(lectures[1], &completed(true));
        assert_eq!(progress.completion_percentage, 67);

        progress.apply(lectures[2], &completed(true));
        assert_eq!(progress.completion_percentage, 100);
        assert!(progress.is_completed);
    }

    #[test]
    fn test_watch_time_update_keeps_completion_flag() {
        let mut progress = CourseProgress::new(Uuid::new_v4(), Uuid::new_v4());
        let lecture = Uuid::new_v4();
        progress.apply(lecture, &completed(true));
        progress.apply(lecture, &LectureUpdate { is_completed: None, watch_time: Some(420) });

        assert_eq!(progress.lecture_progress.len(), 1);
        assert!(progress.lecture_progress[0].is_completed);
        assert_eq!(progress.lecture_progress[0].watch_time, 420);
    }

    #[test]
    fn test_empty_progress_untouched_by_recompute() {
        let mut progress = CourseProgress::new(Uuid::new_v4(), Uuid::new_v4());
        progress.recompute();
        assert_eq!(progress.completion_percentage, 0);
        assert!(!progress.is_completed);
    }
}
