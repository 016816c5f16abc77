use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::MAX_CAS_RETRIES;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Per-(student, lesson) progress record. Created on the first progress
/// report, never deleted, only ever merged forward:
/// `lesson_completed` implies `video_completed && quiz_passed`, and none of
/// the three flags ever goes back to false.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub student_id: String,
    pub lesson_id: String,
    pub video_progress: f64,
    pub video_completed: bool,
    pub quiz_passed: bool,
    pub lesson_completed: bool,
    pub last_watched_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Store {
    pub fn get_lesson_progress(
        &self,
        student_id: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>, StoreError> {
        let key = keys::lesson_progress_key(student_id, lesson_id)?;
        match self.lesson_progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Merge-upsert of a LessonProgress record.
    ///
    /// Read-modify-write under `compare_and_swap`: `apply` receives the
    /// latest stored record (or None) and returns the full replacement, so a
    /// concurrent video-progress write and quiz-pass write for the same key
    /// cannot clobber each other's fields. Retries a bounded number of times
    /// before giving up.
    pub fn merge_lesson_progress<F>(
        &self,
        student_id: &str,
        lesson_id: &str,
        apply: F,
    ) -> Result<LessonProgress, StoreError>
    where
        F: Fn(Option<LessonProgress>) -> LessonProgress,
    {
        let key = keys::lesson_progress_key(student_id, lesson_id)?;

        for _ in 0..MAX_CAS_RETRIES {
            let current_raw = self.lesson_progress.get(key.as_bytes())?;
            let current = match &current_raw {
                Some(raw) => Some(Self::deserialize::<LessonProgress>(raw)?),
                None => None,
            };

            let next = apply(current);
            let next_bytes = Self::serialize(&next)?;

            let cas = self.lesson_progress.compare_and_swap(
                key.as_bytes(),
                current_raw.as_deref(),
                Some(next_bytes),
            )?;

            if cas.is_ok() {
                return Ok(next);
            }
            // Lost the race; re-read and re-apply.
        }

        Err(StoreError::CasRetryExhausted {
            entity: "lesson_progress".to_string(),
            key,
            attempts: MAX_CAS_RETRIES,
        })
    }

    /// Progress records for a set of lessons, keyed by lesson id. Lessons
    /// without a record are simply absent.
    pub fn get_progress_batch(
        &self,
        student_id: &str,
        lesson_ids: &[String],
    ) -> Result<HashMap<String, LessonProgress>, StoreError> {
        let mut by_lesson = HashMap::with_capacity(lesson_ids.len());
        for lesson_id in lesson_ids {
            if by_lesson.contains_key(lesson_id.as_str()) {
                continue;
            }
            if let Some(progress) = self.get_lesson_progress(student_id, lesson_id)? {
                by_lesson.insert(lesson_id.clone(), progress);
            }
        }
        Ok(by_lesson)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn base_progress(student_id: &str, lesson_id: &str) -> LessonProgress {
        LessonProgress {
            student_id: student_id.to_string(),
            lesson_id: lesson_id.to_string(),
            video_progress: 0.0,
            video_completed: false,
            quiz_passed: false,
            lesson_completed: false,
            last_watched_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn merge_creates_then_updates() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("progress-db").to_str().unwrap()).unwrap();

        let created = store
            .merge_lesson_progress("s1", "l1", |current| {
                assert!(current.is_none());
                let mut p = base_progress("s1", "l1");
                p.video_progress = 40.0;
                p
            })
            .unwrap();
        assert_eq!(created.video_progress, 40.0);

        let updated = store
            .merge_lesson_progress("s1", "l1", |current| {
                let mut p = current.expect("record exists after first merge");
                p.quiz_passed = true;
                p
            })
            .unwrap();

        assert_eq!(updated.video_progress, 40.0);
        assert!(updated.quiz_passed);
    }

    #[test]
    fn merge_sees_latest_fields_from_other_writer() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("progress-db2").to_str().unwrap()).unwrap();

        store
            .merge_lesson_progress("s1", "l1", |_| {
                let mut p = base_progress("s1", "l1");
                p.video_progress = 96.0;
                p.video_completed = true;
                p
            })
            .unwrap();

        // A quiz-pass merge must not lose the video fields written above.
        let merged = store
            .merge_lesson_progress("s1", "l1", |current| {
                let mut p = current.unwrap();
                p.quiz_passed = true;
                p.lesson_completed = p.video_completed && p.quiz_passed;
                p
            })
            .unwrap();

        assert!(merged.video_completed);
        assert!(merged.quiz_passed);
        assert!(merged.lesson_completed);
    }

    #[test]
    fn batch_skips_missing_lessons() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("progress-db3").to_str().unwrap()).unwrap();

        store
            .merge_lesson_progress("s1", "l1", |_| base_progress("s1", "l1"))
            .unwrap();

        let batch = store
            .get_progress_batch("s1", &["l1".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.contains_key("l1"));
    }
}
