use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::operations::modules::map_txn_error;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub duration_secs: Option<u32>,
    pub keywords: Vec<String>,
    /// Gate quiz access behind the 95% watch threshold.
    pub watch_required: bool,
    pub order_index: u32,
    pub quiz_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        let key = keys::lesson_key(&lesson.id)?;
        let index_key =
            keys::lesson_module_index_key(&lesson.module_id, lesson.order_index, &lesson.id)?;
        let bytes = Self::serialize(lesson)?;

        (&self.lessons, &self.lesson_module_index)
            .transaction(|(tx_lessons, tx_index)| {
                tx_lessons.insert(key.as_bytes(), bytes.as_slice())?;
                tx_index.insert(index_key.as_bytes(), &[] as &[u8])?;
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    pub fn get_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>, StoreError> {
        let key = keys::lesson_key(lesson_id)?;
        match self.lessons.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Update a lesson; an `order_index` change moves the module index entry
    /// in the same transaction.
    pub fn update_lesson(&self, lesson: &Lesson) -> Result<(), StoreError> {
        let existing = self
            .get_lesson(&lesson.id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "lesson".to_string(),
                key: lesson.id.clone(),
            })?;

        let key = keys::lesson_key(&lesson.id)?;
        let old_index_key =
            keys::lesson_module_index_key(&existing.module_id, existing.order_index, &existing.id)?;
        let new_index_key =
            keys::lesson_module_index_key(&lesson.module_id, lesson.order_index, &lesson.id)?;
        let bytes = Self::serialize(lesson)?;

        (&self.lessons, &self.lesson_module_index)
            .transaction(|(tx_lessons, tx_index)| {
                tx_lessons.insert(key.as_bytes(), bytes.as_slice())?;
                if old_index_key != new_index_key {
                    tx_index.remove(old_index_key.as_bytes())?;
                    tx_index.insert(new_index_key.as_bytes(), &[] as &[u8])?;
                }
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    /// Delete a lesson together with its quiz, if any. Per-student progress
    /// and attempts are history and stay.
    pub fn delete_lesson(&self, lesson_id: &str) -> Result<(), StoreError> {
        let Some(lesson) = self.get_lesson(lesson_id)? else {
            return Ok(());
        };

        if let Some(quiz_id) = &lesson.quiz_id {
            self.delete_quiz(quiz_id)?;
        }

        let key = keys::lesson_key(lesson_id)?;
        let index_key =
            keys::lesson_module_index_key(&lesson.module_id, lesson.order_index, &lesson.id)?;

        (&self.lessons, &self.lesson_module_index)
            .transaction(|(tx_lessons, tx_index)| {
                tx_lessons.remove(key.as_bytes())?;
                tx_index.remove(index_key.as_bytes())?;
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    /// Lessons of a module ordered by `order_index`.
    pub fn list_module_lessons(&self, module_id: &str) -> Result<Vec<Lesson>, StoreError> {
        let prefix = keys::lesson_module_index_prefix(module_id)?;
        let mut lessons = Vec::new();
        for item in self.lesson_module_index.scan_prefix(prefix.as_bytes()) {
            let (index_key, _) = item?;
            let key_str = String::from_utf8_lossy(&index_key);
            let Some(lesson_id) = key_str.rsplit(':').next() else {
                continue;
            };
            if let Some(lesson) = self.get_lesson(lesson_id)? {
                lessons.push(lesson);
            }
        }
        Ok(lessons)
    }

    /// Every lesson of a course, walking modules in order.
    pub fn list_course_lessons(&self, course_id: &str) -> Result<Vec<Lesson>, StoreError> {
        let mut lessons = Vec::new();
        for module in self.list_course_modules(course_id)? {
            lessons.extend(self.list_module_lessons(&module.id)?);
        }
        Ok(lessons)
    }
}
