use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub instructor_id: String,
    pub title: String,
    pub description: Option<String>,
    pub level: CourseLevel,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn create_course(&self, course: &Course) -> Result<(), StoreError> {
        let key = keys::course_key(&course.id)?;
        self.courses
            .insert(key.as_bytes(), Self::serialize(course)?)?;
        Ok(())
    }

    pub fn get_course(&self, course_id: &str) -> Result<Option<Course>, StoreError> {
        let key = keys::course_key(course_id)?;
        match self.courses.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_course(&self, course: &Course) -> Result<(), StoreError> {
        if self.get_course(&course.id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "course".to_string(),
                key: course.id.clone(),
            });
        }
        let key = keys::course_key(&course.id)?;
        self.courses
            .insert(key.as_bytes(), Self::serialize(course)?)?;
        Ok(())
    }

    /// Delete a course and cascade through its modules, lessons and quizzes.
    /// Enrollment, progress and attempt records are kept: they are per-student
    /// history and harmless once the course is gone.
    pub fn delete_course(&self, course_id: &str) -> Result<(), StoreError> {
        for module in self.list_course_modules(course_id)? {
            self.delete_module(&module.id)?;
        }
        let key = keys::course_key(course_id)?;
        self.courses.remove(key.as_bytes())?;
        Ok(())
    }

    /// All published courses, newest first. When `instructor_id` is given the
    /// listing is restricted to that instructor; `include_unpublished` lets an
    /// instructor see their own drafts.
    pub fn list_courses(
        &self,
        instructor_id: Option<&str>,
        include_unpublished: bool,
    ) -> Result<Vec<Course>, StoreError> {
        let mut courses = Vec::new();
        for item in self.courses.iter() {
            let (_, value) = item?;
            let course: Course = Self::deserialize(&value)?;
            if let Some(iid) = instructor_id {
                if course.instructor_id != iid {
                    continue;
                }
            }
            if !include_unpublished && !course.is_published {
                continue;
            }
            courses.push(course);
        }

        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }
}
