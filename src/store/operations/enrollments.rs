use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub student_id: String,
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
}

impl Store {
    /// Idempotent: enrolling twice keeps the original record and reports
    /// `false` for "newly created".
    pub fn enroll(&self, enrollment: &Enrollment) -> Result<bool, StoreError> {
        let key = keys::enrollment_key(&enrollment.student_id, &enrollment.course_id)?;
        let bytes = Self::serialize(enrollment)?;

        let cas = self
            .enrollments
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(bytes))
            .map_err(StoreError::Sled)?;

        Ok(cas.is_ok())
    }

    pub fn get_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, StoreError> {
        let key = keys::enrollment_key(student_id, course_id)?;
        match self.enrollments.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn delete_enrollment(&self, student_id: &str, course_id: &str) -> Result<(), StoreError> {
        let key = keys::enrollment_key(student_id, course_id)?;
        self.enrollments.remove(key.as_bytes())?;
        Ok(())
    }

    /// A student's enrollments, most recent first.
    pub fn list_student_enrollments(
        &self,
        student_id: &str,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let prefix = keys::enrollment_student_prefix(student_id)?;
        let mut enrollments = Vec::new();
        for item in self.enrollments.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            enrollments.push(Self::deserialize::<Enrollment>(&value)?);
        }
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(enrollments)
    }

    pub fn count_course_enrollments(&self, course_id: &str) -> Result<usize, StoreError> {
        let mut count = 0usize;
        for item in self.enrollments.iter() {
            let (_, value) = item?;
            let enrollment: Enrollment = Self::deserialize(&value)?;
            if enrollment.course_id == course_id {
                count += 1;
            }
        }
        Ok(count)
    }
}
