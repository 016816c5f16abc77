use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::store::keys;
use crate::store::{Store, StoreError};

/// One scored quiz submission. Attempts are append-only: retakes add new
/// records and never overwrite, which is what makes retake history possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub score: f64,
    pub passed: bool,
    /// question id -> selected option id
    pub answers: HashMap<String, String>,
    pub completed_at: DateTime<Utc>,
}

impl Store {
    pub fn append_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let key = keys::attempt_key(
            &attempt.student_id,
            &attempt.quiz_id,
            attempt.completed_at.timestamp_millis(),
            &attempt.id,
        )?;
        self.quiz_attempts
            .insert(key.as_bytes(), Self::serialize(attempt)?)?;
        Ok(())
    }

    /// Attempts of one student for one quiz, most recent first.
    pub fn list_quiz_attempts(
        &self,
        student_id: &str,
        quiz_id: &str,
        limit: usize,
    ) -> Result<Vec<QuizAttempt>, StoreError> {
        let prefix = keys::attempt_prefix(student_id, quiz_id)?;
        let mut attempts = Vec::new();
        for item in self.quiz_attempts.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            attempts.push(Self::deserialize::<QuizAttempt>(&value)?);
            if attempts.len() >= limit {
                break;
            }
        }
        Ok(attempts)
    }

    pub fn count_quiz_attempts(&self, student_id: &str, quiz_id: &str) -> Result<usize, StoreError> {
        let prefix = keys::attempt_prefix(student_id, quiz_id)?;
        let mut count = 0usize;
        for item in self.quiz_attempts.scan_prefix(prefix.as_bytes()) {
            let _ = item?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::tempdir;

    use super::*;

    fn sample_attempt(id: &str, score: f64, completed_at: DateTime<Utc>) -> QuizAttempt {
        QuizAttempt {
            id: id.to_string(),
            student_id: "s1".to_string(),
            quiz_id: "q1".to_string(),
            score,
            passed: score >= 70.0,
            answers: HashMap::new(),
            completed_at,
        }
    }

    #[test]
    fn attempts_list_most_recent_first() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("attempts-db").to_str().unwrap()).unwrap();

        let now = Utc::now();
        store
            .append_attempt(&sample_attempt("a1", 50.0, now - Duration::minutes(10)))
            .unwrap();
        store.append_attempt(&sample_attempt("a2", 100.0, now)).unwrap();

        let listed = store.list_quiz_attempts("s1", "q1", 10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "a2");
        assert_eq!(listed[1].id, "a1");
    }

    #[test]
    fn retakes_never_overwrite() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("attempts-db2").to_str().unwrap()).unwrap();

        let now = Utc::now();
        store.append_attempt(&sample_attempt("a1", 50.0, now)).unwrap();
        store
            .append_attempt(&sample_attempt("a2", 50.0, now + Duration::seconds(1)))
            .unwrap();

        assert_eq!(store.count_quiz_attempts("s1", "q1").unwrap(), 2);
    }
}
