use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::operations::modules::map_txn_error;
use crate::store::{Store, StoreError};

/// A quiz is stored as one document with its questions and options inline.
/// The `is_correct` flags live server-side only; route handlers hand clients
/// a sanitized view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    /// Minimum score percentage for a passing attempt (inclusive).
    pub passing_score: u32,
    pub questions: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub text: String,
    pub question_type: QuestionType,
    pub points: u32,
    pub options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl Store {
    /// Create a quiz and claim the one-quiz-per-lesson slot. Conflicts if the
    /// lesson already has a quiz.
    pub fn create_quiz(&self, quiz: &Quiz) -> Result<(), StoreError> {
        let key = keys::quiz_key(&quiz.id)?;
        let index_key = keys::quiz_lesson_index_key(&quiz.lesson_id)?;
        let bytes = Self::serialize(quiz)?;

        // Quiz documents and the lesson index share one tree, so a single-tree
        // transaction covers both writes.
        self.quizzes
            .transaction(|tx| {
                if tx.get(index_key.as_bytes())?.is_some() {
                    return sled::transaction::abort(StoreError::Conflict {
                        entity: "quiz".to_string(),
                        key: quiz.lesson_id.clone(),
                    });
                }
                tx.insert(index_key.as_bytes(), quiz.id.as_bytes())?;
                tx.insert(key.as_bytes(), bytes.as_slice())?;
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }

    pub fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        let key = keys::quiz_key(quiz_id)?;
        match self.quizzes.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_quiz_by_lesson(&self, lesson_id: &str) -> Result<Option<Quiz>, StoreError> {
        let index_key = keys::quiz_lesson_index_key(lesson_id)?;
        let Some(quiz_id_raw) = self.quizzes.get(index_key.as_bytes())? else {
            return Ok(None);
        };
        let quiz_id = match String::from_utf8(quiz_id_raw.to_vec()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid UTF-8 in quiz lesson index");
                return Ok(None);
            }
        };
        self.get_quiz(&quiz_id)
    }

    pub fn delete_quiz(&self, quiz_id: &str) -> Result<(), StoreError> {
        let Some(quiz) = self.get_quiz(quiz_id)? else {
            return Ok(());
        };
        let key = keys::quiz_key(quiz_id)?;
        let index_key = keys::quiz_lesson_index_key(&quiz.lesson_id)?;

        self.quizzes
            .transaction(|tx| {
                tx.remove(key.as_bytes())?;
                tx.remove(index_key.as_bytes())?;
                Ok(())
            })
            .map_err(map_txn_error)?;
        Ok(())
    }
}
