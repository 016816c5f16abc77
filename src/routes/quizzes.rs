use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::progress::coordinator;
use crate::progress::scoring::{score_quiz, ScoredQuiz};
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::attempts::QuizAttempt;
use crate::store::operations::quizzes::{QuestionType, Quiz};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:quiz_id", get(get_quiz))
        .route("/:quiz_id/attempt", get(list_attempts).post(submit_attempt))
}

/// Client-facing quiz view. `is_correct` flags are stripped: correct answers
/// must never leave the server before grading.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    pub passing_score: u32,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    pub question_type: QuestionType,
    pub points: u32,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

impl From<&Quiz> for QuizView {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            lesson_id: quiz.lesson_id.clone(),
            title: quiz.title.clone(),
            passing_score: quiz.passing_score,
            questions: quiz
                .questions
                .iter()
                .map(|question| QuestionView {
                    id: question.id.clone(),
                    text: question.text.clone(),
                    question_type: question.question_type,
                    points: question.points,
                    options: question
                        .options
                        .iter()
                        .map(|option| OptionView {
                            id: option.id.clone(),
                            text: option.text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

async fn get_quiz(
    _auth: AuthUser,
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .store()
        .get_quiz(&quiz_id)?
        .ok_or_else(|| AppError::not_found("Quiz not found"))?;

    Ok(ok(QuizView::from(&quiz)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAttemptRequest {
    /// question id -> selected option id. Absent (not just empty) means an
    /// invalid submission.
    answers: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAttemptResponse {
    attempt: QuizAttempt,
    #[serde(flatten)]
    scored: ScoredQuiz,
}

/// Grade a submission and record the attempt.
///
/// Order matters: validation happens before any write; the attempt append is
/// the fatal boundary (an attempt that was not durably recorded must not be
/// reported as scored); the completion merge runs last and only for passes.
async fn submit_attempt(
    auth: AuthUser,
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(answers) = req.answers else {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "Answers are required",
        ));
    };

    let quiz = state
        .store()
        .get_quiz(&quiz_id)?
        .ok_or_else(|| AppError::not_found("Quiz not found"))?;

    let lesson = state
        .store()
        .get_lesson(&quiz.lesson_id)?
        .ok_or_else(|| AppError::not_found("Lesson not found"))?;

    // Watch gate: a watch-required lesson unlocks its quiz only after the
    // video is completed. Lessons without the gate accept quiz-first.
    if lesson.watch_required {
        let video_completed = state
            .store()
            .get_lesson_progress(&auth.user_id, &lesson.id)?
            .map(|p| p.video_completed)
            .unwrap_or(false);
        if !video_completed {
            return Err(AppError::forbidden(
                "Watch the lesson video before taking the quiz",
            ));
        }
    }

    let scored = score_quiz(&quiz, &answers);
    let now = Utc::now();

    let attempt = QuizAttempt {
        id: uuid::Uuid::new_v4().to_string(),
        student_id: auth.user_id.clone(),
        quiz_id: quiz.id.clone(),
        score: scored.score_percentage,
        passed: scored.passed,
        answers,
        completed_at: now,
    };

    // Append is all-or-nothing: a store failure here surfaces as
    // "submission failed, please retry" and nothing is reported as scored.
    state.store().append_attempt(&attempt)?;

    if scored.passed {
        state
            .store()
            .merge_lesson_progress(&auth.user_id, &lesson.id, |current| {
                coordinator::merge_quiz_pass(current, &auth.user_id, &lesson.id, now)
            })?;
    }

    Ok(created(SubmitAttemptResponse { attempt, scored }))
}

async fn list_attempts(
    auth: AuthUser,
    Path(quiz_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if state.store().get_quiz(&quiz_id)?.is_none() {
        return Err(AppError::not_found("Quiz not found"));
    }

    let attempts = state
        .store()
        .list_quiz_attempts(&auth.user_id, &quiz_id, crate::constants::MAX_PAGE_SIZE as usize)?;
    Ok(ok(attempts))
}
