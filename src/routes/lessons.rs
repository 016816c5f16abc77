use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, InstructorUser};
use crate::constants::DEFAULT_PASSING_SCORE;
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::routes::courses::owned_course;
use crate::routes::quizzes::QuizView;
use crate::state::AppState;
use crate::store::operations::lessons::Lesson;
use crate::store::operations::quizzes::{QuestionOption, QuestionType, Quiz, QuizQuestion};
use crate::validation::validate_title;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_lessons).post(create_lesson))
        .route(
            "/:lesson_id",
            get(get_lesson).put(update_lesson).delete(delete_lesson),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListLessonsQuery {
    module_id: String,
}

async fn list_lessons(
    _auth: AuthUser,
    Query(q): Query<ListLessonsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if state.store().get_module(&q.module_id)?.is_none() {
        return Err(AppError::not_found("Module not found"));
    }
    let lessons = state.store().list_module_lessons(&q.module_id)?;
    Ok(ok(lessons))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineOption {
    text: String,
    #[serde(default)]
    is_correct: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineQuestion {
    text: String,
    question_type: Option<QuestionType>,
    points: Option<u32>,
    options: Vec<InlineOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineQuiz {
    title: Option<String>,
    passing_score: Option<u32>,
    questions: Vec<InlineQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLessonRequest {
    module_id: String,
    title: String,
    description: Option<String>,
    video_url: String,
    duration_secs: Option<u32>,
    keywords: Option<Vec<String>>,
    watch_required: Option<bool>,
    order_index: u32,
    quiz: Option<InlineQuiz>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LessonWithQuiz {
    #[serde(flatten)]
    lesson: Lesson,
    quiz: Option<QuizView>,
}

fn build_quiz(lesson_id: &str, lesson_title: &str, inline: &InlineQuiz) -> Result<Quiz, AppError> {
    if let Some(passing_score) = inline.passing_score {
        if passing_score > 100 {
            return Err(AppError::bad_request(
                "VALIDATION_ERROR",
                "passingScore must be between 0 and 100",
            ));
        }
    }

    let mut questions = Vec::with_capacity(inline.questions.len());
    for question in &inline.questions {
        if question.text.trim().is_empty() {
            return Err(AppError::bad_request(
                "VALIDATION_ERROR",
                "Question text must not be empty",
            ));
        }
        if question.options.is_empty() {
            return Err(AppError::bad_request(
                "VALIDATION_ERROR",
                "Every question needs at least one option",
            ));
        }
        let points = question.points.unwrap_or(1);
        if points == 0 {
            return Err(AppError::bad_request(
                "VALIDATION_ERROR",
                "Question points must be positive",
            ));
        }

        questions.push(QuizQuestion {
            id: uuid::Uuid::new_v4().to_string(),
            text: question.text.trim().to_string(),
            question_type: question.question_type.unwrap_or(QuestionType::MultipleChoice),
            points,
            options: question
                .options
                .iter()
                .map(|option| QuestionOption {
                    id: uuid::Uuid::new_v4().to_string(),
                    text: option.text.clone(),
                    is_correct: option.is_correct,
                })
                .collect(),
        });
    }

    Ok(Quiz {
        id: uuid::Uuid::new_v4().to_string(),
        lesson_id: lesson_id.to_string(),
        title: inline
            .title
            .clone()
            .unwrap_or_else(|| format!("{lesson_title} Quiz")),
        passing_score: inline.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
        questions,
        created_at: Utc::now(),
    })
}

/// Create a lesson, optionally with its quiz. All-or-nothing: if the quiz
/// cannot be stored the fresh lesson is rolled back.
async fn create_lesson(
    instructor: InstructorUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(msg) = validate_title(&req.title) {
        return Err(AppError::bad_request("INVALID_TITLE", msg));
    }
    if req.video_url.trim().is_empty() {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "videoUrl is required",
        ));
    }

    let module = state
        .store()
        .get_module(&req.module_id)?
        .ok_or_else(|| AppError::not_found("Module not found"))?;
    owned_course(&state, &module.course_id, &instructor.user_id)?;

    // Validate the inline quiz before any write.
    let now = Utc::now();
    let lesson_id = uuid::Uuid::new_v4().to_string();
    let quiz = match &req.quiz {
        Some(inline) if !inline.questions.is_empty() => {
            Some(build_quiz(&lesson_id, req.title.trim(), inline)?)
        }
        _ => None,
    };

    let mut lesson = Lesson {
        id: lesson_id,
        module_id: req.module_id.clone(),
        title: req.title.trim().to_string(),
        description: req.description.clone(),
        video_url: req.video_url.trim().to_string(),
        duration_secs: req.duration_secs,
        keywords: req.keywords.clone().unwrap_or_default(),
        watch_required: req.watch_required.unwrap_or(true),
        order_index: req.order_index,
        quiz_id: None,
        created_at: now,
        updated_at: now,
    };

    state.store().create_lesson(&lesson)?;

    if let Some(quiz) = &quiz {
        if let Err(error) = state.store().create_quiz(quiz) {
            // Roll the lesson back so a half-created pair never survives.
            if let Err(cleanup) = state.store().delete_lesson(&lesson.id) {
                tracing::error!(lesson_id = %lesson.id, error = %cleanup, "Failed to roll back lesson after quiz error");
            }
            return Err(error.into());
        }
        lesson.quiz_id = Some(quiz.id.clone());
        state.store().update_lesson(&lesson)?;
    }

    Ok(created(LessonWithQuiz {
        quiz: quiz.as_ref().map(QuizView::from),
        lesson,
    }))
}

async fn get_lesson(
    _auth: AuthUser,
    Path(lesson_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = state
        .store()
        .get_lesson(&lesson_id)?
        .ok_or_else(|| AppError::not_found("Lesson not found"))?;

    let quiz = state.store().get_quiz_by_lesson(&lesson.id)?;

    Ok(ok(LessonWithQuiz {
        quiz: quiz.as_ref().map(QuizView::from),
        lesson,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateLessonRequest {
    title: Option<String>,
    description: Option<String>,
    video_url: Option<String>,
    duration_secs: Option<u32>,
    keywords: Option<Vec<String>>,
    watch_required: Option<bool>,
    order_index: Option<u32>,
}

async fn update_lesson(
    instructor: InstructorUser,
    Path(lesson_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut lesson = owned_lesson(&state, &lesson_id, &instructor.user_id)?;

    if let Some(title) = &req.title {
        if let Err(msg) = validate_title(title) {
            return Err(AppError::bad_request("INVALID_TITLE", msg));
        }
        lesson.title = title.trim().to_string();
    }
    if let Some(description) = &req.description {
        lesson.description = Some(description.clone());
    }
    if let Some(video_url) = &req.video_url {
        if video_url.trim().is_empty() {
            return Err(AppError::bad_request(
                "VALIDATION_ERROR",
                "videoUrl must not be empty",
            ));
        }
        lesson.video_url = video_url.trim().to_string();
    }
    if let Some(duration_secs) = req.duration_secs {
        lesson.duration_secs = Some(duration_secs);
    }
    if let Some(keywords) = &req.keywords {
        lesson.keywords = keywords.clone();
    }
    if let Some(watch_required) = req.watch_required {
        lesson.watch_required = watch_required;
    }
    if let Some(order_index) = req.order_index {
        lesson.order_index = order_index;
    }
    lesson.updated_at = Utc::now();

    state.store().update_lesson(&lesson)?;
    Ok(ok(lesson))
}

async fn delete_lesson(
    instructor: InstructorUser,
    Path(lesson_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = owned_lesson(&state, &lesson_id, &instructor.user_id)?;

    state.store().delete_lesson(&lesson.id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}

/// Fetch a lesson and enforce ownership through its module's course.
fn owned_lesson(
    state: &AppState,
    lesson_id: &str,
    instructor_id: &str,
) -> Result<Lesson, AppError> {
    let lesson = state
        .store()
        .get_lesson(lesson_id)?
        .ok_or_else(|| AppError::not_found("Lesson not found"))?;
    let module = state
        .store()
        .get_module(&lesson.module_id)?
        .ok_or_else(|| AppError::not_found("Module not found"))?;
    owned_course(state, &module.course_id, instructor_id)?;
    Ok(lesson)
}
