use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::progress::coordinator;
use crate::progress::tracker::{PlaybackSample, SeekDecision, VideoTracker};
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::progress::LessonProgress;
use crate::validation::validate_percentage;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_progress).post(report_progress))
        .route("/seek", post(check_seek))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetProgressQuery {
    lesson_id: Option<String>,
    course_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseLessonProgress {
    lesson_id: String,
    lesson_title: String,
    progress: Option<LessonProgress>,
}

/// Progress for one lesson (`lessonId=`) or every lesson of a course
/// (`courseId=`).
async fn get_progress(
    auth: AuthUser,
    Query(q): Query<GetProgressQuery>,
    State(state): State<AppState>,
) -> Result<axum::response::Response, AppError> {
    if let Some(lesson_id) = &q.lesson_id {
        if state.store().get_lesson(lesson_id)?.is_none() {
            return Err(AppError::not_found("Lesson not found"));
        }
        let progress = state.store().get_lesson_progress(&auth.user_id, lesson_id)?;
        return Ok(ok(progress).into_response());
    }

    if let Some(course_id) = &q.course_id {
        if state.store().get_course(course_id)?.is_none() {
            return Err(AppError::not_found("Course not found"));
        }
        let lessons = state.store().list_course_lessons(course_id)?;
        let lesson_ids: Vec<String> = lessons.iter().map(|l| l.id.clone()).collect();
        let mut by_lesson = state.store().get_progress_batch(&auth.user_id, &lesson_ids)?;

        let rows: Vec<CourseLessonProgress> = lessons
            .into_iter()
            .map(|lesson| CourseLessonProgress {
                progress: by_lesson.remove(&lesson.id),
                lesson_id: lesson.id,
                lesson_title: lesson.title,
            })
            .collect();
        return Ok(ok(rows).into_response());
    }

    Err(AppError::bad_request(
        "VALIDATION_ERROR",
        "lessonId or courseId is required",
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportProgressRequest {
    lesson_id: String,
    #[serde(flatten)]
    sample: PlaybackSample,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportProgressResponse {
    progress_percent: f64,
    saved: bool,
    video_completed_signal: bool,
    progress: Option<LessonProgress>,
}

/// Ingest one playback sample through the tracker and, when the tracker says
/// so, merge it into the stored record.
///
/// Persistence is best-effort: a store failure is logged and answered as
/// `saved=false`; the merge-based write makes the next sample retry-safe.
async fn report_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ReportProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !(0.0..=1.0).contains(&req.sample.played_fraction) || !req.sample.played_fraction.is_finite()
    {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "playedFraction must be between 0 and 1",
        ));
    }

    let lesson = state
        .store()
        .get_lesson(&req.lesson_id)?
        .ok_or_else(|| AppError::not_found("Lesson not found"))?;

    let stored = state.store().get_lesson_progress(&auth.user_id, &lesson.id)?;
    let mut tracker = VideoTracker::from_progress(lesson.watch_required, stored.as_ref());

    let now = Utc::now();
    let outcome = tracker.report_sample(req.sample, now);

    let Some(persist_percent) = outcome.persist else {
        return Ok(ok(ReportProgressResponse {
            progress_percent: outcome.progress_percent,
            saved: false,
            video_completed_signal: false,
            progress: stored,
        }));
    };

    let has_quiz = state.store().get_quiz_by_lesson(&lesson.id)?.is_some();

    match state
        .store()
        .merge_lesson_progress(&auth.user_id, &lesson.id, |current| {
            coordinator::merge_video_progress(
                current,
                &auth.user_id,
                &lesson.id,
                persist_percent,
                has_quiz,
                now,
            )
        }) {
        Ok(updated) => Ok(ok(ReportProgressResponse {
            progress_percent: outcome.progress_percent,
            saved: true,
            video_completed_signal: outcome.completed_signal,
            progress: Some(updated),
        })),
        Err(error) => {
            // Losing one five-second granule is acceptable; the next sample
            // will carry the watermark forward.
            tracing::warn!(
                student_id = %auth.user_id,
                lesson_id = %lesson.id,
                error = %error,
                "Failed to persist video progress, will retry on next sample"
            );
            Ok(ok(ReportProgressResponse {
                progress_percent: outcome.progress_percent,
                saved: false,
                video_completed_signal: false,
                progress: stored,
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeekCheckRequest {
    lesson_id: String,
    target_percent: f64,
}

/// Answer a seek request with the allow/clamp decision for this student's
/// watermark.
async fn check_seek(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SeekCheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(msg) = validate_percentage(req.target_percent) {
        return Err(AppError::bad_request("VALIDATION_ERROR", msg));
    }

    let lesson = state
        .store()
        .get_lesson(&req.lesson_id)?
        .ok_or_else(|| AppError::not_found("Lesson not found"))?;

    let stored = state.store().get_lesson_progress(&auth.user_id, &lesson.id)?;
    let tracker = VideoTracker::from_progress(lesson.watch_required, stored.as_ref());

    let decision: SeekDecision = tracker.decide_seek(req.target_percent);
    Ok(ok(decision))
}
