use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::courses::Course;
use crate::store::operations::enrollments::Enrollment;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_enrollments).post(enroll).delete(unenroll))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollmentQuery {
    course_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrollmentWithCourse {
    #[serde(flatten)]
    enrollment: Enrollment,
    course: Option<Course>,
}

/// With `courseId=`: membership check for one course. Without: the student's
/// enrollments, newest first, with the course attached.
async fn list_enrollments(
    auth: AuthUser,
    Query(q): Query<EnrollmentQuery>,
    State(state): State<AppState>,
) -> Result<axum::response::Response, AppError> {
    if let Some(course_id) = &q.course_id {
        let enrollment = state.store().get_enrollment(&auth.user_id, course_id)?;
        return Ok(ok(serde_json::json!({
            "enrolled": enrollment.is_some(),
            "enrollment": enrollment,
        }))
        .into_response());
    }

    let mut rows = Vec::new();
    for enrollment in state.store().list_student_enrollments(&auth.user_id)? {
        let course = state.store().get_course(&enrollment.course_id)?;
        rows.push(EnrollmentWithCourse { enrollment, course });
    }
    Ok(ok(rows).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    course_id: String,
}

async fn enroll(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EnrollRequest>,
) -> Result<axum::response::Response, AppError> {
    let course = state
        .store()
        .get_course(&req.course_id)?
        .ok_or_else(|| AppError::not_found("Course not found"))?;

    if !course.is_published {
        return Err(AppError::bad_request(
            "COURSE_NOT_PUBLISHED",
            "Course is not published",
        ));
    }

    let enrollment = Enrollment {
        student_id: auth.user_id.clone(),
        course_id: course.id.clone(),
        enrolled_at: Utc::now(),
    };

    let newly_created = state.store().enroll(&enrollment)?;
    if newly_created {
        Ok(created(enrollment).into_response())
    } else {
        // Enrolling twice is not an error, just a no-op.
        let existing = state
            .store()
            .get_enrollment(&auth.user_id, &course.id)?
            .unwrap_or(enrollment);
        Ok(ok(existing).into_response())
    }
}

async fn unenroll(
    auth: AuthUser,
    Query(q): Query<EnrollmentQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let Some(course_id) = &q.course_id else {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "courseId is required",
        ));
    };

    state.store().delete_enrollment(&auth.user_id, course_id)?;
    Ok(ok(serde_json::json!({ "unenrolled": true })))
}
