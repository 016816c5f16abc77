use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, InstructorUser};
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::extractors::JsonBody;
use crate::response::{created, ok, paginated, AppError};
use crate::routes::auth::UserProfile;
use crate::state::AppState;
use crate::store::operations::courses::{Course, CourseLevel};
use crate::store::operations::lessons::Lesson;
use crate::store::operations::modules::CourseModule;
use crate::validation::validate_title;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route(
            "/:course_id",
            get(get_course).put(update_course).delete(delete_course),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCoursesQuery {
    instructor_id: Option<String>,
    include_unpublished: Option<bool>,
    page: Option<u64>,
    per_page: Option<u64>,
}

/// Published courses for everyone; an instructor may additionally see their
/// own unpublished drafts.
async fn list_courses(
    auth: AuthUser,
    Query(q): Query<ListCoursesQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let include_unpublished = q.include_unpublished.unwrap_or(false)
        && q.instructor_id.as_deref() == Some(auth.user_id.as_str());

    let page = q.page.unwrap_or(1).max(1);
    let per_page = q.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let courses = state
        .store()
        .list_courses(q.instructor_id.as_deref(), include_unpublished)?;
    let total = courses.len() as u64;
    let offset = ((page - 1) * per_page) as usize;
    let page_items: Vec<Course> = courses
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    Ok(paginated(page_items, total, page, per_page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCourseRequest {
    title: String,
    description: Option<String>,
    level: Option<CourseLevel>,
    thumbnail_url: Option<String>,
}

async fn create_course(
    instructor: InstructorUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(msg) = validate_title(&req.title) {
        return Err(AppError::bad_request("INVALID_TITLE", msg));
    }

    let now = Utc::now();
    let course = Course {
        id: uuid::Uuid::new_v4().to_string(),
        instructor_id: instructor.user_id.clone(),
        title: req.title.trim().to_string(),
        description: req.description.clone(),
        level: req.level.unwrap_or(CourseLevel::Beginner),
        thumbnail_url: req.thumbnail_url.clone(),
        is_published: false,
        created_at: now,
        updated_at: now,
    };

    state.store().create_course(&course)?;
    Ok(created(course))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleOutline {
    #[serde(flatten)]
    module: CourseModule,
    lessons: Vec<Lesson>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseDetail {
    #[serde(flatten)]
    course: Course,
    instructor: Option<UserProfile>,
    modules: Vec<ModuleOutline>,
    enrollment_count: usize,
}

async fn get_course(
    auth: AuthUser,
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let course = state
        .store()
        .get_course(&course_id)?
        .ok_or_else(|| AppError::not_found("Course not found"))?;

    // Unpublished courses are visible to their owner only.
    if !course.is_published && course.instructor_id != auth.user_id {
        return Err(AppError::not_found("Course not found"));
    }

    let instructor = state
        .store()
        .get_user_by_id(&course.instructor_id)?
        .as_ref()
        .map(UserProfile::from);

    let mut modules = Vec::new();
    for module in state.store().list_course_modules(&course_id)? {
        let lessons = state.store().list_module_lessons(&module.id)?;
        modules.push(ModuleOutline { module, lessons });
    }

    let enrollment_count = state.store().count_course_enrollments(&course_id)?;

    Ok(ok(CourseDetail {
        course,
        instructor,
        modules,
        enrollment_count,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCourseRequest {
    title: Option<String>,
    description: Option<String>,
    level: Option<CourseLevel>,
    thumbnail_url: Option<String>,
    is_published: Option<bool>,
}

async fn update_course(
    instructor: InstructorUser,
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut course = owned_course(&state, &course_id, &instructor.user_id)?;

    if let Some(title) = &req.title {
        if let Err(msg) = validate_title(title) {
            return Err(AppError::bad_request("INVALID_TITLE", msg));
        }
        course.title = title.trim().to_string();
    }
    if let Some(description) = &req.description {
        course.description = Some(description.clone());
    }
    if let Some(level) = req.level {
        course.level = level;
    }
    if let Some(thumbnail_url) = &req.thumbnail_url {
        course.thumbnail_url = Some(thumbnail_url.clone());
    }
    if let Some(is_published) = req.is_published {
        course.is_published = is_published;
    }
    course.updated_at = Utc::now();

    state.store().update_course(&course)?;
    Ok(ok(course))
}

async fn delete_course(
    instructor: InstructorUser,
    Path(course_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let course = owned_course(&state, &course_id, &instructor.user_id)?;

    state.store().delete_course(&course.id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}

/// Fetch a course and enforce the ownership relation.
pub(crate) fn owned_course(
    state: &AppState,
    course_id: &str,
    instructor_id: &str,
) -> Result<Course, AppError> {
    let course = state
        .store()
        .get_course(course_id)?
        .ok_or_else(|| AppError::not_found("Course not found"))?;

    if course.instructor_id != instructor_id {
        return Err(AppError::forbidden("Not the course owner"));
    }
    Ok(course)
}
