use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;

use chrono::Utc;
use serde::Deserialize;

use crate::auth::{AuthUser, InstructorUser};
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::routes::courses::owned_course;
use crate::state::AppState;
use crate::store::operations::modules::CourseModule;
use crate::validation::validate_title;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_modules).post(create_module))
        .route("/:module_id", put(update_module).delete(delete_module))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModulesQuery {
    course_id: String,
}

async fn list_modules(
    _auth: AuthUser,
    Query(q): Query<ListModulesQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if state.store().get_course(&q.course_id)?.is_none() {
        return Err(AppError::not_found("Course not found"));
    }
    let modules = state.store().list_course_modules(&q.course_id)?;
    Ok(ok(modules))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateModuleRequest {
    course_id: String,
    title: String,
    description: Option<String>,
    order_index: u32,
}

async fn create_module(
    instructor: InstructorUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(msg) = validate_title(&req.title) {
        return Err(AppError::bad_request("INVALID_TITLE", msg));
    }
    owned_course(&state, &req.course_id, &instructor.user_id)?;

    let module = CourseModule {
        id: uuid::Uuid::new_v4().to_string(),
        course_id: req.course_id.clone(),
        title: req.title.trim().to_string(),
        description: req.description.clone(),
        order_index: req.order_index,
        created_at: Utc::now(),
    };

    state.store().create_module(&module)?;
    Ok(created(module))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateModuleRequest {
    title: Option<String>,
    description: Option<String>,
    order_index: Option<u32>,
}

async fn update_module(
    instructor: InstructorUser,
    Path(module_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut module = state
        .store()
        .get_module(&module_id)?
        .ok_or_else(|| AppError::not_found("Module not found"))?;
    owned_course(&state, &module.course_id, &instructor.user_id)?;

    if let Some(title) = &req.title {
        if let Err(msg) = validate_title(title) {
            return Err(AppError::bad_request("INVALID_TITLE", msg));
        }
        module.title = title.trim().to_string();
    }
    if let Some(description) = &req.description {
        module.description = Some(description.clone());
    }
    if let Some(order_index) = req.order_index {
        module.order_index = order_index;
    }

    state.store().update_module(&module)?;
    Ok(ok(module))
}

async fn delete_module(
    instructor: InstructorUser,
    Path(module_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let module = state
        .store()
        .get_module(&module_id)?
        .ok_or_else(|| AppError::not_found("Module not found"))?;
    owned_course(&state, &module.course_id, &instructor.user_id)?;

    state.store().delete_module(&module_id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}
