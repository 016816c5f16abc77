use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::{AuthUser, InstructorUser};
use crate::constants::DEFAULT_LIVE_MAX_PARTICIPANTS;
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::services::room_provider::{RoomError, RoomProvider};
use crate::state::AppState;
use crate::store::operations::live_sessions::{LiveSession, LiveStatus};
use crate::validation::validate_title;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_upcoming).post(schedule_session))
        .route("/:session_id", delete(cancel_session))
        .route("/:session_id/start", post(start_session))
        .route("/:session_id/join", post(join_session))
        .route("/:session_id/end", post(end_session))
}

async fn list_upcoming(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.store().list_upcoming_live_sessions(Utc::now())?;
    Ok(ok(sessions))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleSessionRequest {
    title: String,
    description: Option<String>,
    scheduled_at: DateTime<Utc>,
    duration_mins: Option<u32>,
    max_participants: Option<u32>,
}

async fn schedule_session(
    instructor: InstructorUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ScheduleSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(msg) = validate_title(&req.title) {
        return Err(AppError::bad_request("INVALID_TITLE", msg));
    }
    if req.scheduled_at <= Utc::now() {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "scheduledAt must be in the future",
        ));
    }

    let now = Utc::now();
    let session = LiveSession {
        id: uuid::Uuid::new_v4().to_string(),
        instructor_id: instructor.user_id.clone(),
        title: req.title.trim().to_string(),
        description: req.description.clone(),
        scheduled_at: req.scheduled_at,
        duration_mins: req.duration_mins.unwrap_or(60).clamp(5, 24 * 60),
        max_participants: req
            .max_participants
            .unwrap_or(DEFAULT_LIVE_MAX_PARTICIPANTS)
            .clamp(2, 200),
        status: LiveStatus::Scheduled,
        room_name: None,
        room_url: None,
        created_at: now,
        updated_at: now,
    };

    state.store().create_live_session(&session)?;
    Ok(created(session))
}

fn owned_session(
    state: &AppState,
    session_id: &str,
    instructor_id: &str,
) -> Result<LiveSession, AppError> {
    let session = state
        .store()
        .get_live_session(session_id)?
        .ok_or_else(|| AppError::not_found("Live session not found"))?;
    if session.instructor_id != instructor_id {
        return Err(AppError::forbidden("Not the session owner"));
    }
    Ok(session)
}

fn room_error_to_app_error(error: RoomError) -> AppError {
    match error {
        RoomError::Disabled => AppError::bad_request("LIVE_ROOMS_DISABLED", "Live rooms are disabled"),
        other => AppError::internal(&other.to_string()),
    }
}

/// Go live: create the provider room and publish its URL.
async fn start_session(
    instructor: InstructorUser,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut session = owned_session(&state, &session_id, &instructor.user_id)?;

    match session.status {
        LiveStatus::Scheduled => {}
        LiveStatus::Live => return Ok(ok(session).into_response()),
        _ => {
            return Err(AppError::conflict(
                "LIVE_SESSION_CLOSED",
                "Session has already ended",
            ))
        }
    }

    let room_name = RoomProvider::room_name_for(&session.id);
    let room = state
        .rooms()
        .create_room(&room_name, session.max_participants)
        .await
        .map_err(room_error_to_app_error)?;

    session.status = LiveStatus::Live;
    session.room_name = Some(room.name.clone());
    session.room_url = Some(room.url.clone());
    session.updated_at = Utc::now();
    state.store().update_live_session(&session)?;

    Ok(ok(session).into_response())
}

/// Any authenticated user can join a session while it is live.
async fn join_session(
    _auth: AuthUser,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .store()
        .get_live_session(&session_id)?
        .ok_or_else(|| AppError::not_found("Live session not found"))?;

    let (Some(room_url), LiveStatus::Live) = (&session.room_url, session.status) else {
        return Err(AppError::conflict(
            "LIVE_SESSION_NOT_ACTIVE",
            "Session is not live",
        ));
    };

    Ok(ok(serde_json::json!({
        "roomUrl": room_url,
        "title": session.title,
    })))
}

async fn end_session(
    instructor: InstructorUser,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut session = owned_session(&state, &session_id, &instructor.user_id)?;

    if session.status != LiveStatus::Live {
        return Err(AppError::conflict(
            "LIVE_SESSION_NOT_ACTIVE",
            "Session is not live",
        ));
    }

    // Best-effort teardown; the provider expires unused rooms anyway.
    if let Some(room_name) = &session.room_name {
        if let Err(error) = state.rooms().delete_room(room_name).await {
            tracing::warn!(session_id = %session.id, error = %error, "Failed to delete provider room");
        }
    }

    session.status = LiveStatus::Ended;
    session.updated_at = Utc::now();
    state.store().update_live_session(&session)?;

    Ok(ok(session))
}

async fn cancel_session(
    instructor: InstructorUser,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut session = owned_session(&state, &session_id, &instructor.user_id)?;

    if session.status != LiveStatus::Scheduled {
        return Err(AppError::conflict(
            "LIVE_SESSION_NOT_CANCELLABLE",
            "Only scheduled sessions can be cancelled",
        ));
    }

    session.status = LiveStatus::Cancelled;
    session.updated_at = Utc::now();
    state.store().update_live_session(&session)?;

    Ok(ok(session))
}
