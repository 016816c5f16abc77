use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::routes::auth::UserProfile;
use crate::state::AppState;
use crate::validation::validate_username;

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(get_me).put(update_me))
}

async fn get_me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store()
        .get_user_by_id(&auth.user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ok(UserProfile::from(&user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMeRequest {
    username: Option<String>,
    full_name: Option<String>,
}

async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = state
        .store()
        .get_user_by_id(&auth.user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if let Some(username) = &req.username {
        let username = username.trim();
        if let Err(msg) = validate_username(username) {
            return Err(AppError::bad_request("AUTH_INVALID_USERNAME", msg));
        }
        user.username = username.to_string();
    }
    if let Some(full_name) = &req.full_name {
        let trimmed = full_name.trim();
        user.full_name = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
    user.updated_at = Utc::now();

    state.store().update_user(&user)?;
    Ok(ok(UserProfile::from(&user)))
}
