use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::Stream;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::constants::{
    DEFAULT_CONVERSATION_LIMIT, MAX_CONVERSATION_LIMIT, MAX_MESSAGE_LENGTH, MAX_SSE_CONNECTIONS,
};
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::state::AppState;
use crate::store::operations::messages::DirectMessage;
use crate::store::operations::users::Role;

static SSE_CONNECTION_COUNT: AtomicUsize = AtomicUsize::new(0);

struct SseGuard;
impl Drop for SseGuard {
    fn drop(&mut self) {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts))
        .route("/events", get(message_events))
        .route("/:contact_id", get(get_conversation).post(send_message))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Contact {
    id: String,
    username: String,
    full_name: Option<String>,
    role: Role,
    last_message: Option<String>,
    last_message_at: Option<chrono::DateTime<Utc>>,
    last_message_sender_id: Option<String>,
}

/// Students see instructors and vice versa, each row carrying a preview of
/// the latest exchanged message.
async fn list_contacts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let counterpart = match auth.role {
        Role::Student => Role::Instructor,
        Role::Instructor => Role::Student,
    };

    let mut contacts = Vec::new();
    for user in state.store().list_users_by_role(counterpart)? {
        if user.id == auth.user_id {
            continue;
        }
        let last = state
            .store()
            .last_conversation_message(&auth.user_id, &user.id)?;
        contacts.push(Contact {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            last_message: last.as_ref().map(|m| m.content.clone()),
            last_message_at: last.as_ref().map(|m| m.created_at),
            last_message_sender_id: last.map(|m| m.sender_id),
        });
    }

    // Most recently active conversations first.
    contacts.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
    Ok(ok(contacts))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationQuery {
    limit: Option<usize>,
}

async fn get_conversation(
    auth: AuthUser,
    Path(contact_id): Path<String>,
    Query(q): Query<ConversationQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    if state.store().get_user_by_id(&contact_id)?.is_none() {
        return Err(AppError::not_found("Contact not found"));
    }

    let limit = q
        .limit
        .unwrap_or(DEFAULT_CONVERSATION_LIMIT)
        .clamp(1, MAX_CONVERSATION_LIMIT);

    let messages = state
        .store()
        .list_conversation(&auth.user_id, &contact_id, limit)?;
    Ok(ok(messages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    content: String,
}

async fn send_message(
    auth: AuthUser,
    Path(contact_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "Message content must not be empty",
        ));
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "Message content is too long",
        ));
    }
    if contact_id == auth.user_id {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "Cannot message yourself",
        ));
    }
    if state.store().get_user_by_id(&contact_id)?.is_none() {
        return Err(AppError::not_found("Contact not found"));
    }

    let message = DirectMessage {
        id: uuid::Uuid::new_v4().to_string(),
        sender_id: auth.user_id.clone(),
        recipient_id: contact_id,
        content: content.to_string(),
        created_at: Utc::now(),
    };

    state.store().append_message(&message)?;
    Ok(created(message))
}

/// SSE stream of new-message notifications: polls the recipient inbox every
/// few seconds and emits a count of messages that arrived since the last
/// emission.
async fn message_events(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let current = SSE_CONNECTION_COUNT.fetch_add(1, Ordering::SeqCst);
    if current >= MAX_SSE_CONNECTIONS {
        SSE_CONNECTION_COUNT.fetch_sub(1, Ordering::SeqCst);
        return Err(AppError::too_many_requests("Too many SSE connections"));
    }

    let mut shutdown_rx = state.shutdown_rx();
    let user_id = auth.user_id.clone();

    let stream = async_stream::stream! {
        let _guard = SseGuard;
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let mut last_seen_ms = Utc::now().timestamp_millis();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.store().count_inbox_since(&user_id, last_seen_ms) {
                        Ok(0) => {}
                        Ok(count) => {
                            last_seen_ms = Utc::now().timestamp_millis();
                            let payload = serde_json::json!({
                                "type": "new_messages",
                                "count": count,
                            });
                            if let Ok(json) = serde_json::to_string(&payload) {
                                yield Ok(Event::default().event("message").data(json));
                            }
                        }
                        Err(error) => {
                            tracing::warn!(user_id = %user_id, error = %error, "Inbox poll failed");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
