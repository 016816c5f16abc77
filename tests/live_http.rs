mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};

use common::app::spawn_test_app;
use common::auth::{register_student, seed_instructor_and_login};
use common::http::{assert_json_error, assert_status_ok_json, auth_header, request, response_json};

async fn schedule(app: &Router, token: &str) -> serde_json::Value {
    let resp = request(
        app,
        Method::POST,
        "/api/live",
        Some(serde_json::json!({
            "title": "Group warmup",
            "scheduledAt": Utc::now() + Duration::hours(2),
            "durationMins": 45,
            "maxParticipants": 12,
        })),
        &[auth_header(token)],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::CREATED, "schedule failed: {body}");
    body["data"].clone()
}

#[tokio::test]
async fn it_schedules_starts_joins_and_ends_a_session() {
    let app = spawn_test_app().await;
    let (instructor_token, _) = seed_instructor_and_login(&app.app, &app.state).await;
    let (student_token, _) = register_student(&app.app).await;

    let session = schedule(&app.app, &instructor_token).await;
    let session_id = session["id"].as_str().unwrap();
    assert_eq!(session["status"], "scheduled");

    // Joining before start is refused.
    let early_join = request(
        &app.app,
        Method::POST,
        &format!("/api/live/{session_id}/join"),
        None,
        &[auth_header(&student_token)],
    )
    .await;
    let (status, _, body) = response_json(early_join).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_json_error(&body, "LIVE_SESSION_NOT_ACTIVE");

    let start = request(
        &app.app,
        Method::POST,
        &format!("/api/live/{session_id}/start"),
        None,
        &[auth_header(&instructor_token)],
    )
    .await;
    let (status, _, body) = response_json(start).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "live");
    assert!(body["data"]["roomUrl"].as_str().unwrap().starts_with("https://"));

    let join = request(
        &app.app,
        Method::POST,
        &format!("/api/live/{session_id}/join"),
        None,
        &[auth_header(&student_token)],
    )
    .await;
    let (status, _, body) = response_json(join).await;
    assert_status_ok_json(status, &body);
    assert!(body["data"]["roomUrl"].is_string());

    let end = request(
        &app.app,
        Method::POST,
        &format!("/api/live/{session_id}/end"),
        None,
        &[auth_header(&instructor_token)],
    )
    .await;
    let (status, _, body) = response_json(end).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "ended");

    // Ended sessions drop out of the upcoming listing.
    let listing = request(
        &app.app,
        Method::GET,
        "/api/live",
        None,
        &[auth_header(&student_token)],
    )
    .await;
    let (_, _, body) = response_json(listing).await;
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["id"] != session_id));
}

#[tokio::test]
async fn it_restricts_session_management_to_the_owner() {
    let app = spawn_test_app().await;
    let (instructor_token, _) = seed_instructor_and_login(&app.app, &app.state).await;
    let (other_token, _) = seed_instructor_and_login(&app.app, &app.state).await;
    let (student_token, _) = register_student(&app.app).await;

    let scheduling_denied = request(
        &app.app,
        Method::POST,
        "/api/live",
        Some(serde_json::json!({
            "title": "Student session",
            "scheduledAt": Utc::now() + Duration::hours(1),
        })),
        &[auth_header(&student_token)],
    )
    .await;
    assert_eq!(scheduling_denied.status(), StatusCode::FORBIDDEN);

    let session = schedule(&app.app, &instructor_token).await;
    let session_id = session["id"].as_str().unwrap();

    let foreign_start = request(
        &app.app,
        Method::POST,
        &format!("/api/live/{session_id}/start"),
        None,
        &[auth_header(&other_token)],
    )
    .await;
    assert_eq!(foreign_start.status(), StatusCode::FORBIDDEN);

    let cancel = request(
        &app.app,
        Method::DELETE,
        &format!("/api/live/{session_id}"),
        None,
        &[auth_header(&instructor_token)],
    )
    .await;
    let (status, _, body) = response_json(cancel).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "cancelled");
}

#[tokio::test]
async fn it_rejects_past_schedule_times() {
    let app = spawn_test_app().await;
    let (instructor_token, _) = seed_instructor_and_login(&app.app, &app.state).await;

    let resp = request(
        &app.app,
        Method::POST,
        "/api/live",
        Some(serde_json::json!({
            "title": "Yesterday",
            "scheduledAt": Utc::now() - Duration::hours(1),
        })),
        &[auth_header(&instructor_token)],
    )
    .await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");
}
