mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::auth::{register_student, seed_instructor_and_login};
use common::http::{assert_json_error, assert_status_ok_json, auth_header, request, response_json};

#[tokio::test]
async fn it_exchanges_messages_between_student_and_instructor() {
    let app = spawn_test_app().await;
    let (instructor_token, instructor_id) =
        seed_instructor_and_login(&app.app, &app.state).await;
    let (student_token, student_id) = register_student(&app.app).await;

    let sent = request(
        &app.app,
        Method::POST,
        &format!("/api/messages/{instructor_id}"),
        Some(serde_json::json!({ "content": "When is the next lesson?" })),
        &[auth_header(&student_token)],
    )
    .await;
    assert_eq!(sent.status(), StatusCode::CREATED);

    let reply = request(
        &app.app,
        Method::POST,
        &format!("/api/messages/{student_id}"),
        Some(serde_json::json!({ "content": "Thursday at five." })),
        &[auth_header(&instructor_token)],
    )
    .await;
    assert_eq!(reply.status(), StatusCode::CREATED);

    // Both sides see the same conversation, oldest first.
    let conversation = request(
        &app.app,
        Method::GET,
        &format!("/api/messages/{instructor_id}"),
        None,
        &[auth_header(&student_token)],
    )
    .await;
    let (status, _, body) = response_json(conversation).await;
    assert_status_ok_json(status, &body);
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "When is the next lesson?");
    assert_eq!(messages[1]["content"], "Thursday at five.");
}

#[tokio::test]
async fn it_lists_contacts_with_last_message_preview() {
    let app = spawn_test_app().await;
    let (_, instructor_id) = seed_instructor_and_login(&app.app, &app.state).await;
    let (student_token, student_id) = register_student(&app.app).await;

    let contacts_before = request(
        &app.app,
        Method::GET,
        "/api/messages/contacts",
        None,
        &[auth_header(&student_token)],
    )
    .await;
    let (status, _, body) = response_json(contacts_before).await;
    assert_status_ok_json(status, &body);
    let row = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == instructor_id.as_str())
        .expect("instructor listed as contact")
        .clone();
    assert!(row["lastMessage"].is_null());

    request(
        &app.app,
        Method::POST,
        &format!("/api/messages/{instructor_id}"),
        Some(serde_json::json!({ "content": "Hello!" })),
        &[auth_header(&student_token)],
    )
    .await;

    let contacts_after = request(
        &app.app,
        Method::GET,
        "/api/messages/contacts",
        None,
        &[auth_header(&student_token)],
    )
    .await;
    let (_, _, body) = response_json(contacts_after).await;
    let row = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == instructor_id.as_str())
        .unwrap()
        .clone();
    assert_eq!(row["lastMessage"], "Hello!");
    assert_eq!(row["lastMessageSenderId"], student_id.as_str());
}

#[tokio::test]
async fn it_validates_message_payloads() {
    let app = spawn_test_app().await;
    let (_, instructor_id) = seed_instructor_and_login(&app.app, &app.state).await;
    let (student_token, student_id) = register_student(&app.app).await;

    let empty = request(
        &app.app,
        Method::POST,
        &format!("/api/messages/{instructor_id}"),
        Some(serde_json::json!({ "content": "   " })),
        &[auth_header(&student_token)],
    )
    .await;
    let (status, _, body) = response_json(empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "VALIDATION_ERROR");

    let to_self = request(
        &app.app,
        Method::POST,
        &format!("/api/messages/{student_id}"),
        Some(serde_json::json!({ "content": "hi me" })),
        &[auth_header(&student_token)],
    )
    .await;
    assert_eq!(to_self.status(), StatusCode::BAD_REQUEST);

    let unknown = request(
        &app.app,
        Method::POST,
        "/api/messages/nobody",
        Some(serde_json::json!({ "content": "hello?" })),
        &[auth_header(&student_token)],
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}
