mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::auth::register_student;
use common::http::{assert_json_error, assert_status_ok_json, auth_header, request, response_json};

#[tokio::test]
async fn it_registers_and_fetches_profile() {
    let app = spawn_test_app().await;
    let (token, user_id) = register_student(&app.app).await;

    let me = request(
        &app.app,
        Method::GET,
        "/api/auth/me",
        None,
        &[auth_header(&token)],
    )
    .await;
    let (status, _, body) = response_json(me).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["role"], "student");
}

#[tokio::test]
async fn it_rejects_weak_password() {
    let app = spawn_test_app().await;

    let response = request(
        &app.app,
        Method::POST,
        "/api/auth/register",
        Some(serde_json::json!({
            "email": "weak@test.com",
            "username": "weakling",
            "password": "short",
        })),
        &[],
    )
    .await;

    let (status, _, body) = response_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "AUTH_WEAK_PASSWORD");
}

#[tokio::test]
async fn it_rejects_duplicate_email() {
    let app = spawn_test_app().await;

    let payload = serde_json::json!({
        "email": "dup@test.com",
        "username": "original",
        "password": "Passw0rd!",
    });

    let first = request(&app.app, Method::POST, "/api/auth/register", Some(payload.clone()), &[]).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = request(&app.app, Method::POST, "/api/auth/register", Some(payload), &[]).await;
    let (status, _, body) = response_json(second).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_json_error(&body, "AUTH_EMAIL_EXISTS");
}

#[tokio::test]
async fn it_rejects_wrong_password_on_login() {
    let app = spawn_test_app().await;

    let email = "login@test.com";
    let register = request(
        &app.app,
        Method::POST,
        "/api/auth/register",
        Some(serde_json::json!({
            "email": email,
            "username": "login-user",
            "password": "Passw0rd!",
        })),
        &[],
    )
    .await;
    assert_eq!(register.status(), StatusCode::CREATED);

    let login = request(
        &app.app,
        Method::POST,
        "/api/auth/login",
        Some(serde_json::json!({
            "email": email,
            "password": "WrongPass1",
        })),
        &[],
    )
    .await;
    let (status, _, body) = response_json(login).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_json_error(&body, "AUTH_UNAUTHORIZED");
}

#[tokio::test]
async fn it_invalidates_session_on_logout() {
    let app = spawn_test_app().await;
    let (token, _) = register_student(&app.app).await;

    let logout = request(
        &app.app,
        Method::POST,
        "/api/auth/logout",
        None,
        &[auth_header(&token)],
    )
    .await;
    assert_eq!(logout.status(), StatusCode::OK);

    let me = request(
        &app.app,
        Method::GET,
        "/api/auth/me",
        None,
        &[auth_header(&token)],
    )
    .await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn it_requires_auth_for_me() {
    let app = spawn_test_app().await;

    let me = request(&app.app, Method::GET, "/api/auth/me", None, &[]).await;
    let (status, _, body) = response_json(me).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_json_error(&body, "AUTH_UNAUTHORIZED");
}

#[tokio::test]
async fn it_updates_profile_fields() {
    let app = spawn_test_app().await;
    let (token, _) = register_student(&app.app).await;

    let update = request(
        &app.app,
        Method::PUT,
        "/api/users/me",
        Some(serde_json::json!({
            "username": "new-name",
            "fullName": "New Name",
        })),
        &[auth_header(&token)],
    )
    .await;
    let (status, _, body) = response_json(update).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["username"], "new-name");
    assert_eq!(body["data"]["fullName"], "New Name");
}
