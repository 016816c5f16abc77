use axum::http::Method;
use axum::Router;
use chrono::Utc;

use academy_backend::auth::hash_password;
use academy_backend::state::AppState;
use academy_backend::store::operations::users::{Role, User};

use super::http::{request, response_json};

/// Register a fresh student via the API and return (access_token, user_id).
pub async fn register_student(app: &Router) -> (String, String) {
    let email = format!("student-{}@test.com", uuid::Uuid::new_v4());
    let username = format!("student-{}", uuid::Uuid::new_v4().simple());

    let response = request(
        app,
        Method::POST,
        "/api/auth/register",
        Some(serde_json::json!({
            "email": email,
            "username": username,
            "password": "Passw0rd!",
        })),
        &[],
    )
    .await;

    let (status, _, body) = response_json(response).await;
    assert!(status.is_success(), "register failed: {body}");

    let token = body["data"]["accessToken"]
        .as_str()
        .expect("access token in register response")
        .to_string();
    let user_id = body["data"]["user"]["id"]
        .as_str()
        .expect("user id in register response")
        .to_string();
    (token, user_id)
}

/// Seed an instructor straight into the store (public registration only
/// creates students), then log in through the API.
pub async fn seed_instructor_and_login(app: &Router, state: &AppState) -> (String, String) {
    let email = format!("coach-{}@test.com", uuid::Uuid::new_v4());
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    state
        .store()
        .create_user(&User {
            id: user_id.clone(),
            email: email.clone(),
            username: format!("coach-{}", uuid::Uuid::new_v4().simple()),
            full_name: Some("Vocal Coach".to_string()),
            role: Role::Instructor,
            password_hash: hash_password("Passw0rd!").expect("hash password"),
            created_at: now,
            updated_at: now,
        })
        .expect("seed instructor");

    let response = request(
        app,
        Method::POST,
        "/api/auth/login",
        Some(serde_json::json!({
            "email": email,
            "password": "Passw0rd!",
        })),
        &[],
    )
    .await;

    let (status, _, body) = response_json(response).await;
    assert!(status.is_success(), "instructor login failed: {body}");

    let token = body["data"]["accessToken"]
        .as_str()
        .expect("access token in login response")
        .to_string();
    (token, user_id)
}
