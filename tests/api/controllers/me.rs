use axum::http::{Method, StatusCode};
use mangashelf::{model::Role, notification::EventKind};
use serde_json::json;

use crate::{AppStateTest, bytes_request, empty_request, json_request, png_bytes, response_json};

#[tokio::test]
async fn profile_can_be_updated_but_not_the_role() {
    let test_state = AppStateTest::new(true);
    let (user, token) = test_state.create_user(Role::Reader).await;

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            "/me",
            Some(&token),
            json!({ "bio": "Reads a lot", "display_name": "Bookworm", "role": "ADMIN" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = test_state
        .generate_response(empty_request(Method::GET, "/me", Some(&token)))
        .await;
    let me: serde_json::Value = response_json(response).await;
    assert_eq!(me["id"], user.id);
    assert_eq!(me["bio"], "Reads a lot");
    assert_eq!(me["display_name"], "Bookworm");
    assert_eq!(me["role"], "READER");
}

#[tokio::test]
async fn invalid_profile_email_is_rejected() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Reader).await;

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            "/me",
            Some(&token),
            json!({ "email": "not-an-email" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn password_change_then_login() {
    let test_state = AppStateTest::new(true);
    test_state
        .generate_response(json_request(
            Method::POST,
            "/auth/register",
            None,
            json!({
                "username": "changer",
                "email": "changer@example.com",
                "password": "password",
                "role": "READER",
            }),
        ))
        .await;
    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": "changer", "password": "password" }),
        ))
        .await;
    let session: serde_json::Value = response_json(response).await;
    let token = session["token"].as_str().unwrap().to_string();

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            "/me/password",
            Some(&token),
            json!({ "current_password": "password", "new_password": "better-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": "changer", "password": "better-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn device_registration_subscribes_and_enables_upload_notifications() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            "/me/device",
            Some(&token),
            json!({ "device_token": "device-1" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let subscriptions = test_state.notifier.subscriptions.lock().unwrap().clone();
    assert_eq!(
        subscriptions,
        vec![("device-1".to_string(), "role-creator".to_string(), true)]
    );

    let response = test_state
        .generate_response(bytes_request(
            "/images/upload/manga-cover",
            &token,
            png_bytes(4, 4),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let events = test_state.notifier.events.lock().unwrap();
    let kinds: Vec<&EventKind> = events.iter().map(|e| &e.kind).collect();
    assert_eq!(
        kinds,
        vec![&EventKind::TopicSubscriptionChanged, &EventKind::UploadSuccess]
    );
}
