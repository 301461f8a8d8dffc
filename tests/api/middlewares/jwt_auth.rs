use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use mangashelf::{auth::issue_token, model::Role};

use crate::{AppStateTest, empty_request};

async fn status_with_header(value: Option<&str>) -> StatusCode {
    let test_state = AppStateTest::new(true);

    let mut builder = Request::builder().uri("/me");
    if let Some(value) = value {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let request = builder.body(Body::empty()).unwrap();

    test_state.generate_response(request).await.status()
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    assert_eq!(status_with_header(None).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_headers_are_unauthorized() {
    for value in [
        "random-string",
        "not-bearer random-string",
        "bearer random-string",
    ] {
        assert_eq!(
            status_with_header(Some(value)).await,
            StatusCode::UNAUTHORIZED
        );
    }
}

#[tokio::test]
async fn token_of_unknown_user_is_unauthorized() {
    let test_state = AppStateTest::new(true);
    let token = issue_token("ghost", 4242, Role::Admin, &test_state.app_state.config.jwt).unwrap();

    let response = test_state
        .generate_response(empty_request(Method::GET, "/me", Some(&token)))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_reads_reject_invalid_tokens_but_allow_anonymous() {
    let test_state = AppStateTest::new(true);

    let anonymous = test_state
        .generate_response(empty_request(Method::GET, "/manga/popular", None))
        .await;
    assert_eq!(anonymous.status(), StatusCode::OK);

    let invalid = test_state
        .generate_response(empty_request(
            Method::GET,
            "/manga/popular",
            Some("not-a-jwt"),
        ))
        .await;
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
}
