use axum::http::{Method, StatusCode};

use crate::{AppStateTest, empty_request, response_json};

#[tokio::test]
async fn index_reports_ok() {
    let test_state = AppStateTest::new(true);

    let response = test_state
        .generate_response(empty_request(Method::GET, "/", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body: serde_json::Value = response_json(response).await;
    assert_eq!(body["status"], "ok");
}
