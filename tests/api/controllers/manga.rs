use axum::http::{Method, StatusCode};
use fake::{Fake, faker::lorem::en::Sentence};
use mangashelf::model::{Role, Work, WorkView};
use serde_json::json;

use crate::{AppStateTest, empty_request, json_request, response_json};

async fn create_manga(test_state: &AppStateTest, token: &str, title: &str, genres: &[&str]) -> i64 {
    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/manga",
            Some(token),
            json!({
                "title": title,
                "description": Sentence(3..8).fake::<String>(),
                "genres": genres,
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let work: serde_json::Value = response_json(response).await;
    work["id"].as_i64().unwrap()
}

#[tokio::test]
async fn readers_cannot_create_manga() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Reader).await;

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/manga",
            Some(&token),
            json!({ "title": "Not mine to publish" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn show_counts_views_and_reports_favorites() {
    let test_state = AppStateTest::new(true);
    let (_, creator_token) = test_state.create_user(Role::Creator).await;
    let (_, reader_token) = test_state.create_user(Role::Reader).await;
    let id = create_manga(&test_state, &creator_token, "Viewed", &["Action"]).await;

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/interaction/favorite",
            Some(&reader_token),
            json!({ "manga_id": id }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/manga/{}", id);
    let first: WorkView = response_json(
        test_state
            .generate_response(empty_request(Method::GET, &uri, None))
            .await,
    )
    .await;
    let second: WorkView = response_json(
        test_state
            .generate_response(empty_request(Method::GET, &uri, Some(&reader_token)))
            .await,
    )
    .await;

    assert_eq!(first.work.view_count, 0);
    assert!(!first.in_user_favorites);
    assert_eq!(second.work.view_count, 1);
    assert!(second.in_user_favorites);
    assert_eq!(second.chapter_count, 0);
}

#[tokio::test]
async fn only_owner_or_admin_can_update() {
    let test_state = AppStateTest::new(true);
    let (owner, owner_token) = test_state.create_user(Role::Creator).await;
    let (_, other_token) = test_state.create_user(Role::Creator).await;
    let (_, reader_token) = test_state.create_user(Role::Reader).await;
    let (_, moderator_token) = test_state.create_user(Role::Moderator).await;
    let (_, admin_token) = test_state.create_user(Role::Admin).await;
    let id = create_manga(&test_state, &owner_token, "Owned", &[]).await;
    let uri = format!("/manga/{}", id);
    let before = test_state.backdate_manga(id).await;

    for token in [&reader_token, &other_token, &moderator_token] {
        let response = test_state
            .generate_response(json_request(
                Method::PUT,
                &uri,
                Some(token),
                json!({ "title": "Taken over" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let unchanged: WorkView = response_json(
        test_state
            .generate_response(empty_request(Method::GET, &uri, None))
            .await,
    )
    .await;
    assert_eq!(unchanged.work.title, "Owned");
    assert_eq!(unchanged.work.updated_at, before);

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            &uri,
            Some(&admin_token),
            json!({ "completed": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let work: Work = response_json(response).await;
    assert_eq!(work.title, "Owned");
    assert!(work.completed);
    assert_eq!(work.creator_id, owner.id);
    assert!(work.updated_at > before);
}

#[tokio::test]
async fn delete_removes_the_manga() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;
    let id = create_manga(&test_state, &token, "Short lived", &[]).await;
    let uri = format!("/manga/{}", id);

    let response = test_state
        .generate_response(empty_request(Method::DELETE, &uri, Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = test_state
        .generate_response(empty_request(Method::GET, &uri, None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalogue_listings_filter_and_paginate() {
    let test_state = AppStateTest::new(true);
    let (creator, token) = test_state.create_user(Role::Creator).await;
    create_manga(&test_state, &token, "Blade Runner", &["Action", "SciFi"]).await;
    create_manga(&test_state, &token, "Quiet Garden", &["Slice of Life"]).await;
    create_manga(&test_state, &token, "Blade Dance", &["Action"]).await;

    let cases = [
        ("/manga/genre/action".to_string(), 2),
        ("/manga/search?query=blade".to_string(), 2),
        ("/manga/search?query=garden&page=0&size=10".to_string(), 1),
        (format!("/manga/creator/{}", creator.id), 3),
        (format!("/manga/creator/{}?page=1&size=2", creator.id), 1),
        ("/manga/popular?size=1".to_string(), 1),
        ("/manga/highest-rated".to_string(), 0),
    ];

    for (uri, expected) in cases {
        let response = test_state
            .generate_response(empty_request(Method::GET, &uri, None))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);

        let works: Vec<WorkView> = response_json(response).await;
        assert_eq!(works.len(), expected, "{}", uri);
    }
}

#[tokio::test]
async fn invalid_page_size_is_rejected() {
    let test_state = AppStateTest::new(true);

    let response = test_state
        .generate_response(empty_request(Method::GET, "/manga/popular?size=0", None))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_page_is_rejected() {
    let test_state = AppStateTest::new(true);

    let response = test_state
        .generate_response(empty_request(
            Method::GET,
            "/manga/popular?page=9223372036854775807&size=10",
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
