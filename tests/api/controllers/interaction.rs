use axum::http::{Method, StatusCode};
use mangashelf::model::{Comment, Favorite, Role, WorkView};
use serde_json::json;

use crate::{AppStateTest, empty_request, json_request, response_json};

async fn create_manga_with_chapter(test_state: &AppStateTest, token: &str) -> (i64, i64) {
    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/manga",
            Some(token),
            json!({ "title": "Interactive" }),
        ))
        .await;
    let work: serde_json::Value = response_json(response).await;
    let manga_id = work["id"].as_i64().unwrap();

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/chapter",
            Some(token),
            json!({
                "work_id": manga_id,
                "title": "Chapter 1",
                "chapter_number": 1,
                "pages": ["1.png"],
            }),
        ))
        .await;
    let unit: serde_json::Value = response_json(response).await;

    (manga_id, unit["id"].as_i64().unwrap())
}

async fn rate(test_state: &AppStateTest, token: &str, manga_id: i64, score: i64) -> StatusCode {
    test_state
        .generate_response(json_request(
            Method::POST,
            "/interaction/rating",
            Some(token),
            json!({ "manga_id": manga_id, "score": score }),
        ))
        .await
        .status()
}

async fn aggregate(test_state: &AppStateTest, manga_id: i64) -> (f64, i64) {
    let response = test_state
        .generate_response(empty_request(
            Method::GET,
            &format!("/manga/{}", manga_id),
            None,
        ))
        .await;
    let view: WorkView = response_json(response).await;

    (view.work.average_rating, view.work.rating_count)
}

#[tokio::test]
async fn rating_aggregate_tracks_every_change() {
    let test_state = AppStateTest::new(true);
    let (_, creator_token) = test_state.create_user(Role::Creator).await;
    let (_, b_token) = test_state.create_user(Role::Reader).await;
    let (_, c_token) = test_state.create_user(Role::Reader).await;
    let (manga_id, _) = create_manga_with_chapter(&test_state, &creator_token).await;

    assert_eq!(rate(&test_state, &b_token, manga_id, 4).await, StatusCode::OK);
    assert_eq!(aggregate(&test_state, manga_id).await, (4.0, 1));

    assert_eq!(rate(&test_state, &c_token, manga_id, 2).await, StatusCode::OK);
    assert_eq!(aggregate(&test_state, manga_id).await, (3.0, 2));

    assert_eq!(rate(&test_state, &b_token, manga_id, 5).await, StatusCode::OK);
    assert_eq!(aggregate(&test_state, manga_id).await, (3.5, 2));

    let response = test_state
        .generate_response(empty_request(
            Method::DELETE,
            &format!("/interaction/rating/{}", manga_id),
            Some(&c_token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(aggregate(&test_state, manga_id).await, (5.0, 1));

    let response = test_state
        .generate_response(empty_request(
            Method::GET,
            &format!("/interaction/rating/{}", manga_id),
            Some(&b_token),
        ))
        .await;
    let own: serde_json::Value = response_json(response).await;
    assert_eq!(own["score"], 5);
}

#[tokio::test]
async fn out_of_range_score_is_rejected() {
    let test_state = AppStateTest::new(true);
    let (_, creator_token) = test_state.create_user(Role::Creator).await;
    let (_, reader_token) = test_state.create_user(Role::Reader).await;
    let (manga_id, _) = create_manga_with_chapter(&test_state, &creator_token).await;

    for score in [0, 6] {
        assert_eq!(
            rate(&test_state, &reader_token, manga_id, score).await,
            StatusCode::BAD_REQUEST
        );
    }
    assert_eq!(aggregate(&test_state, manga_id).await, (0.0, 0));

    let response = test_state
        .generate_response(empty_request(
            Method::DELETE,
            &format!("/interaction/rating/{}", manga_id),
            Some(&reader_token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_moderation() {
    let test_state = AppStateTest::new(true);
    let (_, creator_token) = test_state.create_user(Role::Creator).await;
    let (author, author_token) = test_state.create_user(Role::Reader).await;
    let (_, stranger_token) = test_state.create_user(Role::Reader).await;
    let (_, moderator_token) = test_state.create_user(Role::Moderator).await;
    let (_, chapter_id) = create_manga_with_chapter(&test_state, &creator_token).await;

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/interaction/comment",
            Some(&author_token),
            json!({ "chapter_id": chapter_id, "content": "Great chapter" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment: Comment = response_json(response).await;
    assert_eq!(comment.user_id, author.id);
    let uri = format!("/interaction/comment/{}", comment.id);

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            &uri,
            Some(&stranger_token),
            json!({ "content": "Rewritten" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            &uri,
            Some(&author_token),
            json!({ "content": "Great chapter!" }),
        ))
        .await;
    let edited: Comment = response_json(response).await;
    assert!(edited.edited);

    let response = test_state
        .generate_response(empty_request(Method::GET, "/interaction/comment/mine", Some(&author_token)))
        .await;
    let mine: Vec<Comment> = response_json(response).await;
    assert_eq!(mine.len(), 1);

    let response = test_state
        .generate_response(empty_request(Method::DELETE, &uri, Some(&moderator_token)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = test_state
        .generate_response(empty_request(
            Method::GET,
            &format!("/interaction/comment/chapter/{}", chapter_id),
            None,
        ))
        .await;
    let comments: Vec<Comment> = response_json(response).await;
    assert!(comments.is_empty());
}

#[tokio::test]
async fn favorites_and_read_progress() {
    let test_state = AppStateTest::new(true);
    let (_, creator_token) = test_state.create_user(Role::Creator).await;
    let (_, reader_token) = test_state.create_user(Role::Reader).await;
    let (manga_id, _) = create_manga_with_chapter(&test_state, &creator_token).await;

    for _ in 0..2 {
        let response = test_state
            .generate_response(json_request(
                Method::POST,
                "/interaction/favorite",
                Some(&reader_token),
                json!({ "manga_id": manga_id }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = test_state
        .generate_response(empty_request(
            Method::GET,
            &format!("/interaction/favorite/count/{}", manga_id),
            None,
        ))
        .await;
    let count: serde_json::Value = response_json(response).await;
    assert_eq!(count["count"], 1);

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/interaction/read-progress",
            Some(&reader_token),
            json!({ "manga_id": manga_id, "chapter_number": 1 }),
        ))
        .await;
    let favorite: Favorite = response_json(response).await;
    assert_eq!(favorite.last_read_chapter, 1);

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/interaction/read-progress",
            Some(&reader_token),
            json!({ "manga_id": manga_id, "chapter_number": 7 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = test_state
        .generate_response(empty_request(Method::GET, "/interaction/favorites", Some(&reader_token)))
        .await;
    let favorites: Vec<Favorite> = response_json(response).await;
    assert_eq!(favorites.len(), 1);

    let uri = format!("/interaction/favorite/{}", manga_id);
    let response = test_state
        .generate_response(empty_request(Method::DELETE, &uri, Some(&reader_token)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = test_state
        .generate_response(empty_request(Method::GET, &uri, Some(&reader_token)))
        .await;
    let status: Option<Favorite> = response_json(response).await;
    assert!(status.is_none());

    let response = test_state
        .generate_response(empty_request(Method::DELETE, &uri, Some(&reader_token)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
