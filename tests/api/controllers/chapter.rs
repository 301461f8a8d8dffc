use axum::http::{Method, StatusCode};
use mangashelf::model::{Role, Unit, UnitSummary};
use serde_json::json;

use crate::{AppStateTest, empty_request, json_request, response_json};

async fn create_manga(test_state: &AppStateTest, token: &str) -> i64 {
    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/manga",
            Some(token),
            json!({ "title": "Chaptered" }),
        ))
        .await;
    let work: serde_json::Value = response_json(response).await;
    work["id"].as_i64().unwrap()
}

fn chapter(manga_id: i64, number: i32, draft: bool) -> serde_json::Value {
    json!({
        "work_id": manga_id,
        "title": format!("Chapter {}", number),
        "chapter_number": number,
        "pages": ["1.png", "2.png"],
        "draft": draft,
    })
}

#[tokio::test]
async fn duplicate_chapter_number_is_a_conflict() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;
    let first = create_manga(&test_state, &token).await;
    let second = create_manga(&test_state, &token).await;

    let cases = [
        (chapter(first, 1, false), StatusCode::CREATED),
        (chapter(first, 1, false), StatusCode::CONFLICT),
        (chapter(second, 1, false), StatusCode::CREATED),
    ];
    for (body, expected) in cases {
        let response = test_state
            .generate_response(json_request(Method::POST, "/chapter", Some(&token), body))
            .await;
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn chapters_require_ownership_of_the_manga() {
    let test_state = AppStateTest::new(true);
    let (_, owner_token) = test_state.create_user(Role::Creator).await;
    let (_, other_token) = test_state.create_user(Role::Creator).await;
    let manga_id = create_manga(&test_state, &owner_token).await;

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/chapter",
            Some(&other_token),
            chapter(manga_id, 1, false),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/chapter",
            Some(&owner_token),
            chapter(9999, 1, false),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chapters_are_listed_by_number_and_readable_by_number() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;
    let manga_id = create_manga(&test_state, &token).await;

    for number in [2, 1, 3] {
        test_state
            .generate_response(json_request(
                Method::POST,
                "/chapter",
                Some(&token),
                chapter(manga_id, number, false),
            ))
            .await;
    }

    let response = test_state
        .generate_response(empty_request(
            Method::GET,
            &format!("/chapter/manga/{}", manga_id),
            None,
        ))
        .await;
    let units: Vec<UnitSummary> = response_json(response).await;
    let numbers: Vec<i32> = units.iter().map(|u| u.chapter_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let response = test_state
        .generate_response(empty_request(
            Method::GET,
            &format!("/chapter/manga/{}/chapter/2", manga_id),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let unit: Unit = response_json(response).await;
    assert_eq!(unit.title, "Chapter 2");
    assert_eq!(unit.pages, vec!["1.png".to_string(), "2.png".to_string()]);

    let response = test_state
        .generate_response(empty_request(Method::GET, "/chapter/manga/9999", None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recent_chapters_skip_drafts() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;
    let manga_id = create_manga(&test_state, &token).await;

    for (number, draft) in [(1, false), (2, true), (3, false)] {
        test_state
            .generate_response(json_request(
                Method::POST,
                "/chapter",
                Some(&token),
                chapter(manga_id, number, draft),
            ))
            .await;
    }

    let response = test_state
        .generate_response(empty_request(Method::GET, "/chapter/recent?limit=5", None))
        .await;
    let units: Vec<UnitSummary> = response_json(response).await;

    assert_eq!(units.len(), 2);
    assert!(units.iter().all(|u| u.chapter_number != 2));
}

#[tokio::test]
async fn owner_can_edit_and_delete_chapters() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;
    let (_, reader_token) = test_state.create_user(Role::Reader).await;
    let manga_id = create_manga(&test_state, &token).await;

    let response = test_state
        .generate_response(json_request(
            Method::POST,
            "/chapter",
            Some(&token),
            chapter(manga_id, 1, true),
        ))
        .await;
    let unit: Unit = response_json(response).await;
    let uri = format!("/chapter/{}", unit.id);

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            &uri,
            Some(&reader_token),
            json!({ "draft": false }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = test_state
        .generate_response(json_request(
            Method::PUT,
            &uri,
            Some(&token),
            json!({ "draft": false, "title": "Pilot" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Unit = response_json(response).await;
    assert!(!updated.draft);
    assert_eq!(updated.title, "Pilot");
    assert_eq!(updated.chapter_number, 1);

    let response = test_state
        .generate_response(empty_request(Method::DELETE, &uri, Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = test_state
        .generate_response(empty_request(Method::GET, &uri, None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
