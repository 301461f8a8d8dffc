use axum::http::{Method, StatusCode};
use mangashelf::model::{Role, UploadedImage};

use crate::{AppStateTest, bytes_request, empty_request, png_bytes, response_json};

#[tokio::test]
async fn creator_uploads_and_deletes_a_cover() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;

    let response = test_state
        .generate_response(bytes_request(
            "/images/upload/manga-cover",
            &token,
            png_bytes(6, 9),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let image: UploadedImage = response_json(response).await;
    assert_eq!((image.width, image.height), (6, 9));
    assert_eq!(image.format, "png");
    assert!(image.public_id.starts_with("manga-covers/"));

    let uri = format!("/images/{}", image.public_id);
    let response = test_state
        .generate_response(empty_request(Method::DELETE, &uri, Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let deleted: serde_json::Value = response_json(response).await;
    assert_eq!(deleted["deleted"], true);
}

#[tokio::test]
async fn chapter_pages_are_grouped_per_chapter() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Creator).await;

    let response = test_state
        .generate_response(bytes_request(
            "/images/upload/chapter-page?manga_id=3&chapter_number=2",
            &token,
            png_bytes(2, 2),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let image: UploadedImage = response_json(response).await;
    assert!(image.public_id.starts_with("chapter-pages/manga_3/chapter_2/"));
}

#[tokio::test]
async fn readers_may_only_upload_profile_images() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Reader).await;

    let cases = [
        ("/images/upload?folder=manga-covers", StatusCode::FORBIDDEN),
        ("/images/upload/manga-cover", StatusCode::FORBIDDEN),
        ("/images/upload/profile-image", StatusCode::OK),
    ];
    for (uri, expected) in cases {
        let response = test_state
            .generate_response(bytes_request(uri, &token, png_bytes(1, 1)))
            .await;
        assert_eq!(response.status(), expected, "{}", uri);
    }
}

#[tokio::test]
async fn non_images_and_bad_folders_are_rejected() {
    let test_state = AppStateTest::new(true);
    let (_, token) = test_state.create_user(Role::Admin).await;

    let response = test_state
        .generate_response(bytes_request(
            "/images/upload/manga-cover",
            &token,
            b"definitely not a png".to_vec(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test_state
        .generate_response(bytes_request(
            "/images/upload?folder=..%2Fescape",
            &token,
            png_bytes(1, 1),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
