use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
};

use crate::{
    error::Error,
    media::{self, CHAPTER_PAGE_FOLDER, MANGA_COVER_FOLDER, PROFILE_IMAGE_FOLDER},
    model::{UploadedImage, User},
    policy::{can_publish, ensure},
    state::SharedAppState,
};

#[derive(serde::Deserialize, Debug)]
pub struct FolderQuery {
    folder: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
pub struct ChapterPageQuery {
    manga_id: i64,
    chapter_number: i32,
}

#[derive(serde::Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

async fn upload(
    app_state: &SharedAppState,
    user: &User,
    body: &[u8],
    folder: &str,
) -> Result<Json<UploadedImage>, Error> {
    let image = media::upload_image(
        app_state.media.as_ref(),
        app_state.notifier.as_ref(),
        user,
        body,
        folder,
    )
    .await?;

    Ok(Json(image))
}

#[tracing::instrument(name = "[POST] images/upload", skip(app_state, user, body), fields(user_id = user.id))]
pub async fn store(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Query(query): Query<FolderQuery>,
    body: Bytes,
) -> Result<Json<UploadedImage>, Error> {
    ensure(can_publish(&user), "upload images")?;

    let folder = query.folder.as_deref().unwrap_or(MANGA_COVER_FOLDER);
    upload(&app_state, &user, &body, folder).await
}

#[tracing::instrument(name = "[POST] images/upload/manga-cover", skip_all, fields(user_id = user.id))]
pub async fn manga_cover(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    body: Bytes,
) -> Result<Json<UploadedImage>, Error> {
    ensure(can_publish(&user), "upload manga covers")?;

    upload(&app_state, &user, &body, MANGA_COVER_FOLDER).await
}

#[tracing::instrument(name = "[POST] images/upload/chapter-page", skip(app_state, user, body), fields(user_id = user.id))]
pub async fn chapter_page(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Query(query): Query<ChapterPageQuery>,
    body: Bytes,
) -> Result<Json<UploadedImage>, Error> {
    ensure(can_publish(&user), "upload chapter pages")?;

    let folder = format!(
        "{}/manga_{}/chapter_{}",
        CHAPTER_PAGE_FOLDER, query.manga_id, query.chapter_number
    );
    upload(&app_state, &user, &body, &folder).await
}

#[tracing::instrument(name = "[POST] images/upload/profile-image", skip_all, fields(user_id = user.id))]
pub async fn profile_image(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    body: Bytes,
) -> Result<Json<UploadedImage>, Error> {
    upload(&app_state, &user, &body, PROFILE_IMAGE_FOLDER).await
}

#[tracing::instrument(name = "[DELETE] images/{public_id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn destroy(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(public_id): Path<String>,
) -> Result<Json<Deleted>, Error> {
    ensure(can_publish(&user), "delete images")?;

    let deleted = app_state.media.delete(&public_id).await?;

    Ok(Json(Deleted { deleted }))
}
