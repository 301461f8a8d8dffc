use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    error::Error,
    model::{Comment, Favorite, Rating, User},
    services::{comments, favorites, ratings},
    state::SharedAppState,
};

#[derive(serde::Deserialize)]
pub struct CommentRequest {
    pub chapter_id: i64,
    pub content: String,
}

#[derive(serde::Deserialize)]
pub struct CommentEdit {
    pub content: String,
}

#[derive(serde::Deserialize)]
pub struct RatingRequest {
    pub manga_id: i64,
    pub score: i16,
}

#[derive(serde::Deserialize)]
pub struct FavoriteRequest {
    pub manga_id: i64,
}

#[derive(serde::Deserialize)]
pub struct ReadProgressRequest {
    pub manga_id: i64,
    pub chapter_number: i32,
}

#[derive(serde::Serialize)]
pub struct FavoriteCount {
    pub manga_id: i64,
    pub count: i64,
}

#[tracing::instrument(name = "[POST] interaction/comment", skip_all, fields(user_id = user.id))]
pub async fn store_comment(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), Error> {
    let comment = comments::create_comment(
        app_state.store.as_ref(),
        &user,
        request.chapter_id,
        request.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[tracing::instrument(name = "[PUT] interaction/comment/{id}", skip(app_state, user, request), fields(user_id = user.id))]
pub async fn update_comment(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(id): Path<i64>,
    Json(request): Json<CommentEdit>,
) -> Result<Json<Comment>, Error> {
    let comment =
        comments::update_comment(app_state.store.as_ref(), &user, id, request.content).await?;

    Ok(Json(comment))
}

#[tracing::instrument(name = "[DELETE] interaction/comment/{id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn destroy_comment(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    comments::delete_comment(app_state.store.as_ref(), &user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(name = "[GET] interaction/comment/chapter/{id}", skip(app_state))]
pub async fn chapter_comments(
    State(app_state): State<SharedAppState>,
    Path(chapter_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, Error> {
    let result = comments::list_comments_by_unit(app_state.store.as_ref(), chapter_id).await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[GET] interaction/comment/mine", skip_all, fields(user_id = user.id))]
pub async fn my_comments(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<Vec<Comment>>, Error> {
    let result = comments::list_comments_by_user(app_state.store.as_ref(), user.id).await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[POST] interaction/rating", skip_all, fields(user_id = user.id))]
pub async fn store_rating(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<RatingRequest>,
) -> Result<Json<Rating>, Error> {
    let rating =
        ratings::rate_work(app_state.store.as_ref(), &user, request.manga_id, request.score)
            .await?;

    Ok(Json(rating))
}

#[tracing::instrument(name = "[GET] interaction/rating/{manga_id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn show_rating(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(manga_id): Path<i64>,
) -> Result<Json<Option<Rating>>, Error> {
    let rating = ratings::get_user_rating(app_state.store.as_ref(), &user, manga_id).await?;

    Ok(Json(rating))
}

#[tracing::instrument(name = "[DELETE] interaction/rating/{manga_id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn destroy_rating(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(manga_id): Path<i64>,
) -> Result<StatusCode, Error> {
    ratings::delete_rating(app_state.store.as_ref(), &user, manga_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(name = "[POST] interaction/favorite", skip_all, fields(user_id = user.id))]
pub async fn store_favorite(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<Favorite>, Error> {
    let favorite =
        favorites::add_favorite(app_state.store.as_ref(), &user, request.manga_id).await?;

    Ok(Json(favorite))
}

#[tracing::instrument(name = "[GET] interaction/favorites", skip_all, fields(user_id = user.id))]
pub async fn list_favorites(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
) -> Result<Json<Vec<Favorite>>, Error> {
    let result = favorites::list_favorites(app_state.store.as_ref(), &user).await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[GET] interaction/favorite/{manga_id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn show_favorite(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(manga_id): Path<i64>,
) -> Result<Json<Option<Favorite>>, Error> {
    let favorite = favorites::favorite_status(app_state.store.as_ref(), &user, manga_id).await?;

    Ok(Json(favorite))
}

#[tracing::instrument(name = "[DELETE] interaction/favorite/{manga_id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn destroy_favorite(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(manga_id): Path<i64>,
) -> Result<StatusCode, Error> {
    favorites::remove_favorite(app_state.store.as_ref(), &user, manga_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(name = "[GET] interaction/favorite/count/{manga_id}", skip(app_state))]
pub async fn favorite_count(
    State(app_state): State<SharedAppState>,
    Path(manga_id): Path<i64>,
) -> Result<Json<FavoriteCount>, Error> {
    let count = favorites::favorite_count(app_state.store.as_ref(), manga_id).await?;

    Ok(Json(FavoriteCount { manga_id, count }))
}

#[tracing::instrument(name = "[POST] interaction/read-progress", skip_all, fields(user_id = user.id))]
pub async fn read_progress(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<ReadProgressRequest>,
) -> Result<Json<Favorite>, Error> {
    let favorite = favorites::update_read_progress(
        app_state.store.as_ref(),
        &user,
        request.manga_id,
        request.chapter_number,
    )
    .await?;

    Ok(Json(favorite))
}
