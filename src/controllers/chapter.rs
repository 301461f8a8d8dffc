use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_aux::field_attributes::deserialize_option_number_from_string;

use crate::{
    error::Error,
    model::{NewUnit, Unit, UnitPatch, UnitSummary, User},
    services::units::{self, DEFAULT_RECENT_LIMIT},
    state::SharedAppState,
};

#[derive(serde::Deserialize, Debug)]
pub struct RecentQuery {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    limit: Option<i64>,
}

#[tracing::instrument(name = "[POST] chapter", skip_all, fields(user_id = user.id))]
pub async fn store(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<NewUnit>,
) -> Result<(StatusCode, Json<Unit>), Error> {
    let unit = units::create_unit(app_state.store.as_ref(), &user, request).await?;

    Ok((StatusCode::CREATED, Json(unit)))
}

#[tracing::instrument(name = "[GET] chapter/{id}", skip(app_state))]
pub async fn show(
    State(app_state): State<SharedAppState>,
    Path(id): Path<i64>,
) -> Result<Json<Unit>, Error> {
    let unit = units::get_unit(app_state.store.as_ref(), id).await?;

    Ok(Json(unit))
}

#[tracing::instrument(name = "[PUT] chapter/{id}", skip(app_state, user, request), fields(user_id = user.id))]
pub async fn update(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(id): Path<i64>,
    Json(request): Json<UnitPatch>,
) -> Result<Json<Unit>, Error> {
    let unit = units::update_unit(app_state.store.as_ref(), &user, id, request).await?;

    Ok(Json(unit))
}

#[tracing::instrument(name = "[DELETE] chapter/{id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn destroy(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    units::delete_unit(app_state.store.as_ref(), &user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(name = "[GET] chapter/manga/{id}", skip(app_state))]
pub async fn by_manga(
    State(app_state): State<SharedAppState>,
    Path(manga_id): Path<i64>,
) -> Result<Json<Vec<UnitSummary>>, Error> {
    let result = units::list_units(app_state.store.as_ref(), manga_id).await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[GET] chapter/manga/{id}/chapter/{number}", skip(app_state))]
pub async fn by_number(
    State(app_state): State<SharedAppState>,
    Path((manga_id, chapter_number)): Path<(i64, i32)>,
) -> Result<Json<Unit>, Error> {
    let unit = units::get_unit_by_number(app_state.store.as_ref(), manga_id, chapter_number).await?;

    Ok(Json(unit))
}

#[tracing::instrument(name = "[GET] chapter/recent", skip(app_state))]
pub async fn recent(
    State(app_state): State<SharedAppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<UnitSummary>>, Error> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let result = units::list_recent_units(app_state.store.as_ref(), limit).await?;

    Ok(Json(result))
}
