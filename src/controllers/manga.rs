use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use validator::Validate;

use crate::{
    error::Error,
    model::{MAX_PAGE, NewWork, Page, User, Work, WorkPatch, WorkQuery, WorkView},
    services::works,
    state::SharedAppState,
};

#[derive(serde::Deserialize, serde::Serialize, Debug, Validate)]
pub struct Pagination {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    #[validate(range(min = 0, max = MAX_PAGE))]
    page: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    #[validate(range(min = 1, max = 100))]
    size: Option<i64>,
}

impl Pagination {
    fn to_page(&self) -> Page {
        let default = Page::default();
        Page {
            page: self.page.unwrap_or(default.page),
            size: self.size.unwrap_or(default.size),
        }
    }
}

#[derive(serde::Deserialize, Debug)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
}

type Viewer = Extension<Option<Arc<User>>>;

async fn list(
    app_state: &SharedAppState,
    query: WorkQuery,
    pagination: Pagination,
    viewer: Option<Arc<User>>,
) -> Result<Json<Vec<WorkView>>, Error> {
    pagination.validate().map_err(Error::Validation)?;

    let result = works::list_works(
        app_state.store.as_ref(),
        &query,
        pagination.to_page(),
        viewer.as_deref(),
    )
    .await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[POST] manga", skip_all, fields(user_id = user.id))]
pub async fn store(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<NewWork>,
) -> Result<(StatusCode, Json<Work>), Error> {
    let work = works::create_work(app_state.store.as_ref(), &user, request).await?;

    Ok((StatusCode::CREATED, Json(work)))
}

#[tracing::instrument(name = "[GET] manga/{id}", skip(app_state, viewer))]
pub async fn show(
    State(app_state): State<SharedAppState>,
    Extension(viewer): Viewer,
    Path(id): Path<i64>,
) -> Result<Json<WorkView>, Error> {
    let result = works::get_work(app_state.store.as_ref(), id, viewer.as_deref()).await?;

    Ok(Json(result))
}

#[tracing::instrument(name = "[PUT] manga/{id}", skip(app_state, user, request), fields(user_id = user.id))]
pub async fn update(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(id): Path<i64>,
    Json(request): Json<WorkPatch>,
) -> Result<Json<Work>, Error> {
    let work = works::update_work(app_state.store.as_ref(), &user, id, request).await?;

    Ok(Json(work))
}

#[tracing::instrument(name = "[DELETE] manga/{id}", skip(app_state, user), fields(user_id = user.id))]
pub async fn destroy(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    works::delete_work(app_state.store.as_ref(), &user, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(name = "[GET] manga/creator/{id}", skip(app_state, viewer))]
pub async fn by_creator(
    State(app_state): State<SharedAppState>,
    Extension(viewer): Viewer,
    Path(creator_id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<WorkView>>, Error> {
    list(&app_state, WorkQuery::Creator(creator_id), pagination, viewer).await
}

#[tracing::instrument(name = "[GET] manga/genre/{genre}", skip(app_state, viewer))]
pub async fn by_genre(
    State(app_state): State<SharedAppState>,
    Extension(viewer): Viewer,
    Path(genre): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<WorkView>>, Error> {
    list(&app_state, WorkQuery::Genre(genre), pagination, viewer).await
}

#[tracing::instrument(name = "[GET] manga/popular", skip(app_state, viewer))]
pub async fn popular(
    State(app_state): State<SharedAppState>,
    Extension(viewer): Viewer,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<WorkView>>, Error> {
    list(&app_state, WorkQuery::Popular, pagination, viewer).await
}

#[tracing::instrument(name = "[GET] manga/highest-rated", skip(app_state, viewer))]
pub async fn highest_rated(
    State(app_state): State<SharedAppState>,
    Extension(viewer): Viewer,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<WorkView>>, Error> {
    list(&app_state, WorkQuery::HighestRated, pagination, viewer).await
}

#[tracing::instrument(name = "[GET] manga/search", skip(app_state, viewer))]
pub async fn search(
    State(app_state): State<SharedAppState>,
    Extension(viewer): Viewer,
    Query(search): Query<SearchQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<WorkView>>, Error> {
    list(
        &app_state,
        WorkQuery::Search(search.query.trim().to_string()),
        pagination,
        viewer,
    )
    .await
}
