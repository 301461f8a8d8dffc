use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    error::Error,
    model::{ProfilePatch, User},
    services::accounts::{self, PasswordChange},
    state::SharedAppState,
};

#[tracing::instrument(name = "[GET] me", skip_all)]
pub async fn index(Extension(user): Extension<Arc<User>>) -> Result<Json<Arc<User>>, Error> {
    Ok(Json(user))
}

#[tracing::instrument(name = "[PUT] me", skip_all, fields(user_id = user.id))]
pub async fn update(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<ProfilePatch>,
) -> Result<Json<User>, Error> {
    let user = accounts::update_profile(app_state.store.as_ref(), &user, request).await?;

    Ok(Json(user))
}

#[tracing::instrument(name = "[PUT] me/password", skip_all, fields(user_id = user.id))]
pub async fn password(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<PasswordChange>,
) -> Result<StatusCode, Error> {
    accounts::change_password(app_state.store.as_ref(), &user, request).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(serde::Deserialize)]
pub struct DeviceRequest {
    pub device_token: String,
}

#[tracing::instrument(name = "[PUT] me/device", skip_all, fields(user_id = user.id))]
pub async fn device(
    State(app_state): State<SharedAppState>,
    Extension(user): Extension<Arc<User>>,
    Json(request): Json<DeviceRequest>,
) -> Result<StatusCode, Error> {
    accounts::register_device(
        app_state.store.as_ref(),
        app_state.notifier.as_ref(),
        &user,
        request.device_token,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
