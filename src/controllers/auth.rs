use axum::{Json, extract::State, http::StatusCode};

use crate::{
    error::Error,
    model::User,
    services::accounts::{self, Credentials, Registration, Session},
    state::SharedAppState,
};

#[tracing::instrument(name = "[POST] auth/register", skip_all)]
pub async fn register(
    State(app_state): State<SharedAppState>,
    Json(request): Json<Registration>,
) -> Result<(StatusCode, Json<User>), Error> {
    let user = accounts::register(
        app_state.store.as_ref(),
        app_state.config.application.allow_registration,
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[tracing::instrument(name = "[POST] auth/login", skip_all)]
pub async fn login(
    State(app_state): State<SharedAppState>,
    Json(request): Json<Credentials>,
) -> Result<Json<Session>, Error> {
    let session = accounts::login(
        app_state.store.as_ref(),
        app_state.notifier.as_ref(),
        &app_state.config.jwt,
        request,
    )
    .await?;

    Ok(Json(session))
}
