use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{
    auth::{decode_jwt, error::AuthError},
    error::Error,
    model::User,
    services::accounts::resolve_actor,
    state::SharedAppState,
};

/// Extracts the bearer token from the `Authorization` header. `Ok(None)`
/// means the header is absent.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, Error> {
    let auth_header = match headers.get(axum::http::header::AUTHORIZATION) {
        Some(header) => header.to_str().map_err(|e| Error::Other(e.into()))?,
        None => return Ok(None),
    };

    let mut header = auth_header.split_whitespace();
    let (bearer_option, token_option) = (header.next(), header.next());

    let bearer = match bearer_option {
        Some(value) => value.to_lowercase(),
        None => {
            return Err(Error::Auth(AuthError::Unauthenticated));
        }
    };

    if bearer != *"bearer" {
        return Err(Error::Auth(AuthError::Unauthenticated));
    }

    match token_option {
        Some(value) => Ok(Some(value)),
        None => Err(Error::Auth(AuthError::Unauthenticated)),
    }
}

async fn authenticate(app_state: &SharedAppState, token: &str) -> Result<Arc<User>, Error> {
    let token_data = decode_jwt(token, &app_state.config.jwt)
        .map_err(|_| Error::Auth(AuthError::Unauthenticated))?;

    let user = resolve_actor(app_state.store.as_ref(), token_data.claims.user_id).await?;

    Ok(Arc::new(user))
}

#[tracing::instrument(name = "[MIDDLEWARE] jwt auth", skip_all)]
pub async fn jwt_auth_middleware(
    State(app_state): State<SharedAppState>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, Error> {
    let token = bearer_token(req.headers())?
        .ok_or(Error::Auth(AuthError::Unauthenticated))?
        .to_string();

    let user = authenticate(&app_state, &token).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Like [`jwt_auth_middleware`], but lets anonymous requests through. The
/// handler receives `Option<Arc<User>>`. A header that is present must still
/// carry a valid token.
#[tracing::instrument(name = "[MIDDLEWARE] optional jwt auth", skip_all)]
pub async fn optional_jwt_auth_middleware(
    State(app_state): State<SharedAppState>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, Error> {
    let user = match bearer_token(req.headers())?.map(str::to_string) {
        Some(token) => Some(authenticate(&app_state, &token).await?),
        None => None,
    };
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
