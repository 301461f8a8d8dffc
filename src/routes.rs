use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, Request, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    controllers::{auth, chapter, home, images, interaction, manga, me},
    middlewares::{jwt_auth_middleware, optional_jwt_auth_middleware},
    state::{AppState, SharedAppState},
};

const REQUEST_ID_HEADER: &str = "x-request-id";
const IMAGE_BODY_LIMIT: usize = 10_485_760; // 10MB

pub fn init_router(app_state: AppState) -> Router {
    let state: SharedAppState = Arc::new(app_state);
    let require_auth = || middleware::from_fn_with_state(state.clone(), jwt_auth_middleware);
    let optional_auth =
        || middleware::from_fn_with_state(state.clone(), optional_jwt_auth_middleware);

    let app = Router::new()
        .route("/", get(home::index))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let me_route = Router::new()
        .route("/", get(me::index).put(me::update))
        .route("/password", put(me::password))
        .route("/device", put(me::device))
        .route_layer(require_auth());

    let manga_public = Router::new()
        .route("/popular", get(manga::popular))
        .route("/highest-rated", get(manga::highest_rated))
        .route("/search", get(manga::search))
        .route("/creator/{id}", get(manga::by_creator))
        .route("/genre/{genre}", get(manga::by_genre))
        .route("/{id}", get(manga::show))
        .route_layer(optional_auth());
    let manga_protected = Router::new()
        .route("/", post(manga::store))
        .route("/{id}", put(manga::update).delete(manga::destroy))
        .route_layer(require_auth());

    let chapter_public = Router::new()
        .route("/recent", get(chapter::recent))
        .route("/manga/{id}", get(chapter::by_manga))
        .route("/manga/{id}/chapter/{number}", get(chapter::by_number))
        .route("/{id}", get(chapter::show));
    let chapter_protected = Router::new()
        .route("/", post(chapter::store))
        .route("/{id}", put(chapter::update).delete(chapter::destroy))
        .route_layer(require_auth());

    let interaction_public = Router::new()
        .route(
            "/comment/chapter/{id}",
            get(interaction::chapter_comments),
        )
        .route(
            "/favorite/count/{manga_id}",
            get(interaction::favorite_count),
        );
    let interaction_protected = Router::new()
        .route("/comment", post(interaction::store_comment))
        .route("/comment/mine", get(interaction::my_comments))
        .route(
            "/comment/{id}",
            put(interaction::update_comment).delete(interaction::destroy_comment),
        )
        .route("/rating", post(interaction::store_rating))
        .route(
            "/rating/{manga_id}",
            get(interaction::show_rating).delete(interaction::destroy_rating),
        )
        .route("/favorite", post(interaction::store_favorite))
        .route("/favorites", get(interaction::list_favorites))
        .route(
            "/favorite/{manga_id}",
            get(interaction::show_favorite).delete(interaction::destroy_favorite),
        )
        .route("/read-progress", post(interaction::read_progress))
        .route_layer(require_auth());

    let images_route = Router::new()
        .route("/upload", post(images::store))
        .route("/upload/manga-cover", post(images::manga_cover))
        .route("/upload/chapter-page", post(images::chapter_page))
        .route("/upload/profile-image", post(images::profile_image))
        .layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT))
        .route("/{*public_id}", delete(images::destroy))
        .route_layer(require_auth());

    let x_request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let request_id_middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            x_request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|val| val.to_str().ok())
                    .unwrap_or("");
                let user_agent = request
                    .headers()
                    .get(header::USER_AGENT)
                    .and_then(|val| val.to_str().ok())
                    .unwrap_or("");

                let matched_path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);

                tracing::info_span!(
                    "http_request",
                    request_id,
                    method = ?request.method(),
                    uri = ?request.uri(),
                    path = matched_path,
                    version = ?request.version(),
                    user_agent,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id_header));

    app.nest("/me", me_route)
        .nest("/manga", manga_public.merge(manga_protected))
        .nest("/chapter", chapter_public.merge(chapter_protected))
        .nest(
            "/interaction",
            interaction_public.merge(interaction_protected),
        )
        .nest("/images", images_route)
        .layer(CompressionLayer::new())
        .layer(request_id_middleware)
        .with_state(state)
}
