use std::time::Duration;

use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    BoxError, Json, Router,
};
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
};

use orbyt_dto::ErrorBody;

use crate::{api, config::Config, AppState};

/// The `/api` routes with state attached and no middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        // ==== AUTH ==== //
        .route("/api/auth/createProfile", post(api::auth::create_profile))
        .route("/api/auth/login", post(api::auth::login))
        // ==== USERS ==== //
        .route(
            "/api/users/me",
            get(api::user::get_me).put(api::user::update_me),
        )
        .route("/api/users/search", get(api::user::search_users))
        .route("/api/users/by-email", get(api::user::username_by_email))
        .route("/api/users/:username/profile", get(api::user::get_profile))
        .route(
            "/api/users/:username/following",
            get(api::follows::list_following),
        )
        .route(
            "/api/users/:username/followers",
            get(api::follows::list_followers),
        )
        // ==== FOLLOWS ==== //
        .route("/api/follows/follow", post(api::follows::follow))
        .route("/api/follows/unfollow", post(api::follows::unfollow))
        .route("/api/follows/status", get(api::follows::status))
        .route(
            "/api/follows/following",
            get(api::follows::list_following_by_query),
        )
        .route(
            "/api/follows/followers",
            get(api::follows::list_followers_by_query),
        )
        // ==== TWEETS ==== //
        .route(
            "/api/tweets",
            get(api::tweets::feed).post(api::tweets::create_tweet),
        )
        .route("/api/tweets/feed", get(api::tweets::feed))
        .route("/api/tweets/user/:username", get(api::tweets::by_user))
        .route("/api/tweets/:id", get(api::tweets::get_tweet))
        .route(
            "/api/tweets/:id/comments",
            get(api::tweets::get_comments).post(api::tweets::create_comment),
        )
        // ==== LIKES ==== //
        .route("/api/likes/toggle", post(api::likes::toggle_like))
        // ==== MEDIA ==== //
        .route(
            "/api/media/cloudinary-signature",
            post(api::media::cloudinary_signature),
        )
        .fallback(handler_404)
        .with_state(state)
}

/// The served application: routes plus compression, CORS and a global rate limit.
pub fn generate_routes(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let origin = match &config.frontend_url {
        Some(url) => AllowOrigin::exact(
            url.parse::<HeaderValue>()
                .with_context(|| format!("FRONTEND_URL is not a valid origin: {url}"))?,
        ),
        None => AllowOrigin::any(),
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(router(state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    log::error!("Unhandled middleware error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorBody {
                            message: "Server error".to_string(),
                        }),
                    )
                }))
                .layer(BufferLayer::new(1024))
                .layer(RateLimitLayer::new(
                    config.rate_limit_per_second.max(1),
                    Duration::from_secs(1),
                )),
        ))
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            message: "Not found".to_string(),
        }),
    )
}
