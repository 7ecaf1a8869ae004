use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use orbyt_dto::{SearchResults, UserEnvelope, UsernameLookup};

use crate::{
    db::{self, ProfileChanges},
    error::{AppError, AppResult},
    utils::{
        auth::AuthUser,
        extract::{AppJson, AppPath, AppQuery},
    },
};

const SEARCH_LIMIT: i64 = 20;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 64, message = "Full name must be 1-64 characters"))]
    pub full_name: Option<String>,
    #[validate(length(max = 160, message = "Bio must be at most 160 characters"))]
    pub bio: Option<String>,
    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar_url: Option<String>,
}

// GET /api/users/me
pub async fn get_me(auth: AuthUser) -> AppResult<impl IntoResponse> {
    Ok(Json(UserEnvelope {
        user: auth.user.into_private(),
    }))
}

// PUT /api/users/me
pub async fn update_me(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppJson(body): AppJson<UpdateProfile>,
) -> AppResult<impl IntoResponse> {
    let body = UpdateProfile {
        full_name: body.full_name.map(|name| name.trim().to_string()),
        bio: body.bio.map(|bio| bio.trim().to_string()),
        avatar_url: body.avatar_url.map(|url| url.trim().to_string()),
    };
    body.validate()?;

    let user = db::update_profile(
        &pool,
        auth.id(),
        ProfileChanges {
            full_name: body.full_name,
            bio: body.bio,
            avatar_url: body.avatar_url,
        },
    )
    .await?;

    Ok(Json(UserEnvelope {
        user: user.into_private(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: Option<String>,
}

// GET /api/users/search?q=
pub async fn search_users(
    State(pool): State<SqlitePool>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Ok(Json(SearchResults { results: vec![] }));
    }

    let results = db::search_users(&pool, q, SEARCH_LIMIT).await?;
    Ok(Json(SearchResults { results }))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    email: Option<String>,
}

// GET /api/users/by-email?email=
pub async fn username_by_email(
    State(pool): State<SqlitePool>,
    AppQuery(query): AppQuery<EmailQuery>,
) -> AppResult<impl IntoResponse> {
    let email = query.email.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(AppError::invalid("email required"));
    }

    let user = db::find_user_by_email(&pool, email)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(UsernameLookup {
        username: user.username,
    }))
}

// GET /api/users/:username/profile
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    AppPath(username): AppPath<String>,
) -> AppResult<impl IntoResponse> {
    let user = db::get_user_by_username(&pool, &username).await?;
    Ok(Json(UserEnvelope {
        user: user.into_public(),
    }))
}
