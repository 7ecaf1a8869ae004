use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;

use orbyt_dto::ToggleLikeResponse;

use crate::{
    db,
    error::{AppError, AppResult},
    utils::{
        auth::AuthUser,
        extract::{id_from_value, AppJson},
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLike {
    #[serde(default)]
    tweet_id: Option<Value>,
}

// POST /api/likes/toggle
pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppJson(body): AppJson<ToggleLike>,
) -> AppResult<impl IntoResponse> {
    let raw = match body.tweet_id {
        None | Some(Value::Null) => return Err(AppError::invalid("tweetId required")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(AppError::invalid("tweetId required"))
        }
        Some(raw) => raw,
    };
    let tweet_id = id_from_value(&raw).ok_or_else(|| AppError::invalid("Invalid tweetId"))?;

    if !db::tweet_exists(&pool, tweet_id).await? {
        return Err(AppError::not_found("Tweet"));
    }

    let state = db::toggle_like(&pool, auth.id(), tweet_id).await?;
    log::debug!(
        "@{} {} tweet {} (likes: {})",
        auth.user.username,
        if state.liked { "liked" } else { "unliked" },
        tweet_id,
        state.likes_count
    );

    Ok(Json(ToggleLikeResponse {
        liked: state.liked,
        likes_count: state.likes_count,
    }))
}
