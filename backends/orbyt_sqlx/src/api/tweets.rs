use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;

use orbyt_dto::{CommentsEnvelope, TweetEnvelope, TweetId, TweetPage, UserId, MAX_TWEET_CHARS};

use crate::{
    config::CloudinaryConfig,
    db::{self, NewTweet},
    error::{AppError, AppResult},
    utils::{
        auth::{AuthUser, MaybeAuthUser},
        extract::{id_from_value, parse_id, AppJson, AppPath, AppQuery},
        media::normalize_media,
        pagination::{PageQuery, Pagination, MAX_PAGE_LIMIT},
    },
};

const FEED_LIMIT: i64 = 20;
const USER_TWEETS_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct CreateTweet {
    #[serde(default)]
    text: Option<Value>,
    #[serde(default)]
    media: Option<Value>,
    #[serde(default)]
    parent: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    #[serde(default)]
    text: Option<Value>,
}

/// Trimmed body text, 1 to `MAX_TWEET_CHARS` characters.
fn clean_text(text: Option<&Value>, too_long: &str) -> AppResult<String> {
    let clean = text.and_then(Value::as_str).map(str::trim).unwrap_or_default();

    if clean.is_empty() {
        return Err(AppError::invalid("Text required"));
    }
    if clean.chars().count() > MAX_TWEET_CHARS {
        return Err(AppError::invalid(too_long));
    }

    Ok(clean.to_string())
}

fn path_tweet_id(raw: &str) -> AppResult<TweetId> {
    parse_id(raw).ok_or_else(|| AppError::invalid("Invalid tweetId"))
}

async fn existing_tweet(pool: &SqlitePool, tweet_id: TweetId) -> AppResult<TweetId> {
    if db::tweet_exists(pool, tweet_id).await? {
        Ok(tweet_id)
    } else {
        Err(AppError::not_found("Tweet"))
    }
}

async fn insert_and_load(pool: &SqlitePool, new_tweet: NewTweet) -> AppResult<impl IntoResponse> {
    let tweet_id = db::create_tweet(pool, new_tweet).await?;
    let row = db::find_tweet(pool, tweet_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tweet"))?;

    Ok((
        StatusCode::CREATED,
        Json(TweetEnvelope {
            tweet: row.into_tweet(false),
        }),
    ))
}

async fn tweet_page(
    pool: &SqlitePool,
    viewer_id: Option<UserId>,
    author_id: Option<UserId>,
    pagination: Pagination,
) -> AppResult<TweetPage> {
    let (rows, total) = db::top_level_tweets(pool, author_id, pagination).await?;
    let tweets = db::annotate_tweets(pool, viewer_id, rows).await?;

    Ok(TweetPage {
        has_more: pagination.has_more(tweets.len(), total),
        tweets,
        page: pagination.page,
        limit: pagination.limit,
        total: Some(total),
    })
}

// GET /api/tweets/feed
pub async fn feed(
    State(pool): State<SqlitePool>,
    viewer: MaybeAuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let pagination = Pagination::from_query(&query, FEED_LIMIT, MAX_PAGE_LIMIT);
    let page = tweet_page(&pool, viewer.id(), None, pagination).await?;
    Ok(Json(page))
}

// GET /api/tweets/user/:username
pub async fn by_user(
    State(pool): State<SqlitePool>,
    viewer: MaybeAuthUser,
    AppPath(username): AppPath<String>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let pagination = Pagination::from_query(&query, USER_TWEETS_LIMIT, MAX_PAGE_LIMIT);
    let author = db::get_user_by_username(&pool, &username).await?;

    let page = tweet_page(&pool, viewer.id(), Some(author.id), pagination).await?;
    Ok(Json(page))
}

// GET /api/tweets/:id
pub async fn get_tweet(
    State(pool): State<SqlitePool>,
    viewer: MaybeAuthUser,
    AppPath(id): AppPath<String>,
) -> AppResult<impl IntoResponse> {
    let tweet_id = path_tweet_id(&id)?;
    let row = db::find_tweet(&pool, tweet_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tweet"))?;

    let mut tweets = db::annotate_tweets(&pool, viewer.id(), vec![row]).await?;
    let tweet = tweets.pop().ok_or_else(|| AppError::not_found("Tweet"))?;
    Ok(Json(TweetEnvelope { tweet }))
}

// GET /api/tweets/:id/comments
pub async fn get_comments(
    State(pool): State<SqlitePool>,
    viewer: MaybeAuthUser,
    AppPath(id): AppPath<String>,
) -> AppResult<impl IntoResponse> {
    let parent_id = existing_tweet(&pool, path_tweet_id(&id)?).await?;

    let rows = db::replies_to(&pool, parent_id).await?;
    let comments = db::annotate_tweets(&pool, viewer.id(), rows).await?;
    Ok(Json(CommentsEnvelope { comments }))
}

// POST /api/tweets
pub async fn create_tweet(
    State(pool): State<SqlitePool>,
    State(cloudinary): State<Arc<CloudinaryConfig>>,
    auth: AuthUser,
    AppJson(body): AppJson<CreateTweet>,
) -> AppResult<impl IntoResponse> {
    let text = clean_text(
        body.text.as_ref(),
        &format!("Tweet must be 1-{MAX_TWEET_CHARS} characters"),
    )?;

    let media = match &body.media {
        Some(Value::Array(entries)) => normalize_media(entries, cloudinary.cloud_name.as_deref()),
        _ => vec![],
    };

    let parent_id = match body.parent {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(raw) => {
            let id = id_from_value(&raw).ok_or_else(|| AppError::invalid("Invalid parent"))?;
            Some(existing_tweet(&pool, id).await?)
        }
    };

    insert_and_load(
        &pool,
        NewTweet {
            author_id: auth.id(),
            text,
            media,
            parent_id,
        },
    )
    .await
}

// POST /api/tweets/:id/comments
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(body): AppJson<CreateComment>,
) -> AppResult<impl IntoResponse> {
    let parent_id = existing_tweet(&pool, path_tweet_id(&id)?).await?;
    let text = clean_text(
        body.text.as_ref(),
        &format!("Comment must be 1-{MAX_TWEET_CHARS} characters"),
    )?;

    insert_and_load(
        &pool,
        NewTweet {
            author_id: auth.id(),
            text,
            media: vec![],
            parent_id: Some(parent_id),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_is_trimmed_and_bounded_in_characters() {
        let ok = clean_text(Some(&json!("  hello  ")), "too long").ok();
        assert_eq!(ok.as_deref(), Some("hello"));

        // 280 multi-byte characters are still within the limit
        let emoji = "é".repeat(MAX_TWEET_CHARS);
        assert!(clean_text(Some(&json!(emoji)), "too long").is_ok());

        let long = "a".repeat(MAX_TWEET_CHARS + 1);
        let err = clean_text(Some(&json!(long)), "too long").unwrap_err();
        assert_eq!(err.to_string(), "too long");
    }

    #[test]
    fn missing_or_non_string_text_is_required() {
        for value in [None, Some(json!("   ")), Some(json!(42))] {
            let err = clean_text(value.as_ref(), "too long").unwrap_err();
            assert_eq!(err.to_string(), "Text required");
        }
    }
}
