use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use orbyt_dto::{FollowResponse, FollowStatus, UserId, UserPage, UserRow};

use crate::{
    db::{self, FollowDirection, UserRecord},
    error::{AppError, AppResult},
    utils::{
        auth::AuthUser,
        extract::{AppJson, AppPath, AppQuery},
        pagination::{PageQuery, Pagination, MAX_PAGE_LIMIT},
    },
};

const FOLLOW_LIST_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowTarget {
    #[serde(default)]
    target_username: Option<String>,
    // `status` also accepts `?username=`
    #[serde(default)]
    username: Option<String>,
}

async fn resolve_target(pool: &SqlitePool, target: FollowTarget) -> AppResult<UserRecord> {
    let handle = target
        .target_username
        .or(target.username)
        .map(|handle| handle.trim().to_lowercase())
        .filter(|handle| !handle.is_empty())
        .ok_or_else(|| AppError::invalid("targetUsername required"))?;

    db::get_user_by_username(pool, &handle).await
}

// POST /api/follows/follow
pub async fn follow(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppJson(target): AppJson<FollowTarget>,
) -> AppResult<impl IntoResponse> {
    let target = resolve_target(&pool, target).await?;
    if target.id == auth.id() {
        return Err(AppError::invalid("Cannot follow yourself"));
    }

    let change = db::follow_user(&pool, auth.id(), target.id).await?;
    log::debug!(
        "@{} follows @{} (changed: {}, followers: {})",
        auth.user.username,
        target.username,
        change.changed,
        change.followers_count
    );

    Ok(Json(FollowResponse {
        ok: true,
        is_following: true,
        followers_count: change.followers_count,
    }))
}

// POST /api/follows/unfollow
pub async fn unfollow(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppJson(target): AppJson<FollowTarget>,
) -> AppResult<impl IntoResponse> {
    let target = resolve_target(&pool, target).await?;
    if target.id == auth.id() {
        return Err(AppError::invalid("Cannot unfollow yourself"));
    }

    let change = db::unfollow_user(&pool, auth.id(), target.id).await?;
    log::debug!(
        "@{} unfollows @{} (changed: {}, followers: {})",
        auth.user.username,
        target.username,
        change.changed,
        change.followers_count
    );

    Ok(Json(FollowResponse {
        ok: true,
        is_following: false,
        followers_count: change.followers_count,
    }))
}

// GET /api/follows/status?targetUsername=
pub async fn status(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppQuery(target): AppQuery<FollowTarget>,
) -> AppResult<impl IntoResponse> {
    let target = resolve_target(&pool, target).await?;
    let is_following = db::is_following(&pool, auth.id(), target.id).await?;

    Ok(Json(FollowStatus {
        ok: true,
        is_following,
    }))
}

async fn list_edges(
    pool: &SqlitePool,
    viewer_id: UserId,
    username: &str,
    direction: FollowDirection,
    query: &PageQuery,
) -> AppResult<UserPage> {
    let pagination = Pagination::from_query(query, FOLLOW_LIST_LIMIT, MAX_PAGE_LIMIT);
    let subject = db::get_user_by_username(pool, username).await?;

    let (rows, total) = db::list_follow_edges(pool, subject.id, direction, pagination).await?;

    let ids: Vec<UserId> = rows.iter().map(|row| row.id).collect();
    let followed = db::followed_among(pool, viewer_id, &ids).await?;

    let results: Vec<UserRow> = rows
        .into_iter()
        .map(|row| UserRow {
            is_following: followed.contains(&row.id),
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
        })
        .collect();

    Ok(UserPage {
        has_more: pagination.has_more(results.len(), total),
        results,
        page: pagination.page,
        limit: pagination.limit,
        total: Some(total),
    })
}

// GET /api/users/:username/following
pub async fn list_following(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppPath(username): AppPath<String>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let page = list_edges(&pool, auth.id(), &username, FollowDirection::Following, &query).await?;
    Ok(Json(page))
}

// GET /api/users/:username/followers
pub async fn list_followers(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppPath(username): AppPath<String>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let page = list_edges(&pool, auth.id(), &username, FollowDirection::Followers, &query).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    username: Option<String>,
}

// GET /api/follows/following?username=
pub async fn list_following_by_query(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppQuery(subject): AppQuery<UsernameQuery>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let username = subject.username.unwrap_or_default();
    let page = list_edges(&pool, auth.id(), &username, FollowDirection::Following, &query).await?;
    Ok(Json(page))
}

// GET /api/follows/followers?username=
pub async fn list_followers_by_query(
    State(pool): State<SqlitePool>,
    auth: AuthUser,
    AppQuery(subject): AppQuery<UsernameQuery>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<impl IntoResponse> {
    let username = subject.username.unwrap_or_default();
    let page = list_edges(&pool, auth.id(), &username, FollowDirection::Followers, &query).await?;
    Ok(Json(page))
}
