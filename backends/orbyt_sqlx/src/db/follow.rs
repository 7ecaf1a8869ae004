use std::collections::HashSet;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use orbyt_dto::UserId;

use super::{counters, SummaryRow, LOCALE_COLLATION};
use crate::{error::AppResult, utils::pagination::Pagination};

/// Result of a follow or unfollow: whether the edge set changed and the
/// followee's recomputed follower count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowChange {
    pub changed: bool,
    pub followers_count: i64,
}

/// Which side of the edge a listing walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    /// Users that follow the subject.
    Followers,
    /// Users the subject follows.
    Following,
}

/// A duplicate insert, including one from a concurrent identical request,
/// is absorbed by the primary key and reported as "no change".
pub async fn follow_user(
    pool: &SqlitePool,
    follower_id: UserId,
    followee_id: UserId,
) -> AppResult<FollowChange> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "
        INSERT INTO follows (follower_id, followee_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(follower_id)
    .bind(followee_id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    counters::recount_following(&mut tx, follower_id).await?;
    let followers_count = counters::recount_followers(&mut tx, followee_id).await?;

    tx.commit().await?;

    Ok(FollowChange {
        changed: inserted > 0,
        followers_count,
    })
}

pub async fn unfollow_user(
    pool: &SqlitePool,
    follower_id: UserId,
    followee_id: UserId,
) -> AppResult<FollowChange> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    counters::recount_following(&mut tx, follower_id).await?;
    let followers_count = counters::recount_followers(&mut tx, followee_id).await?;

    tx.commit().await?;

    Ok(FollowChange {
        changed: deleted > 0,
        followers_count,
    })
}

pub async fn is_following(
    pool: &SqlitePool,
    follower_id: UserId,
    followee_id: UserId,
) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "
        SELECT EXISTS (
            SELECT 1 FROM follows
            WHERE follower_id = ? AND followee_id = ?
        )
        ",
    )
    .bind(follower_id)
    .bind(followee_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// The subset of `candidates` that `follower_id` follows, in one query.
pub async fn followed_among(
    pool: &SqlitePool,
    follower_id: UserId,
    candidates: &[UserId],
) -> AppResult<HashSet<UserId>> {
    if candidates.is_empty() {
        return Ok(HashSet::new());
    }

    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT followee_id FROM follows WHERE follower_id = ");
    query.push_bind(follower_id).push(" AND followee_id IN (");
    let mut ids = query.separated(", ");
    for id in candidates {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");

    let followed: Vec<UserId> = query.build_query_scalar().fetch_all(pool).await?;
    Ok(followed.into_iter().collect())
}

/// One page of the users on the other end of `subject_id`'s edges, sorted
/// by full name then handle, ignoring case and accents, plus the total edge count.
pub async fn list_follow_edges(
    pool: &SqlitePool,
    subject_id: UserId,
    direction: FollowDirection,
    pagination: Pagination,
) -> AppResult<(Vec<SummaryRow>, i64)> {
    let (other_side, subject_side) = match direction {
        FollowDirection::Followers => ("follower_id", "followee_id"),
        FollowDirection::Following => ("followee_id", "follower_id"),
    };

    let rows = sqlx::query_as::<_, SummaryRow>(&format!(
        "
        SELECT users.id, users.username, users.full_name, users.avatar_url
        FROM follows
        INNER JOIN users ON users.id = follows.{other_side}
        WHERE follows.{subject_side} = ?
        ORDER BY users.full_name COLLATE {LOCALE_COLLATION},
            users.username COLLATE {LOCALE_COLLATION},
            users.id
        LIMIT ? OFFSET ?
        "
    ))
    .bind(subject_id)
    .bind(pagination.limit)
    .bind(pagination.skip())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM follows WHERE {subject_side} = ?"
    ))
    .bind(subject_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}
