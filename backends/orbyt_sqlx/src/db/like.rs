use std::collections::HashSet;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use orbyt_dto::{TweetId, UserId};

use super::counters;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}

/// Flips the (user, tweet) like edge and stores the authoritative like count.
///
/// Unlike is attempted first; only when nothing was deleted is the edge
/// inserted. Either way `likes_count` is recounted from the edge table, so the
/// stored value cannot drift whatever the interleaving of toggles.
pub async fn toggle_like(
    pool: &SqlitePool,
    user_id: UserId,
    tweet_id: TweetId,
) -> AppResult<LikeState> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM likes WHERE user_id = ? AND tweet_id = ?")
        .bind(user_id)
        .bind(tweet_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = if deleted > 0 {
        false
    } else {
        sqlx::query(
            "
            INSERT INTO likes (user_id, tweet_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(tweet_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        true
    };

    let likes_count = counters::recount_likes(&mut tx, tweet_id).await?;
    tx.commit().await?;

    Ok(LikeState { liked, likes_count })
}

/// The subset of `tweet_ids` that `user_id` has liked, in one query.
pub async fn liked_among(
    pool: &SqlitePool,
    user_id: UserId,
    tweet_ids: &[TweetId],
) -> AppResult<HashSet<TweetId>> {
    if tweet_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT tweet_id FROM likes WHERE user_id = ");
    query.push_bind(user_id).push(" AND tweet_id IN (");
    let mut ids = query.separated(", ");
    for id in tweet_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");

    let liked: Vec<TweetId> = query.build_query_scalar().fetch_all(pool).await?;
    Ok(liked.into_iter().collect())
}

pub async fn count_likes(pool: &SqlitePool, tweet_id: TweetId) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE tweet_id = ?")
        .bind(tweet_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
