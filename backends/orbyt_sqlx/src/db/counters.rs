//! Denormalized counters are cached projections of the edge tables.
//!
//! Each counter has exactly one writer below, and it always stores the
//! authoritative count. Callers run these in the same transaction as the edge
//! mutation that made the counter stale.

use sqlx::SqliteConnection;

use orbyt_dto::{TweetId, UserId};

pub(crate) async fn recount_followers(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "
        UPDATE users
        SET followers_count = (SELECT COUNT(*) FROM follows WHERE followee_id = ?)
        WHERE id = ?
        RETURNING followers_count
        ",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

pub(crate) async fn recount_following(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "
        UPDATE users
        SET following_count = (SELECT COUNT(*) FROM follows WHERE follower_id = ?)
        WHERE id = ?
        RETURNING following_count
        ",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}

pub(crate) async fn recount_likes(
    conn: &mut SqliteConnection,
    tweet_id: TweetId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "
        UPDATE tweets
        SET likes_count = (SELECT COUNT(*) FROM likes WHERE tweet_id = ?)
        WHERE id = ?
        RETURNING likes_count
        ",
    )
    .bind(tweet_id)
    .bind(tweet_id)
    .fetch_one(&mut *conn)
    .await
}

pub(crate) async fn recount_comments(
    conn: &mut SqliteConnection,
    tweet_id: TweetId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "
        UPDATE tweets
        SET comments_count = (SELECT COUNT(*) FROM tweets WHERE parent_id = ?)
        WHERE id = ?
        RETURNING comments_count
        ",
    )
    .bind(tweet_id)
    .bind(tweet_id)
    .fetch_one(&mut *conn)
    .await
}
