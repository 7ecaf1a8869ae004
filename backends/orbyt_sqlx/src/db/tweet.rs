use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, SqlitePool};

use orbyt_dto::{Tweet, TweetId, UserId, UserSummary};

use super::{counters, liked_among};
use crate::{error::AppResult, utils::pagination::Pagination};

// Counters holding anything but an integer read back as 0 instead of
// failing the row decode.
const TWEET_SELECT: &str = "
    SELECT
        tweets.id,
        tweets.text,
        tweets.media,
        tweets.parent_id,
        CASE WHEN typeof(tweets.likes_count) = 'integer'
            THEN tweets.likes_count ELSE 0 END AS likes_count,
        CASE WHEN typeof(tweets.comments_count) = 'integer'
            THEN tweets.comments_count ELSE 0 END AS comments_count,
        tweets.created_at,
        users.id AS author_id,
        users.username AS author_username,
        users.full_name AS author_full_name,
        users.avatar_url AS author_avatar_url
    FROM tweets
    INNER JOIN users ON users.id = tweets.author_id
";

#[derive(Debug, Clone, FromRow)]
pub struct TweetRow {
    pub id: TweetId,
    pub text: String,
    pub media: Json<Vec<String>>,
    pub parent_id: Option<TweetId>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub author_id: UserId,
    pub author_username: String,
    pub author_full_name: String,
    pub author_avatar_url: Option<String>,
}

impl TweetRow {
    pub fn into_tweet(self, liked_by_current_user: bool) -> Tweet {
        Tweet {
            id: self.id,
            author: UserSummary {
                id: self.author_id,
                username: self.author_username,
                full_name: self.author_full_name,
                avatar_url: self.author_avatar_url,
            },
            text: self.text,
            media: self.media.0,
            parent: self.parent_id,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            liked_by_current_user,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug)]
pub struct NewTweet {
    pub author_id: UserId,
    pub text: String,
    pub media: Vec<String>,
    pub parent_id: Option<TweetId>,
}

pub async fn tweet_exists(pool: &SqlitePool, tweet_id: TweetId) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tweets WHERE id = ?)")
        .bind(tweet_id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

/// Inserts the tweet and, for a reply, recounts the parent's comments in the
/// same transaction.
pub async fn create_tweet(pool: &SqlitePool, new_tweet: NewTweet) -> AppResult<TweetId> {
    let mut tx = pool.begin().await?;

    let tweet_id: TweetId = sqlx::query_scalar(
        "
        INSERT INTO tweets (author_id, text, media, parent_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        ",
    )
    .bind(new_tweet.author_id)
    .bind(&new_tweet.text)
    .bind(Json(&new_tweet.media))
    .bind(new_tweet.parent_id)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    if let Some(parent_id) = new_tweet.parent_id {
        counters::recount_comments(&mut tx, parent_id).await?;
    }

    tx.commit().await?;
    Ok(tweet_id)
}

pub async fn find_tweet(pool: &SqlitePool, tweet_id: TweetId) -> AppResult<Option<TweetRow>> {
    let row = sqlx::query_as::<_, TweetRow>(&format!("{TWEET_SELECT} WHERE tweets.id = ?"))
        .bind(tweet_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Top-level tweets, newest first, optionally restricted to one author, plus
/// the total number of matching tweets.
pub async fn top_level_tweets(
    pool: &SqlitePool,
    author_id: Option<UserId>,
    pagination: Pagination,
) -> AppResult<(Vec<TweetRow>, i64)> {
    // ids grow with insertion, so ordering by id is creation order without
    // timestamp ties
    let rows = sqlx::query_as::<_, TweetRow>(&format!(
        "
        {TWEET_SELECT}
        WHERE tweets.parent_id IS NULL
            AND (? IS NULL OR tweets.author_id = ?)
        ORDER BY tweets.id DESC
        LIMIT ? OFFSET ?
        "
    ))
    .bind(author_id)
    .bind(author_id)
    .bind(pagination.limit)
    .bind(pagination.skip())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "
        SELECT COUNT(*) FROM tweets
        WHERE parent_id IS NULL AND (? IS NULL OR author_id = ?)
        ",
    )
    .bind(author_id)
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn replies_to(pool: &SqlitePool, parent_id: TweetId) -> AppResult<Vec<TweetRow>> {
    let rows = sqlx::query_as::<_, TweetRow>(&format!(
        "
        {TWEET_SELECT}
        WHERE tweets.parent_id = ?
        ORDER BY tweets.id DESC
        "
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Converts rows into wire tweets, resolving `likedByCurrentUser` for the whole
/// batch with a single query.
pub async fn annotate_tweets(
    pool: &SqlitePool,
    viewer_id: Option<UserId>,
    rows: Vec<TweetRow>,
) -> AppResult<Vec<Tweet>> {
    let liked = match viewer_id {
        Some(viewer_id) => {
            let ids: Vec<TweetId> = rows.iter().map(|row| row.id).collect();
            liked_among(pool, viewer_id, &ids).await?
        }
        None => Default::default(),
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let is_liked = liked.contains(&row.id);
            row.into_tweet(is_liked)
        })
        .collect())
}
