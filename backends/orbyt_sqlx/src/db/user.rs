use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use orbyt_dto::{User, UserId, UserSummary};

use crate::error::{is_unique_violation, AppResult, DBError};

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub firebase_uid: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// The owner's view, email included.
    pub fn into_private(self) -> User {
        let email = Some(self.email.clone());
        User {
            email,
            ..self.into_public()
        }
    }

    pub fn into_public(self) -> User {
        User {
            id: self.id,
            username: self.username,
            full_name: self.full_name,
            email: None,
            bio: self.bio,
            avatar_url: self.avatar_url,
            followers_count: self.followers_count,
            following_count: self.following_count,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SummaryRow {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl From<SummaryRow> for UserSummary {
    fn from(row: SummaryRow) -> Self {
        UserSummary {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
        }
    }
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub firebase_uid: &'a str,
    pub full_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn find_user_by_uid(pool: &SqlitePool, uid: &str) -> AppResult<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE firebase_uid = ?")
        .bind(uid)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Handles are stored lowercase, so any casing resolves.
pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> AppResult<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = ?")
        .bind(username.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> AppResult<UserRecord> {
    find_user_by_username(pool, username)
        .await?
        .ok_or(DBError::NotFound("User").into())
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn create_user(pool: &SqlitePool, new_user: NewUser<'_>) -> AppResult<UserRecord> {
    let taken: bool = sqlx::query_scalar(
        "
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE username = ? OR email = ? OR firebase_uid = ?
        )
        ",
    )
    .bind(new_user.username)
    .bind(new_user.email)
    .bind(new_user.firebase_uid)
    .fetch_one(pool)
    .await?;

    if taken {
        return Err(DBError::AlreadyRegistered.into());
    }

    let user = sqlx::query_as::<_, UserRecord>(
        "
        INSERT INTO users (firebase_uid, full_name, username, email, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        ",
    )
    .bind(new_user.firebase_uid)
    .bind(new_user.full_name)
    .bind(new_user.username)
    .bind(new_user.email)
    .bind(Utc::now())
    .fetch_one(pool)
    .await;

    match user {
        Ok(user) => Ok(user),
        // lost a race against a concurrent registration
        Err(err) if is_unique_violation(&err) => Err(DBError::AlreadyRegistered.into()),
        Err(err) => Err(err.into()),
    }
}

pub async fn update_profile(
    pool: &SqlitePool,
    user_id: UserId,
    changes: ProfileChanges,
) -> AppResult<UserRecord> {
    let user = sqlx::query_as::<_, UserRecord>(
        "
        UPDATE users
        SET full_name = COALESCE(?, full_name),
            bio = COALESCE(?, bio),
            avatar_url = COALESCE(?, avatar_url)
        WHERE id = ?
        RETURNING *
        ",
    )
    .bind(changes.full_name)
    .bind(changes.bio)
    .bind(changes.avatar_url)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    user.ok_or(DBError::NotFound("User").into())
}

/// Case-insensitive substring match on handle or full name.
pub async fn search_users(pool: &SqlitePool, q: &str, limit: i64) -> AppResult<Vec<UserSummary>> {
    let pattern = format!("%{}%", escape_like(q));

    let rows = sqlx::query_as::<_, SummaryRow>(
        r"
        SELECT id, username, full_name, avatar_url
        FROM users
        WHERE username LIKE ? ESCAPE '\' OR full_name LIKE ? ESCAPE '\'
        ORDER BY username
        LIMIT ?
        ",
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(UserSummary::from).collect())
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
