use std::{borrow::Cow, sync::Arc};

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::{Validate, ValidationError};

use orbyt_dto::{LoginResponse, UserEnvelope};

use crate::{
    db::{create_user, find_user_by_username, NewUser},
    error::{AppError, AppResult},
    utils::{extract::AppJson, identity::IdentityProvider},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfile {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Validate)]
struct ProfileFields {
    #[validate(length(min = 1, max = 64, message = "Full name must be 1-64 characters"))]
    full_name: String,
    #[validate(
        length(min = 1, max = 30, message = "Username must be 1-30 characters"),
        custom = "validate_handle"
    )]
    username: String,
}

fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    let alphanumeric = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let allowed = |c: char| alphanumeric(c) || c == '_' || c == '.';

    if !handle.chars().all(allowed) {
        let mut err = ValidationError::new("handle");
        err.message = Some(Cow::from(
            "Username may only contain letters, numbers, underscores and dots",
        ));
        return Err(err);
    }

    // "." and ".." would be swallowed by path normalization.
    if !handle.chars().any(alphanumeric) {
        let mut err = ValidationError::new("handle");
        err.message = Some(Cow::from("Username must contain a letter or number"));
        return Err(err);
    }

    Ok(())
}

fn required(field: Option<String>) -> AppResult<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::invalid("Missing fields"))
}

// POST /api/auth/createProfile
pub async fn create_profile(
    State(pool): State<SqlitePool>,
    State(identity): State<Arc<dyn IdentityProvider>>,
    AppJson(body): AppJson<CreateProfile>,
) -> AppResult<impl IntoResponse> {
    let id_token = required(body.id_token)?;
    let fields = ProfileFields {
        full_name: required(body.full_name)?,
        username: required(body.username)?.to_lowercase(),
    };
    fields.validate()?;

    let verified = identity.verify_id_token(&id_token).await?;
    let Some(email) = verified.email.as_deref().map(str::to_lowercase) else {
        return Err(AppError::invalid("Token has no email"));
    };

    let user = create_user(
        &pool,
        NewUser {
            firebase_uid: &verified.uid,
            full_name: &fields.full_name,
            username: &fields.username,
            email: &email,
        },
    )
    .await?;

    log::info!("Registered @{}", user.username);
    Ok(Json(UserEnvelope {
        user: user.into_private(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct Login {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

// POST /api/auth/login
pub async fn login(
    State(pool): State<SqlitePool>,
    State(identity): State<Arc<dyn IdentityProvider>>,
    AppJson(body): AppJson<Login>,
) -> AppResult<impl IntoResponse> {
    let username = required(body.username)?;
    // passwords are not trimmed
    let Some(password) = body.password.filter(|password| !password.is_empty()) else {
        return Err(AppError::invalid("Missing fields"));
    };

    let Some(user) = find_user_by_username(&pool, &username).await? else {
        return Err(AppError::Unauthorized("Invalid credentials"));
    };

    let tokens = identity
        .sign_in_with_password(&user.email, &password)
        .await?;

    Ok(Json(LoginResponse {
        id_token: tokens.id_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: user.into_private(),
    }))
}
