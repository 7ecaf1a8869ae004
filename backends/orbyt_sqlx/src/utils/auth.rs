use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    headers::{Authorization, HeaderMapExt},
    http::{header::AUTHORIZATION, request::Parts},
};
use sqlx::SqlitePool;

use orbyt_dto::UserId;

use super::{
    identity::IdentityProvider,
    jwt::IdToken,
};
use crate::{
    db::{find_user_by_uid, UserRecord},
    error::{AppError, AppResult},
};

/// A caller whose bearer token verified and who has a local profile.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRecord,
}

impl AuthUser {
    pub fn id(&self) -> UserId {
        self.user.id
    }
}

/// An optional viewer: no `Authorization` header means anonymous, but a header
/// that is present must authenticate.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(AuthUser::id)
    }
}

pub async fn authenticate(
    pool: &SqlitePool,
    identity: &dyn IdentityProvider,
    token: &str,
) -> AppResult<AuthUser> {
    let verified = identity.verify_id_token(token).await?;

    let Some(user) = find_user_by_uid(pool, &verified.uid).await? else {
        return Err(AppError::Unauthorized("User not found in DB"));
    };

    Ok(AuthUser { user })
}

async fn authenticate_parts<S>(parts: &Parts, state: &S) -> AppResult<AuthUser>
where
    SqlitePool: FromRef<S>,
    Arc<dyn IdentityProvider>: FromRef<S>,
{
    let Some(Authorization(IdToken(token))) = parts.headers.typed_get::<Authorization<IdToken>>()
    else {
        return Err(AppError::Unauthorized("No token provided"));
    };

    let pool = SqlitePool::from_ref(state);
    let identity = <Arc<dyn IdentityProvider>>::from_ref(state);
    authenticate(&pool, &*identity, &token).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
    Arc<dyn IdentityProvider>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_parts(parts, state).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
    Arc<dyn IdentityProvider>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Self(None));
        }

        authenticate_parts(parts, state).await.map(|user| Self(Some(user)))
    }
}
