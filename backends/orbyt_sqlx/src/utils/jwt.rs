use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use axum::headers::authorization::Credentials;
use axum::http::HeaderValue;
use jsonwebtoken::{jwk::JwkSet, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Claims of an identity-provider ID token that the backend relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

pub fn verify_jwt(token: &str, key: &DecodingKey, validation: &Validation) -> AppResult<Claims> {
    let claims = jsonwebtoken::decode::<Claims>(token, key, validation)?.claims;

    if claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized("Invalid token"));
    }

    Ok(claims)
}

#[derive(Debug)]
pub struct IdToken(pub String);

impl Credentials for IdToken {
    const SCHEME: &'static str = "Bearer";

    fn decode(value: &HeaderValue) -> Option<Self> {
        let mut it = value.to_str().ok()?.split_whitespace();
        let scheme = it.next()?;
        let token = it.next()?;

        if !scheme.eq_ignore_ascii_case(Self::SCHEME) || it.next().is_some() {
            None?
        }

        Some(Self(token.to_string()))
    }

    fn encode(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("{} {}", Self::SCHEME, self.0))
            .unwrap_or_else(|_| HeaderValue::from_static(Self::SCHEME))
    }
}

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

/// Signing keys published as a JWK set, looked up by `kid`.
///
/// The set is fetched lazily and refetched when a token names a key the cache
/// does not hold, at most once per [`MIN_REFRESH_INTERVAL`].
pub struct JwkCache {
    url: String,
    http: reqwest::Client,
    state: RwLock<CachedKeys>,
}

impl JwkCache {
    pub fn new(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
            state: RwLock::new(CachedKeys::default()),
        }
    }

    pub async fn key_for(&self, kid: &str) -> AppResult<DecodingKey> {
        if let Some(key) = self.state.read().await.keys.get(kid) {
            return Ok(key.clone());
        }

        let mut state = self.state.write().await;
        // another request may have refreshed while we waited for the lock
        if let Some(key) = state.keys.get(kid) {
            return Ok(key.clone());
        }

        let recently_fetched = state
            .fetched_at
            .map_or(false, |at| at.elapsed() < MIN_REFRESH_INTERVAL);
        if recently_fetched {
            return Err(AppError::Unauthorized("Invalid token"));
        }

        let set: JwkSet = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        state.keys = decode_key_set(&set);
        state.fetched_at = Some(Instant::now());
        log::info!("Loaded {} identity signing keys", state.keys.len());

        state
            .keys
            .get(kid)
            .cloned()
            .ok_or(AppError::Unauthorized("Invalid token"))
    }
}

fn decode_key_set(set: &JwkSet) -> HashMap<String, DecodingKey> {
    set.keys
        .iter()
        .filter_map(|jwk| {
            let kid = jwk.common.key_id.clone()?;
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => Some((kid, key)),
                Err(err) => {
                    log::warn!("Skipping unusable signing key {}: {}", kid, err);
                    None
                }
            }
        })
        .collect()
}
