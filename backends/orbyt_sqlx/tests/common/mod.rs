#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

use orbyt::{
    config::CloudinaryConfig,
    db,
    error::{AppError, AppResult},
    routes,
    utils::{
        identity::{IdentityProvider, SignInTokens, VerifiedIdentity},
        jwt::verify_jwt,
    },
    AppState,
};

pub const PASSWORD: &str = "correct horse";

const SECRET: &[u8] = b"orbyt-integration-secret";
const AUDIENCE: &str = "orbyt-test";

pub fn mint_token(uid: &str, email: Option<&str>, ttl_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + ttl_secs;
    let claims = json!({ "sub": uid, "aud": AUDIENCE, "exp": exp, "email": email });
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

/// Issues HS256 tokens and checks passwords from an in-memory account list.
#[derive(Default)]
pub struct StubIdentity {
    // email -> (password, uid)
    accounts: Mutex<HashMap<String, (String, String)>>,
}

impl StubIdentity {
    pub fn add_account(&self, email: &str, password: &str, uid: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), uid.to_string()));
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn verify_id_token(&self, id_token: &str) -> AppResult<VerifiedIdentity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);

        let claims = verify_jwt(id_token, &DecodingKey::from_secret(SECRET), &validation)?;
        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AppResult<SignInTokens> {
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((expected, uid)) if expected == password => Ok(SignInTokens {
                id_token: mint_token(&uid, Some(email), 3600),
                refresh_token: format!("refresh-{uid}"),
                expires_in: "3600".to_string(),
            }),
            _ => Err(AppError::Unauthorized("Invalid credentials")),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub identity: Arc<StubIdentity>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_cloudinary(CloudinaryConfig::default()).await
    }

    pub async fn with_cloudinary(cloudinary: CloudinaryConfig) -> Self {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        db::prepare_db(&pool).await.unwrap();

        let identity = Arc::new(StubIdentity::default());
        let state = AppState {
            pool: pool.clone(),
            identity: identity.clone(),
            cloudinary: Arc::new(cloudinary),
        };

        Self {
            router: routes::router(state),
            pool,
            identity,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call("PUT", uri, token, Some(body)).await
    }

    /// Registers `username` with the given display name and returns a bearer token for it.
    pub async fn register_named(&self, username: &str, full_name: &str) -> String {
        let uid = format!("uid-{username}");
        let email = format!("{username}@example.com");
        let token = mint_token(&uid, Some(&email), 3600);

        let (status, body) = self
            .post(
                "/api/auth/createProfile",
                None,
                json!({ "idToken": token, "fullName": full_name, "username": username }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register {username}: {body}");

        self.identity.add_account(&email, PASSWORD, &uid);
        token
    }

    pub async fn register(&self, username: &str) -> String {
        self.register_named(username, username).await
    }

    pub async fn tweet(&self, token: &str, text: &str) -> i64 {
        let (status, body) = self
            .post("/api/tweets", Some(token), json!({ "text": text }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "tweet: {body}");
        body["tweet"]["id"].as_i64().unwrap()
    }

    pub async fn follow(&self, token: &str, target: &str) -> (StatusCode, Value) {
        self.post(
            "/api/follows/follow",
            Some(token),
            json!({ "targetUsername": target }),
        )
        .await
    }

    pub async fn unfollow(&self, token: &str, target: &str) -> (StatusCode, Value) {
        self.post(
            "/api/follows/unfollow",
            Some(token),
            json!({ "targetUsername": target }),
        )
        .await
    }

    pub async fn profile(&self, username: &str) -> Value {
        let (status, body) = self
            .get(&format!("/api/users/{username}/profile"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "profile {username}: {body}");
        body["user"].clone()
    }

    pub async fn tweet_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM tweets")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
