use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};

use orbyt_dto::{
    CommentsEnvelope, CreateCommentRequest, CreateProfileRequest, CreateTweetRequest, ErrorBody,
    FollowRequest, FollowResponse, FollowStatus, LoginRequest, LoginResponse, SearchResults,
    SignatureRequest, ToggleLikeRequest, ToggleLikeResponse, Tweet, TweetEnvelope, TweetId,
    TweetPage, UpdateProfileRequest, UploadSignature, User, UserEnvelope, UserPage,
    UserSummary, UsernameLookup, MAX_TWEET_CHARS,
};

use crate::error::{ClientError, ClientResult};

/// Typed wrapper over the `/api` routes. Cheap to clone; clones share the
/// connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Trimmed tweet or comment text, or the reason it would be refused.
pub fn validate_text(text: &str) -> ClientResult<String> {
    let clean = text.trim();
    if clean.is_empty() {
        return Err(ClientError::InvalidInput("Text required".to_string()));
    }
    if clean.chars().count() > MAX_TWEET_CHARS {
        return Err(ClientError::InvalidInput(format!(
            "Text must be 1-{MAX_TWEET_CHARS} characters"
        )));
    }
    Ok(clean.to_string())
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:4000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}/api{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        log::debug!("API call failed with {}: {}", status, message);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        Self::send(self.request(Method::GET, path).query(query)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        Self::send(self.request(Method::POST, path).json(body)).await
    }

    // ==== AUTH ==== //

    pub async fn create_profile(&self, request: &CreateProfileRequest) -> ClientResult<User> {
        let envelope: UserEnvelope = self.post("/auth/createProfile", request).await?;
        Ok(envelope.user)
    }

    /// Signs in and keeps the returned ID token for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self.post("/auth/login", &request).await?;
        self.token = Some(response.id_token.clone());
        Ok(response)
    }

    // ==== USERS ==== //

    pub async fn me(&self) -> ClientResult<User> {
        let envelope: UserEnvelope = self.get("/users/me", &[]).await?;
        Ok(envelope.user)
    }

    pub async fn update_me(&self, changes: &UpdateProfileRequest) -> ClientResult<User> {
        let builder = self.request(Method::PUT, "/users/me").json(changes);
        let envelope: UserEnvelope = Self::send(builder).await?;
        Ok(envelope.user)
    }

    pub async fn search_users(&self, q: &str) -> ClientResult<Vec<UserSummary>> {
        if q.trim().is_empty() {
            return Ok(vec![]);
        }
        let results: SearchResults = self.get("/users/search", &[("q", q.to_string())]).await?;
        Ok(results.results)
    }

    pub async fn username_by_email(&self, email: &str) -> ClientResult<String> {
        let lookup: UsernameLookup = self
            .get("/users/by-email", &[("email", email.to_string())])
            .await?;
        Ok(lookup.username)
    }

    pub async fn profile(&self, username: &str) -> ClientResult<User> {
        let envelope: UserEnvelope = self.get(&format!("/users/{username}/profile"), &[]).await?;
        Ok(envelope.user)
    }

    pub async fn following(&self, username: &str, page: i64, limit: i64) -> ClientResult<UserPage> {
        self.get(&format!("/users/{username}/following"), &page_query(page, limit)).await
    }

    pub async fn followers(&self, username: &str, page: i64, limit: i64) -> ClientResult<UserPage> {
        self.get(&format!("/users/{username}/followers"), &page_query(page, limit)).await
    }

    // ==== FOLLOWS ==== //

    pub async fn follow(&self, username: &str) -> ClientResult<FollowResponse> {
        self.post("/follows/follow", &follow_request(username)).await
    }

    pub async fn unfollow(&self, username: &str) -> ClientResult<FollowResponse> {
        self.post("/follows/unfollow", &follow_request(username)).await
    }

    pub async fn follow_status(&self, username: &str) -> ClientResult<bool> {
        let status: FollowStatus = self
            .get("/follows/status", &[("targetUsername", username.to_string())])
            .await?;
        Ok(status.is_following)
    }

    // ==== TWEETS ==== //

    pub async fn feed(&self, page: i64, limit: Option<i64>) -> ClientResult<TweetPage> {
        self.get("/tweets/feed", &optional_page_query(page, limit)).await
    }

    pub async fn user_tweets(
        &self,
        username: &str,
        page: i64,
        limit: Option<i64>,
    ) -> ClientResult<TweetPage> {
        self.get(
            &format!("/tweets/user/{username}"),
            &optional_page_query(page, limit),
        )
        .await
    }

    pub async fn tweet(&self, tweet_id: TweetId) -> ClientResult<Tweet> {
        let envelope: TweetEnvelope = self.get(&format!("/tweets/{tweet_id}"), &[]).await?;
        Ok(envelope.tweet)
    }

    pub async fn comments(&self, tweet_id: TweetId) -> ClientResult<Vec<Tweet>> {
        let envelope: CommentsEnvelope = self
            .get(&format!("/tweets/{tweet_id}/comments"), &[])
            .await?;
        Ok(envelope.comments)
    }

    /// Refuses empty or over-long text before any request is made.
    pub async fn create_tweet(
        &self,
        text: &str,
        media: Vec<String>,
        parent: Option<TweetId>,
    ) -> ClientResult<Tweet> {
        let request = CreateTweetRequest {
            text: validate_text(text)?,
            media,
            parent,
        };
        let envelope: TweetEnvelope = self.post("/tweets", &request).await?;
        Ok(envelope.tweet)
    }

    pub async fn create_comment(&self, parent: TweetId, text: &str) -> ClientResult<Tweet> {
        let request = CreateCommentRequest {
            text: validate_text(text)?,
        };
        let envelope: TweetEnvelope = self
            .post(&format!("/tweets/{parent}/comments"), &request)
            .await?;
        Ok(envelope.tweet)
    }

    // ==== LIKES ==== //

    pub async fn toggle_like(&self, tweet_id: TweetId) -> ClientResult<ToggleLikeResponse> {
        self.post("/likes/toggle", &ToggleLikeRequest { tweet_id })
            .await
    }

    // ==== MEDIA ==== //

    pub async fn upload_signature(&self, folder: Option<&str>) -> ClientResult<UploadSignature> {
        let request = SignatureRequest {
            folder: folder.map(str::to_string),
        };
        self.post("/media/cloudinary-signature", &request).await
    }
}

fn follow_request(username: &str) -> FollowRequest {
    FollowRequest {
        target_username: username.to_string(),
    }
}

fn page_query(page: i64, limit: i64) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string()), ("limit", limit.to_string())]
}

fn optional_page_query(page: i64, limit: Option<i64>) -> Vec<(&'static str, String)> {
    let mut query = vec![("page", page.to_string())];
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    query
}
