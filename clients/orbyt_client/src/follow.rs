use std::collections::HashSet;

use async_trait::async_trait;

use orbyt_dto::{FollowResponse, UserId, UserPage};

use crate::{error::ClientResult, ApiClient};

const FOLLOWING_PAGE_SIZE: i64 = 50;

#[async_trait]
pub trait FollowSource: Send + Sync {
    async fn follow(&self, username: &str) -> ClientResult<FollowResponse>;

    async fn unfollow(&self, username: &str) -> ClientResult<FollowResponse>;

    async fn following_page(&self, username: &str, page: i64, limit: i64)
        -> ClientResult<UserPage>;
}

#[async_trait]
impl FollowSource for ApiClient {
    async fn follow(&self, username: &str) -> ClientResult<FollowResponse> {
        ApiClient::follow(self, username).await
    }

    async fn unfollow(&self, username: &str) -> ClientResult<FollowResponse> {
        ApiClient::unfollow(self, username).await
    }

    async fn following_page(
        &self,
        username: &str,
        page: i64,
        limit: i64,
    ) -> ClientResult<UserPage> {
        self.following(username, page, limit).await
    }
}

/// Ids of everyone `username` follows, collected across all pages.
pub async fn load_following_set<S: FollowSource + ?Sized>(
    source: &S,
    username: &str,
) -> ClientResult<HashSet<UserId>> {
    let mut ids = HashSet::new();
    let mut page = 1;

    loop {
        let batch = source
            .following_page(username, page, FOLLOWING_PAGE_SIZE)
            .await?;
        let empty = batch.results.is_empty();
        ids.extend(batch.results.into_iter().map(|row| row.id));

        if !batch.has_more || empty {
            return Ok(ids);
        }
        page += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowTicket {
    previous_following: bool,
    previous_followers: i64,
}

/// Follow button state for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowToggle {
    username: String,
    is_following: bool,
    followers_count: i64,
    in_flight: bool,
}

impl FollowToggle {
    pub fn new(username: impl Into<String>, is_following: bool, followers_count: i64) -> Self {
        Self {
            username: username.into(),
            is_following,
            followers_count,
            in_flight: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_following(&self) -> bool {
        self.is_following
    }

    pub fn followers_count(&self) -> i64 {
        self.followers_count
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Flips the state locally; `None` while a previous toggle is unsettled.
    pub fn begin(&mut self) -> Option<FollowTicket> {
        if self.in_flight {
            return None;
        }

        let ticket = FollowTicket {
            previous_following: self.is_following,
            previous_followers: self.followers_count,
        };

        self.in_flight = true;
        self.is_following = !self.is_following;
        self.followers_count = if ticket.previous_following {
            (self.followers_count - 1).max(0)
        } else {
            self.followers_count + 1
        };

        Some(ticket)
    }

    pub fn finish(&mut self, ticket: FollowTicket, result: &ClientResult<FollowResponse>) {
        self.in_flight = false;

        match result {
            Ok(response) => {
                self.is_following = response.is_following;
                self.followers_count = response.followers_count;
            }
            Err(err) => {
                log::warn!("Follow toggle for @{} failed: {}", self.username, err);
                self.is_following = ticket.previous_following;
                self.followers_count = ticket.previous_followers;
            }
        }
    }

    /// Optimistic follow or unfollow, whichever flips the current state.
    /// Returns the settled state, or `None` when a toggle is already running.
    pub async fn toggle<S: FollowSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> ClientResult<Option<bool>> {
        let Some(ticket) = self.begin() else {
            return Ok(None);
        };

        let result = if ticket.previous_following {
            source.unfollow(&self.username).await
        } else {
            source.follow(&self.username).await
        };

        self.finish(ticket, &result);
        result.map(|response| Some(response.is_following))
    }
}
