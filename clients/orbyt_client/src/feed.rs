use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use orbyt_dto::{ToggleLikeResponse, Tweet, TweetId, TweetPage, UserId};

use crate::{error::ClientResult, ApiClient};

/// Where a feed's pages and like toggles come from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(&self, page: i64) -> ClientResult<TweetPage>;

    async fn toggle_like(&self, tweet_id: TweetId) -> ClientResult<ToggleLikeResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    /// Every top-level tweet.
    Home,
    /// One author's top-level tweets.
    User(String),
}

/// A [`FeedSource`] backed by the HTTP API.
#[derive(Debug, Clone)]
pub struct ApiFeed {
    client: ApiClient,
    kind: FeedKind,
}

impl ApiFeed {
    pub fn new(client: ApiClient, kind: FeedKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait]
impl FeedSource for ApiFeed {
    async fn fetch_page(&self, page: i64) -> ClientResult<TweetPage> {
        match &self.kind {
            FeedKind::Home => self.client.feed(page, None).await,
            FeedKind::User(username) => self.client.user_tweets(username, page, None).await,
        }
    }

    async fn toggle_like(&self, tweet_id: TweetId) -> ClientResult<ToggleLikeResponse> {
        self.client.toggle_like(tweet_id).await
    }
}

/// Which loaded tweets a view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFilter {
    All,
    /// Tweets by `me` or by anyone in `following`.
    Following {
        me: UserId,
        following: HashSet<UserId>,
    },
}

impl FeedFilter {
    pub fn admits(&self, tweet: &Tweet) -> bool {
        match self {
            FeedFilter::All => true,
            FeedFilter::Following { me, following } => {
                tweet.author.id == *me || following.contains(&tweet.author.id)
            }
        }
    }
}

/// The state a like had before an optimistic flip, kept until the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeTicket {
    pub tweet_id: TweetId,
    previous_liked: bool,
    previous_count: i64,
}

/// Single source of truth for one paginated feed.
///
/// Pages are merged by tweet id and replies never enter the list. Like
/// toggles are applied locally first; at most one toggle per tweet is in
/// flight, and a failed toggle restores the exact prior state.
pub struct FeedRepository<S> {
    source: S,
    tweets: Vec<Tweet>,
    page: i64,
    has_more: bool,
    pending_likes: HashMap<TweetId, LikeTicket>,
}

impl<S: FeedSource> FeedRepository<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tweets: Vec::new(),
            page: 0,
            has_more: true,
            pending_likes: HashMap::new(),
        }
    }

    pub fn tweets(&self) -> &[Tweet] {
        &self.tweets
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Last page merged, 0 before the first load.
    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn visible(&self, filter: &FeedFilter) -> Vec<&Tweet> {
        self.tweets.iter().filter(|tweet| filter.admits(tweet)).collect()
    }

    pub fn get(&self, tweet_id: TweetId) -> Option<&Tweet> {
        self.tweets.iter().find(|tweet| tweet.id == tweet_id)
    }

    fn get_mut(&mut self, tweet_id: TweetId) -> Option<&mut Tweet> {
        self.tweets.iter_mut().find(|tweet| tweet.id == tweet_id)
    }

    /// Replaces the list with page 1. On error the current list is kept.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        let first = self.source.fetch_page(1).await?;

        self.tweets.clear();
        self.merge(first.tweets);
        self.page = 1;
        self.has_more = first.has_more;
        Ok(())
    }

    /// Appends the next page and returns how many new tweets it contributed.
    pub async fn load_more(&mut self) -> ClientResult<usize> {
        if !self.has_more {
            return Ok(0);
        }

        let next = self.page + 1;
        let page = self.source.fetch_page(next).await?;
        let added = self.merge(page.tweets);

        self.page = next;
        self.has_more = page.has_more;
        Ok(added)
    }

    /// Puts a tweet the user just posted at the top. Replies are ignored.
    pub fn prepend(&mut self, tweet: Tweet) {
        if tweet.is_reply() {
            return;
        }
        self.tweets.retain(|existing| existing.id != tweet.id);
        self.tweets.insert(0, tweet);
    }

    fn merge(&mut self, incoming: Vec<Tweet>) -> usize {
        let mut seen: HashSet<TweetId> = self.tweets.iter().map(|tweet| tweet.id).collect();
        let before = self.tweets.len();

        for mut tweet in incoming {
            if tweet.is_reply() || !seen.insert(tweet.id) {
                continue;
            }
            // a toggle still in flight wins over the stale server copy
            if let Some(ticket) = self.pending_likes.get(&tweet.id) {
                tweet.liked_by_current_user = !ticket.previous_liked;
                tweet.likes_count = optimistic_count(ticket.previous_liked, ticket.previous_count);
            }
            self.tweets.push(tweet);
        }

        self.tweets.len() - before
    }

    pub fn is_like_pending(&self, tweet_id: TweetId) -> bool {
        self.pending_likes.contains_key(&tweet_id)
    }

    /// Flips the like locally. `None` when the tweet is unknown or a toggle
    /// for it is already in flight.
    pub fn begin_like(&mut self, tweet_id: TweetId) -> Option<LikeTicket> {
        if self.pending_likes.contains_key(&tweet_id) {
            return None;
        }

        let tweet = self.get_mut(tweet_id)?;
        let ticket = LikeTicket {
            tweet_id,
            previous_liked: tweet.liked_by_current_user,
            previous_count: tweet.likes_count,
        };

        tweet.liked_by_current_user = !ticket.previous_liked;
        tweet.likes_count = optimistic_count(ticket.previous_liked, ticket.previous_count);

        self.pending_likes.insert(tweet_id, ticket);
        Some(ticket)
    }

    /// Settles a toggle: the server's state on success, the prior state on error.
    pub fn finish_like(&mut self, ticket: LikeTicket, result: &ClientResult<ToggleLikeResponse>) {
        self.pending_likes.remove(&ticket.tweet_id);

        let Some(tweet) = self.get_mut(ticket.tweet_id) else {
            return;
        };

        match result {
            Ok(response) => {
                tweet.liked_by_current_user = response.liked;
                tweet.likes_count = response.likes_count;
            }
            Err(err) => {
                log::warn!("Like toggle for tweet {} failed: {}", ticket.tweet_id, err);
                tweet.liked_by_current_user = ticket.previous_liked;
                tweet.likes_count = ticket.previous_count;
            }
        }
    }

    /// Optimistic toggle round trip. Returns the settled liked state, or
    /// `None` when the toggle was refused locally.
    pub async fn toggle_like(&mut self, tweet_id: TweetId) -> ClientResult<Option<bool>> {
        let Some(ticket) = self.begin_like(tweet_id) else {
            return Ok(None);
        };

        let result = self.source.toggle_like(tweet_id).await;
        self.finish_like(ticket, &result);
        result.map(|response| Some(response.liked))
    }
}

fn optimistic_count(previous_liked: bool, previous_count: i64) -> i64 {
    if previous_liked {
        (previous_count - 1).max(0)
    } else {
        previous_count + 1
    }
}
