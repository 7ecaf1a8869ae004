use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TweetId, UserSummary};

/// A post, or a reply when `parent` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: TweetId,
    pub author: UserSummary,
    pub text: String,
    #[serde(default)]
    pub media: Vec<String>,
    pub parent: Option<TweetId>,
    pub likes_count: i64,
    pub comments_count: i64,
    #[serde(default)]
    pub liked_by_current_user: bool,
    pub created_at: DateTime<Utc>,
}

impl Tweet {
    pub fn is_reply(&self) -> bool {
        self.parent.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetEnvelope {
    pub tweet: Tweet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentsEnvelope {
    pub comments: Vec<Tweet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTweetRequest {
    pub text: String,
    #[serde(default)]
    pub media: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TweetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub tweet_id: TweetId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}
