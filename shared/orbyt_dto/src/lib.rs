//! Wire types shared by the Orbyt backend and its clients.
//!
//! Every JSON body the API produces or accepts is described here once, in
//! camelCase, so neither side has to probe alternative field names.

mod auth;
mod follow;
mod media;
mod page;
mod tweet;
mod user;

pub use auth::*;
pub use follow::*;
pub use media::*;
pub use page::*;
pub use tweet::*;
pub use user::*;

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type TweetId = i64;

/// Largest tweet or comment body, in characters.
pub const MAX_TWEET_CHARS: usize = 280;

/// Body of every 4xx/5xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
