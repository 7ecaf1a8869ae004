//! Client side of the Orbyt API.
//!
//! [`ApiClient`] speaks the HTTP API with the shared `orbyt_dto` types. The
//! repositories on top of it own the local state a UI renders: one
//! [`FeedRepository`] per feed and one [`FollowToggle`] per profile button,
//! both applying changes optimistically and rolling back when the server
//! refuses them.

mod error;
mod feed;
mod follow;
mod http;

pub use error::{ClientError, ClientResult};
pub use feed::{ApiFeed, FeedFilter, FeedKind, FeedRepository, FeedSource, LikeTicket};
pub use follow::{load_following_set, FollowSource, FollowTicket, FollowToggle};
pub use http::{validate_text, ApiClient};
