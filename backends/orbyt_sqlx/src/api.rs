pub mod auth;
pub mod follows;
pub mod likes;
pub mod media;
pub mod tweets;
pub mod user;
