pub mod auth;
pub mod extract;
pub mod identity;
pub mod jwt;
pub mod media;
pub mod pagination;
