pub mod admin;
pub mod audit;
pub mod auth;
pub mod bootstrap_admin;
pub mod cache;
pub mod category;
pub mod comment;
pub mod like;
pub mod moderation;
pub mod prompt;
pub mod user;
