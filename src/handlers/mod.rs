pub mod admin;
pub mod auth;
pub mod category;
pub mod comment;
pub mod like;
pub mod me;
pub mod prompt;
pub mod user;
