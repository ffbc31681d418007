pub mod auth;
pub mod collection;
pub mod health;
pub mod ingredient;
pub mod recipe;
pub mod user;
