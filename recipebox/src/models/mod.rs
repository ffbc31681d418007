pub mod collection;
pub mod recipe;
pub mod user;
