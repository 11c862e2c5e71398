//! User directory backends.

pub mod user_store;

pub use user_store::{InMemoryUserDirectory, SqliteUserDirectory, UserDirectory};
