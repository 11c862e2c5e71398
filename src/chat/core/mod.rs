//! Core chat types and identifiers.

pub mod config;
pub mod errors;
pub mod ids;
pub mod user_profile;

pub use config::{
    AppConfig, HistoryConfig, LlmConfig, ServerConfig, StorageConfig, StorageMode, WindowConfig,
};
pub use errors::{ChatError, ChatResult};
pub use ids::{ChatId, UserId};
pub use user_profile::{ProfileType, User};
