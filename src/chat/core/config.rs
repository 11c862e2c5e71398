//! Configuration for the chat backend.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::history::document_store::SqliteChatDocumentStore;
use crate::chat::prompt::window::DEFAULT_MAX_MESSAGES;
use crate::chat::users::user_store::SqliteUserDirectory;

/// Environment variable for the HTTP port.
pub const ENV_PORT: &str = "CONVERSAFINA_PORT";
/// Environment variable for the `SQLite` database path.
pub const ENV_DB_PATH: &str = "CONVERSAFINA_DB_PATH";
/// Environment variable selecting the storage backend (`sqlite` or `memory`).
pub const ENV_STORAGE: &str = "CONVERSAFINA_STORAGE";
/// Environment variable for the Ollama base URL.
pub const ENV_OLLAMA_URL: &str = "CONVERSAFINA_OLLAMA_URL";
/// Environment variable for the finance completion model.
pub const ENV_FINANCE_MODEL: &str = "CONVERSAFINA_FINANCE_MODEL";
/// Environment variable for the translation model.
pub const ENV_TRANSLATION_MODEL: &str = "CONVERSAFINA_TRANSLATION_MODEL";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Completion model settings.
    pub llm: LlmConfig,
    /// Conversation window settings.
    pub window: WindowConfig,
    /// History pagination settings.
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Build the default configuration and apply `CONVERSAFINA_*` overrides.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed or the result is invalid.
    pub fn from_env() -> ChatResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ChatResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .parse()
                .map_err(|_| ChatError::InvalidConfig(format!("{ENV_PORT}={port} is not a port")))?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(mode) = lookup(ENV_STORAGE) {
            self.storage.mode = mode.parse()?;
        }
        if let Some(url) = lookup(ENV_OLLAMA_URL) {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup(ENV_FINANCE_MODEL) {
            self.llm.finance_model = model;
        }
        if let Some(model) = lookup(ENV_TRANSLATION_MODEL) {
            self.llm.translation_model = model;
        }
        Ok(())
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.window.max_messages == 0 {
            return Err(ChatError::InvalidConfig(
                "window.max_messages must be > 0".to_string(),
            ));
        }

        if self.history.default_page_size == 0 {
            return Err(ChatError::InvalidConfig(
                "history.default_page_size must be > 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ChatError::InvalidConfig(
                "llm.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(ChatError::InvalidConfig(
                "llm.top_p must be within 0.0..=1.0".to_string(),
            ));
        }

        if self.llm.finance_model.trim().is_empty() || self.llm.translation_model.trim().is_empty()
        {
            return Err(ChatError::InvalidConfig(
                "llm model names must not be empty".to_string(),
            ));
        }

        Url::parse(&self.llm.base_url)?;

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::server::DEFAULT_PORT,
        }
    }
}

/// Storage backend selector.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Durable `SQLite` database.
    #[default]
    Sqlite,
    /// Process-local maps, lost on restart.
    Memory,
}

impl FromStr for StorageMode {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ChatError::InvalidConfig(format!(
                "unknown storage mode: {other}"
            ))),
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use.
    pub mode: StorageMode,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Chat record table name.
    pub chats_table: String,
    /// User table name.
    pub users_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Sqlite,
            sqlite_path: PathBuf::from("conversafina.sqlite"),
            chats_table: SqliteChatDocumentStore::DEFAULT_TABLE.to_string(),
            users_table: SqliteUserDirectory::DEFAULT_TABLE.to_string(),
        }
    }
}

/// Completion model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL.
    pub base_url: String,
    /// Model answering finance questions.
    pub finance_model: String,
    /// Model used for translation into Portuguese.
    pub translation_model: String,
    /// Temperature for generation.
    pub temperature: f64,
    /// Nucleus sampling threshold.
    pub top_p: f64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            finance_model: "0xroyce/Plutus-3B".to_string(),
            translation_model: "llama3.2:1b".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            connect_timeout_secs: 5,
            request_timeout_secs: 120,
        }
    }
}

/// Conversation window settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Maximum number of prior turns placed in the window.
    pub max_messages: usize,
    /// Number of recent turns loaded from history for each question.
    pub history_turns: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            history_turns: 5,
        }
    }
}

/// History pagination settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Page size when the caller does not pass `limit`.
    pub default_page_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
        }
    }
}
