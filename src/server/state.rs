//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio_rusqlite::Connection;
use tracing::info;

use crate::chat::advisor::{AdvisorBackends, FinanceAdvisor};
use crate::chat::core::config::{AppConfig, StorageMode};
use crate::chat::core::errors::ChatResult;
use crate::chat::history::document_store::{ChatDocumentStore, SqliteChatDocumentStore};
use crate::chat::history::history_store::HistoryStore;
use crate::chat::history::memory_store::InMemoryChatDocumentStore;
use crate::chat::prompt::template::PromptTemplate;
use crate::chat::users::user_store::{InMemoryUserDirectory, SqliteUserDirectory, UserDirectory};
use crate::llm::ollama_chat::{CompletionService, OllamaChatClient, OllamaTranslator, Translator};

/// Shared application state.
pub struct AppState {
    /// Effective configuration.
    pub config: AppConfig,
    /// User directory.
    pub users: Arc<dyn UserDirectory>,
    /// Turn history.
    pub history: Arc<HistoryStore>,
    /// Question answering flow.
    pub advisor: FinanceAdvisor,
}

impl AppState {
    /// Build storage backends and Ollama clients from the configuration.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or a client cannot be created.
    pub async fn new(config: AppConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let (users, documents) = open_storage(&config).await?;

        let finance = OllamaChatClient::new(&config.llm, config.llm.finance_model.clone())
            .map_err(|e| format!("Failed to create Ollama client: {e}"))?;
        let translation = OllamaChatClient::new(&config.llm, config.llm.translation_model.clone())
            .map_err(|e| format!("Failed to create Ollama client: {e}"))?;
        info!(
            finance_model = finance.model(),
            translation_model = translation.model(),
            "ollama clients ready"
        );

        Ok(Self::from_parts(
            config,
            users,
            documents,
            Arc::new(finance),
            Arc::new(OllamaTranslator::new(translation)),
        ))
    }

    /// Assemble state from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserDirectory>,
        documents: Arc<dyn ChatDocumentStore>,
        completion: Arc<dyn CompletionService>,
        translator: Arc<dyn Translator>,
    ) -> Arc<Self> {
        let history = Arc::new(HistoryStore::new(documents, users.clone()));
        let advisor = FinanceAdvisor::new(
            AdvisorBackends {
                history: history.clone(),
                users: users.clone(),
                completion,
                translator,
            },
            PromptTemplate::default(),
            config.window.clone(),
        );

        Arc::new(Self {
            config,
            users,
            history,
            advisor,
        })
    }
}

async fn open_storage(
    config: &AppConfig,
) -> ChatResult<(Arc<dyn UserDirectory>, Arc<dyn ChatDocumentStore>)> {
    let storage = &config.storage;
    match storage.mode {
        StorageMode::Memory => {
            info!("using in-memory storage");
            Ok((
                Arc::new(InMemoryUserDirectory::new()),
                Arc::new(InMemoryChatDocumentStore::new()),
            ))
        }
        StorageMode::Sqlite => {
            info!(path = %storage.sqlite_path.display(), "opening sqlite storage");
            let conn = Arc::new(Connection::open(&storage.sqlite_path).await?);
            let users = SqliteUserDirectory::new(conn.clone(), storage.users_table.clone()).await?;
            let documents =
                SqliteChatDocumentStore::new(conn, storage.chats_table.clone()).await?;
            Ok((Arc::new(users), Arc::new(documents)))
        }
    }
}
