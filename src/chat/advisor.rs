//! Finance advisor orchestration: one question in, one persisted answer out.

use std::sync::Arc;

use tracing::{debug, info};

use crate::chat::core::config::WindowConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::UserId;
use crate::chat::history::history_store::HistoryStore;
use crate::chat::prompt::template::{PromptTemplate, UserContext};
use crate::chat::prompt::window::build_window;
use crate::chat::users::user_store::UserDirectory;
use crate::llm::language::is_portuguese;
use crate::llm::ollama_chat::{CompletionService, Translator};

/// Collaborators of the advisor.
pub struct AdvisorBackends {
    /// Turn history.
    pub history: Arc<HistoryStore>,
    /// User lookup.
    pub users: Arc<dyn UserDirectory>,
    /// Finance completion model.
    pub completion: Arc<dyn CompletionService>,
    /// Translation fallback.
    pub translator: Arc<dyn Translator>,
}

/// Answers finance questions with the user's own history as context.
pub struct FinanceAdvisor {
    backends: AdvisorBackends,
    template: PromptTemplate,
    window: WindowConfig,
}

impl FinanceAdvisor {
    /// Create an advisor.
    #[must_use]
    pub const fn new(
        backends: AdvisorBackends,
        template: PromptTemplate,
        window: WindowConfig,
    ) -> Self {
        Self {
            backends,
            template,
            window,
        }
    }

    /// Answer `question` for `user_id` and persist the exchange.
    ///
    /// # Errors
    /// - [`ChatError::InvalidInput`] if the question is blank.
    /// - [`ChatError::NotFound`] if the user is unknown.
    /// - [`ChatError::Upstream`] if completion or translation fails.
    /// - Any history store error.
    pub async fn ask(&self, user_id: &UserId, question: &str) -> ChatResult<String> {
        if question.trim().is_empty() {
            return Err(ChatError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }

        let user = self
            .backends
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(user_id.clone()))?;
        let context = UserContext::from(&user);

        let history = self
            .backends
            .history
            .recent_turns(user_id, self.window.history_turns)
            .await?;
        let messages = build_window(
            self.template.render(&context),
            &history,
            question,
            self.window.max_messages,
        );
        info!(%user_id, count = messages.len(), "sending window to completion service");

        let raw = self.backends.completion.complete(messages).await?;
        debug!(%user_id, chars = raw.len(), "completion received");

        let answer = if is_portuguese(&raw) {
            raw
        } else {
            info!(%user_id, "answer not in Portuguese, translating");
            self.backends.translator.translate_to_portuguese(&raw).await?
        };

        self.backends.history.append(user_id, question, &answer).await?;
        Ok(answer)
    }
}
