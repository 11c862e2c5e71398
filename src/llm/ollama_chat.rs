//! Ollama `/api/chat` client used for finance answers and translation.
//!
//! Behaviour:
//! - Send the whole window in one non-streaming request.
//! - Surface every transport, status or decoding failure as
//!   [`ChatError::Upstream`]; no retries.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::chat::core::config::LlmConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::prompt::window::ChatMessage;

/// Boxed future type for completion calls.
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = ChatResult<String>> + Send + 'a>>;

/// Completion service consuming an ordered message window.
pub trait CompletionService: Send + Sync {
    /// Complete the window and return the assistant text.
    ///
    /// # Errors
    /// Returns [`ChatError::Upstream`] if the service is unreachable or errored.
    fn complete(&self, messages: Vec<ChatMessage>) -> CompletionFuture<'_>;
}

/// Translation fallback for answers not in Portuguese.
pub trait Translator: Send + Sync {
    /// Translate `text` into Brazilian Portuguese.
    ///
    /// # Errors
    /// Returns [`ChatError::Upstream`] if the service is unreachable or errored.
    fn translate_to_portuguese(&self, text: &str) -> CompletionFuture<'_>;
}

#[derive(Clone, Copy, Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    top_p: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Async Ollama chat client bound to one model.
#[derive(Clone, Debug)]
pub struct OllamaChatClient {
    client: Client,
    chat_url: Url,
    model: String,
    options: ChatOptions,
}

impl OllamaChatClient {
    /// Create a client for `model` against the configured Ollama server.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig, model: impl Into<String>) -> ChatResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| ChatError::InvalidConfig(format!("http client: {err}")))?;

        Ok(Self {
            client,
            chat_url: chat_endpoint(&config.base_url)?,
            model: model.into(),
            options: ChatOptions {
                temperature: config.temperature,
                top_p: config.top_p,
            },
        })
    }

    /// Model name used for requests.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the window and return the trimmed assistant text.
    ///
    /// # Errors
    /// Returns [`ChatError::Upstream`] on transport, status or decoding failure.
    pub async fn chat(&self, messages: &[ChatMessage]) -> ChatResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: self.options,
        };

        debug!(model = %self.model, count = messages.len(), "sending chat request");
        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|err| ChatError::Upstream(format!("ollama unreachable: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Upstream(format!(
                "ollama http status not ok: {}",
                status.as_u16()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| ChatError::Upstream(format!("ollama response malformed: {err}")))?;

        body.message
            .map(|message| message.content.trim().to_string())
            .ok_or_else(|| ChatError::Upstream("ollama response has no message".to_string()))
    }
}

impl CompletionService for OllamaChatClient {
    fn complete(&self, messages: Vec<ChatMessage>) -> CompletionFuture<'_> {
        Box::pin(async move { self.chat(&messages).await })
    }
}

/// Translator backed by a general-purpose Ollama model.
#[derive(Clone, Debug)]
pub struct OllamaTranslator {
    client: OllamaChatClient,
}

impl OllamaTranslator {
    /// Wrap a client bound to the translation model.
    #[must_use]
    pub const fn new(client: OllamaChatClient) -> Self {
        Self { client }
    }
}

impl Translator for OllamaTranslator {
    fn translate_to_portuguese(&self, text: &str) -> CompletionFuture<'_> {
        let messages = vec![ChatMessage::user(translation_prompt(text))];
        Box::pin(async move { self.client.chat(&messages).await })
    }
}

/// Instruction asking for a faithful Brazilian Portuguese translation.
#[must_use]
pub fn translation_prompt(text: &str) -> String {
    format!(
        "Traduza o texto a seguir para o português do Brasil. \
         Responda somente com a tradução, sem comentários.\n\n{text}"
    )
}

fn chat_endpoint(base_url: &str) -> ChatResult<Url> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?.join("api/chat")?)
}
