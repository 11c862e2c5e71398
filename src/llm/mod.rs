//! LLM-facing components: the Ollama chat client, translation and language check.

pub mod language;
pub mod ollama_chat;

pub use language::is_portuguese;
pub use ollama_chat::{
    CompletionFuture, CompletionService, OllamaChatClient, OllamaTranslator, Translator,
};
