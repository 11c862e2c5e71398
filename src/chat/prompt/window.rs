//! Conversation window sent to the completion service.

use serde::{Deserialize, Serialize};

use crate::chat::history::record::HistoryMessage;

/// Default number of prior turns included in a window.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Role of a message in the window.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions and user context.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// One entry of the window.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System entry.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User entry.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant entry.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Assemble system prompt, the last `max_messages` turns and the new question.
///
/// The result always holds `1 + 2 * min(history.len(), max_messages) + 1`
/// entries, with history as strict user/assistant pairs.
#[must_use]
pub fn build_window(
    system_prompt: impl Into<String>,
    history: &[HistoryMessage],
    question: &str,
    max_messages: usize,
) -> Vec<ChatMessage> {
    let recent = &history[history.len().saturating_sub(max_messages)..];

    let mut window = Vec::with_capacity(2 + recent.len() * 2);
    window.push(ChatMessage::system(system_prompt));
    for turn in recent {
        window.push(ChatMessage::user(turn.question.clone()));
        window.push(ChatMessage::assistant(turn.answer.clone()));
    }
    window.push(ChatMessage::user(question));
    window
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn history(count: usize) -> Vec<HistoryMessage> {
        (0..count)
            .map(|i| HistoryMessage {
                question: format!("q{i}"),
                answer: format!("a{i}"),
                created_at: format!("2024-05-01T12:00:{i:02}.000Z"),
            })
            .collect()
    }

    #[test]
    fn window_is_capped_to_the_most_recent_turns() {
        let window = build_window("sys", &history(12), "Q", DEFAULT_MAX_MESSAGES);

        assert_eq!(window.len(), 22);
        assert_eq!(window[0].role, ChatRole::System);
        assert_eq!(window[21], ChatMessage::user("Q"));
        for (offset, pair) in window[1..21].chunks(2).enumerate() {
            assert_eq!(pair[0], ChatMessage::user(format!("q{}", offset + 2)));
            assert_eq!(pair[1], ChatMessage::assistant(format!("a{}", offset + 2)));
        }
    }

    #[test]
    fn short_history_is_used_in_full() {
        let window = build_window("sys", &history(3), "Q", DEFAULT_MAX_MESSAGES);
        assert_eq!(window.len(), 1 + 2 * 3 + 1);
        assert_eq!(window[1].content, "q0");
        assert_eq!(window[6].content, "a2");
    }

    #[test]
    fn empty_history_yields_system_and_question() {
        let window = build_window("sys", &[], "Q", DEFAULT_MAX_MESSAGES);
        assert_eq!(window, vec![ChatMessage::system("sys"), ChatMessage::user("Q")]);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "ok" }));
    }
}
