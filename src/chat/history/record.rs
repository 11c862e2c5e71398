//! Persisted chat record shape and the page types read back from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ChatId, UserId};
use crate::chat::core::user_profile::ProfileType;
use crate::chat::history::timestamp::StoredTimestamp;

/// Fields every stored chat record must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["chatId", "userId", "profileType", "createdAt"];

/// Per-user container of all turns plus metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    /// Record identifier, equal to the owning user's identifier.
    pub chat_id: ChatId,
    /// Owning user.
    pub user_id: UserId,
    /// Classification snapshot taken when the record was created.
    pub profile_type: ProfileType,
    /// Append-only list of turns.
    pub messages: Vec<Turn>,
    /// Creation time.
    pub created_at: StoredTimestamp,
    /// Time of the last append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<StoredTimestamp>,
}

impl ChatRecord {
    /// Empty record for a user, created at `now`.
    #[must_use]
    pub fn new(user_id: UserId, profile_type: ProfileType, now: StoredTimestamp) -> Self {
        Self {
            chat_id: user_id.clone(),
            user_id,
            profile_type,
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: Some(now),
        }
    }
}

/// One question/answer exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// User question.
    pub question: String,
    /// Assistant answer.
    pub answer: String,
    /// When the turn was appended.
    pub created_at: StoredTimestamp,
}

impl Turn {
    /// Build a turn, rejecting empty questions or answers.
    ///
    /// # Errors
    /// Returns [`ChatError::InvalidTurn`] if either side is empty.
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        created_at: StoredTimestamp,
    ) -> ChatResult<Self> {
        let question = question.into();
        let answer = answer.into();
        if question.is_empty() {
            return Err(ChatError::InvalidTurn("question must not be empty".to_string()));
        }
        if answer.is_empty() {
            return Err(ChatError::InvalidTurn("answer must not be empty".to_string()));
        }
        Ok(Self {
            question,
            answer,
            created_at,
        })
    }
}

/// A turn as read back from storage, before timestamp normalization.
///
/// Reading is lenient: legacy entries may lack any field.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTurn {
    /// User question.
    #[serde(default)]
    pub question: String,
    /// Assistant answer.
    #[serde(default)]
    pub answer: String,
    /// Timestamp in any persisted shape.
    #[serde(default)]
    pub created_at: Value,
}

/// A turn with its timestamp rendered as a canonical ISO string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    /// User question.
    pub question: String,
    /// Assistant answer.
    pub answer: String,
    /// Canonical ISO-8601 creation time.
    pub created_at: String,
}

/// One page of history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Turns in chronological order.
    pub messages: Vec<HistoryMessage>,
    /// Cursor for the next page, present only when the page is full.
    #[serde(rename = "nextPageToken")]
    pub next_cursor: Option<String>,
}

/// Fail with [`ChatError::IncompleteRecord`] when a mandatory field is missing,
/// null or empty.
///
/// # Errors
/// Returns an error naming the owning user when the record is incomplete.
pub fn ensure_complete(user_id: &UserId, document: &Value) -> ChatResult<()> {
    let complete = REQUIRED_FIELDS
        .iter()
        .all(|field| document.get(field).is_some_and(is_present));
    if complete {
        Ok(())
    } else {
        Err(ChatError::IncompleteRecord(user_id.clone()))
    }
}

/// Turns of a stored record in stored order. Missing `messages` reads as empty.
#[must_use]
pub fn stored_turns(document: &Value) -> Vec<StoredTurn> {
    document
        .get("messages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .map(|message| StoredTurn::deserialize(message).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}

/// Push a serialized turn onto `messages` and stamp `updatedAt`.
///
/// Returns `false`, leaving the document untouched, when it is not an object
/// or its `messages` field holds something other than a list.
pub fn push_message(document: &mut Value, message: Value, updated_at: Value) -> bool {
    let Some(fields) = document.as_object_mut() else {
        return false;
    };
    let messages = fields
        .entry("messages")
        .or_insert_with(|| Value::Array(Vec::new()));
    if messages.is_null() {
        *messages = Value::Array(Vec::new());
    }
    let Some(list) = messages.as_array_mut() else {
        return false;
    };
    list.push(message);
    fields.insert("updatedAt".to_string(), updated_at);
    true
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
