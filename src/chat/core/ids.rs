// File: src/chat/core/ids.rs

//! Identifier types for users and their chat records.
//!
//! User identifiers are opaque strings issued by the account system. A chat
//! record is keyed by the identifier of the user that owns it, so `ChatId` is
//! an alias of `UserId` rather than a separate newtype.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a raw user identifier was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UserIdError {
    /// Empty after trimming.
    #[error("user id is empty")]
    Empty,
    /// Longer than [`UserId::MAX_LEN`].
    #[error("user id too long (max {max}, got {got})")]
    TooLong {
        /// Allowed maximum.
        max: usize,
        /// Received length.
        got: usize,
    },
    /// Contains whitespace or a control character.
    #[error("user id contains invalid character {ch:?} at index {index}")]
    InvalidChar {
        /// Offending character.
        ch: char,
        /// Character index.
        index: usize,
    },
}

/// User account identifier, as issued by the account system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Hard ceiling to prevent pathological payloads.
    pub const MAX_LEN: usize = 128;

    /// Build a validated `UserId`.
    ///
    /// Rules:
    /// - Non-empty after trimming.
    /// - At most [`Self::MAX_LEN`] bytes.
    /// - No whitespace or control characters inside.
    ///
    /// # Errors
    /// Returns `UserIdError` if the input is empty, too long, or contains invalid characters.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, UserIdError> {
        let s = raw.as_ref().trim();

        if s.is_empty() {
            return Err(UserIdError::Empty);
        }
        if s.len() > Self::MAX_LEN {
            return Err(UserIdError::TooLong {
                max: Self::MAX_LEN,
                got: s.len(),
            });
        }
        if let Some((index, ch)) = s
            .chars()
            .enumerate()
            .find(|(_, ch)| ch.is_whitespace() || ch.is_control())
        {
            return Err(UserIdError::InvalidChar { ch, index });
        }

        Ok(Self(s.to_owned()))
    }

    /// Create a new random identifier.
    #[cfg(test)]
    #[allow(clippy::new_without_default)]
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// A chat record shares the identifier of its owning user.
pub type ChatId = UserId;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn account_system_uid_is_accepted() {
        let id: UserId = "Xk3aP9qLmZbT2vYcR8sWn4eHd1F2".parse().unwrap();
        assert_eq!(id.as_str(), "Xk3aP9qLmZbT2vYcR8sWn4eHd1F2");
        assert_eq!(id.to_string(), "Xk3aP9qLmZbT2vYcR8sWn4eHd1F2");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let id = UserId::parse("  user-42 ").unwrap();
        assert_eq!(id.as_str(), "user-42");
    }

    #[test]
    fn invalid_ids_are_rejected() {
        assert_eq!(UserId::parse("   "), Err(UserIdError::Empty));
        assert_eq!(
            UserId::parse("a b"),
            Err(UserIdError::InvalidChar { ch: ' ', index: 1 })
        );
        assert!(matches!(
            UserId::parse("x".repeat(UserId::MAX_LEN + 1)),
            Err(UserIdError::TooLong { .. })
        ));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = UserId::new();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));

        let restored: UserId = serde_json::from_value(json).unwrap();
        assert_eq!(restored, id);
        assert!(serde_json::from_value::<UserId>(serde_json::json!("")).is_err());
    }
}
