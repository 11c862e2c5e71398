//! User profile and financial-literacy classification.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::UserId;

/// Coarse financial-literacy classification driving prompt wording.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    /// Still learning about personal finance.
    #[default]
    Basic,
    /// Solid financial knowledge.
    Advanced,
}

impl ProfileType {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user as owned by the account system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// First name.
    pub name: String,
    /// Family name.
    pub second_name: String,
    /// Age in years.
    pub age: u32,
    /// Monthly income in BRL.
    pub income: f64,
    /// Classification; absent on users created before the evaluation flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<ProfileType>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Register a new user with the `basic` classification.
    #[must_use]
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        second_name: impl Into<String>,
        age: u32,
        income: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            second_name: second_name.into(),
            age,
            income,
            profile_type: Some(ProfileType::Basic),
            created_at: Utc::now(),
        }
    }

    /// Classification to use for prompts and new chat records.
    #[must_use]
    pub fn classification(&self) -> ProfileType {
        self.profile_type.unwrap_or_default()
    }

    /// Validate registration fields.
    ///
    /// # Errors
    /// Returns an error if a name is blank or the income is negative or not finite.
    pub fn validate(&self) -> ChatResult<()> {
        if self.name.trim().is_empty() {
            return Err(ChatError::InvalidInput("name is required".to_string()));
        }
        if self.second_name.trim().is_empty() {
            return Err(ChatError::InvalidInput("secondName is required".to_string()));
        }
        if !self.income.is_finite() || self.income < 0.0 {
            return Err(ChatError::InvalidInput(
                "income must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_profile_type_defaults_to_basic() {
        let json = serde_json::json!({
            "id": UserId::new(),
            "name": "Ana",
            "secondName": "Souza",
            "age": 31,
            "income": 4200.0,
            "createdAt": "2024-05-01T12:00:00Z"
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.profile_type, None);
        assert_eq!(user.classification(), ProfileType::Basic);
    }

    #[test]
    fn validate_rejects_negative_income() {
        let user = User::new(UserId::new(), "Ana", "Souza", 31, -1.0);
        assert!(matches!(user.validate(), Err(ChatError::InvalidInput(_))));
    }

    #[test]
    fn validate_rejects_blank_name() {
        let user = User::new(UserId::new(), "  ", "Souza", 31, 10.0);
        assert!(user.validate().is_err());
    }

    #[test]
    fn profile_type_uses_storage_form() {
        let json = serde_json::to_value(ProfileType::Advanced).unwrap();
        assert_eq!(json, ProfileType::Advanced.as_str());
        let parsed: ProfileType = serde_json::from_value(serde_json::json!("basic")).unwrap();
        assert_eq!(parsed, ProfileType::Basic);
        assert!(serde_json::from_value::<ProfileType>(serde_json::json!("expert")).is_err());
    }
}
