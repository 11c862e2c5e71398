//! User directory: lookup, registration and classification updates.

use std::sync::Arc;

use dashmap::DashMap;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::UserId;
use crate::chat::core::user_profile::{ProfileType, User};
use crate::chat::history::document_store::StoreFuture;

/// User directory trait.
pub trait UserDirectory: Send + Sync {
    /// Get a user by ID.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_user(&self, user_id: &UserId) -> StoreFuture<'_, ChatResult<Option<User>>>;

    /// Save or replace a user.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn save_user(&self, user: &User) -> StoreFuture<'_, ChatResult<()>>;

    /// Set a user's classification; `false` if the user does not exist.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn update_profile_type(
        &self,
        user_id: &UserId,
        profile_type: ProfileType,
    ) -> StoreFuture<'_, ChatResult<bool>>;
}

/// `SQLite` implementation of the user directory.
pub struct SqliteUserDirectory {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteUserDirectory {
    /// Table name for users.
    pub const DEFAULT_TABLE: &'static str = "users";

    /// Initialize the directory and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>, table: impl Into<String>) -> ChatResult<Self> {
        let table = table.into();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    user_id TEXT PRIMARY KEY,
                    user_json TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl UserDirectory for SqliteUserDirectory {
    fn get_user(&self, user_id: &UserId) -> StoreFuture<'_, ChatResult<Option<User>>> {
        let user_id_str = user_id.to_string();
        Box::pin(async move {
            let table = self.table.clone();

            let result = self
                .conn
                .call(move |conn| {
                    let row: Option<String> = conn
                        .query_row(
                            &format!("SELECT user_json FROM {table} WHERE user_id = ?1"),
                            rusqlite::params![user_id_str],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;

            match result {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn save_user(&self, user: &User) -> StoreFuture<'_, ChatResult<()>> {
        let user = user.clone();
        Box::pin(async move {
            let table = self.table.clone();
            let user_id_str = user.id.to_string();
            let user_json = serde_json::to_string(&user)?;
            let created_at = user.created_at.timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table} (user_id, user_json, created_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![user_id_str, user_json, created_at],
                    )?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
    }

    fn update_profile_type(
        &self,
        user_id: &UserId,
        profile_type: ProfileType,
    ) -> StoreFuture<'_, ChatResult<bool>> {
        let user_id_str = user_id.to_string();
        Box::pin(async move {
            let table = self.table.clone();

            let changed = self
                .conn
                .call(move |conn| {
                    let changed = conn.execute(
                        &format!(
                            "UPDATE {table}
                             SET user_json = json_set(user_json, '$.profileType', ?1)
                             WHERE user_id = ?2"
                        ),
                        rusqlite::params![profile_type.as_str(), user_id_str],
                    )?;
                    Ok(changed)
                })
                .await?;

            Ok(changed > 0)
        })
    }
}

/// Process-local user directory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user synchronously.
    pub fn insert(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get_user(&self, user_id: &UserId) -> StoreFuture<'_, ChatResult<Option<User>>> {
        let user = self.users.get(user_id).map(|user| user.value().clone());
        Box::pin(std::future::ready(Ok(user)))
    }

    fn save_user(&self, user: &User) -> StoreFuture<'_, ChatResult<()>> {
        self.insert(user.clone());
        Box::pin(std::future::ready(Ok(())))
    }

    fn update_profile_type(
        &self,
        user_id: &UserId,
        profile_type: ProfileType,
    ) -> StoreFuture<'_, ChatResult<bool>> {
        let updated = self.users.get_mut(user_id).is_some_and(|mut user| {
            user.profile_type = Some(profile_type);
            true
        });
        Box::pin(std::future::ready(Ok(updated)))
    }
}
