//! Document storage for chat records.
//!
//! Records are kept as JSON documents keyed by user so that legacy shapes
//! (mixed timestamp representations, missing fields) survive untouched.
//! Appends are atomic at the storage layer: concurrent appends for the same
//! user never drop a turn.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rusqlite::OptionalExtension;
use serde_json::Value;
use tokio_rusqlite::Connection;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::UserId;
use crate::chat::history::record::push_message;

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Chat record document store.
pub trait ChatDocumentStore: Send + Sync {
    /// Fetch the raw record document for a user.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get(&self, user_id: &UserId) -> StoreFuture<'_, ChatResult<Option<Value>>>;

    /// Insert a record unless one already exists; `true` when inserted.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn insert_if_absent(
        &self,
        user_id: &UserId,
        document: Value,
    ) -> StoreFuture<'_, ChatResult<bool>>;

    /// Atomically push `message` onto the record's `messages` and set `updatedAt`.
    ///
    /// Returns `false` when there is no record or it cannot hold messages.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append_message(
        &self,
        user_id: &UserId,
        message: Value,
        updated_at: Value,
    ) -> StoreFuture<'_, ChatResult<bool>>;
}

/// `SQLite` implementation of the chat document store.
pub struct SqliteChatDocumentStore {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteChatDocumentStore {
    /// Table name for chat records.
    pub const DEFAULT_TABLE: &'static str = "chats";

    /// Initialize the store and create the table if it doesn't exist.
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
                    document TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl ChatDocumentStore for SqliteChatDocumentStore {
    fn get(&self, user_id: &UserId) -> StoreFuture<'_, ChatResult<Option<Value>>> {
        let user_id_str = user_id.to_string();
        Box::pin(async move {
            let table = self.table.clone();

            let row = self
                .conn
                .call(move |conn| {
                    let row: Option<String> = conn
                        .query_row(
                            &format!("SELECT document FROM {table} WHERE user_id = ?1"),
                            rusqlite::params![user_id_str],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;

            match row {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
    }

    fn insert_if_absent(
        &self,
        user_id: &UserId,
        document: Value,
    ) -> StoreFuture<'_, ChatResult<bool>> {
        let user_id_str = user_id.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let document = serde_json::to_string(&document)?;
            let now_ms = chrono::Utc::now().timestamp_millis();

            let inserted = self
                .conn
                .call(move |conn| {
                    let changed = conn.execute(
                        &format!(
                            "INSERT OR IGNORE INTO {table} (user_id, document, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![user_id_str, document, now_ms],
                    )?;
                    Ok(changed == 1)
                })
                .await?;

            Ok(inserted)
        })
    }

    fn append_message(
        &self,
        user_id: &UserId,
        message: Value,
        updated_at: Value,
    ) -> StoreFuture<'_, ChatResult<bool>> {
        let user_id_str = user_id.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let now_ms = chrono::Utc::now().timestamp_millis();

            let appended = self
                .conn
                .call(move |conn| {
                    // Read-modify-write under one write transaction.
                    let tx = conn.transaction_with_behavior(
                        rusqlite::TransactionBehavior::Immediate,
                    )?;
                    let existing: Option<String> = tx
                        .query_row(
                            &format!("SELECT document FROM {table} WHERE user_id = ?1"),
                            rusqlite::params![user_id_str],
                            |row| row.get(0),
                        )
                        .optional()?;
                    let Some(existing) = existing else {
                        return Ok(false);
                    };

                    let mut document: Value = serde_json::from_str(&existing)
                        .map_err(|err| tokio_rusqlite::Error::Other(Box::new(err)))?;
                    if !push_message(&mut document, message, updated_at) {
                        return Ok(false);
                    }
                    let document = serde_json::to_string(&document)
                        .map_err(|err| tokio_rusqlite::Error::Other(Box::new(err)))?;

                    tx.execute(
                        &format!(
                            "UPDATE {table} SET document = ?1, updated_at = ?2 WHERE user_id = ?3"
                        ),
                        rusqlite::params![document, now_ms, user_id_str],
                    )?;
                    tx.commit()?;
                    Ok(true)
                })
                .await?;

            Ok(appended)
        })
    }
}
