//! Paginated, append-only history of a user's turns.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::UserId;
use crate::chat::history::document_store::ChatDocumentStore;
use crate::chat::history::record::{
    ChatRecord, HistoryMessage, HistoryPage, Turn, ensure_complete, stored_turns,
};
use crate::chat::history::timestamp::{StoredTimestamp, normalize, to_iso};
use crate::chat::users::user_store::UserDirectory;

/// Durable append and cursor-paginated read of a user's turns.
pub struct HistoryStore {
    documents: Arc<dyn ChatDocumentStore>,
    users: Arc<dyn UserDirectory>,
}

impl HistoryStore {
    /// Create a history store over injected backends.
    #[must_use]
    pub const fn new(
        documents: Arc<dyn ChatDocumentStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self { documents, users }
    }

    /// Append a question/answer pair stamped with the current time.
    ///
    /// The record is created on first use with the user's classification
    /// (`basic` when the user has none).
    ///
    /// # Errors
    /// - [`ChatError::InvalidTurn`] if the question or answer is empty.
    /// - [`ChatError::NotFound`] if no record exists and the user is unknown.
    /// - [`ChatError::IncompleteRecord`] if the existing record lacks mandatory fields.
    pub async fn append(&self, user_id: &UserId, question: &str, answer: &str) -> ChatResult<()> {
        let now = StoredTimestamp::now();
        let turn = Turn::new(question, answer, now.clone())?;

        match self.documents.get(user_id).await? {
            Some(document) => ensure_complete(user_id, &document)?,
            None => {
                info!(%user_id, "chat record not found, creating a new one");
                let user = self
                    .users
                    .get_user(user_id)
                    .await?
                    .ok_or_else(|| ChatError::NotFound(user_id.clone()))?;
                let record = ChatRecord::new(user_id.clone(), user.classification(), now.clone());
                let inserted = self
                    .documents
                    .insert_if_absent(user_id, serde_json::to_value(&record)?)
                    .await?;
                if !inserted {
                    debug!(%user_id, "chat record created concurrently, reusing it");
                }
            }
        }

        let appended = self
            .documents
            .append_message(
                user_id,
                serde_json::to_value(&turn)?,
                serde_json::to_value(&now)?,
            )
            .await?;
        if !appended {
            return Err(ChatError::IncompleteRecord(user_id.clone()));
        }

        debug!(%user_id, "turn appended");
        Ok(())
    }

    /// Read up to `limit` turns strictly after `cursor`, oldest first.
    ///
    /// An unknown cursor restarts from the beginning. A user without a record
    /// gets an empty page.
    ///
    /// # Errors
    /// Returns [`ChatError::IncompleteRecord`] if the record lacks mandatory
    /// fields, or a storage error.
    pub async fn read_page(
        &self,
        user_id: &UserId,
        limit: usize,
        cursor: Option<&str>,
    ) -> ChatResult<HistoryPage> {
        let Some(document) = self.documents.get(user_id).await? else {
            return Ok(HistoryPage::default());
        };
        ensure_complete(user_id, &document)?;

        let sorted = chronological(&document);
        let page = paginate(&sorted, limit, cursor);
        debug!(
            %user_id,
            total = sorted.len(),
            returned = page.messages.len(),
            "history page read"
        );
        Ok(page)
    }

    /// The last `count` turns, oldest first.
    ///
    /// # Errors
    /// Returns [`ChatError::IncompleteRecord`] if the record lacks mandatory
    /// fields, or a storage error.
    pub async fn recent_turns(&self, user_id: &UserId, count: usize) -> ChatResult<Vec<HistoryMessage>> {
        let Some(document) = self.documents.get(user_id).await? else {
            return Ok(Vec::new());
        };
        ensure_complete(user_id, &document)?;

        let mut sorted = chronological(&document);
        let start = sorted.len().saturating_sub(count);
        Ok(sorted.split_off(start))
    }
}

/// Normalize every turn and stable-sort ascending by creation time.
fn chronological(document: &Value) -> Vec<HistoryMessage> {
    let mut stamped: Vec<_> = stored_turns(document)
        .into_iter()
        .map(|turn| {
            let at = normalize(&turn.created_at);
            (
                at,
                HistoryMessage {
                    question: turn.question,
                    answer: turn.answer,
                    created_at: to_iso(at),
                },
            )
        })
        .collect();
    stamped.sort_by_key(|(at, _)| *at);
    stamped.into_iter().map(|(_, message)| message).collect()
}

/// Slice a chronologically sorted list after `cursor`.
fn paginate(sorted: &[HistoryMessage], limit: usize, cursor: Option<&str>) -> HistoryPage {
    let start = cursor
        .and_then(|cursor| {
            sorted
                .iter()
                .position(|message| message.created_at == cursor)
        })
        .map_or(0, |index| index + 1);

    let messages: Vec<HistoryMessage> = sorted.iter().skip(start).take(limit).cloned().collect();
    let next_cursor = if limit > 0 && messages.len() == limit {
        messages.last().map(|message| message.created_at.clone())
    } else {
        None
    };

    HistoryPage {
        messages,
        next_cursor,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tokio::task::JoinSet;
    use tokio_rusqlite::Connection;

    use super::*;
    use crate::chat::core::user_profile::{ProfileType, User};
    use crate::chat::history::document_store::SqliteChatDocumentStore;
    use crate::chat::history::memory_store::InMemoryChatDocumentStore;
    use crate::chat::users::user_store::InMemoryUserDirectory;

    struct Fixture {
        documents: Arc<InMemoryChatDocumentStore>,
        users: Arc<InMemoryUserDirectory>,
        store: HistoryStore,
    }

    fn fixture() -> Fixture {
        let documents = Arc::new(InMemoryChatDocumentStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let store = HistoryStore::new(documents.clone(), users.clone());
        Fixture {
            documents,
            users,
            store,
        }
    }

    fn register(users: &InMemoryUserDirectory, profile_type: Option<ProfileType>) -> UserId {
        let mut user = User::new(UserId::new(), "Ana", "Souza", 30, 3500.0);
        user.profile_type = profile_type;
        let id = user.id.clone();
        users.insert(user);
        id
    }

    /// Seven turns stored out of order, in all three timestamp shapes.
    fn seeded_document(user_id: &UserId) -> Value {
        let base = 1_714_566_600_i64;
        json!({
            "chatId": user_id.to_string(),
            "userId": user_id.to_string(),
            "profileType": "basic",
            "createdAt": { "seconds": base, "nanoseconds": 0 },
            "messages": [
                { "question": "q3", "answer": "a3", "createdAt": { "_seconds": base + 3, "_nanoseconds": 0 } },
                { "question": "q1", "answer": "a1", "createdAt": { "seconds": base + 1, "nanoseconds": 0 } },
                { "question": "q2", "answer": "a2", "createdAt": "2024-05-01T12:30:02.000Z" },
                { "question": "q5", "answer": "a5", "createdAt": { "seconds": base + 5, "nanoseconds": 500_000_000 } },
                { "question": "q4", "answer": "a4", "createdAt": "2024-05-01T12:30:04.000Z" },
                { "question": "q7", "answer": "a7", "createdAt": { "_seconds": base + 7, "_nanoseconds": 0 } },
                { "question": "q6", "answer": "a6", "createdAt": { "seconds": base + 6, "nanoseconds": 0 } }
            ]
        })
    }

    fn questions(page: &HistoryPage) -> Vec<&str> {
        page.messages.iter().map(|m| m.question.as_str()).collect()
    }

    #[tokio::test]
    async fn append_then_read_returns_turns_in_order() {
        let fx = fixture();
        let user_id = register(&fx.users, Some(ProfileType::Advanced));

        fx.store.append(&user_id, "Q1", "A1").await.unwrap();
        fx.store.append(&user_id, "Q2", "A2").await.unwrap();

        let page = fx.store.read_page(&user_id, 10, None).await.unwrap();
        let pairs: Vec<(&str, &str)> = page
            .messages
            .iter()
            .map(|m| (m.question.as_str(), m.answer.as_str()))
            .collect();
        assert_eq!(pairs, vec![("Q1", "A1"), ("Q2", "A2")]);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn lazy_creation_defaults_to_basic() {
        let fx = fixture();
        let user_id = register(&fx.users, None);

        fx.store.append(&user_id, "Q", "A").await.unwrap();

        let doc = fx.documents.get(&user_id).await.unwrap().unwrap();
        assert_eq!(doc["profileType"], json!("basic"));
        assert_eq!(doc["chatId"], json!(user_id.to_string()));
    }

    #[tokio::test]
    async fn lazy_creation_snapshots_the_user_classification() {
        let fx = fixture();
        let user_id = register(&fx.users, Some(ProfileType::Advanced));
        fx.store.append(&user_id, "Q", "A").await.unwrap();
        let doc = fx.documents.get(&user_id).await.unwrap().unwrap();
        assert_eq!(doc["profileType"], json!("advanced"));
    }

    #[tokio::test]
    async fn first_append_for_unknown_user_is_not_found() {
        let fx = fixture();
        let user_id = UserId::new();
        let err = fx.store.append(&user_id, "Q", "A").await.unwrap_err();
        assert!(matches!(err, ChatError::NotFound(id) if id == user_id));
    }

    #[tokio::test]
    async fn later_appends_do_not_consult_the_user_directory() {
        let fx = fixture();
        let user_id = UserId::new();
        fx.documents.put_document(&user_id, seeded_document(&user_id));

        fx.store.append(&user_id, "q8", "a8").await.unwrap();
        let page = fx.store.read_page(&user_id, 10, None).await.unwrap();
        assert_eq!(page.messages.len(), 8);
        assert_eq!(page.messages.last().map(|m| m.question.as_str()), Some("q8"));
    }

    #[tokio::test]
    async fn incomplete_record_is_reported_on_append_and_read() {
        let fx = fixture();
        let user_id = register(&fx.users, None);
        fx.documents
            .put_document(&user_id, json!({ "userId": user_id.to_string(), "messages": [] }));

        let on_append = fx.store.append(&user_id, "Q", "A").await.unwrap_err();
        assert!(matches!(on_append, ChatError::IncompleteRecord(_)));
        let on_read = fx.store.read_page(&user_id, 5, None).await.unwrap_err();
        assert!(matches!(on_read, ChatError::IncompleteRecord(_)));
    }

    #[tokio::test]
    async fn empty_answer_is_rejected_before_touching_storage() {
        let fx = fixture();
        let user_id = register(&fx.users, None);
        let err = fx.store.append(&user_id, "Q", "").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidTurn(_)));
        assert!(fx.documents.get(&user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_record_reads_as_empty_page() {
        let fx = fixture();
        let page = fx.store.read_page(&UserId::new(), 10, None).await.unwrap();
        assert_eq!(page, HistoryPage::default());
    }

    #[tokio::test]
    async fn pagination_visits_every_turn_once_in_order() {
        let fx = fixture();
        let user_id = UserId::new();
        fx.documents.put_document(&user_id, seeded_document(&user_id));

        let mut sizes = Vec::new();
        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = fx
                .store
                .read_page(&user_id, 3, cursor.as_deref())
                .await
                .unwrap();
            sizes.push(page.messages.len());
            seen.extend(questions(&page).into_iter().map(str::to_string));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(seen, vec!["q1", "q2", "q3", "q4", "q5", "q6", "q7"]);
    }

    #[tokio::test]
    async fn cursor_is_the_canonical_timestamp_of_the_last_item() {
        let fx = fixture();
        let user_id = UserId::new();
        fx.documents.put_document(&user_id, seeded_document(&user_id));

        let page = fx.store.read_page(&user_id, 3, None).await.unwrap();
        assert_eq!(page.next_cursor.as_deref(), Some("2024-05-01T12:30:03.000Z"));
        assert_eq!(page.messages[0].created_at, "2024-05-01T12:30:01.000Z");
    }

    #[tokio::test]
    async fn stale_cursor_restarts_from_the_beginning() {
        let fx = fixture();
        let user_id = UserId::new();
        fx.documents.put_document(&user_id, seeded_document(&user_id));

        let fresh = fx.store.read_page(&user_id, 3, None).await.unwrap();
        let stale = fx
            .store
            .read_page(&user_id, 3, Some("not-a-real-timestamp"))
            .await
            .unwrap();
        assert_eq!(stale, fresh);
    }

    #[tokio::test]
    async fn zero_limit_returns_empty_page_without_cursor() {
        let fx = fixture();
        let user_id = UserId::new();
        fx.documents.put_document(&user_id, seeded_document(&user_id));
        let page = fx.store.read_page(&user_id, 0, None).await.unwrap();
        assert!(page.messages.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn identical_timestamps_keep_stored_order() {
        let fx = fixture();
        let user_id = UserId::new();
        let mut doc = seeded_document(&user_id);
        doc["messages"] = json!([
            { "question": "first", "answer": "a", "createdAt": "2024-05-01T12:00:00.000Z" },
            { "question": "second", "answer": "a", "createdAt": { "seconds": 1_714_564_800, "nanoseconds": 0 } },
            { "question": "third", "answer": "a", "createdAt": "2024-05-01T12:00:00.000Z" }
        ]);
        fx.documents.put_document(&user_id, doc);

        let page = fx.store.read_page(&user_id, 10, None).await.unwrap();
        assert_eq!(questions(&page), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn recent_turns_returns_the_chronological_suffix() {
        let fx = fixture();
        let user_id = UserId::new();
        fx.documents.put_document(&user_id, seeded_document(&user_id));

        let recent = fx.store.recent_turns(&user_id, 2).await.unwrap();
        let names: Vec<&str> = recent.iter().map(|m| m.question.as_str()).collect();
        assert_eq!(names, vec!["q6", "q7"]);

        let all = fx.store.recent_turns(&user_id, 50).await.unwrap();
        assert_eq!(all.len(), 7);
        assert!(fx.store.recent_turns(&UserId::new(), 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_appends_keep_every_turn() {
        let fx = fixture();
        let user_id = register(&fx.users, None);
        let store = Arc::new(fx.store);

        let mut tasks = JoinSet::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            tasks.spawn(async move {
                store
                    .append(&user_id, &format!("q{i}"), &format!("a{i}"))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let page = store.read_page(&user_id, 100, None).await.unwrap();
        assert_eq!(page.messages.len(), 16);
    }

    async fn sqlite_documents() -> Arc<SqliteChatDocumentStore> {
        let conn = Arc::new(Connection::open_in_memory().await.unwrap());
        Arc::new(
            SqliteChatDocumentStore::new(conn, SqliteChatDocumentStore::DEFAULT_TABLE)
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn concurrent_appends_over_sqlite_keep_every_turn() {
        let users = Arc::new(InMemoryUserDirectory::new());
        let user_id = register(&users, Some(ProfileType::Basic));
        let store = Arc::new(HistoryStore::new(sqlite_documents().await, users));

        let mut tasks = JoinSet::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            tasks.spawn(async move {
                store
                    .append(&user_id, &format!("q{i}"), &format!("a{i}"))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let page = store.read_page(&user_id, 100, None).await.unwrap();
        assert_eq!(page.messages.len(), 16);
    }

    #[tokio::test]
    async fn sqlite_record_with_non_list_messages_refuses_append() {
        let documents = sqlite_documents().await;
        let users = Arc::new(InMemoryUserDirectory::new());
        let user_id = register(&users, None);
        let seeded = json!({
            "chatId": user_id.to_string(),
            "userId": user_id.to_string(),
            "profileType": "basic",
            "createdAt": "2024-05-01T12:00:00.000Z",
            "messages": 3
        });
        assert!(documents.insert_if_absent(&user_id, seeded.clone()).await.unwrap());
        let store = HistoryStore::new(documents.clone(), users);

        let err = store.append(&user_id, "Q", "A").await.unwrap_err();
        assert!(matches!(err, ChatError::IncompleteRecord(id) if id == user_id));
        assert_eq!(documents.get(&user_id).await.unwrap(), Some(seeded));
    }
}
