//! In-memory chat document store.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::UserId;
use crate::chat::history::document_store::{ChatDocumentStore, StoreFuture};
use crate::chat::history::record::push_message;

/// Process-local document store; appends are serialized by the shard lock.
#[derive(Debug, Default)]
pub struct InMemoryChatDocumentStore {
    documents: DashMap<UserId, Value>,
}

impl InMemoryChatDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a raw document, bypassing every check.
    #[cfg(test)]
    pub fn put_document(&self, user_id: &UserId, document: Value) {
        self.documents.insert(user_id.clone(), document);
    }
}

impl ChatDocumentStore for InMemoryChatDocumentStore {
    fn get(&self, user_id: &UserId) -> StoreFuture<'_, ChatResult<Option<Value>>> {
        let document = self.documents.get(user_id).map(|doc| doc.value().clone());
        Box::pin(std::future::ready(Ok(document)))
    }

    fn insert_if_absent(
        &self,
        user_id: &UserId,
        document: Value,
    ) -> StoreFuture<'_, ChatResult<bool>> {
        let inserted = match self.documents.entry(user_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(document);
                true
            }
        };
        Box::pin(std::future::ready(Ok(inserted)))
    }

    fn append_message(
        &self,
        user_id: &UserId,
        message: Value,
        updated_at: Value,
    ) -> StoreFuture<'_, ChatResult<bool>> {
        let appended = self
            .documents
            .get_mut(user_id)
            .is_some_and(|mut doc| push_message(doc.value_mut(), message, updated_at));
        Box::pin(std::future::ready(Ok(appended)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn append_requires_an_existing_record() {
        let store = InMemoryChatDocumentStore::new();
        let user_id = UserId::new();
        assert!(!store.append_message(&user_id, json!({}), json!("t")).await.unwrap());

        store.put_document(&user_id, json!({ "messages": [] }));
        assert!(store.append_message(&user_id, json!({}), json!("t")).await.unwrap());
        let doc = store.get(&user_id).await.unwrap().unwrap();
        assert_eq!(doc["messages"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn insert_if_absent_does_not_overwrite() {
        let store = InMemoryChatDocumentStore::new();
        let user_id = UserId::new();
        assert!(store.insert_if_absent(&user_id, json!(1)).await.unwrap());
        assert!(!store.insert_if_absent(&user_id, json!(2)).await.unwrap());
        assert_eq!(store.get(&user_id).await.unwrap(), Some(json!(1)));
    }
}
