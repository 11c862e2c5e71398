//! Chat history persistence.
//!
//! - `timestamp`: normalization of the persisted timestamp shapes
//! - `record`: stored record shape and page types
//! - `document_store`: document store trait and `SQLite` backend
//! - `memory_store`: in-memory backend
//! - `history_store`: append and cursor pagination over a user's turns

pub mod document_store;
pub mod history_store;
pub mod memory_store;
pub mod record;
pub mod timestamp;

pub use document_store::{ChatDocumentStore, SqliteChatDocumentStore, StoreFuture};
pub use history_store::HistoryStore;
pub use memory_store::InMemoryChatDocumentStore;
pub use record::{ChatRecord, HistoryMessage, HistoryPage, Turn};
pub use timestamp::{StoredTimestamp, normalize, to_iso};
