//! Persistence & rehydration: the JSON envelope the editor saves/loads, the
//! [`StorageAdapter`] abstraction over where those bytes live, and
//! process-level [`EditorConfig`].

pub mod adapter;
pub mod config;
pub mod document_store;
pub mod error;
pub mod schema;

pub use adapter::{FileStorageAdapter, InMemoryStorageAdapter, StorageAdapter};
pub use config::EditorConfig;
pub use document_store::{load_document, save_document};
pub use error::PersistError;
pub use schema::{
    HeadKind, HistorySettings, RetentionSettings, SerializedCommit, SerializedDocument,
    SerializedGraph, SerializedHead, SerializedHistory, DOCUMENT_SCHEMA, HISTORY_SCHEMA,
};
