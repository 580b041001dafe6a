use thiserror::Error;

/// Storage/serialization failures. Callers treat both as non-fatal: log and
/// continue.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage adapter failed: {0}")]
    Adapter(String),
    #[error("no document found for key {0:?}")]
    NotFound(String),
    #[error("unsupported schema {found:?}, expected {expected:?}")]
    SchemaMismatch { found: String, expected: String },
    #[error("malformed persisted document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] anyhow::Error),
}
