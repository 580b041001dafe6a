//! Glue between [`StorageAdapter`] and the JSON envelope: on load, validate
//! schema version, then rehydrate state and graph.

use crate::adapter::StorageAdapter;
use crate::error::PersistError;
use crate::schema::{SerializedDocument, DOCUMENT_SCHEMA};

pub fn save_document(
    adapter: &dyn StorageAdapter,
    key: &str,
    document: &SerializedDocument,
) -> Result<(), PersistError> {
    let bytes = serde_json::to_vec(document)?;
    adapter.save(key, &bytes)
}

/// Loads and validates the document at `key`. Returns `Ok(None)` if nothing
/// is stored there yet; a present-but-wrong-schema document is an error,
/// not a silent miss.
pub fn load_document(
    adapter: &dyn StorageAdapter,
    key: &str,
) -> Result<Option<SerializedDocument>, PersistError> {
    let Some(bytes) = adapter.load(key)? else {
        return Ok(None);
    };
    let document: SerializedDocument = serde_json::from_slice(&bytes)?;
    if document.schema != DOCUMENT_SCHEMA {
        return Err(PersistError::SchemaMismatch {
            found: document.schema,
            expected: DOCUMENT_SCHEMA.to_string(),
        });
    }
    Ok(Some(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryStorageAdapter;
    use crate::schema::{HeadKind, SerializedGraph, SerializedHead, SerializedHistory, HISTORY_SCHEMA};
    use core_model::CanonicalState;
    use std::collections::BTreeMap;

    fn sample_document() -> SerializedDocument {
        let graph = SerializedGraph {
            commits: BTreeMap::new(),
            branches: BTreeMap::from([("main".to_string(), "root".to_string())]),
            children: BTreeMap::new(),
            head: SerializedHead {
                kind: HeadKind::Branch,
                name: Some("main".to_string()),
                at: "root".to_string(),
            },
            protected: Default::default(),
        };
        let history = SerializedHistory {
            version: 1,
            schema: HISTORY_SCHEMA.to_string(),
            saved_at: 0,
            graph,
            snapshots: None,
            settings: None,
        };
        SerializedDocument::new(0, CanonicalState::new(800, 600), history)
    }

    #[test]
    fn round_trips_through_adapter() {
        let adapter = InMemoryStorageAdapter::new();
        let document = sample_document();
        save_document(&adapter, "phototis:editor", &document).unwrap();
        let loaded = load_document(&adapter, "phototis:editor").unwrap().unwrap();
        assert_eq!(loaded.state, document.state);
    }

    #[test]
    fn missing_key_loads_none() {
        let adapter = InMemoryStorageAdapter::new();
        assert!(load_document(&adapter, "phototis:editor").unwrap().is_none());
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let adapter = InMemoryStorageAdapter::new();
        let mut document = sample_document();
        document.schema = "something-else.v1".to_string();
        let bytes = serde_json::to_vec(&document).unwrap();
        adapter.save("phototis:editor", &bytes).unwrap();
        let err = load_document(&adapter, "phototis:editor").unwrap_err();
        assert!(matches!(err, PersistError::SchemaMismatch { .. }));
    }
}
