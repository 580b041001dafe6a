//! Export/import and save/load: converting between the live
//! [`HistoryGraph`] and the [`core_persist`] wire schema, and the async FIFO
//! wrapper that serializes save/load-class operations against a single
//! storage key.

use std::sync::atomic::Ordering;

use base64::Engine;

use core_command::deserialize_command;
use core_persist::{
    HeadKind, SerializedCommit, SerializedDocument, SerializedGraph, SerializedHead,
    SerializedHistory, SerializedProtected, HISTORY_SCHEMA,
};

use crate::engine::HistoryEngine;
use crate::error::HistoryError;
use crate::graph::{Commit, Head, HistoryGraph, Protected};

fn thumbnail_to_wire(bytes: &Option<Vec<u8>>) -> Option<String> {
    bytes
        .as_ref()
        .map(|b| base64::engine::general_purpose::STANDARD.encode(b))
}

fn thumbnail_from_wire(encoded: &Option<String>) -> Option<Vec<u8>> {
    encoded
        .as_ref()
        .and_then(|s| base64::engine::general_purpose::STANDARD.decode(s).ok())
}

fn graph_to_wire(graph: &HistoryGraph) -> SerializedGraph {
    let commits = graph
        .commits
        .iter()
        .map(|(id, commit)| {
            (
                id.clone(),
                SerializedCommit {
                    id: commit.id.clone(),
                    parent_ids: commit.parent_ids.clone(),
                    label: commit.label.clone(),
                    timestamp: commit.timestamp_ms,
                    thumbnail: thumbnail_to_wire(&commit.thumbnail),
                    byte_size: commit.byte_size,
                    commands: commit.commands.iter().map(|c| c.serialize()).collect(),
                },
            )
        })
        .collect();
    let head = match &graph.head {
        Head::Branch { name, at } => SerializedHead {
            kind: HeadKind::Branch,
            name: Some(name.clone()),
            at: at.clone(),
        },
        Head::Detached { at } => SerializedHead {
            kind: HeadKind::Detached,
            name: None,
            at: at.clone(),
        },
    };
    SerializedGraph {
        commits,
        branches: graph.branches.clone(),
        children: graph.children.clone(),
        head,
        protected: SerializedProtected {
            commits: graph.protected.commits.iter().cloned().collect(),
            branches: graph.protected.branches.iter().cloned().collect(),
        },
    }
}

fn wire_to_graph(wire: &SerializedGraph) -> Result<HistoryGraph, HistoryError> {
    let mut commits = std::collections::BTreeMap::new();
    for (id, sc) in &wire.commits {
        let commands = sc
            .commands
            .iter()
            .cloned()
            .map(deserialize_command)
            .collect();
        commits.insert(
            id.clone(),
            Commit {
                id: sc.id.clone(),
                parent_ids: sc.parent_ids.clone(),
                label: sc.label.clone(),
                timestamp_ms: sc.timestamp,
                thumbnail: thumbnail_from_wire(&sc.thumbnail),
                commands,
                byte_size: sc.byte_size,
            },
        );
    }
    let head = match wire.head.kind {
        HeadKind::Branch => Head::Branch {
            name: wire
                .head
                .name
                .clone()
                .ok_or_else(|| HistoryError::SerializationError("branch head missing name".to_string()))?,
            at: wire.head.at.clone(),
        },
        HeadKind::Detached => Head::Detached { at: wire.head.at.clone() },
    };
    Ok(HistoryGraph {
        commits,
        branches: wire.branches.clone(),
        children: wire.children.clone(),
        head,
        protected: Protected {
            commits: wire.protected.commits.iter().cloned().collect(),
            branches: wire.protected.branches.iter().cloned().collect(),
        },
    })
}

impl HistoryEngine {
    /// A complete, storage-adapter-independent snapshot of the document and
    /// its history, ready to hand to `import_document`.
    pub fn export_document(&self) -> SerializedDocument {
        let history = SerializedHistory {
            version: 1,
            schema: HISTORY_SCHEMA.to_string(),
            saved_at: self.clock.now_ms(),
            graph: graph_to_wire(&self.graph),
            snapshots: None,
            settings: Some(self.settings.clone()),
        };
        SerializedDocument::new(self.clock.now_ms(), self.state.clone(), history)
    }

    /// Replaces the live state, graph, and settings wholesale. The baseline
    /// state is recomputed by replaying the imported root forward, since the
    /// wire format carries no separate baseline snapshot.
    pub fn import_document(&mut self, document: SerializedDocument) -> Result<(), HistoryError> {
        if document.schema != core_persist::DOCUMENT_SCHEMA {
            return Err(HistoryError::Persist(core_persist::PersistError::SchemaMismatch {
                found: document.schema,
                expected: core_persist::DOCUMENT_SCHEMA.to_string(),
            }));
        }
        let graph = wire_to_graph(&document.history.graph)?;
        if let Some(settings) = document.history.settings {
            self.settings = settings;
        }
        self.graph = graph;
        self.state = document.state;
        self.baseline_state = self.state_at(self.graph.root_id())?;
        Ok(())
    }

    /// Saves the current document under `key`, serializing concurrent
    /// save/load calls through the engine's FIFO queue.
    pub async fn save(&self, key: &str) -> Result<(), HistoryError> {
        self.telemetry.async_ops_started.fetch_add(1, Ordering::Relaxed);
        let _permit = self.io_queue.lock().await;
        let document = self.export_document();
        let result = core_persist::save_document(self.storage.as_ref(), key, &document).map_err(HistoryError::from);
        self.telemetry.async_ops_completed.fetch_add(1, Ordering::Relaxed);
        result
    }

    pub async fn save_default(&self) -> Result<(), HistoryError> {
        let key = self.settings.storage_key.clone();
        self.save(&key).await
    }

    /// Loads and rehydrates the document stored at `key`, if any.
    pub async fn load_at(&mut self, key: &str) -> Result<bool, HistoryError> {
        self.telemetry.async_ops_started.fetch_add(1, Ordering::Relaxed);
        let _permit = self.io_queue.lock().await;
        let loaded = core_persist::load_document(self.storage.as_ref(), key)?;
        let found = loaded.is_some();
        if let Some(document) = loaded {
            self.import_document(document)?;
        }
        self.telemetry.async_ops_completed.fetch_add(1, Ordering::Relaxed);
        Ok(found)
    }
}
