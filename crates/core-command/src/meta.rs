use serde::{Deserialize, Serialize};

/// Which part of the canonical state a command primarily touches. Informs
/// UI grouping and is carried through to serialization; it has no bearing on
/// `apply`/`invert` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    Layers,
    Tool,
    Canvas,
    Document,
    Global,
}

/// Metadata carried by every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMeta {
    pub label: String,
    pub scope: Scope,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub coalescable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_key: Option<String>,
    #[serde(default)]
    pub non_undoable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_size: Option<usize>,
}

impl CommandMeta {
    pub fn new(label: impl Into<String>, scope: Scope, timestamp_ms: u64) -> Self {
        Self {
            label: label.into(),
            scope,
            timestamp_ms,
            coalescable: false,
            merge_key: None,
            non_undoable: false,
            estimated_size: None,
        }
    }

    pub fn coalescable(mut self, merge_key: impl Into<String>) -> Self {
        self.coalescable = true;
        self.merge_key = Some(merge_key.into());
        self
    }

    pub fn non_undoable(mut self) -> Self {
        self.non_undoable = true;
        self
    }
}

/// Concrete `mergeKey` strings used by the built-in coalescable commands.
pub mod merge_keys {
    pub const VIEWPORT: &str = "viewport";

    pub fn adjustment(id: &str) -> String {
        format!("adjustment:{id}")
    }

    pub fn reorder(id: &str) -> String {
        format!("reorder:{id}")
    }
}
