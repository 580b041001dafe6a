//! Wire format for the persisted document, schema
//! `"phototis.editor.v1"`/`"phototis.history.v1"`. These are plain data
//! types; `core-history` is responsible for converting a live `HistoryGraph`
//! to and from [`SerializedGraph`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use core_command::SerializedCommand;
use core_model::CanonicalState;

pub const DOCUMENT_SCHEMA: &str = "phototis.editor.v1";
pub const HISTORY_SCHEMA: &str = "phototis.history.v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedHead {
    #[serde(rename = "type")]
    pub kind: HeadKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadKind {
    Branch,
    Detached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCommit {
    pub id: String,
    pub parent_ids: Vec<String>,
    pub label: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub byte_size: usize,
    pub commands: Vec<SerializedCommand>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedProtected {
    #[serde(default)]
    pub commits: Vec<String>,
    #[serde(default)]
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedGraph {
    pub commits: BTreeMap<String, SerializedCommit>,
    pub branches: BTreeMap<String, String>,
    pub children: BTreeMap<String, Vec<String>>,
    pub head: SerializedHead,
    #[serde(default)]
    pub protected: SerializedProtected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySettings {
    pub max_bytes: u64,
    pub coalesce_window_ms: u64,
    pub autosave_on_transaction_end: bool,
    pub storage_key: String,
    pub auto_create_branch_on_detached: bool,
    pub retention: RetentionSettings,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionSettings {
    pub keep_unreachable_count: usize,
    pub keep_unreachable_days: u64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            keep_unreachable_count: 50,
            keep_unreachable_days: 7,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_bytes: 32 * 1024 * 1024,
            coalesce_window_ms: 120,
            autosave_on_transaction_end: true,
            storage_key: "phototis:editor".to_string(),
            auto_create_branch_on_detached: true,
            retention: RetentionSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedHistory {
    pub version: u32,
    pub schema: String,
    pub saved_at: u64,
    pub graph: SerializedGraph,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<BTreeMap<String, CanonicalState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<HistorySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDocument {
    pub version: u32,
    pub schema: String,
    pub saved_at: u64,
    pub state: CanonicalState,
    pub history: SerializedHistory,
}

impl SerializedDocument {
    pub fn new(saved_at: u64, state: CanonicalState, history: SerializedHistory) -> Self {
        Self {
            version: 1,
            schema: DOCUMENT_SCHEMA.to_string(),
            saved_at,
            state,
            history,
        }
    }
}
