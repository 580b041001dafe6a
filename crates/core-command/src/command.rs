use thiserror::Error;

use core_model::{CanonicalState, ModelError};

use crate::meta::CommandMeta;
use crate::serialized::SerializedCommand;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("unknown command tag: {0}")]
    UnknownTag(String),
}

/// A typed, reversible edit. Commands are pure values: all mutation lives
/// inside the history engine, never inside a command impl.
pub trait Command: std::fmt::Debug + Send + Sync {
    fn meta(&self) -> &CommandMeta;

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError>;

    /// Produces the inverse command. The engine guarantees this is always
    /// called with the exact `prev` that was passed to the matching `apply`
    /// and the `next` it returned, so implementations are free to read
    /// whatever they need from either rather than pre-capturing snapshots
    /// into their own fields (see DESIGN.md).
    fn invert(&self, prev: &CanonicalState, next: &CanonicalState) -> BoxedCommand;

    fn can_coalesce_with(&self, _other: &dyn Command) -> bool {
        false
    }

    /// Only ever invoked when `can_coalesce_with` returned true for the same
    /// pair; the default body is unreachable in practice.
    fn coalesce_with(self: Box<Self>, _other: BoxedCommand) -> BoxedCommand
    where
        Self: Sized,
    {
        self
    }

    /// Byte estimate used for retention accounting. Fallback heuristic:
    /// `128 + len(serialize(meta))`.
    fn estimate_size(&self) -> usize {
        self.meta().estimated_size.unwrap_or_else(|| {
            let meta_len = serde_json::to_vec(self.meta()).map(|b| b.len()).unwrap_or(0);
            128 + meta_len
        })
    }

    fn serialize(&self) -> SerializedCommand;

    fn clone_box(&self) -> BoxedCommand;
}

pub type BoxedCommand = Box<dyn Command>;

impl Clone for BoxedCommand {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
