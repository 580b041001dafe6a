//! The command algebra: typed, reversible edits over a
//! [`core_model::CanonicalState`]. Every command is a pure value; the only
//! thing that ever owns a live document is the history engine in
//! `core-history`, which calls [`Command::apply`]/[`Command::invert`] and
//! nothing else.

pub mod command;
pub mod commands;
pub mod meta;
pub mod registry;
pub mod serialized;

pub use command::{BoxedCommand, Command, CommandError};
pub use meta::{merge_keys, CommandMeta, Scope};
pub use registry::deserialize_command;
pub use serialized::SerializedCommand;
