use core_model::{ops, CanonicalState, DocumentDimensionsArgs, DocumentFlipArgs};

use crate::command::{BoxedCommand, Command, CommandError};
use crate::meta::CommandMeta;
use crate::serialized::SerializedCommand;

#[derive(Debug, Clone)]
pub struct DocumentRotate {
    pub meta: CommandMeta,
    pub delta_deg: f64,
}

impl Command for DocumentRotate {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::document_rotate(state, self.delta_deg)?)
    }

    fn invert(&self, _prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(DocumentRotate {
            meta: CommandMeta::new("Undo Document Rotate", self.meta.scope, self.meta.timestamp_ms),
            delta_deg: -self.delta_deg,
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::DocumentRotate {
            meta: self.meta.clone(),
            delta_deg: self.delta_deg,
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct DocumentFlip {
    pub meta: CommandMeta,
    pub args: DocumentFlipArgs,
}

impl Command for DocumentFlip {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::document_flip(state, self.args)?)
    }

    /// A flip along a given axis is its own inverse (flipping twice restores
    /// the original), so the inverse command is identical to this one.
    fn invert(&self, _prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(DocumentFlip {
            meta: CommandMeta::new("Undo Document Flip", self.meta.scope, self.meta.timestamp_ms),
            args: self.args,
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::DocumentFlip {
            meta: self.meta.clone(),
            args: self.args,
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct DocumentDimensions {
    pub meta: CommandMeta,
    pub next: DocumentDimensionsArgs,
}

impl Command for DocumentDimensions {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::document_dimensions(state, &self.next)?)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        let layers = self
            .next
            .layers
            .iter()
            .filter_map(|layer| prev.layers.get(layer.id()).cloned())
            .collect();
        Box::new(DocumentDimensions {
            meta: CommandMeta::new(
                "Undo Document Dimensions",
                self.meta.scope,
                self.meta.timestamp_ms,
            ),
            next: DocumentDimensionsArgs {
                width: prev.document.width,
                height: prev.document.height,
                anchor: prev.document.anchor,
                layers,
            },
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::DocumentDimensions {
            meta: self.meta.clone(),
            next: self.next.clone(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Scope;

    #[test]
    fn flip_is_self_inverse() {
        let state = CanonicalState::new(100, 100);
        let cmd = DocumentFlip {
            meta: CommandMeta::new("Flip", Scope::Document, 0),
            args: DocumentFlipArgs { h: true, v: false },
        };
        let next = cmd.apply(&state).unwrap();
        let inverse = cmd.invert(&state, &next);
        let back = inverse.apply(&next).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn rotate_invert_negates_delta() {
        let state = CanonicalState::new(100, 100);
        let cmd = DocumentRotate {
            meta: CommandMeta::new("Rotate", Scope::Document, 0),
            delta_deg: 45.0,
        };
        let next = cmd.apply(&state).unwrap();
        let inverse = cmd.invert(&state, &next);
        let back = inverse.apply(&next).unwrap();
        assert_eq!(back, state);
    }
}
