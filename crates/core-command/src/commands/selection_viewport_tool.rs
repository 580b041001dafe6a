use std::collections::BTreeSet;

use core_model::viewport::ViewportPatch;
use core_model::{ops, ActiveTool, CanonicalState, LayerId};

use crate::command::{BoxedCommand, Command, CommandError};
use crate::meta::CommandMeta;
use crate::serialized::SerializedCommand;

#[derive(Debug, Clone)]
pub struct SetSelection {
    pub meta: CommandMeta,
    pub ids: BTreeSet<LayerId>,
}

impl Command for SetSelection {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::set_selection(state, self.ids.clone())?)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(SetSelection {
            meta: CommandMeta::new("Undo Set Selection", self.meta.scope, self.meta.timestamp_ms),
            ids: prev.selection.clone(),
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::SetSelection {
            meta: self.meta.clone(),
            ids: self.ids.iter().cloned().collect(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SetViewport {
    pub meta: CommandMeta,
    pub patch: ViewportPatch,
}

impl Command for SetViewport {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::set_viewport(state, &self.patch)?)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(SetViewport {
            meta: CommandMeta::new("Undo Set Viewport", self.meta.scope, self.meta.timestamp_ms),
            patch: ViewportPatch::capture(&prev.viewport, &self.patch),
        })
    }

    fn can_coalesce_with(&self, other: &dyn Command) -> bool {
        self.meta.coalescable && other.meta().merge_key.as_deref() == self.meta.merge_key.as_deref()
    }

    fn coalesce_with(self: Box<Self>, other: BoxedCommand) -> BoxedCommand {
        let other_meta = other.meta().clone();
        let SerializedCommand::SetViewport { patch, .. } = other.serialize() else {
            return other;
        };
        Box::new(SetViewport {
            meta: other_meta,
            patch,
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::SetViewport {
            meta: self.meta.clone(),
            patch: self.patch.clone(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SetActiveTool {
    pub meta: CommandMeta,
    pub active: ActiveTool,
}

impl Command for SetActiveTool {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::set_active_tool(state, self.active.clone())?)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(SetActiveTool {
            meta: CommandMeta::new("Undo Set Active Tool", self.meta.scope, self.meta.timestamp_ms),
            active: prev.active_tool.clone(),
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::SetActiveTool {
            meta: self.meta.clone(),
            active: self.active.clone(),
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
    fn set_viewport_invert_restores_prior_values() {
        let mut state = CanonicalState::new(200, 200);
        state.viewport.zoom = 1.0;
        let patch = ViewportPatch {
            zoom: Some(2.5),
            ..Default::default()
        };
        let cmd = SetViewport {
            meta: CommandMeta::new("Zoom", Scope::Canvas, 0).coalescable(crate::meta::merge_keys::VIEWPORT),
            patch,
        };
        let next = cmd.apply(&state).unwrap();
        assert_eq!(next.viewport.zoom, 2.5);
        let inverse = cmd.invert(&state, &next);
        let back = inverse.apply(&next).unwrap();
        assert_eq!(back.viewport.zoom, 1.0);
    }
}
