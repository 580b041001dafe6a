use core_model::{ops, AddPosition, CanonicalState, Layer, LayerId, LayerPatch};

use crate::command::{BoxedCommand, Command, CommandError};
use crate::meta::CommandMeta;
use crate::serialized::SerializedCommand;

#[derive(Debug, Clone)]
pub struct AddLayer {
    pub meta: CommandMeta,
    pub layer: Layer,
    pub position: AddPosition,
}

impl Command for AddLayer {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::add_layer(state, self.layer.clone(), &self.position)?)
    }

    fn invert(&self, _prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(RemoveLayer {
            meta: CommandMeta::new("Undo Add Layer", self.meta.scope, self.meta.timestamp_ms),
            id: self.layer.id().clone(),
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::AddLayer {
            meta: self.meta.clone(),
            layer: self.layer.clone(),
            position: self.position.clone(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct RemoveLayer {
    pub meta: CommandMeta,
    pub id: LayerId,
}

impl Command for RemoveLayer {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        let (next, _layer, _idx) = ops::remove_layer(state, &self.id)?;
        Ok(next)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        // `prev` is guaranteed to be the exact state `apply` ran against, so
        // the layer and its index can be read straight out of it instead of
        // being stashed on this command.
        let idx = prev
            .layers
            .order
            .iter()
            .position(|id| id == &self.id)
            .unwrap_or(prev.layers.order.len());
        let layer = prev
            .layers
            .get(&self.id)
            .cloned()
            .expect("invert(prev,_) called with the prev that RemoveLayer::apply consumed");
        Box::new(AddLayer {
            meta: CommandMeta::new("Undo Remove Layer", self.meta.scope, self.meta.timestamp_ms),
            layer,
            position: AddPosition::Index(idx),
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::RemoveLayer {
            meta: self.meta.clone(),
            id: self.id.clone(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ReorderLayers {
    pub meta: CommandMeta,
    pub from: usize,
    pub to: usize,
}

impl Command for ReorderLayers {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::reorder_layer(state, self.from, self.to)?)
    }

    fn invert(&self, _prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(ReorderLayers {
            meta: CommandMeta::new("Undo Reorder Layers", self.meta.scope, self.meta.timestamp_ms),
            from: self.to,
            to: self.from,
        })
    }

    fn can_coalesce_with(&self, other: &dyn Command) -> bool {
        other
            .meta()
            .merge_key
            .as_deref()
            .zip(self.meta.merge_key.as_deref())
            .is_some_and(|(a, b)| a == b)
    }

    fn coalesce_with(self: Box<Self>, other: BoxedCommand) -> BoxedCommand {
        let other_meta = other.meta().clone();
        let other_ser = other.serialize();
        let SerializedCommand::ReorderLayers { to, .. } = other_ser else {
            return other;
        };
        Box::new(ReorderLayers {
            meta: other_meta,
            from: self.from,
            to,
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::ReorderLayers {
            meta: self.meta.clone(),
            from: self.from,
            to: self.to,
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct UpdateLayer {
    pub meta: CommandMeta,
    pub id: LayerId,
    pub patch: LayerPatch,
}

impl Command for UpdateLayer {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        Ok(ops::update_layer(state, &self.id, &self.patch)?)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        let captured = prev
            .layers
            .get(&self.id)
            .map(|layer| LayerPatch::capture(layer, &self.patch))
            .unwrap_or_default();
        Box::new(UpdateLayer {
            meta: CommandMeta::new("Undo Update Layer", self.meta.scope, self.meta.timestamp_ms),
            id: self.id.clone(),
            patch: captured,
        })
    }

    fn can_coalesce_with(&self, other: &dyn Command) -> bool {
        self.meta.coalescable
            && other
                .meta()
                .merge_key
                .as_deref()
                .zip(self.meta.merge_key.as_deref())
                .is_some_and(|(a, b)| a == b)
    }

    fn coalesce_with(self: Box<Self>, other: BoxedCommand) -> BoxedCommand {
        let other_meta = other.meta().clone();
        let SerializedCommand::UpdateLayer { id, patch, .. } = other.serialize() else {
            return other;
        };
        Box::new(UpdateLayer {
            meta: other_meta,
            id,
            patch,
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::UpdateLayer {
            meta: self.meta.clone(),
            id: self.id.clone(),
            patch: self.patch.clone(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::document::ParamMap;
    use core_model::{ImageLayer, LayerBase};

    fn layer(id: &str) -> Layer {
        Layer::Image(ImageLayer {
            base: LayerBase::new(LayerId::new(id), id),
            image: None,
            is_empty: true,
            filters: ParamMap::new(),
            tracks: Default::default(),
        })
    }

    #[test]
    fn add_then_invert_restores_state() {
        let state = CanonicalState::new(100, 100);
        let cmd = AddLayer {
            meta: CommandMeta::new("Add", crate::meta::Scope::Layers, 0),
            layer: layer("L1"),
            position: AddPosition::Top,
        };
        let next = cmd.apply(&state).unwrap();
        let inverse = cmd.invert(&state, &next);
        let back = inverse.apply(&next).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn remove_then_invert_restores_state_and_position() {
        let state = CanonicalState::new(100, 100);
        let state = ops::add_layer(&state, layer("L1"), &AddPosition::Top).unwrap();
        let state = ops::add_layer(&state, layer("L2"), &AddPosition::Top).unwrap();
        let cmd = RemoveLayer {
            meta: CommandMeta::new("Remove", crate::meta::Scope::Layers, 0),
            id: LayerId::new("L1"),
        };
        let next = cmd.apply(&state).unwrap();
        let inverse = cmd.invert(&state, &next);
        let back = inverse.apply(&next).unwrap();
        assert_eq!(back, state);
    }
}
