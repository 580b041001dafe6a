use core_model::{ops, AdjustmentKind, AdjustmentLayer, CanonicalState, Layer, LayerBase, LayerId, ParamMap};

use crate::command::{BoxedCommand, Command, CommandError};
use crate::commands::layer_ops::RemoveLayer;
use crate::meta::CommandMeta;
use crate::serialized::SerializedCommand;

#[derive(Debug, Clone)]
pub struct AddAdjustmentLayer {
    pub meta: CommandMeta,
    pub id: LayerId,
    pub name: String,
    pub kind: AdjustmentKind,
    pub params: ParamMap,
    pub position: ops::AddPosition,
}

impl Command for AddAdjustmentLayer {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        let layer = Layer::Adjustment(AdjustmentLayer {
            base: LayerBase::new(self.id.clone(), self.name.clone()),
            kind: self.kind,
            parameters: self.params.clone(),
        });
        Ok(ops::add_layer(state, layer, &self.position)?)
    }

    fn invert(&self, _prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        Box::new(RemoveLayer {
            meta: CommandMeta::new(
                "Undo Add Adjustment Layer",
                self.meta.scope,
                self.meta.timestamp_ms,
            ),
            id: self.id.clone(),
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::AddAdjustmentLayer {
            meta: self.meta.clone(),
            id: self.id.clone(),
            kind: self.kind,
            params: self.params.clone(),
            position: self.position.clone(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct UpdateAdjustmentParameters {
    pub meta: CommandMeta,
    pub id: LayerId,
    pub params: ParamMap,
}

impl Command for UpdateAdjustmentParameters {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        let patch = core_model::LayerPatch {
            variant: Some(core_model::LayerVariantPatch {
                parameters: Some(self.params.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };
        Ok(ops::update_layer(state, &self.id, &patch)?)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        let prior = match prev.layers.get(&self.id) {
            Some(Layer::Adjustment(l)) => l.parameters.clone(),
            _ => ParamMap::new(),
        };
        Box::new(UpdateAdjustmentParameters {
            meta: CommandMeta::new(
                "Undo Update Adjustment Parameters",
                self.meta.scope,
                self.meta.timestamp_ms,
            ),
            id: self.id.clone(),
            params: prior,
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
        let SerializedCommand::UpdateAdjustmentParameters { id, params, .. } = other.serialize()
        else {
            return other;
        };
        Box::new(UpdateAdjustmentParameters {
            meta: other_meta,
            id,
            params,
        })
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::UpdateAdjustmentParameters {
            meta: self.meta.clone(),
            id: self.id.clone(),
            params: self.params.clone(),
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
    fn add_adjustment_then_update_then_invert() {
        let state = CanonicalState::new(200, 200);
        let mut params = ParamMap::new();
        params.insert("amount".into(), core_model::ParamValue::Scalar(10.0));
        let add = AddAdjustmentLayer {
            meta: CommandMeta::new("Add Adjustment", Scope::Layers, 0),
            id: LayerId::new("Adj1"),
            name: "Brightness".into(),
            kind: AdjustmentKind::Brightness,
            params: params.clone(),
            position: ops::AddPosition::Top,
        };
        let after_add = add.apply(&state).unwrap();

        let mut new_params = ParamMap::new();
        new_params.insert("amount".into(), core_model::ParamValue::Scalar(40.0));
        let update = UpdateAdjustmentParameters {
            meta: CommandMeta::new("Update Adjustment", Scope::Layers, 1)
                .coalescable(crate::meta::merge_keys::adjustment("Adj1")),
            id: LayerId::new("Adj1"),
            params: new_params,
        };
        let after_update = update.apply(&after_add).unwrap();
        let inverse = update.invert(&after_add, &after_update);
        let back = inverse.apply(&after_update).unwrap();
        assert_eq!(back, after_add);
    }
}
