//! Reconstructs a live [`BoxedCommand`] from the wire-level
//! [`SerializedCommand`] produced by [`Command::serialize`]. This is the
//! inverse of serialization and the only place that needs to know about
//! every concrete command type.

use crate::command::BoxedCommand;
use crate::commands::{
    AddAdjustmentLayer, AddLayer, Composite, DocumentDimensions, DocumentFlip, DocumentRotate,
    RemoveLayer, ReorderLayers, SetActiveTool, SetSelection, SetViewport, UpdateAdjustmentParameters,
    UpdateLayer,
};
use crate::serialized::SerializedCommand;

pub fn deserialize_command(serialized: SerializedCommand) -> BoxedCommand {
    match serialized {
        SerializedCommand::AddLayer {
            meta,
            layer,
            position,
        } => Box::new(AddLayer {
            meta,
            layer,
            position,
        }),
        SerializedCommand::AddAdjustmentLayer {
            meta,
            id,
            kind,
            params,
            position,
        } => Box::new(AddAdjustmentLayer {
            meta,
            id,
            name: kind_label(kind),
            kind,
            params,
            position,
        }),
        SerializedCommand::RemoveLayer { meta, id } => Box::new(RemoveLayer { meta, id }),
        SerializedCommand::ReorderLayers { meta, from, to } => {
            Box::new(ReorderLayers { meta, from, to })
        }
        SerializedCommand::UpdateLayer { meta, id, patch } => {
            Box::new(UpdateLayer { meta, id, patch })
        }
        SerializedCommand::UpdateAdjustmentParameters { meta, id, params } => {
            Box::new(UpdateAdjustmentParameters { meta, id, params })
        }
        SerializedCommand::SetSelection { meta, ids } => Box::new(SetSelection {
            meta,
            ids: ids.into_iter().collect(),
        }),
        SerializedCommand::SetViewport { meta, patch } => Box::new(SetViewport { meta, patch }),
        SerializedCommand::SetActiveTool { meta, active } => {
            Box::new(SetActiveTool { meta, active })
        }
        SerializedCommand::DocumentRotate { meta, delta_deg } => {
            Box::new(DocumentRotate { meta, delta_deg })
        }
        SerializedCommand::DocumentFlip { meta, args } => Box::new(DocumentFlip { meta, args }),
        SerializedCommand::DocumentDimensions { meta, next } => {
            Box::new(DocumentDimensions { meta, next })
        }
        SerializedCommand::Composite { meta, children } => Box::new(Composite {
            meta,
            children: children.into_iter().map(deserialize_command).collect(),
        }),
    }
}

/// The wire format only carries an [`core_model::AdjustmentKind`], not a
/// display name; rehydrated adjustment layers get a name derived from the
/// kind so `assert_invariants`' non-empty-name check still holds.
fn kind_label(kind: core_model::AdjustmentKind) -> String {
    format!("{kind:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::commands::AddLayer;
    use crate::meta::{CommandMeta, Scope};
    use core_model::document::ParamMap;
    use core_model::{AddPosition, CanonicalState, ImageLayer, Layer, LayerBase, LayerId};

    #[test]
    fn add_layer_round_trips_through_serialization() {
        let layer = Layer::Image(ImageLayer {
            base: LayerBase::new(LayerId::new("L1"), "L1"),
            image: None,
            is_empty: true,
            filters: ParamMap::new(),
            tracks: Default::default(),
        });
        let cmd: BoxedCommand = Box::new(AddLayer {
            meta: CommandMeta::new("Add", Scope::Layers, 0),
            layer,
            position: AddPosition::Top,
        });
        let wire = cmd.serialize();
        let json = serde_json::to_string(&wire).unwrap();
        let back: SerializedCommand = serde_json::from_str(&json).unwrap();
        let rebuilt = deserialize_command(back);

        let state = CanonicalState::new(50, 50);
        let a = cmd.apply(&state).unwrap();
        let b = rebuilt.apply(&state).unwrap();
        assert_eq!(a, b);
    }
}
