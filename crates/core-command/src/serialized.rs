use serde::{Deserialize, Serialize};

use core_model::{
    ActiveTool, AddPosition, AdjustmentKind, DocumentDimensionsArgs, DocumentFlipArgs, Layer,
    LayerId, LayerPatch, ParamMap,
};
use core_model::viewport::ViewportPatch;

use crate::meta::CommandMeta;

/// Discriminated union every `Command` serializes to. `type` is the wire
/// discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SerializedCommand {
    AddLayer {
        meta: CommandMeta,
        layer: Layer,
        position: AddPosition,
    },
    AddAdjustmentLayer {
        meta: CommandMeta,
        id: LayerId,
        kind: AdjustmentKind,
        params: ParamMap,
        position: AddPosition,
    },
    RemoveLayer {
        meta: CommandMeta,
        id: LayerId,
    },
    ReorderLayers {
        meta: CommandMeta,
        from: usize,
        to: usize,
    },
    UpdateLayer {
        meta: CommandMeta,
        id: LayerId,
        patch: LayerPatch,
    },
    UpdateAdjustmentParameters {
        meta: CommandMeta,
        id: LayerId,
        params: ParamMap,
    },
    SetSelection {
        meta: CommandMeta,
        ids: Vec<LayerId>,
    },
    SetViewport {
        meta: CommandMeta,
        patch: ViewportPatch,
    },
    SetActiveTool {
        meta: CommandMeta,
        active: ActiveTool,
    },
    DocumentRotate {
        meta: CommandMeta,
        delta_deg: f64,
    },
    DocumentFlip {
        meta: CommandMeta,
        args: DocumentFlipArgs,
    },
    DocumentDimensions {
        meta: CommandMeta,
        next: DocumentDimensionsArgs,
    },
    Composite {
        meta: CommandMeta,
        children: Vec<SerializedCommand>,
    },
}

impl SerializedCommand {
    pub fn meta(&self) -> &CommandMeta {
        match self {
            SerializedCommand::AddLayer { meta, .. }
            | SerializedCommand::AddAdjustmentLayer { meta, .. }
            | SerializedCommand::RemoveLayer { meta, .. }
            | SerializedCommand::ReorderLayers { meta, .. }
            | SerializedCommand::UpdateLayer { meta, .. }
            | SerializedCommand::UpdateAdjustmentParameters { meta, .. }
            | SerializedCommand::SetSelection { meta, .. }
            | SerializedCommand::SetViewport { meta, .. }
            | SerializedCommand::SetActiveTool { meta, .. }
            | SerializedCommand::DocumentRotate { meta, .. }
            | SerializedCommand::DocumentFlip { meta, .. }
            | SerializedCommand::DocumentDimensions { meta, .. }
            | SerializedCommand::Composite { meta, .. } => meta,
        }
    }
}
