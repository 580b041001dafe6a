//! Conflict resolver: remaps layer ids referenced by a foreign commit's
//! commands onto the current graph's layers so `cherryPick`/`merge` can
//! replay them safely, or reports exactly what it could not reconcile.

use std::collections::BTreeMap;

use core_command::{deserialize_command, BoxedCommand, SerializedCommand};
use core_model::{CanonicalState, Layer, LayerId};

/// One layer reference the resolver could not reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: String,
    pub reason: String,
}

/// Outcome of a resolution pass: either a clean set of runtime commands
/// ready to replay, or the conflicts blocking it.
#[derive(Debug)]
pub enum ResolveOutcome {
    Resolved(Vec<BoxedCommand>),
    Conflicts(Vec<Conflict>),
}

/// `(kind, name) → id` index used as the fallback match when a raw id isn't
/// present in the destination graph.
fn build_name_type_index(state: &CanonicalState) -> BTreeMap<(&'static str, String), LayerId> {
    let mut index = BTreeMap::new();
    for id in &state.layers.order {
        let Some(layer) = state.layers.get(id) else {
            continue;
        };
        let kind = layer_kind(layer);
        let name = layer.base().name.clone();
        index.insert((kind, name), id.clone());
    }
    index
}

fn layer_kind(layer: &Layer) -> &'static str {
    match layer {
        Layer::Image(_) => "image",
        Layer::Adjustment(_) => "adjustment",
        Layer::Solid(_) => "solid",
        Layer::Document(_) => "document",
        Layer::Mask(_) => "mask",
        Layer::Group(_) => "group",
    }
}

/// Ids an Add-layer command creates in the same commit: these are never
/// conflicts even when absent from the destination graph.
fn created_ids(commands: &[SerializedCommand]) -> std::collections::BTreeSet<LayerId> {
    commands
        .iter()
        .filter_map(|cmd| match cmd {
            SerializedCommand::AddLayer { layer, .. } => Some(layer.id().clone()),
            SerializedCommand::AddAdjustmentLayer { id, .. } => Some(id.clone()),
            _ => None,
        })
        .collect()
}

fn referenced_ids(commands: &[SerializedCommand]) -> Vec<LayerId> {
    let mut ids = Vec::new();
    for cmd in commands {
        match cmd {
            SerializedCommand::AddLayer { .. } | SerializedCommand::AddAdjustmentLayer { .. } => {}
            SerializedCommand::RemoveLayer { id }
            | SerializedCommand::UpdateLayer { id, .. }
            | SerializedCommand::UpdateAdjustmentParameters { id, .. } => ids.push(id.clone()),
            SerializedCommand::SetSelection { ids: sel, .. } => ids.extend(sel.iter().cloned()),
            SerializedCommand::ReorderLayers { .. }
            | SerializedCommand::SetViewport { .. }
            | SerializedCommand::SetActiveTool { .. }
            | SerializedCommand::DocumentRotate { .. }
            | SerializedCommand::DocumentFlip { .. }
            | SerializedCommand::DocumentDimensions { .. } => {}
            SerializedCommand::Composite { children, .. } => ids.extend(referenced_ids(children)),
        }
    }
    ids
}

fn source_layer_name(source_layers: &BTreeMap<LayerId, (&'static str, String)>, id: &LayerId) -> Option<(&'static str, String)> {
    source_layers.get(id).cloned()
}

/// Resolves a source commit's serialized commands against the destination
/// state. `source_layers` is an id → (kind, name) snapshot of the layers as
/// they existed in the source graph, used for the by-name fallback match;
/// callers typically build this from the commit's own parent state.
pub fn resolve(
    dest: &CanonicalState,
    source_layers: &BTreeMap<LayerId, (&'static str, String)>,
    commands: Vec<SerializedCommand>,
) -> ResolveOutcome {
    let name_type_index = build_name_type_index(dest);
    let created = created_ids(&commands);
    let referenced = referenced_ids(&commands);

    let mut remap: BTreeMap<LayerId, LayerId> = BTreeMap::new();
    let mut conflicts = Vec::new();

    for src_id in &referenced {
        if remap.contains_key(src_id) {
            continue;
        }
        if dest.layers.contains(src_id) {
            remap.insert(src_id.clone(), src_id.clone());
            continue;
        }
        if let Some((kind, name)) = source_layer_name(source_layers, src_id) {
            if let Some(dst_id) = name_type_index.get(&(kind, name)) {
                remap.insert(src_id.clone(), dst_id.clone());
                continue;
            }
        }
        if created.contains(src_id) {
            remap.insert(src_id.clone(), src_id.clone());
            continue;
        }
        conflicts.push(Conflict {
            path: format!("layer:{src_id}"),
            reason: "Missing target layer and no add-layer present".to_string(),
        });
    }

    if !conflicts.is_empty() {
        return ResolveOutcome::Conflicts(conflicts);
    }

    let rewritten = commands
        .into_iter()
        .filter_map(|cmd| rewrite(cmd, &remap, dest))
        .map(deserialize_command)
        .collect();
    ResolveOutcome::Resolved(rewritten)
}

/// Rewrites ids per `remap`; drops Add-layer commands whose target id
/// already exists in `dest` so replay is idempotent.
fn rewrite(
    cmd: SerializedCommand,
    remap: &BTreeMap<LayerId, LayerId>,
    dest: &CanonicalState,
) -> Option<SerializedCommand> {
    let remapped = |id: &LayerId| remap.get(id).cloned().unwrap_or_else(|| id.clone());
    match cmd {
        SerializedCommand::AddLayer { meta, mut layer, position } => {
            if dest.layers.contains(layer.id()) {
                return None;
            }
            let new_id = remapped(layer.id());
            layer.base_mut().id = new_id;
            Some(SerializedCommand::AddLayer { meta, layer, position })
        }
        SerializedCommand::AddAdjustmentLayer {
            meta,
            id,
            kind,
            params,
            position,
        } => {
            if dest.layers.contains(&id) {
                return None;
            }
            Some(SerializedCommand::AddAdjustmentLayer {
                meta,
                id: remapped(&id),
                kind,
                params,
                position,
            })
        }
        SerializedCommand::RemoveLayer { meta, id } => Some(SerializedCommand::RemoveLayer {
            meta,
            id: remapped(&id),
        }),
        SerializedCommand::UpdateLayer { meta, id, patch } => Some(SerializedCommand::UpdateLayer {
            meta,
            id: remapped(&id),
            patch,
        }),
        SerializedCommand::UpdateAdjustmentParameters { meta, id, params } => {
            Some(SerializedCommand::UpdateAdjustmentParameters {
                meta,
                id: remapped(&id),
                params,
            })
        }
        SerializedCommand::SetSelection { meta, ids } => Some(SerializedCommand::SetSelection {
            meta,
            ids: ids.iter().map(remapped).collect(),
        }),
        SerializedCommand::Composite { meta, children } => {
            let rewritten: Vec<SerializedCommand> = children
                .into_iter()
                .filter_map(|c| rewrite(c, remap, dest))
                .collect();
            Some(SerializedCommand::Composite {
                meta,
                children: rewritten,
            })
        }
        other @ (SerializedCommand::ReorderLayers { .. }
        | SerializedCommand::SetViewport { .. }
        | SerializedCommand::SetActiveTool { .. }
        | SerializedCommand::DocumentRotate { .. }
        | SerializedCommand::DocumentFlip { .. }
        | SerializedCommand::DocumentDimensions { .. }) => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_command::meta::{CommandMeta, Scope};
    use core_model::document::ParamMap;
    use core_model::{AddPosition, ImageLayer, LayerBase};

    fn image_layer(id: &str, name: &str) -> Layer {
        Layer::Image(ImageLayer {
            base: LayerBase::new(LayerId::new(id), name),
            image: None,
            is_empty: true,
            filters: ParamMap::new(),
            tracks: Default::default(),
        })
    }

    #[test]
    fn identity_remap_when_id_already_present() {
        let mut dest = CanonicalState::new(100, 100);
        dest = core_model::ops::add_layer(&dest, image_layer("L1", "Sky"), &AddPosition::Top).unwrap();
        let commands = vec![SerializedCommand::UpdateLayer {
            meta: CommandMeta::new("Update", Scope::Layers, 0),
            id: LayerId::new("L1"),
            patch: Default::default(),
        }];
        let outcome = resolve(&dest, &BTreeMap::new(), commands);
        assert!(matches!(outcome, ResolveOutcome::Resolved(cmds) if cmds.len() == 1));
    }

    #[test]
    fn renamed_target_resolved_by_name_and_type() {
        let mut dest = CanonicalState::new(100, 100);
        dest = core_model::ops::add_layer(&dest, image_layer("L2", "Sky"), &AddPosition::Top).unwrap();
        let mut source_layers = BTreeMap::new();
        source_layers.insert(LayerId::new("L1"), ("image", "Sky".to_string()));
        let commands = vec![SerializedCommand::UpdateLayer {
            meta: CommandMeta::new("Update", Scope::Layers, 0),
            id: LayerId::new("L1"),
            patch: Default::default(),
        }];
        let outcome = resolve(&dest, &source_layers, commands);
        match outcome {
            ResolveOutcome::Resolved(cmds) => assert_eq!(cmds.len(), 1),
            ResolveOutcome::Conflicts(c) => panic!("unexpected conflicts: {c:?}"),
        }
    }

    #[test]
    fn missing_layer_with_no_add_command_is_a_conflict() {
        let dest = CanonicalState::new(100, 100);
        let commands = vec![SerializedCommand::RemoveLayer {
            meta: CommandMeta::new("Remove", Scope::Layers, 0),
            id: LayerId::new("Ghost"),
        }];
        let outcome = resolve(&dest, &BTreeMap::new(), commands);
        match outcome {
            ResolveOutcome::Conflicts(c) => {
                assert_eq!(c.len(), 1);
                assert_eq!(c[0].path, "layer:Ghost");
            }
            ResolveOutcome::Resolved(_) => panic!("expected a conflict"),
        }
    }

    #[test]
    fn add_layer_creating_its_own_id_is_preserved_not_conflicted() {
        let dest = CanonicalState::new(100, 100);
        let commands = vec![
            SerializedCommand::AddLayer {
                meta: CommandMeta::new("Add", Scope::Layers, 0),
                layer: image_layer("New1", "Fresh"),
                position: AddPosition::Top,
            },
            SerializedCommand::UpdateLayer {
                meta: CommandMeta::new("Update", Scope::Layers, 1),
                id: LayerId::new("New1"),
                patch: Default::default(),
            },
        ];
        let outcome = resolve(&dest, &BTreeMap::new(), commands);
        assert!(matches!(outcome, ResolveOutcome::Resolved(cmds) if cmds.len() == 2));
    }

    #[test]
    fn add_layer_whose_id_already_exists_is_dropped_for_idempotent_replay() {
        let mut dest = CanonicalState::new(100, 100);
        dest = core_model::ops::add_layer(&dest, image_layer("L1", "Sky"), &AddPosition::Top).unwrap();
        let commands = vec![SerializedCommand::AddLayer {
            meta: CommandMeta::new("Add", Scope::Layers, 0),
            layer: image_layer("L1", "Sky"),
            position: AddPosition::Top,
        }];
        let outcome = resolve(&dest, &BTreeMap::new(), commands);
        assert!(matches!(outcome, ResolveOutcome::Resolved(cmds) if cmds.is_empty()));
    }
}
