//! Property tests for the engine's universal invariants: every command
//! round-trips through its own invert, and retention never deletes a
//! protected commit or the root.

use std::sync::Arc;

use core_command::commands::{AddLayer, UpdateLayer};
use core_command::meta::{CommandMeta, Scope};
use core_command::Command;
use core_model::{AddPosition, CanonicalState, ImageLayer, LayerBase, LayerId, LayerPatch};
use core_persist::{InMemoryStorageAdapter, RetentionSettings};
use core_history::HistoryEngine;
use proptest::prelude::*;

fn base_state() -> CanonicalState {
    let state = CanonicalState::new(400, 300);
    let layer = core_model::Layer::Image(ImageLayer {
        base: LayerBase::new(LayerId::new("L1"), "Sky"),
        image: None,
        is_empty: true,
        filters: Default::default(),
        tracks: Default::default(),
    });
    AddLayer {
        meta: CommandMeta::new("Add Layer", Scope::Layers, 0),
        layer,
        position: AddPosition::Top,
    }
    .apply(&state)
    .unwrap()
}

proptest! {
    /// Invariant 2: `invert(prev, apply(prev)).apply(apply(prev))` equals `prev`.
    #[test]
    fn update_layer_invert_round_trips_opacity(opacity in 0.0f32..=100.0) {
        let prev = base_state();
        let cmd = UpdateLayer {
            meta: CommandMeta::new("Opacity", Scope::Layers, 0),
            id: LayerId::new("L1"),
            patch: LayerPatch {
                opacity: Some(opacity),
                ..Default::default()
            },
        };
        let next = cmd.apply(&prev).unwrap();
        let inverse = cmd.invert(&prev, &next);
        let back = inverse.apply(&next).unwrap();
        prop_assert_eq!(back, prev);
    }
}

#[test]
fn retention_never_deletes_the_root_commit() {
    let mut engine = HistoryEngine::new(CanonicalState::new(200, 200), Arc::new(InMemoryStorageAdapter::new()));
    let root_id = engine.get_graph().root_id().to_string();
    for i in 0..10 {
        engine
            .execute(Box::new(AddLayer {
                meta: CommandMeta::new("Add Layer", Scope::Layers, i),
                layer: core_model::Layer::Image(ImageLayer {
                    base: LayerBase::new(LayerId::new(format!("L{i}")), format!("Layer {i}")),
                    image: None,
                    is_empty: true,
                    filters: Default::default(),
                    tracks: Default::default(),
                }),
                position: AddPosition::Top,
            }))
            .unwrap();
    }
    engine.set_retention(RetentionSettings {
        keep_unreachable_count: 0,
        keep_unreachable_days: 0,
    });
    engine.gc();
    assert!(engine.get_graph().commits.contains_key(&root_id));
}

#[test]
fn checkpointed_commit_survives_aggressive_retention() {
    let mut engine = HistoryEngine::new(CanonicalState::new(200, 200), Arc::new(InMemoryStorageAdapter::new()));
    engine
        .execute(Box::new(AddLayer {
            meta: CommandMeta::new("Add Layer", Scope::Layers, 0),
            layer: core_model::Layer::Image(ImageLayer {
                base: LayerBase::new(LayerId::new("L1"), "Sky"),
                image: None,
                is_empty: true,
                filters: Default::default(),
                tracks: Default::default(),
            }),
            position: AddPosition::Top,
        }))
        .unwrap();
    let checkpoint_id = engine.head().at().to_string();
    engine.add_checkpoint("Before heavy edits");

    for i in 1..15 {
        engine
            .execute(Box::new(AddLayer {
                meta: CommandMeta::new("Add Layer", Scope::Layers, i),
                layer: core_model::Layer::Image(ImageLayer {
                    base: LayerBase::new(LayerId::new(format!("L{i}")), format!("Layer {i}")),
                    image: None,
                    is_empty: true,
                    filters: Default::default(),
                    tracks: Default::default(),
                }),
                position: AddPosition::Top,
            }))
            .unwrap();
    }

    engine.set_retention(RetentionSettings {
        keep_unreachable_count: 0,
        keep_unreachable_days: 0,
    });
    engine.gc();
    assert!(engine.get_graph().commits.contains_key(&checkpoint_id));
}
