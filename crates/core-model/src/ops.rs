//! Pure document model operations. Every function here takes a
//! `&CanonicalState` and returns a new, invariant-checked `CanonicalState` or
//! a `ModelError`. None of them mutate in place; the caller (the history
//! engine) decides what to do with the returned value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::document::ParamValue;
use crate::ids::LayerId;
use crate::layer::{Layer, LayerPatch};
use crate::state::{assert_invariants, check_dimension_limit, CanonicalState, ModelError};
use crate::tool::ActiveTool;
use crate::viewport::ViewportPatch;

/// Where a newly added layer lands in `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AddPosition {
    Top,
    Bottom,
    Index(usize),
}

fn finish(mut state: CanonicalState, mutate: impl FnOnce(&mut CanonicalState)) -> Result<CanonicalState, ModelError> {
    mutate(&mut state);
    assert_invariants(&state)?;
    Ok(state)
}

pub fn add_layer(
    state: &CanonicalState,
    layer: Layer,
    position: &AddPosition,
) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| {
        let id = layer.id().clone();
        let idx = match position {
            AddPosition::Top => 0,
            AddPosition::Bottom => state.layers.order.len(),
            AddPosition::Index(i) => (*i).min(state.layers.order.len()),
        };
        state.layers.order.insert(idx, id.clone());
        state.layers.by_id.insert(id, layer);
    })
}

/// Returns the removed layer and the index it occupied, which the caller
/// needs to build `RemoveLayer`'s inverse (re-`AddLayer` at the captured
/// index).
pub fn remove_layer(
    state: &CanonicalState,
    id: &LayerId,
) -> Result<(CanonicalState, Layer, usize), ModelError> {
    let mut next = state.clone();
    let idx = next
        .layers
        .order
        .iter()
        .position(|existing| existing == id)
        .ok_or_else(|| ModelError::InvariantError(format!("no such layer {id}")))?;
    next.layers.order.remove(idx);
    let layer = next
        .layers
        .by_id
        .remove(id)
        .ok_or_else(|| ModelError::InvariantError(format!("no such layer {id}")))?;
    next.selection.remove(id);
    assert_invariants(&next)?;
    Ok((next, layer, idx))
}

pub fn reorder_layer(
    state: &CanonicalState,
    from: usize,
    to: usize,
) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| {
        if from >= state.layers.order.len() {
            return;
        }
        let id = state.layers.order.remove(from);
        let to = to.min(state.layers.order.len());
        state.layers.order.insert(to, id);
    })
}

pub fn update_layer(
    state: &CanonicalState,
    id: &LayerId,
    patch: &LayerPatch,
) -> Result<CanonicalState, ModelError> {
    let mut next = state.clone();
    let layer = next
        .layers
        .by_id
        .get_mut(id)
        .ok_or_else(|| ModelError::InvariantError(format!("no such layer {id}")))?;
    patch.apply(layer);
    assert_invariants(&next)?;
    Ok(next)
}

pub fn set_selection(
    state: &CanonicalState,
    ids: BTreeSet<LayerId>,
) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| {
        state.selection = ids;
    })
}

pub fn set_viewport(
    state: &CanonicalState,
    patch: &ViewportPatch,
) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| {
        patch.apply(&mut state.viewport);
    })
}

pub fn set_active_tool(
    state: &CanonicalState,
    active: ActiveTool,
) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| {
        state.active_tool = active;
    })
}

pub fn add_global_layer(state: &CanonicalState, id: LayerId) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| {
        if !state.document.global_layers.contains(&id) {
            state.document.global_layers.push(id);
        }
    })
}

pub fn remove_global_layer(
    state: &CanonicalState,
    id: &LayerId,
) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| {
        state.document.global_layers.retain(|existing| existing != id);
    })
}

pub fn set_document_parameter(
    state: &CanonicalState,
    key: &str,
    value: Option<ParamValue>,
) -> Result<CanonicalState, ModelError> {
    let state = state.clone();
    finish(state, |state| match value {
        Some(value) => {
            state.document.parameters.insert(key.to_string(), value);
        }
        None => {
            state.document.parameters.remove(key);
        }
    })
}

/// `rotate` filter key read/written on image layers by the document-wide
/// rotate/flip operations below.
const ROTATE_FILTER_KEY: &str = "rotate";
const FLIP_H_FILTER_KEY: &str = "flipH";
const FLIP_V_FILTER_KEY: &str = "flipV";

fn image_filter_scalar(layer: &Layer, key: &str) -> f64 {
    match layer {
        Layer::Image(l) => l.filters.get(key).map(|v| v.scalar()).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn set_image_filter_scalar(layer: &mut Layer, key: &str, value: f64) {
    if let Layer::Image(l) = layer {
        l.filters.insert(key.to_string(), ParamValue::Scalar(value));
    }
}

/// Rotates every image layer's `rotate` filter by Δ (mod 360) and pairs it
/// with the matching viewport rotation update in one state transition.
pub fn document_rotate(state: &CanonicalState, delta_deg: f64) -> Result<CanonicalState, ModelError> {
    let mut next = state.clone();
    for id in next.layers.order.clone() {
        if let Some(layer) = next.layers.by_id.get_mut(&id) {
            let current = image_filter_scalar(layer, ROTATE_FILTER_KEY);
            let rotated = (current + delta_deg).rem_euclid(360.0);
            set_image_filter_scalar(layer, ROTATE_FILTER_KEY, rotated);
        }
    }
    next.viewport.rotation = ((next.viewport.rotation as f64 + delta_deg).rem_euclid(360.0)) as f32;
    check_dimension_limit(next.document.width, next.document.height)?;
    assert_invariants(&next)?;
    Ok(next)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFlipArgs {
    #[serde(default)]
    pub h: bool,
    #[serde(default)]
    pub v: bool,
}

/// Toggles each image layer's flip flags and mirrors state onto the
/// document layer so previews stay consistent.
pub fn document_flip(
    state: &CanonicalState,
    args: DocumentFlipArgs,
) -> Result<CanonicalState, ModelError> {
    let mut next = state.clone();
    for id in next.layers.order.clone() {
        if let Some(layer) = next.layers.by_id.get_mut(&id) {
            if args.h {
                let flipped = image_filter_scalar(layer, FLIP_H_FILTER_KEY) == 0.0;
                set_image_filter_scalar(layer, FLIP_H_FILTER_KEY, if flipped { 1.0 } else { 0.0 });
            }
            if args.v {
                let flipped = image_filter_scalar(layer, FLIP_V_FILTER_KEY) == 0.0;
                set_image_filter_scalar(layer, FLIP_V_FILTER_KEY, if flipped { 1.0 } else { 0.0 });
            }
        }
    }
    if let Some(Layer::Document(doc_layer)) = next.layers.by_id.get_mut(&LayerId::document()) {
        if args.h {
            let flipped = doc_layer
                .filters
                .get(FLIP_H_FILTER_KEY)
                .map(|v| v.scalar())
                .unwrap_or(0.0)
                == 0.0;
            doc_layer.filters.insert(
                FLIP_H_FILTER_KEY.to_string(),
                ParamValue::Scalar(if flipped { 1.0 } else { 0.0 }),
            );
        }
        if args.v {
            let flipped = doc_layer
                .filters
                .get(FLIP_V_FILTER_KEY)
                .map(|v| v.scalar())
                .unwrap_or(0.0)
                == 0.0;
            doc_layer.filters.insert(
                FLIP_V_FILTER_KEY.to_string(),
                ParamValue::Scalar(if flipped { 1.0 } else { 0.0 }),
            );
        }
    }
    check_dimension_limit(next.document.width, next.document.height)?;
    assert_invariants(&next)?;
    Ok(next)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDimensionsArgs {
    pub width: u32,
    pub height: u32,
    pub anchor: crate::document::CanvasAnchor,
    /// Replacement records for layers whose placement must reflow.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// Replaces document size/anchor and the listed layer records (used for
/// resize).
pub fn document_dimensions(
    state: &CanonicalState,
    args: &DocumentDimensionsArgs,
) -> Result<CanonicalState, ModelError> {
    check_dimension_limit(args.width, args.height)?;
    let mut next = state.clone();
    next.document.width = args.width;
    next.document.height = args.height;
    next.document.anchor = args.anchor;
    for layer in &args.layers {
        if next.layers.by_id.contains_key(layer.id()) {
            next.layers.by_id.insert(layer.id().clone(), layer.clone());
        }
    }
    assert_invariants(&next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{AdjustmentKind, AdjustmentLayer, ImageLayer, LayerBase};
    use crate::document::ParamMap;

    fn image_layer(id: &str) -> Layer {
        Layer::Image(ImageLayer {
            base: LayerBase::new(LayerId::new(id), id),
            image: None,
            is_empty: true,
            filters: ParamMap::new(),
            tracks: Default::default(),
        })
    }

    #[test]
    fn add_then_remove_round_trips() {
        let state = CanonicalState::new(100, 100);
        let layer = image_layer("L1");
        let added = add_layer(&state, layer.clone(), &AddPosition::Top).unwrap();
        assert_eq!(added.layers.order[0], LayerId::new("L1"));
        let (removed, got, idx) = remove_layer(&added, &LayerId::new("L1")).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(got, layer);
        assert_eq!(removed, state);
    }

    #[test]
    fn update_layer_rejects_foreign_variant_fields_silently() {
        let state = CanonicalState::new(100, 100);
        let mut params = ParamMap::new();
        params.insert("brightness".into(), ParamValue::Scalar(10.0));
        let adj = Layer::Adjustment(AdjustmentLayer {
            base: LayerBase::new(LayerId::new("A1"), "Adj"),
            kind: AdjustmentKind::Brightness,
            parameters: params.clone(),
        });
        let state = add_layer(&state, adj, &AddPosition::Top).unwrap();
        // Patch claims to set Image-only `isEmpty`; Adjustment must ignore it.
        let mut variant = crate::layer::LayerVariantPatch::default();
        variant.is_empty = Some(true);
        let patch = LayerPatch {
            opacity: Some(50.0),
            variant: Some(variant),
            ..Default::default()
        };
        let updated = update_layer(&state, &LayerId::new("A1"), &patch).unwrap();
        let Layer::Adjustment(adj) = updated.layers.get(&LayerId::new("A1")).unwrap() else {
            panic!("expected adjustment layer");
        };
        assert_eq!(adj.base.opacity, 50.0);
        assert_eq!(adj.parameters, params);
    }

    #[test]
    fn document_rotate_pairs_with_viewport() {
        let state = CanonicalState::new(100, 100);
        let state = add_layer(&state, image_layer("L1"), &AddPosition::Top).unwrap();
        let rotated = document_rotate(&state, 90.0).unwrap();
        assert_eq!(rotated.viewport.rotation, 90.0);
        let Layer::Image(l) = rotated.layers.get(&LayerId::new("L1")).unwrap() else {
            panic!()
        };
        assert_eq!(l.filters.get("rotate").unwrap().scalar(), 90.0);
    }

    #[test]
    fn document_flip_is_self_inverse() {
        let state = CanonicalState::new(100, 100);
        let state = add_layer(&state, image_layer("L1"), &AddPosition::Top).unwrap();
        let args = DocumentFlipArgs { h: true, v: false };
        let flipped = document_flip(&state, args).unwrap();
        let flipped_back = document_flip(&flipped, args).unwrap();
        assert_eq!(flipped_back, state);
    }
}
