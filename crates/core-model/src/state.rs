use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Document;
use crate::ids::LayerId;
use crate::layer::{Layer, LayersCollection};
use crate::timeline::Timeline;
use crate::tool::ActiveTool;
use crate::viewport::Viewport;

/// Hard safety ceiling on either dimension.
pub const MAX_TEXTURE_SIZE: u32 = 32768;

/// Error surfaced by a Document Model operation. `apply` on a command must
/// never return a state that fails `assert_invariants`; when it would, the
/// operation returns this error instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("invariant violated: {0}")]
    InvariantError(String),
    #[error(
        "dimension limit exceeded: {width}x{height} (max side {max_side}, max area {max_area})"
    )]
    DimensionLimit {
        width: u32,
        height: u32,
        max_side: u32,
        max_area: u64,
    },
}

/// Canonical, history-tracked state. Ephemeral UI state (drag, hover,
/// marquee, open transaction frame) is held outside this type and never
/// participates in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalState {
    pub document: Document,
    pub layers: LayersCollection,
    pub selection: BTreeSet<LayerId>,
    pub viewport: Viewport,
    pub active_tool: ActiveTool,
    pub timeline: Timeline,
}

impl CanonicalState {
    pub fn new(width: u32, height: u32) -> Self {
        let document = Document::new(width, height);
        let mut layers = LayersCollection::new();
        let doc_layer = Layer::Document(crate::layer::DocumentLayer {
            base: crate::layer::LayerBase::new(LayerId::document(), "Document"),
            filters: Default::default(),
        });
        layers.order.push(LayerId::document());
        layers.by_id.insert(LayerId::document(), doc_layer);
        Self {
            document,
            layers,
            selection: BTreeSet::new(),
            viewport: Viewport::default(),
            active_tool: ActiveTool::default(),
            timeline: Timeline::default(),
        }
    }
}

/// Validates the dimension/area ceilings shared by every document-wide
/// resize/rotate/flip operation: rejects a canvas exceeding
/// `MAX_TEXTURE_SIZE` on either side or 90% of `MAX_TEXTURE_SIZE²` in area.
pub fn check_dimension_limit(width: u32, height: u32) -> Result<(), ModelError> {
    let max_area = (f64::from(MAX_TEXTURE_SIZE).powi(2) * 0.9) as u64;
    if width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
        return Err(ModelError::DimensionLimit {
            width,
            height,
            max_side: MAX_TEXTURE_SIZE,
            max_area,
        });
    }
    let area = u64::from(width) * u64::from(height);
    if area > max_area {
        return Err(ModelError::DimensionLimit {
            width,
            height,
            max_side: MAX_TEXTURE_SIZE,
            max_area,
        });
    }
    Ok(())
}

/// Checks every structural invariant of the document model. Called after
/// every operation; a command whose `apply` would produce an invalid state
/// must fail with this error instead of returning the bad state.
pub fn assert_invariants(state: &CanonicalState) -> Result<(), ModelError> {
    if state.document.width == 0 || state.document.height == 0 {
        return Err(ModelError::InvariantError(
            "document dimensions must be positive".into(),
        ));
    }
    if !state.document.background.in_range() {
        return Err(ModelError::InvariantError(
            "background rgba channels must lie in [0,1]".into(),
        ));
    }
    if !state.layers.keys_aligned() {
        return Err(ModelError::InvariantError(
            "layers.order and layers.byId key sets diverged".into(),
        ));
    }
    for id in &state.layers.order {
        let layer = state
            .layers
            .by_id
            .get(id)
            .ok_or_else(|| ModelError::InvariantError(format!("dangling order entry {id}")))?;
        check_layer_invariants(layer)?;
    }
    for id in &state.selection {
        if !state.layers.contains(id) {
            return Err(ModelError::InvariantError(format!(
                "selection references unknown layer {id}"
            )));
        }
    }
    if !(5.0..=800.0).contains(&state.viewport.zoom) {
        return Err(ModelError::InvariantError(format!(
            "viewport zoom {} out of range [5,800]",
            state.viewport.zoom
        )));
    }
    if !state.viewport.pan_x.is_finite() || !state.viewport.pan_y.is_finite() {
        return Err(ModelError::InvariantError(
            "viewport pan must be finite".into(),
        ));
    }
    if !(0.0..360.0).contains(&state.viewport.rotation) {
        return Err(ModelError::InvariantError(format!(
            "viewport rotation {} out of range [0,360)",
            state.viewport.rotation
        )));
    }
    if state.timeline.duration <= 0.0 {
        return Err(ModelError::InvariantError(
            "timeline duration must be positive".into(),
        ));
    }
    if state.timeline.fps <= 0.0 {
        return Err(ModelError::InvariantError(
            "timeline fps must be positive".into(),
        ));
    }
    if !(0.0..=state.timeline.duration).contains(&state.timeline.playhead_time) {
        return Err(ModelError::InvariantError(format!(
            "timeline playhead {} out of range [0,{}]",
            state.timeline.playhead_time, state.timeline.duration
        )));
    }
    Ok(())
}

fn check_layer_invariants(layer: &Layer) -> Result<(), ModelError> {
    let base = layer.base();
    if base.name.trim().is_empty() {
        return Err(ModelError::InvariantError(format!(
            "layer {} has an empty name",
            base.id
        )));
    }
    if !(0.0..=100.0).contains(&base.opacity) {
        return Err(ModelError::InvariantError(format!(
            "layer {} opacity {} out of range [0,100]",
            base.id, base.opacity
        )));
    }
    match layer {
        Layer::Image(l) => {
            if l.is_empty != l.image.is_none() {
                return Err(ModelError::InvariantError(format!(
                    "layer {} isEmpty must mirror absence of an image handle",
                    base.id
                )));
            }
        }
        Layer::Adjustment(l) => {
            if l.parameters.is_empty() {
                return Err(ModelError::InvariantError(format!(
                    "adjustment layer {} must have a non-empty parameters map",
                    base.id
                )));
            }
        }
        Layer::Group(_) => {
            // children is always a `Vec`; nothing further to check structurally.
        }
        Layer::Solid(_) | Layer::Document(_) | Layer::Mask(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_passes_invariants() {
        let state = CanonicalState::new(800, 600);
        assert_invariants(&state).unwrap();
    }

    #[test]
    fn zero_dimension_fails() {
        let mut state = CanonicalState::new(800, 600);
        state.document.width = 0;
        assert!(assert_invariants(&state).is_err());
    }

    #[test]
    fn dimension_limit_allows_exactly_90_percent_area() {
        // side such that side*side == 0.9 * MAX^2 exactly at boundary is
        // irrational; use a rectangle that lands just at/under the area cap.
        let max_area = (f64::from(MAX_TEXTURE_SIZE).powi(2) * 0.9) as u64;
        let height = MAX_TEXTURE_SIZE;
        let width = (max_area / u64::from(height)) as u32;
        assert!(check_dimension_limit(width, height).is_ok());
    }

    #[test]
    fn dimension_limit_rejects_over_90_percent_area() {
        let max_area = (f64::from(MAX_TEXTURE_SIZE).powi(2) * 0.9) as u64;
        let height = MAX_TEXTURE_SIZE;
        let width = (max_area / u64::from(height)) as u32 + 2;
        assert!(check_dimension_limit(width, height).is_err());
    }

    #[test]
    fn dimension_limit_rejects_oversized_side() {
        assert!(check_dimension_limit(MAX_TEXTURE_SIZE + 1, 10).is_err());
    }
}
