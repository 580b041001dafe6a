use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Zoom percent, invariant-checked to lie in [5, 800].
    pub zoom: f32,
    pub pan_x: f64,
    pub pan_y: f64,
    /// Degrees, invariant-checked to lie in [0, 360).
    pub rotation: f32,
    pub snapping: bool,
    pub guides: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 100.0,
            pan_x: 0.0,
            pan_y: 0.0,
            rotation: 0.0,
            snapping: true,
            guides: true,
        }
    }
}

/// Partial update applied by `SetViewport` / `UpdateLayer`-style patches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapping: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guides: Option<bool>,
}

impl ViewportPatch {
    pub fn capture(viewport: &Viewport, shape: &ViewportPatch) -> ViewportPatch {
        ViewportPatch {
            zoom: shape.zoom.map(|_| viewport.zoom),
            pan_x: shape.pan_x.map(|_| viewport.pan_x),
            pan_y: shape.pan_y.map(|_| viewport.pan_y),
            rotation: shape.rotation.map(|_| viewport.rotation),
            snapping: shape.snapping.map(|_| viewport.snapping),
            guides: shape.guides.map(|_| viewport.guides),
        }
    }

    pub fn apply(&self, viewport: &mut Viewport) {
        if let Some(v) = self.zoom {
            viewport.zoom = v;
        }
        if let Some(v) = self.pan_x {
            viewport.pan_x = v;
        }
        if let Some(v) = self.pan_y {
            viewport.pan_y = v;
        }
        if let Some(v) = self.rotation {
            viewport.rotation = v;
        }
        if let Some(v) = self.snapping {
            viewport.snapping = v;
        }
        if let Some(v) = self.guides {
            viewport.guides = v;
        }
    }
}
