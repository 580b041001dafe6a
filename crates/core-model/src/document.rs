use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::LayerId;

/// 9-way anchor used by resize/reflow operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanvasAnchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Background {
    Transparent,
    Rgba { r: f32, g: f32, b: f32, a: f32 },
}

impl Background {
    pub fn in_range(&self) -> bool {
        match self {
            Background::Transparent => true,
            Background::Rgba { r, g, b, a } => {
                [r, g, b, a].into_iter().all(|c| (0.0..=1.0).contains(c))
            }
        }
    }
}

/// A document/layer-scope parameter value. Filters/adjustment parameter maps
/// are keyed by parameter name to one of these: either a bare scalar or a
/// `{value, color}` pair for tint-capable adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    Colored { value: f64, color: [f32; 4] },
}

impl ParamValue {
    pub fn scalar(&self) -> f64 {
        match self {
            ParamValue::Scalar(v) => *v,
            ParamValue::Colored { value, .. } => *value,
        }
    }

    pub fn color(&self) -> Option<[f32; 4]> {
        match self {
            ParamValue::Scalar(_) => None,
            ParamValue::Colored { color, .. } => Some(*color),
        }
    }
}

/// Ordered parameter map (BTreeMap for deterministic serialization, which
/// matters for byte-size estimation and export round-tripping).
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Document-scope attributes: size, orientation, background, color
/// management, plus document-scope global layers and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub width: u32,
    pub height: u32,
    pub anchor: CanvasAnchor,
    pub background: Background,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<f64>,
    /// Ids of document-scope global adjustment/solid/mask layers, referencing
    /// entries in the sibling `LayersCollection`.
    #[serde(default)]
    pub global_layers: Vec<LayerId>,
    #[serde(default)]
    pub parameters: ParamMap,
}

impl Document {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            anchor: CanvasAnchor::MiddleCenter,
            background: Background::Transparent,
            color_profile: None,
            dpi: None,
            global_layers: Vec::new(),
            parameters: ParamMap::new(),
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}
