use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::ParamMap;
use crate::ids::LayerId;
use crate::track::Track;

/// Closed set of blend modes. The standard Porter-Duff-plus-Photoshop set,
/// kept as the smallest closed enum consistent with the other closed
/// layer/adjustment enums in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::Normal
    }
}

/// Closed adjustment-kind enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentKind {
    Brightness,
    Contrast,
    Exposure,
    Gamma,
    Levels,
    Curves,
    Hue,
    Saturation,
    Vibrance,
    Temperature,
    Tint,
    Colorize,
    GradientMap,
    Lut,
    Sepia,
    Grayscale,
    Invert,
    Vintage,
    Posterize,
    Threshold,
    Solarize,
    SplitToning,
    Clarity,
    Texture,
    Dehaze,
    UnsharpMask,
    HighPass,
    Sharpen,
    Gaussian,
    FilmGrain,
    AdditiveNoise,
    NoiseReduction,
    Defringe,
    CaCorrection,
    Vignette,
    Solid,
}

/// Shared attributes present on every layer variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerBase {
    pub id: LayerId,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    /// Opacity percentage, invariant-checked to lie in [0, 100].
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<LayerId>,
}

fn default_true() -> bool {
    true
}

impl LayerBase {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 100.0,
            blend_mode: BlendMode::Normal,
            parent: None,
        }
    }
}

/// Opaque reference to image bytes decoded elsewhere; the core only ever
/// moves this handle around, never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageHandle>,
    pub is_empty: bool,
    #[serde(default)]
    pub filters: ParamMap,
    #[serde(default)]
    pub tracks: BTreeMap<String, Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    pub kind: AdjustmentKind,
    pub parameters: ParamMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolidLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    #[serde(default)]
    pub filters: ParamMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    pub enabled: bool,
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    pub children: Vec<LayerId>,
    pub collapsed: bool,
}

/// Sum type over the six layer variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Layer {
    Image(ImageLayer),
    Adjustment(AdjustmentLayer),
    Solid(SolidLayer),
    Document(DocumentLayer),
    Mask(MaskLayer),
    Group(GroupLayer),
}

impl Layer {
    pub fn base(&self) -> &LayerBase {
        match self {
            Layer::Image(l) => &l.base,
            Layer::Adjustment(l) => &l.base,
            Layer::Solid(l) => &l.base,
            Layer::Document(l) => &l.base,
            Layer::Mask(l) => &l.base,
            Layer::Group(l) => &l.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut LayerBase {
        match self {
            Layer::Image(l) => &mut l.base,
            Layer::Adjustment(l) => &mut l.base,
            Layer::Solid(l) => &mut l.base,
            Layer::Document(l) => &mut l.base,
            Layer::Mask(l) => &mut l.base,
            Layer::Group(l) => &mut l.base,
        }
    }

    pub fn id(&self) -> &LayerId {
        &self.base().id
    }

    /// Applies the base-attribute subset of a patch; variant-specific fields
    /// are handled by the caller (`LayerPatch::apply`) since the base is
    /// common to every variant.
    fn apply_base(&mut self, patch: &LayerPatch) {
        let base = self.base_mut();
        if let Some(name) = &patch.name {
            base.name = name.clone();
        }
        if let Some(visible) = patch.visible {
            base.visible = visible;
        }
        if let Some(locked) = patch.locked {
            base.locked = locked;
        }
        if let Some(opacity) = patch.opacity {
            base.opacity = opacity;
        }
        if let Some(blend_mode) = patch.blend_mode {
            base.blend_mode = blend_mode;
        }
        if let Some(parent) = &patch.parent {
            base.parent = parent.clone();
        }
    }
}

/// Variant-specific half of a patch. A patch whose variant does not match the
/// target layer's actual variant is rejected silently: `updateLayer` is
/// type-preserving, so patches to foreign fields are never consulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerVariantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<ImageHandle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_empty: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ParamMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ParamMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LayerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

/// A patch to apply to a single layer via `updateLayer`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<BlendMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Option<LayerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<LayerVariantPatch>,
}

impl LayerPatch {
    /// Captures the subset of `self`'s current fields named by `shape`,
    /// producing the inverse patch `UpdateLayer`'s `invert` needs.
    pub fn capture(layer: &Layer, shape: &LayerPatch) -> LayerPatch {
        let base = layer.base();
        let mut captured = LayerPatch {
            name: shape.name.as_ref().map(|_| base.name.clone()),
            visible: shape.visible.map(|_| base.visible),
            locked: shape.locked.map(|_| base.locked),
            opacity: shape.opacity.map(|_| base.opacity),
            blend_mode: shape.blend_mode.map(|_| base.blend_mode),
            parent: shape.parent.as_ref().map(|_| base.parent.clone()),
            variant: None,
        };
        if let Some(shape_variant) = &shape.variant {
            captured.variant = Some(capture_variant(layer, shape_variant));
        }
        captured
    }

    pub fn apply(&self, layer: &mut Layer) {
        layer.apply_base(self);
        let Some(variant) = &self.variant else {
            return;
        };
        match layer {
            Layer::Image(l) => {
                if let Some(image) = &variant.image {
                    l.image = image.clone();
                }
                if let Some(is_empty) = variant.is_empty {
                    l.is_empty = is_empty;
                }
                if let Some(filters) = &variant.filters {
                    l.filters = filters.clone();
                }
            }
            Layer::Adjustment(l) => {
                if let Some(parameters) = &variant.parameters {
                    l.parameters = parameters.clone();
                }
            }
            Layer::Solid(l) => {
                if let Some(color) = variant.color {
                    l.color = color;
                }
            }
            Layer::Document(l) => {
                if let Some(filters) = &variant.filters {
                    l.filters = filters.clone();
                }
            }
            Layer::Mask(l) => {
                if let Some(enabled) = variant.enabled {
                    l.enabled = enabled;
                }
                if let Some(inverted) = variant.inverted {
                    l.inverted = inverted;
                }
            }
            Layer::Group(l) => {
                if let Some(children) = &variant.children {
                    l.children = children.clone();
                }
                if let Some(collapsed) = variant.collapsed {
                    l.collapsed = collapsed;
                }
            }
        }
        // A variant patch that names no field matching the actual variant is
        // a silent no-op by construction above: every arm only reads the
        // fields valid for its own variant, so foreign fields are simply
        // never consulted.
    }
}

fn capture_variant(layer: &Layer, shape: &LayerVariantPatch) -> LayerVariantPatch {
    match layer {
        Layer::Image(l) => LayerVariantPatch {
            image: shape.image.as_ref().map(|_| l.image.clone()),
            is_empty: shape.is_empty.map(|_| l.is_empty),
            filters: shape.filters.as_ref().map(|_| l.filters.clone()),
            ..Default::default()
        },
        Layer::Adjustment(l) => LayerVariantPatch {
            parameters: shape.parameters.as_ref().map(|_| l.parameters.clone()),
            ..Default::default()
        },
        Layer::Solid(l) => LayerVariantPatch {
            color: shape.color.map(|_| l.color),
            ..Default::default()
        },
        Layer::Document(l) => LayerVariantPatch {
            filters: shape.filters.as_ref().map(|_| l.filters.clone()),
            ..Default::default()
        },
        Layer::Mask(l) => LayerVariantPatch {
            enabled: shape.enabled.map(|_| l.enabled),
            inverted: shape.inverted.map(|_| l.inverted),
            ..Default::default()
        },
        Layer::Group(l) => LayerVariantPatch {
            children: shape.children.as_ref().map(|_| l.children.clone()),
            collapsed: shape.collapsed.map(|_| l.collapsed),
            ..Default::default()
        },
    }
}

/// `byId`/`order` pair with the identical-key-set invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayersCollection {
    #[serde(rename = "byId")]
    pub by_id: BTreeMap<LayerId, Layer>,
    pub order: Vec<LayerId>,
}

impl LayersCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `order`/`byId` key sets match and every id is unique.
    pub fn keys_aligned(&self) -> bool {
        if self.order.len() != self.by_id.len() {
            return false;
        }
        let mut seen = std::collections::BTreeSet::new();
        for id in &self.order {
            if !seen.insert(id) {
                return false;
            }
            if !self.by_id.contains_key(id) {
                return false;
            }
        }
        true
    }
}
