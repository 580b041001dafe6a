//! Canonical document model for the editor core.
//!
//! Everything here is pure data plus pure functions: a [`CanonicalState`] goes
//! in, a new `CanonicalState` (or a [`ModelError`]) comes out. Nothing in this
//! crate owns a clock, a thread, or an IO handle; the history engine
//! (`core-history`) is the only thing allowed to mutate a live document, and
//! it does so exclusively by calling the operations in [`ops`].

pub mod document;
pub mod ids;
pub mod layer;
pub mod ops;
pub mod state;
pub mod timeline;
pub mod tool;
pub mod track;
pub mod viewport;

pub use document::{Background, CanvasAnchor, Document, ParamMap, ParamValue};
pub use ids::LayerId;
pub use layer::{
    AdjustmentKind, AdjustmentLayer, BlendMode, DocumentLayer, GroupLayer, ImageHandle, ImageLayer,
    Layer, LayerBase, LayerPatch, LayerVariantPatch, LayersCollection, MaskLayer, Rgba, SolidLayer,
};
pub use ops::{AddPosition, DocumentDimensionsArgs, DocumentFlipArgs};
pub use state::{CanonicalState, ModelError, MAX_TEXTURE_SIZE};
pub use timeline::Timeline;
pub use tool::{ActiveTool, Sidebar, ToolKind};
pub use track::{Easing, Interpolation, Keyframe, Track, TrackValue};
pub use viewport::Viewport;
