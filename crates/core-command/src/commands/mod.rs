pub mod adjustment;
pub mod composite;
pub mod document_ops;
pub mod layer_ops;
pub mod selection_viewport_tool;

pub use adjustment::{AddAdjustmentLayer, UpdateAdjustmentParameters};
pub use composite::Composite;
pub use document_ops::{DocumentDimensions, DocumentFlip, DocumentRotate};
pub use layer_ops::{AddLayer, RemoveLayer, ReorderLayers, UpdateLayer};
pub use selection_viewport_tool::{SetActiveTool, SetSelection, SetViewport};
