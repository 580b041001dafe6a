use serde::{Deserialize, Serialize};

/// Closed sidebar enum covering the panels a layer/adjustment/history-driven
/// editor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Sidebar {
    Layers,
    Adjustments,
    Tools,
    History,
    Library,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    Move,
    Brush,
    Eraser,
    Crop,
    Text,
    Shape,
    Eyedropper,
    Zoom,
    Hand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTool {
    pub sidebar: Sidebar,
    pub tool: ToolKind,
}

impl Default for ActiveTool {
    fn default() -> Self {
        Self {
            sidebar: Sidebar::Layers,
            tool: ToolKind::Move,
        }
    }
}
