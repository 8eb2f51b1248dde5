//! Shared types used across multiple modules.
//!
//! This module contains the window view consumed by the rendering pipeline,
//! kept separate so that the tree parser and the renderer do not depend on
//! each other.

/// Read-only view of one leaf window taken from a tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowAttributes {
    /// Container id, used as the argument of the click action
    pub id: u64,
    /// X11 WM_CLASS class, or the Wayland app id under sway
    pub window_class: String,
    /// Raw window title
    pub name: String,
    pub focused: bool,
    pub urgent: bool,
    /// Name of the enclosing workspace (empty if the window has none)
    pub workspace_name: String,
}

impl WindowAttributes {
    pub fn new(id: u64, window_class: &str, name: &str, workspace_name: &str) -> Self {
        Self {
            id,
            window_class: window_class.to_string(),
            name: name.to_string(),
            focused: false,
            urgent: false,
            workspace_name: workspace_name.to_string(),
        }
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }

    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }
}
