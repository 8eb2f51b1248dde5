//! Window tree snapshot as returned by `GET_TREE`.
//!
//! Only the fields the bar needs are deserialized; everything else in the
//! reply is ignored.

use std::collections::VecDeque;

use serde::Deserialize;

use crate::types::WindowAttributes;

/// Node type of a tree container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Output,
    Con,
    FloatingCon,
    Workspace,
    Dockarea,
    #[serde(other)]
    Unknown,
}

/// X11 window properties attached to a leaf container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowProperties {
    #[serde(default)]
    pub class: Option<String>,
}

/// A single container in the layout tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: u64,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub window_properties: Option<WindowProperties>,
    /// Wayland application id (sway only)
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub floating_nodes: Vec<Node>,
}

impl Node {
    /// Window class for display purposes.
    ///
    /// Prefers WM_CLASS and falls back to the Wayland app id.
    pub fn window_class(&self) -> &str {
        self.window_properties
            .as_ref()
            .and_then(|props| props.class.as_deref())
            .or(self.app_id.as_deref())
            .unwrap_or("")
    }

    /// Collect every application window below this node.
    ///
    /// Traversal is breadth-first over tiling then floating children, so the
    /// order is stable for an unchanged tree. Clients docked in a dock area
    /// (bars, panels) are skipped.
    pub fn leaves(&self) -> Vec<WindowAttributes> {
        let mut leaves = Vec::new();
        let mut queue: VecDeque<(&Node, NodeType, &str)> = VecDeque::new();
        let workspace = self.workspace_name_or("");
        for child in self.children() {
            queue.push_back((child, self.node_type, workspace));
        }

        while let Some((node, parent_type, workspace)) = queue.pop_front() {
            let workspace = node.workspace_name_or(workspace);
            if node.nodes.is_empty()
                && node.node_type == NodeType::Con
                && parent_type != NodeType::Dockarea
            {
                leaves.push(WindowAttributes {
                    id: node.id,
                    window_class: node.window_class().to_string(),
                    name: node.name.clone().unwrap_or_default(),
                    focused: node.focused,
                    urgent: node.urgent,
                    workspace_name: workspace.to_string(),
                });
            }
            for child in node.children() {
                queue.push_back((child, node.node_type, workspace));
            }
        }

        leaves
    }

    fn children(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().chain(self.floating_nodes.iter())
    }

    fn workspace_name_or<'a>(&'a self, inherited: &'a str) -> &'a str {
        if self.node_type == NodeType::Workspace {
            self.name.as_deref().unwrap_or("")
        } else {
            inherited
        }
    }
}
