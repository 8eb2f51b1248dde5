//! winbar - window list module for i3 status bars
//!
//! Renders every open window as a clickable, icon-prefixed bar fragment and
//! re-renders whenever the window manager reports a workspace or window
//! change. Shared by the `winbar` and `winbar-focus` binaries.

pub mod config;
pub mod event;
pub mod icon;
pub mod ipc;
pub mod render;
pub mod title;
pub mod tree;
pub mod types;
