//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, map canvas, panels and overlays
//! - `input`: keyboard and mouse handling
//! - `styles`: colors and text styling

pub mod input;
pub mod render;
pub mod styles;
