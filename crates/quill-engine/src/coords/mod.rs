//! Coordinate and geometry types shared by the renderer and the scene graph.
//!
//! Canonical CPU space:
//! - Logical pixels (DPI-aware)
//! - Origin top-left
//! - +X right, +Y down, positive rotation is clockwise on screen
//!
//! The sprite shader converts to NDC through an orthographic projection uniform.

mod color;
mod matrix;
mod rect;
mod vec2;
mod viewport;

pub use color::{ColorRgba, Rgba8};
pub use matrix::{Matrix2D, SingularMatrixError};
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
