//! Quill engine crate.
//!
//! Owns the platform + GPU runtime pieces used by the scene graph: the winit
//! runtime loop, wgpu device management, input translation, frame timing, the
//! 2D affine math shared with the stage, and the instanced sprite batcher.

pub mod core;
pub mod device;
pub mod input;
pub mod time;
pub mod window;

pub mod coords;
pub mod logging;
pub mod render;
