//! Quill stage: a retained 2D scene graph on top of `quill-engine`.
//!
//! Nodes live in a [`Stage`] arena and are addressed by [`NodeId`]. Each
//! node carries a local transform (position, scale, rotation, pivot) plus
//! tint, alpha and visibility, and either draws a textured sprite or only
//! groups children.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use quill_stage::prelude::*;
//!
//! let mut stage = Stage::new();
//! let ship = stage.insert(Node::sprite(Some(texture), 32.0, 32.0).with_pivot(16.0, 16.0));
//! stage.add_child(stage.root(), ship)?;
//!
//! stage.on(ship, EventKind::EnterFrame, |stage, id, ev| {
//!     if let (Some(node), NodeEvent::EnterFrame { elapsed }) = (stage.node_mut(id), ev) {
//!         node.set_rotation(*elapsed);
//!     }
//! })?;
//!
//! // Once per frame:
//! pointer.process(&mut stage, ctx.input_frame, ctx.time.now);
//! stage.render(ctx.time.since_start, &mut queue);
//! // ...then hand `queue` to a `BatchRenderer`.
//! ```

pub mod error;
pub mod events;
pub mod hit;
pub mod input;
pub mod node;
pub mod render;
pub mod render_state;
pub mod stage;
pub mod transform;

pub use error::{Axis, SceneError};
pub use events::{EventKind, Handler, HandlerId, NodeEvent};
pub use input::{PointerConfig, PointerDispatcher};
pub use node::{Content, Node, NodeId};
pub use render_state::{RenderState, RenderStateStack};
pub use stage::Stage;

/// Everything needed to build and drive a stage.
pub mod prelude {
    pub use crate::error::{Axis, SceneError};
    pub use crate::events::{EventKind, HandlerId, NodeEvent};
    pub use crate::input::{PointerConfig, PointerDispatcher};
    pub use crate::node::{Content, Node, NodeId};
    pub use crate::stage::Stage;

    pub use quill_engine::coords::{Matrix2D, Rect, Rgba8, Vec2};
    pub use quill_engine::render::{BatchQueue, TextureId};
}
