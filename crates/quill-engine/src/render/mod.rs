//! GPU sprite rendering.
//!
//! The stage records sprites into a [`BatchQueue`] in painter's order; the
//! [`BatchRenderer`] flushes that queue as instanced draws, one per run of
//! adjacent sprites sharing a texture.
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - The vertex shader converts to clip space with an orthographic projection.

mod ctx;
mod error;
mod queue;
mod renderer;
mod texture;
mod vertex;

pub use ctx::{RenderCtx, RenderTarget};
pub use error::RenderError;
pub use queue::{orthographic_projection, Batch, BatchQueue, Batches, DrawBackend, FlushStats, QueueEntry};
pub use renderer::{BatchRenderer, BatchRendererConfig};
pub use texture::{TextureCache, TextureCacheConfig, TextureId};
pub use vertex::{QuadVertex, QUAD_VERTEX_COUNT, VERTEX_STRIDE};
