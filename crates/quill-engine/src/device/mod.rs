//! GPU device and window surface.
//!
//! [`Gpu`] owns the wgpu device/queue and the swapchain of the single
//! runtime window. Each frame is acquired as a [`GpuFrame`], recorded into,
//! then handed back through [`Gpu::submit`].

mod context;
mod init;
mod surface;

pub use context::Gpu;
pub use init::GpuInit;
pub use surface::{GpuFrame, SurfaceErrorAction};
