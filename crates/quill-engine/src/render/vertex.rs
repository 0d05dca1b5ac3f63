use bytemuck::{Pod, Zeroable};

/// Per-instance record consumed by the sprite shader.
///
/// One `QuadVertex` describes a whole sprite: the shader expands it into a
/// four-corner strip using the vertex index. `position` is the screen-space
/// location of the sprite's local origin, `size` its scaled extent, and the
/// quad is rotated by `rotation` radians around `position`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub size: [f32; 2],
    /// Straight-alpha RGBA, normalized in the shader.
    pub tint: [u8; 4],
    pub rotation: f32,
}

/// Size in bytes of one [`QuadVertex`] in the instance buffer.
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<QuadVertex>() as u64;

/// Number of base vertices drawn per instance (a triangle-strip quad).
pub const QUAD_VERTEX_COUNT: u32 = 4;

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // size
        2 => Unorm8x4,  // tint
        3 => Float32    // rotation
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}
