use std::collections::HashSet;

use super::error::RenderError;
use super::queue::{BatchQueue, DrawBackend, FlushStats};
use super::texture::{TextureCache, TextureId};
use super::vertex::QuadVertex;
use super::{RenderCtx, RenderTarget};

/// Batch renderer configuration.
#[derive(Debug, Clone)]
pub struct BatchRendererConfig {
    /// Size in bytes of the instance buffer created up front.
    pub initial_vertex_buffer_size: u64,
}

impl Default for BatchRendererConfig {
    fn default() -> Self {
        Self {
            initial_vertex_buffer_size: 1000,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct RecordedDraw {
    texture: TextureId,
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    first_instance: u32,
}

/// Instanced sprite renderer.
///
/// Owns the sprite pipeline, the projection uniform and one growable instance
/// buffer. A frame is rendered by flushing a [`BatchQueue`]: one instanced
/// draw per adjacent equal-texture run, all inside a single render pass that
/// loads the existing target contents.
pub struct BatchRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    projection_layout: wgpu::BindGroupLayout,
    projection_ubo: wgpu::Buffer,
    projection_bind_group: wgpu::BindGroup,

    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,

    draws: Vec<RecordedDraw>,
    warned_missing: HashSet<TextureId>,
    last_draw_count: u32,
}

impl BatchRenderer {
    pub fn new(device: &wgpu::Device, config: BatchRendererConfig) -> Self {
        let projection_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quill projection bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(PROJECTION_SIZE),
                },
                count: None,
            }],
        });

        let projection_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quill projection ubo"),
            size: PROJECTION_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quill projection bind group"),
            layout: &projection_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_ubo.as_entire_binding(),
            }],
        });

        let vertex_capacity = align_to_copy(config.initial_vertex_buffer_size.max(1));
        let vertex_buffer = create_vertex_buffer(device, vertex_capacity);

        Self {
            pipeline_format: None,
            pipeline: None,
            projection_layout,
            projection_ubo,
            projection_bind_group,
            vertex_buffer,
            vertex_capacity,
            draws: Vec::new(),
            warned_missing: HashSet::new(),
            last_draw_count: 0,
        }
    }

    /// Draw calls issued by the most recent [`render`](Self::render).
    #[inline]
    pub fn draw_count(&self) -> u32 {
        self.last_draw_count
    }

    /// Current instance buffer size in bytes.
    #[inline]
    pub fn vertex_capacity(&self) -> u64 {
        self.vertex_capacity
    }

    /// Flushes `batch` into `target`.
    ///
    /// The queue is empty afterwards, also on error. Draws referencing a
    /// texture no longer in `textures` are skipped with a one-time warning.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        textures: &TextureCache,
        batch: &mut BatchQueue,
    ) -> Result<FlushStats, RenderError> {
        self.ensure_pipeline(ctx, textures);

        self.draws.clear();
        let stats = {
            let mut backend = WgpuBackend {
                device: ctx.device,
                queue: ctx.queue,
                projection_ubo: &self.projection_ubo,
                vertex_buffer: &mut self.vertex_buffer,
                vertex_capacity: &mut self.vertex_capacity,
                draws: &mut self.draws,
            };
            batch.flush(&mut backend, ctx.viewport)?
        };
        self.last_draw_count = stats.draw_calls;

        if self.draws.is_empty() {
            return Ok(stats);
        }

        let Some(pipeline) = self.pipeline.as_ref() else {
            return Ok(stats);
        };

        let mut rpass = target.begin_pass("quill sprite pass");

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &self.projection_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        for draw in &self.draws {
            let Some(bind_group) = textures.bind_group(draw.texture) else {
                if self.warned_missing.insert(draw.texture) {
                    log::warn!("skipping sprites with released texture {:?}", draw.texture);
                }
                continue;
            };
            rpass.set_bind_group(1, bind_group, &[]);
            rpass.draw(
                draw.first_vertex..draw.first_vertex + draw.vertex_count,
                draw.first_instance..draw.first_instance + draw.instance_count,
            );
        }

        Ok(stats)
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, textures: &TextureCache) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quill sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quill sprite pipeline layout"),
            bind_group_layouts: &[&self.projection_layout, textures.bind_group_layout()],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quill sprite pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built sprite pipeline for {:?}", ctx.surface_format);
        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }
}

const PROJECTION_SIZE: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

#[inline]
fn align_to_copy(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

fn create_vertex_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("quill sprite instance vbo"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Frame-scoped [`DrawBackend`] that uploads through wgpu and records draws
/// for replay inside the render pass.
struct WgpuBackend<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    projection_ubo: &'a wgpu::Buffer,
    vertex_buffer: &'a mut wgpu::Buffer,
    vertex_capacity: &'a mut u64,
    draws: &'a mut Vec<RecordedDraw>,
}

impl DrawBackend for WgpuBackend<'_> {
    fn set_projection(&mut self, projection: [[f32; 4]; 4]) {
        self.queue
            .write_buffer(self.projection_ubo, 0, bytemuck::cast_slice(&projection));
    }

    fn vertex_capacity(&self) -> u64 {
        *self.vertex_capacity
    }

    fn reallocate_vertex_buffer(&mut self, size: u64) -> Result<(), RenderError> {
        let limit = self.device.limits().max_buffer_size;
        let size = align_to_copy(size);
        if size > limit {
            return Err(RenderError::ResourceAllocation {
                requested: size,
                limit,
            });
        }

        let old = std::mem::replace(self.vertex_buffer, create_vertex_buffer(self.device, size));
        old.destroy();
        *self.vertex_capacity = size;
        Ok(())
    }

    fn write_vertices(&mut self, vertices: &[QuadVertex]) {
        self.queue
            .write_buffer(self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
    }

    fn draw(
        &mut self,
        texture: TextureId,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.draws.push(RecordedDraw {
            texture,
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }
}
