use crate::coords::Viewport;

use super::error::RenderError;
use super::texture::TextureId;
use super::vertex::{QuadVertex, QUAD_VERTEX_COUNT, VERTEX_STRIDE};

/// One renderable sprite recorded during traversal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QueueEntry {
    pub texture: TextureId,
    pub vertex: QuadVertex,
}

/// A maximal run of adjacent queue entries sharing one texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Batch {
    pub texture: TextureId,
    pub first_instance: u32,
    pub instance_count: u32,
}

/// Summary of a single [`BatchQueue::flush`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FlushStats {
    pub instances: u32,
    pub draw_calls: u32,
}

/// GPU operations needed to flush a frame queue.
///
/// [`BatchRenderer`](super::BatchRenderer) implements this on top of wgpu.
/// The trait keeps the batching algorithm independent of a live device.
pub trait DrawBackend {
    /// Uploads the orthographic projection (column-major).
    fn set_projection(&mut self, projection: [[f32; 4]; 4]);

    /// Current size of the instance buffer in bytes.
    fn vertex_capacity(&self) -> u64;

    /// Replaces the instance buffer by one of exactly `size` bytes.
    ///
    /// The previous buffer is released. Contents are not preserved.
    fn reallocate_vertex_buffer(&mut self, size: u64) -> Result<(), RenderError>;

    /// Writes `vertices` at offset 0 of the instance buffer.
    fn write_vertices(&mut self, vertices: &[QuadVertex]);

    /// Records one instanced draw with `texture` bound.
    fn draw(
        &mut self,
        texture: TextureId,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );
}

/// Per-frame queue of sprites in painter's order.
///
/// Entries are never reordered: batching merges only *adjacent* entries with
/// the same texture, so interleaved textures produce more, smaller batches.
/// Sorting by texture would change visual stacking.
///
/// Performance characteristics:
/// - `push()` is O(1)
/// - `flush()` is O(n); the vertex scratch buffer is reused across frames
#[derive(Debug, Default)]
pub struct BatchQueue {
    entries: Vec<QueueEntry>,
    scratch: Vec<QuadVertex>,
    last_draw_count: u32,
}

impl BatchQueue {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, texture: TextureId, vertex: QuadVertex) {
        self.entries.push(QueueEntry { texture, vertex });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns entries in enqueue order.
    #[inline]
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Drops all entries. Keeps allocated capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates the maximal equal-texture runs of the current queue order.
    #[inline]
    pub fn batches(&self) -> Batches<'_> {
        Batches { entries: &self.entries, pos: 0 }
    }

    /// Number of draw calls issued by the most recent flush.
    #[inline]
    pub fn draw_count(&self) -> u32 {
        self.last_draw_count
    }

    /// Converts the queue into draw calls on `backend`, then clears it.
    ///
    /// Steps:
    /// 1. upload a projection sized to `output`
    /// 2. grow the instance buffer to exactly `len * stride` bytes if it is too small
    /// 3. upload one vertex per entry, in queue order
    /// 4. issue one instanced draw per maximal equal-texture run
    /// 5. clear the queue
    ///
    /// The queue is cleared even when buffer growth fails; the draw count
    /// then reads zero.
    pub fn flush<B: DrawBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        output: Viewport,
    ) -> Result<FlushStats, RenderError> {
        let result = self.flush_inner(backend, output);
        if result.is_err() {
            self.last_draw_count = 0;
        }
        self.entries.clear();
        result
    }

    fn flush_inner<B: DrawBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        output: Viewport,
    ) -> Result<FlushStats, RenderError> {
        backend.set_projection(orthographic_projection(output));

        let required = self.entries.len() as u64 * VERTEX_STRIDE;
        if backend.vertex_capacity() < required {
            log::debug!(
                "growing sprite vertex buffer {} -> {} bytes",
                backend.vertex_capacity(),
                required
            );
            backend.reallocate_vertex_buffer(required)?;
        }

        self.scratch.clear();
        self.scratch.extend(self.entries.iter().map(|e| e.vertex));
        if !self.scratch.is_empty() {
            backend.write_vertices(&self.scratch);
        }

        let mut stats = FlushStats {
            instances: self.entries.len() as u32,
            draw_calls: 0,
        };
        for batch in self.batches() {
            backend.draw(
                batch.texture,
                QUAD_VERTEX_COUNT,
                batch.instance_count,
                0,
                batch.first_instance,
            );
            stats.draw_calls += 1;
        }

        self.last_draw_count = stats.draw_calls;
        log::trace!(
            "flushed {} sprites in {} draw calls",
            stats.instances,
            stats.draw_calls
        );
        Ok(stats)
    }
}

/// Iterator over [`Batch`] runs, see [`BatchQueue::batches`].
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    entries: &'a [QueueEntry],
    pos: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let start = self.pos;
        let texture = self.entries.get(start)?.texture;

        let mut end = start + 1;
        while end < self.entries.len() && self.entries[end].texture == texture {
            end += 1;
        }
        self.pos = end;

        Some(Batch {
            texture,
            first_instance: start as u32,
            instance_count: (end - start) as u32,
        })
    }
}

/// Orthographic projection mapping logical pixels (top-left origin, +Y down)
/// onto clip space. Column-major, ready for a WGSL `mat4x4<f32>`.
pub fn orthographic_projection(output: Viewport) -> [[f32; 4]; 4] {
    let w = output.width.max(1.0);
    let h = output.height.max(1.0);
    [
        [2.0 / w, 0.0, 0.0, 0.0],
        [0.0, -2.0 / h, 0.0, 0.0],
        [0.0, 0.0, -1.0, 0.0],
        [-1.0, 1.0, 0.0, 1.0],
    ]
}
