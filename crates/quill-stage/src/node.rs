use std::cell::Cell;
use std::f32::consts::{PI, TAU};

use quill_engine::coords::{Matrix2D, Rgba8};
use quill_engine::render::TextureId;

use crate::error::{Axis, SceneError};

slotmap::new_key_type! {
    /// Stable handle to a node in a [`Stage`](crate::Stage).
    pub struct NodeId;
}

/// What a node draws.
///
/// The render core only needs size and texture, so this is a closed set.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Grouping node with no intrinsic size. Never enqueued.
    Container,
    /// Textured quad of `width x height` local units.
    ///
    /// A sprite without a texture is laid out and hit-tested but not drawn.
    Sprite {
        texture: Option<TextureId>,
        width: f32,
        height: f32,
    },
}

/// A transformable element of the scene graph.
///
/// Hierarchy links are owned by the [`Stage`](crate::Stage); a `Node` built
/// standalone is inserted with `Stage::insert` and starts detached.
///
/// The local transform is cached. Mutating position, scale, rotation or pivot
/// marks the cache dirty and the next [`local_transform`](Node::local_transform)
/// recomputes it.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) on_stage: bool,

    name: Option<String>,
    content: Content,

    x: f32,
    y: f32,
    scale_x: f32,
    scale_y: f32,
    rotation: f32,
    pivot_x: f32,
    pivot_y: f32,

    /// Straight-alpha tint multiplied with the texture.
    pub tint: Rgba8,
    /// Own opacity factor, multiplied with every ancestor's.
    pub alpha: f32,
    /// Invisible nodes are skipped, with their subtree, by rendering and hit testing.
    pub visible: bool,
    /// Non-interactive nodes are skipped, with their subtree, by hit testing.
    pub interactive: bool,

    transform: Cell<Matrix2D>,
    dirty: Cell<bool>,
}

impl Node {
    fn with_content(content: Content) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            on_stage: false,
            name: None,
            content,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            pivot_x: 0.0,
            pivot_y: 0.0,
            tint: Rgba8::WHITE,
            alpha: 1.0,
            visible: true,
            interactive: true,
            transform: Cell::new(Matrix2D::IDENTITY),
            dirty: Cell::new(false),
        }
    }

    pub fn container() -> Self {
        Self::with_content(Content::Container)
    }

    pub fn sprite(texture: Option<TextureId>, width: f32, height: f32) -> Self {
        Self::with_content(Content::Sprite { texture, width, height })
    }

    // ── builder ───────────────────────────────────────────────────────────

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.set_position(x, y);
        self
    }

    pub fn with_scale(mut self, sx: f32, sy: f32) -> Self {
        self.set_scale_x(sx);
        self.set_scale_y(sy);
        self
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.set_rotation(radians);
        self
    }

    pub fn with_pivot(mut self, px: f32, py: f32) -> Self {
        self.set_pivot(px, py);
        self
    }

    pub fn with_tint(mut self, tint: Rgba8) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    // ── hierarchy (read-only; mutate through the stage) ───────────────────

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in back-to-front order.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// `true` while the node is reachable from the stage root.
    #[inline]
    pub fn is_on_stage(&self) -> bool {
        self.on_stage
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    // ── content ───────────────────────────────────────────────────────────

    #[inline]
    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn set_content(&mut self, content: Content) {
        self.content = content;
    }

    #[inline]
    pub fn texture(&self) -> Option<TextureId> {
        match self.content {
            Content::Sprite { texture, .. } => texture,
            Content::Container => None,
        }
    }

    /// Replaces the texture of a sprite. Containers ignore this and return `false`.
    pub fn set_texture(&mut self, id: Option<TextureId>) -> bool {
        match &mut self.content {
            Content::Sprite { texture, .. } => {
                *texture = id;
                true
            }
            Content::Container => false,
        }
    }

    /// Unscaled size in local units; zero for containers.
    #[inline]
    pub fn size(&self) -> (f32, f32) {
        match self.content {
            Content::Sprite { width, height, .. } => (width, height),
            Content::Container => (0.0, 0.0),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size().0
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size().1
    }

    /// Width after this node's own horizontal scale.
    #[inline]
    pub fn width_scaled(&self) -> f32 {
        self.width() * self.scale_x
    }

    #[inline]
    pub fn height_scaled(&self) -> f32 {
        self.height() * self.scale_y
    }

    /// Sets `scale_x` so that the scaled width becomes `width`.
    ///
    /// `id` is only used to label the error.
    pub fn set_width_scaled(&mut self, id: NodeId, width: f32) -> Result<(), SceneError> {
        let original = self.width();
        if original == 0.0 {
            return Err(SceneError::DegenerateSize { node: id, axis: Axis::Horizontal });
        }
        self.set_scale_x(width / original);
        Ok(())
    }

    pub fn set_height_scaled(&mut self, id: NodeId, height: f32) -> Result<(), SceneError> {
        let original = self.height();
        if original == 0.0 {
            return Err(SceneError::DegenerateSize { node: id, axis: Axis::Vertical });
        }
        self.set_scale_y(height / original);
        Ok(())
    }

    /// `true` for sprites that can be the target of a hit test.
    #[inline]
    pub(crate) fn is_hit_area(&self) -> bool {
        let (w, h) = self.size();
        matches!(self.content, Content::Sprite { .. }) && w != 0.0 && h != 0.0
    }

    // ── transform parameters ──────────────────────────────────────────────

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    #[inline]
    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    /// Rotation in radians, always within `(-PI, PI]`.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn is_rotated(&self) -> bool {
        self.rotation != 0.0
    }

    #[inline]
    pub fn pivot(&self) -> (f32, f32) {
        (self.pivot_x, self.pivot_y)
    }

    pub fn set_x(&mut self, x: f32) {
        if self.x != x {
            self.x = x;
            self.dirty.set(true);
        }
    }

    pub fn set_y(&mut self, y: f32) {
        if self.y != y {
            self.y = y;
            self.dirty.set(true);
        }
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.set_x(x);
        self.set_y(y);
    }

    pub fn set_scale_x(&mut self, sx: f32) {
        if self.scale_x != sx {
            self.scale_x = sx;
            self.dirty.set(true);
        }
    }

    pub fn set_scale_y(&mut self, sy: f32) {
        if self.scale_y != sy {
            self.scale_y = sy;
            self.dirty.set(true);
        }
    }

    /// Uniform scale.
    pub fn set_scale(&mut self, s: f32) {
        self.set_scale_x(s);
        self.set_scale_y(s);
    }

    /// Sets the rotation, reduced to the equivalent angle in `(-PI, PI]`.
    pub fn set_rotation(&mut self, radians: f32) {
        let r = normalize_angle(radians);
        if self.rotation != r {
            self.rotation = r;
            self.dirty.set(true);
        }
    }

    pub fn set_pivot(&mut self, px: f32, py: f32) {
        if self.pivot_x != px || self.pivot_y != py {
            self.pivot_x = px;
            self.pivot_y = py;
            self.dirty.set(true);
        }
    }

    /// Local → parent transform: scale, then rotate, then translate, with the
    /// translation adjusted so scaling and rotation happen around the pivot.
    pub fn local_transform(&self) -> Matrix2D {
        if self.dirty.get() {
            self.transform.set(self.compose());
            self.dirty.set(false);
        }
        self.transform.get()
    }

    fn compose(&self) -> Matrix2D {
        let mut m = Matrix2D::identity();
        m.scale(self.scale_x, self.scale_y)
            .rotate(self.rotation)
            .translate(self.x, self.y);

        if self.pivot_x != 0.0 || self.pivot_y != 0.0 {
            m.tx = self.x - m.a * self.pivot_x - m.c * self.pivot_y;
            m.ty = self.y - m.b * self.pivot_x - m.d * self.pivot_y;
        }
        m
    }
}

/// Reduces `angle` to the equivalent angle in `(-PI, PI]`.
pub(crate) fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}
