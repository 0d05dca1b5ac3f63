use quill_engine::coords::Matrix2D;

use crate::node::Node;

/// Accumulated drawing context for one node during a traversal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderState {
    /// Product of the alpha of every node on the path.
    pub alpha: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Sum of the rotations on the path. Carried next to the matrix because
    /// the sprite vertex stores position, size and rotation separately.
    pub rotation: f32,
    /// Local → stage transform.
    pub modelview: Matrix2D,
}

impl RenderState {
    pub const ROOT: Self = Self {
        alpha: 1.0,
        scale_x: 1.0,
        scale_y: 1.0,
        rotation: 0.0,
        modelview: Matrix2D::IDENTITY,
    };

    /// State of `node` drawn inside `self`.
    pub fn derive(&self, node: &Node) -> RenderState {
        RenderState {
            alpha: self.alpha * node.alpha,
            scale_x: self.scale_x * node.scale_x(),
            scale_y: self.scale_y * node.scale_y(),
            rotation: self.rotation + node.rotation(),
            modelview: node.local_transform().then(&self.modelview),
        }
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::ROOT
    }
}

/// LIFO stack of [`RenderState`]s, one per tree level on the active path.
///
/// The bottom entry is [`RenderState::ROOT`] and is never popped.
#[derive(Debug)]
pub struct RenderStateStack {
    states: Vec<RenderState>,
}

impl RenderStateStack {
    pub fn new() -> Self {
        Self {
            states: vec![RenderState::ROOT],
        }
    }

    /// Pushes the state of `node` composed onto the current top and returns it.
    pub fn push(&mut self, node: &Node) -> RenderState {
        let state = self.top().derive(node);
        self.states.push(state);
        state
    }

    /// Pops the most recent state. The root state stays.
    pub fn pop(&mut self) -> Option<RenderState> {
        if self.states.len() > 1 {
            self.states.pop()
        } else {
            None
        }
    }

    #[inline]
    pub fn top(&self) -> &RenderState {
        // The root entry is never removed.
        &self.states[self.states.len() - 1]
    }

    /// Number of pushed states above the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.states.len() - 1
    }

    pub fn reset(&mut self) {
        self.states.truncate(1);
    }
}

impl Default for RenderStateStack {
    fn default() -> Self {
        Self::new()
    }
}
