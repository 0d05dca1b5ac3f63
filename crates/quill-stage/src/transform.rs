use std::collections::HashSet;

use quill_engine::coords::{Matrix2D, Rect, Vec2};

use crate::error::SceneError;
use crate::node::NodeId;
use crate::stage::Stage;

impl Stage {
    /// Matrix mapping `from`'s local space into `target`'s local space.
    ///
    /// `target = None` means the space above the topmost ancestor of `from`:
    /// every local transform on the path is applied, the root's included.
    ///
    /// Fails with [`SceneError::DisconnectedTree`] when the nodes share no
    /// ancestor, and with [`SceneError::SingularMatrix`] when a transform
    /// that has to be inverted is degenerate.
    pub fn transform_to(&self, from: NodeId, target: Option<NodeId>) -> Result<Matrix2D, SceneError> {
        let node = self.get(from)?;

        if target == Some(from) {
            return Ok(Matrix2D::IDENTITY);
        }
        if target == node.parent {
            return Ok(node.local_transform());
        }

        let Some(target) = target else {
            return self.transform_up(from, None);
        };
        self.get(target)?;

        if self.is_ancestor(target, from) {
            return self.transform_up(from, Some(target));
        }

        if self.is_ancestor(from, target) {
            let down = self.transform_up(target, Some(from))?;
            return Ok(down.inverted()?);
        }

        let common = self.common_ancestor(from, target)?;
        let to_common = self.transform_up(from, Some(common))?;
        let target_to_common = self.transform_up(target, Some(common))?;
        Ok(to_common.then(&target_to_common.inverted()?))
    }

    /// Composes local transforms from `from` upwards, stopping before `stop`.
    fn transform_up(&self, from: NodeId, stop: Option<NodeId>) -> Result<Matrix2D, SceneError> {
        let mut m = Matrix2D::identity();
        let mut cur = Some(from);
        while let Some(id) = cur {
            if Some(id) == stop {
                break;
            }
            let node = self.get(id)?;
            m.append(&node.local_transform());
            cur = node.parent;
        }
        Ok(m)
    }

    /// Lowest node that is an ancestor-or-self of both `a` and `b`.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Result<NodeId, SceneError> {
        let mut visited = HashSet::new();
        let mut cur = Some(a);
        while let Some(id) = cur {
            visited.insert(id);
            cur = self.get(id)?.parent;
        }

        let mut cur = Some(b);
        while let Some(id) = cur {
            if visited.contains(&id) {
                return Ok(id);
            }
            cur = self.get(id)?.parent;
        }

        Err(SceneError::DisconnectedTree { from: a, to: b })
    }

    /// Converts a point in `id`'s local space to stage coordinates.
    pub fn local_to_global(&self, id: NodeId, p: Vec2) -> Result<Vec2, SceneError> {
        Ok(self.transform_to(id, None)?.transform_point(p))
    }

    /// Converts a stage-space point into `id`'s local space.
    pub fn global_to_local(&self, id: NodeId, p: Vec2) -> Result<Vec2, SceneError> {
        Ok(self.transform_to(id, None)?.inverted()?.transform_point(p))
    }

    /// Bounding box of `id`'s own content expressed in `target`'s space.
    ///
    /// Nodes directly under an unrotated parent take an axis-aligned fast path;
    /// negative scales flip the origin so the result keeps a positive size.
    pub fn bounds(&self, id: NodeId, target: Option<NodeId>) -> Result<Rect, SceneError> {
        let node = self.get(id)?;
        let (w, h) = node.size();

        if target == Some(id) {
            return Ok(Rect::new(0.0, 0.0, w, h));
        }

        if target == node.parent && !node.is_rotated() {
            let (px, py) = node.pivot();
            let (sx, sy) = (node.scale_x(), node.scale_y());

            let mut x = node.x() - px * sx;
            let mut y = node.y() - py * sy;
            let mut bw = w * sx;
            let mut bh = h * sy;
            if bw < 0.0 {
                bw = -bw;
                x -= bw;
            }
            if bh < 0.0 {
                bh = -bh;
                y -= bh;
            }
            return Ok(Rect::new(x, y, bw, bh));
        }

        let m = self.transform_to(id, target)?;
        Ok(Rect::new(0.0, 0.0, w, h).transformed_bounds(&m))
    }

    /// Union of [`bounds`](Self::bounds) over `id` and all its descendants.
    pub fn bounds_with_children(&self, id: NodeId, target: Option<NodeId>) -> Result<Rect, SceneError> {
        let mut out = self.bounds(id, target)?;
        for &child in &self.get(id)?.children {
            out = out.union(self.bounds_with_children(child, target)?);
        }
        Ok(out)
    }
}
