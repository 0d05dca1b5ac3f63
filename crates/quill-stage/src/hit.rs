use quill_engine::coords::{Rect, Vec2};

use crate::error::SceneError;
use crate::node::NodeId;
use crate::stage::Stage;

impl Stage {
    /// Front-most node under `local`, a point in `id`'s local space.
    ///
    /// Children are tested front to back before `id` itself. Invisible or
    /// non-interactive nodes are skipped along with their subtrees, as are
    /// children collapsed to a singular transform since they cover no area.
    /// Only sprites with a non-zero size can be hit.
    pub fn hit_test(&self, id: NodeId, local: Vec2) -> Result<Option<NodeId>, SceneError> {
        let node = self.get(id)?;
        if !node.visible || !node.interactive {
            return Ok(None);
        }

        for &child in node.children.iter().rev() {
            let c = self.get(child)?;
            if !c.visible || !c.interactive {
                continue;
            }
            let to_child = match c.local_transform().inverted() {
                Ok(m) => m,
                Err(err) => {
                    log::trace!("skipping collapsed {child:?} in hit test: {err}");
                    continue;
                }
            };
            if let Some(hit) = self.hit_test(child, to_child.transform_point(local))? {
                return Ok(Some(hit));
            }
        }

        let (w, h) = node.size();
        if node.is_hit_area() && Rect::new(0.0, 0.0, w, h).contains(local) {
            Ok(Some(id))
        } else {
            Ok(None)
        }
    }

    /// Front-most node under a point in stage (window) coordinates.
    pub fn hit_test_global(&self, point: Vec2) -> Result<Option<NodeId>, SceneError> {
        let root = self.get(self.root())?;
        let local = root.local_transform().inverted()?.transform_point(point);
        self.hit_test(self.root(), local)
    }
}
