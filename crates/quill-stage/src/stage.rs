use slotmap::SlotMap;

use crate::error::SceneError;
use crate::events::{HandlerRegistry, NodeEvent};
use crate::node::{Node, NodeId};

/// Arena owning every node of a scene graph.
///
/// Nodes are addressed by [`NodeId`]. Parent/child links are id pairs kept in
/// sync by the stage: a node appears in exactly one parent's child list, or in
/// none (a detached root). The stage root is created with the stage and is
/// always on-stage; everything reachable from it is on-stage too.
///
/// Structural mutation from inside a traversal (`render`, hit testing) is a
/// precondition violation. Event handlers run between traversal steps and
/// may mutate the tree, but the traversal does not revisit its decisions.
pub struct Stage {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) handlers: HandlerRegistry,
    root: NodeId,
}

impl Stage {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root_node = Node::container().with_name("stage");
        root_node.on_stage = true;
        let root = nodes.insert(root_node);

        Self {
            nodes,
            handlers: HandlerRegistry::default(),
            root,
        }
    }

    /// The always-on-stage root node.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the root and detached nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Adds a detached node to the arena.
    pub fn insert(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        node.on_stage = false;
        self.nodes.insert(node)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::StaleNode(id))
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::StaleNode(id))
    }

    // ── queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children in back-to-front order; empty for stale ids.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    #[inline]
    pub fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.children(parent).get(index).copied()
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    #[inline]
    pub fn is_on_stage(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.on_stage)
    }

    /// Topmost ancestor of `id` (itself when detached and parentless).
    pub fn root_of(&self, id: NodeId) -> Result<NodeId, SceneError> {
        let mut cur = id;
        while let Some(parent) = self.get(cur)?.parent {
            cur = parent;
        }
        Ok(cur)
    }

    /// `true` if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.parent(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// First node named `name` in pre-order below and including `from`.
    pub fn find_by_name(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get(from)?;
        if node.name() == Some(name) {
            return Some(from);
        }
        node.children
            .iter()
            .find_map(|&child| self.find_by_name(child, name))
    }

    /// `id` and all its descendants in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(node) = self.nodes.get(cur) else { continue };
            out.push(cur);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    // ── structure ─────────────────────────────────────────────────────────

    /// Appends `child` as the front-most child of `parent`.
    ///
    /// A child attached elsewhere is detached first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let len = self.get(parent)?.children.len();
        let index = if self.parent(child) == Some(parent) { len - 1 } else { len };
        self.add_child_at(parent, child, index)
    }

    /// Inserts `child` at `index` of `parent`'s child list (0 is back-most).
    ///
    /// `index` is interpreted after `child` has left its previous position, so
    /// it may be at most the number of *other* children of `parent`.
    ///
    /// Moving a node between two on-stage parents fires no stage notifications;
    /// notifications fire only when the on-stage state actually changes.
    pub fn add_child_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> Result<(), SceneError> {
        self.get(child)?;
        let siblings = self.get(parent)?.children.len();

        if child == self.root {
            return Err(SceneError::RootNode);
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(SceneError::WouldCreateCycle { parent, child });
        }

        let old_parent = self.parent(child);
        let len = if old_parent == Some(parent) { siblings - 1 } else { siblings };
        if index > len {
            return Err(SceneError::InvalidChildIndex { index, len });
        }

        if let Some(old) = old_parent {
            self.unlink(old, child);
        }

        let on_stage = {
            let p = self.get_mut(parent)?;
            p.children.insert(index, child);
            p.on_stage
        };
        self.get_mut(child)?.parent = Some(parent);

        log::trace!("attached {child:?} to {parent:?} at {index}");
        self.set_on_stage(child, on_stage);
        Ok(())
    }

    /// Removes `child` from `parent`. Returns `false` if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, SceneError> {
        self.get(parent)?;
        if self.get(child)?.parent != Some(parent) {
            return Ok(false);
        }
        self.detach(child)
    }

    /// Detaches `id` from its parent. Returns `false` if it had none.
    pub fn detach(&mut self, id: NodeId) -> Result<bool, SceneError> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(false);
        };

        self.unlink(parent, id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }

        log::trace!("detached {id:?} from {parent:?}");
        self.set_on_stage(id, false);
        Ok(true)
    }

    /// Detaches `id` and releases it together with all its descendants.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RootNode);
        }
        self.detach(id)?;

        for node in self.subtree(id) {
            self.nodes.remove(node);
            self.handlers.remove_node(node);
        }
        Ok(())
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
    }

    /// Moves the subtree at `id` to `on_stage`, notifying each node whose
    /// state changes exactly once, in pre-order.
    fn set_on_stage(&mut self, id: NodeId, on_stage: bool) {
        let changed: Vec<NodeId> = self
            .subtree(id)
            .into_iter()
            .filter(|&n| self.nodes[n].on_stage != on_stage)
            .collect();

        for &n in &changed {
            self.nodes[n].on_stage = on_stage;
        }

        let event = if on_stage {
            NodeEvent::AddedToStage
        } else {
            NodeEvent::RemovedFromStage
        };
        for n in changed {
            self.dispatch(n, &event);
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub(crate) fn sprite(stage: &mut Stage, x: f32, y: f32) -> NodeId {
        stage.insert(Node::sprite(None, 1.0, 1.0).with_position(x, y))
    }

    /// Every parent link is mirrored by exactly one child-list entry.
    pub(crate) fn assert_links_consistent(stage: &Stage) {
        for (id, node) in &stage.nodes {
            if let Some(p) = node.parent {
                let count = stage.nodes[p].children.iter().filter(|&&c| c == id).count();
                assert_eq!(count, 1, "{id:?} listed {count} times under {p:?}");
            }
            for &c in &node.children {
                assert_eq!(stage.nodes[c].parent, Some(id));
            }
        }
    }

    fn record(stage: &mut Stage, id: NodeId, log: &Rc<RefCell<Vec<(NodeId, EventKind)>>>) {
        for kind in [EventKind::AddedToStage, EventKind::RemovedFromStage] {
            let log = Rc::clone(log);
            stage
                .on(id, kind, move |_, node, ev| log.borrow_mut().push((node, ev.kind())))
                .unwrap();
        }
    }

    // ── hierarchy ─────────────────────────────────────────────────────────

    #[test]
    fn add_child_appends_front_most() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = sprite(&mut stage, 0.0, 0.0);
        let b = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(root, a).unwrap();
        stage.add_child(root, b).unwrap();

        assert_eq!(stage.children(root), &[a, b]);
        assert_eq!(stage.parent(b), Some(root));
        assert_links_consistent(&stage);
    }

    #[test]
    fn reparenting_detaches_first() {
        let mut stage = Stage::new();
        let root = stage.root();
        let p1 = stage.insert(Node::container());
        let p2 = stage.insert(Node::container());
        let c = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(root, p1).unwrap();
        stage.add_child(root, p2).unwrap();

        stage.add_child(p1, c).unwrap();
        stage.add_child(p2, c).unwrap();

        assert!(stage.children(p1).is_empty());
        assert_eq!(stage.children(p2), &[c]);
        assert_links_consistent(&stage);
    }

    #[test]
    fn add_child_at_controls_order() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = sprite(&mut stage, 0.0, 0.0);
        let b = sprite(&mut stage, 0.0, 0.0);
        let c = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(root, a).unwrap();
        stage.add_child(root, b).unwrap();
        stage.add_child_at(root, c, 0).unwrap();
        assert_eq!(stage.children(root), &[c, a, b]);

        // Moving within the same parent.
        stage.add_child_at(root, c, 2).unwrap();
        assert_eq!(stage.children(root), &[a, b, c]);
        stage.add_child(root, a).unwrap();
        assert_eq!(stage.children(root), &[b, c, a]);
        assert_links_consistent(&stage);
    }

    #[test]
    fn add_child_at_out_of_range() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = sprite(&mut stage, 0.0, 0.0);
        let err = stage.add_child_at(root, a, 1).unwrap_err();
        assert_eq!(err, SceneError::InvalidChildIndex { index: 1, len: 0 });
        assert_eq!(stage.parent(a), None);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut stage = Stage::new();
        let a = stage.insert(Node::container());
        let b = stage.insert(Node::container());
        stage.add_child(a, b).unwrap();

        assert_eq!(
            stage.add_child(b, a).unwrap_err(),
            SceneError::WouldCreateCycle { parent: b, child: a }
        );
        assert!(matches!(stage.add_child(a, a), Err(SceneError::WouldCreateCycle { .. })));

        let root = stage.root();
        assert_eq!(stage.add_child(a, root).unwrap_err(), SceneError::RootNode);
    }

    #[test]
    fn remove_child_of_other_parent_is_noop() {
        let mut stage = Stage::new();
        let root = stage.root();
        let other = stage.insert(Node::container());
        let c = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(root, c).unwrap();

        assert!(!stage.remove_child(other, c).unwrap());
        assert_eq!(stage.parent(c), Some(root));
        assert!(stage.remove_child(root, c).unwrap());
        assert_eq!(stage.parent(c), None);
        assert!(!stage.detach(c).unwrap());
    }

    #[test]
    fn destroy_releases_subtree() {
        let mut stage = Stage::new();
        let root = stage.root();
        let p = stage.insert(Node::container());
        let c = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(root, p).unwrap();
        stage.add_child(p, c).unwrap();

        stage.destroy(p).unwrap();
        assert!(!stage.contains(p));
        assert!(!stage.contains(c));
        assert!(stage.children(root).is_empty());
        assert_eq!(stage.add_child(root, c).unwrap_err(), SceneError::StaleNode(c));
        assert_eq!(stage.destroy(root).unwrap_err(), SceneError::RootNode);
    }

    #[test]
    fn queries() {
        let mut stage = Stage::new();
        let root = stage.root();
        let p = stage.insert(Node::container().with_name("panel"));
        let c = stage.insert(Node::sprite(None, 1.0, 1.0).with_name("icon"));
        stage.add_child(root, p).unwrap();
        stage.add_child(p, c).unwrap();

        assert_eq!(stage.find_by_name(root, "icon"), Some(c));
        assert_eq!(stage.find_by_name(root, "missing"), None);
        assert_eq!(stage.root_of(c).unwrap(), root);
        assert!(stage.is_ancestor(root, c));
        assert!(!stage.is_ancestor(c, root));
        assert_eq!(stage.child_index(p, c), Some(0));
        assert_eq!(stage.child_at(root, 0), Some(p));
        assert_eq!(stage.subtree(root), vec![root, p, c]);
    }

    // ── on-stage propagation ──────────────────────────────────────────────

    #[test]
    fn attaching_subtree_propagates_on_stage_once() {
        let mut stage = Stage::new();
        let root = stage.root();
        let p = stage.insert(Node::container());
        let c = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(p, c).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        record(&mut stage, p, &log);
        record(&mut stage, c, &log);

        stage.add_child(root, p).unwrap();
        assert!(stage.is_on_stage(p) && stage.is_on_stage(c));
        assert_eq!(
            *log.borrow(),
            vec![(p, EventKind::AddedToStage), (c, EventKind::AddedToStage)]
        );

        log.borrow_mut().clear();
        stage.detach(p).unwrap();
        assert!(!stage.is_on_stage(c));
        assert_eq!(
            *log.borrow(),
            vec![(p, EventKind::RemovedFromStage), (c, EventKind::RemovedFromStage)]
        );
    }

    #[test]
    fn moving_between_on_stage_parents_is_silent() {
        let mut stage = Stage::new();
        let root = stage.root();
        let p1 = stage.insert(Node::container());
        let p2 = stage.insert(Node::container());
        let c = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(root, p1).unwrap();
        stage.add_child(root, p2).unwrap();
        stage.add_child(p1, c).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        record(&mut stage, c, &log);
        stage.add_child(p2, c).unwrap();
        assert!(log.borrow().is_empty());
        assert!(stage.is_on_stage(c));
    }

    #[test]
    fn building_off_stage_fires_nothing() {
        let mut stage = Stage::new();
        let p = stage.insert(Node::container());
        let c = sprite(&mut stage, 0.0, 0.0);

        let log = Rc::new(RefCell::new(Vec::new()));
        record(&mut stage, c, &log);
        stage.add_child(p, c).unwrap();
        stage.detach(c).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn destroy_fires_removed_before_release() {
        let mut stage = Stage::new();
        let root = stage.root();
        let c = sprite(&mut stage, 0.0, 0.0);
        stage.add_child(root, c).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        record(&mut stage, c, &log);
        stage.destroy(c).unwrap();
        assert_eq!(*log.borrow(), vec![(c, EventKind::RemovedFromStage)]);
    }
}
