use quill_engine::render::{BatchQueue, QuadVertex};

use crate::events::NodeEvent;
use crate::node::NodeId;
use crate::render_state::{RenderState, RenderStateStack};
use crate::stage::Stage;

impl Stage {
    /// Runs one frame traversal from the root and enqueues every visible,
    /// textured, non-empty sprite into `queue` in painter's order.
    ///
    /// Each visited on-stage node first receives [`NodeEvent::EnterFrame`].
    /// Invisible nodes are not visited, nor are their subtrees. Nodes
    /// without a texture or with empty bounds are not enqueued, but their
    /// children still are.
    ///
    /// Returns the number of sprites enqueued.
    pub fn render(&mut self, elapsed: f32, queue: &mut BatchQueue) -> usize {
        let mut states = RenderStateStack::new();
        let before = queue.len();
        self.render_node(self.root(), elapsed, &mut states, queue);
        queue.len() - before
    }

    fn render_node(
        &mut self,
        id: NodeId,
        elapsed: f32,
        states: &mut RenderStateStack,
        queue: &mut BatchQueue,
    ) {
        match self.nodes.get(id) {
            Some(node) if node.visible => {
                if node.on_stage {
                    self.dispatch(id, &NodeEvent::EnterFrame { elapsed });
                }
            }
            _ => return,
        }

        // Handlers may have hidden or destroyed the node.
        let Some(node) = self.nodes.get(id).filter(|n| n.visible) else {
            return;
        };

        let state = states.push(node);
        if let Some(texture) = node.texture() {
            let non_empty = self
                .bounds(id, node.parent)
                .is_ok_and(|b| !b.is_empty());
            if non_empty {
                queue.push(texture, sprite_vertex(node.size(), node.tint, &state));
            }
        }

        let mut i = 0;
        while let Some(child) = self.child_at(id, i) {
            self.render_node(child, elapsed, states, queue);
            i += 1;
        }

        states.pop();
    }
}

fn sprite_vertex(
    (width, height): (f32, f32),
    tint: quill_engine::coords::Rgba8,
    state: &RenderState,
) -> QuadVertex {
    QuadVertex {
        position: [state.modelview.tx, state.modelview.ty],
        size: [width * state.scale_x, height * state.scale_y],
        tint: tint.with_alpha_factor(state.alpha).to_array(),
        rotation: state.rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::node::Node;
    use core::f32::consts::FRAC_PI_2;
    use quill_engine::coords::Rgba8;
    use quill_engine::render::TextureId;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn textures(n: usize) -> Vec<TextureId> {
        let mut keys: SlotMap<TextureId, ()> = SlotMap::with_key();
        (0..n).map(|_| keys.insert(())).collect()
    }

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn enqueues_in_painter_order() {
        let t = textures(2);
        let mut stage = Stage::new();
        let root = stage.root();
        let a = stage.insert(Node::sprite(Some(t[0]), 10.0, 10.0));
        let b = stage.insert(Node::sprite(Some(t[1]), 10.0, 10.0));
        let c = stage.insert(Node::sprite(Some(t[0]), 10.0, 10.0));
        for n in [a, b, c] {
            stage.add_child(root, n).unwrap();
        }

        let mut queue = BatchQueue::new();
        assert_eq!(stage.render(0.0, &mut queue), 3);
        let order: Vec<_> = queue.entries().iter().map(|e| e.texture).collect();
        assert_eq!(order, vec![t[0], t[1], t[0]]);
        assert_eq!(queue.batches().count(), 3);
    }

    #[test]
    fn skips_untextured_empty_and_invisible() {
        let t = textures(1);
        let mut stage = Stage::new();
        let root = stage.root();
        let group = stage.insert(Node::sprite(None, 10.0, 10.0));
        let child = stage.insert(Node::sprite(Some(t[0]), 4.0, 4.0));
        let flat = stage.insert(Node::sprite(Some(t[0]), 4.0, 4.0).with_scale(1.0, 0.0));
        let hidden = stage.insert(Node::sprite(Some(t[0]), 4.0, 4.0));
        stage.add_child(root, group).unwrap();
        stage.add_child(group, child).unwrap();
        stage.add_child(root, flat).unwrap();
        stage.add_child(root, hidden).unwrap();
        stage.node_mut(hidden).unwrap().visible = false;

        let mut queue = BatchQueue::new();
        assert_eq!(stage.render(0.0, &mut queue), 1);
    }

    #[test]
    fn vertex_reflects_accumulated_state() {
        let t = textures(1);
        let mut stage = Stage::new();
        let root = stage.root();
        let group = stage.insert(
            Node::container()
                .with_position(100.0, 50.0)
                .with_scale(2.0, 2.0)
                .with_alpha(0.5),
        );
        let leaf = stage.insert(
            Node::sprite(Some(t[0]), 8.0, 4.0)
                .with_position(10.0, 0.0)
                .with_rotation(FRAC_PI_2)
                .with_tint(Rgba8::new(255, 0, 0, 255)),
        );
        stage.add_child(root, group).unwrap();
        stage.add_child(group, leaf).unwrap();

        let mut queue = BatchQueue::new();
        stage.render(0.0, &mut queue);
        let v = queue.entries()[0].vertex;

        assert!(approx_eq(v.position[0], 120.0) && approx_eq(v.position[1], 50.0));
        assert_eq!(v.size, [16.0, 8.0]);
        assert_eq!(v.tint, [255, 0, 0, 128]);
        assert!(approx_eq(v.rotation, FRAC_PI_2));
    }

    #[test]
    fn enter_frame_reaches_visible_on_stage_nodes() {
        let mut stage = Stage::new();
        let root = stage.root();
        let shown = stage.insert(Node::container());
        let hidden = stage.insert(Node::container());
        let off_stage = stage.insert(Node::container());
        stage.add_child(root, shown).unwrap();
        stage.add_child(root, hidden).unwrap();
        stage.node_mut(hidden).unwrap().visible = false;

        let seen = Rc::new(RefCell::new(Vec::new()));
        for id in [shown, hidden, off_stage] {
            let s = Rc::clone(&seen);
            stage
                .on(id, EventKind::EnterFrame, move |_, node, ev| {
                    if let NodeEvent::EnterFrame { elapsed } = ev {
                        s.borrow_mut().push((node, *elapsed));
                    }
                })
                .unwrap();
        }

        stage.render(1.5, &mut BatchQueue::new());
        assert_eq!(*seen.borrow(), vec![(shown, 1.5)]);
    }

    #[test]
    fn enter_frame_handler_can_animate_before_enqueue() {
        let t = textures(1);
        let mut stage = Stage::new();
        let root = stage.root();
        let spinner = stage.insert(Node::sprite(Some(t[0]), 2.0, 2.0));
        stage.add_child(root, spinner).unwrap();
        stage
            .on(spinner, EventKind::EnterFrame, |stage, id, ev| {
                if let (Some(node), NodeEvent::EnterFrame { elapsed }) = (stage.node_mut(id), ev) {
                    node.set_x(*elapsed * 10.0);
                }
            })
            .unwrap();

        let mut queue = BatchQueue::new();
        stage.render(2.0, &mut queue);
        assert_eq!(queue.entries()[0].vertex.position, [20.0, 0.0]);
    }
}
