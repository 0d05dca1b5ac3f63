//! Per-node event handlers.
//!
//! Handlers are plain closures registered on a node for one [`EventKind`].
//! They run synchronously on the thread that drives the stage and receive
//! `&mut Stage`, so they may mutate the tree (including their own node).
//!
//! The handlers to run are fixed when a dispatch starts: handlers registered
//! meanwhile run from the next dispatch on, handlers removed meanwhile are
//! skipped. Each handler is taken out of its slot only while it runs, so it
//! may trigger other events on its own node (detaching itself fires
//! `RemovedFromStage`). A handler is not re-entered by a nested dispatch of
//! its own kind.

use std::collections::HashMap;

use quill_engine::coords::Vec2;
use quill_engine::input::MouseButton;
use slotmap::SecondaryMap;

use crate::error::SceneError;
use crate::node::NodeId;
use crate::stage::Stage;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventKind {
    AddedToStage,
    RemovedFromStage,
    EnterFrame,
    PointerEnter,
    PointerExit,
    PointerDown,
    PointerUp,
    Click,
}

/// Event delivered to a node's handlers.
///
/// Pointer positions are in stage (window) coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeEvent {
    AddedToStage,
    RemovedFromStage,
    /// Seconds elapsed since the frame driver started.
    EnterFrame { elapsed: f32 },
    PointerEnter { position: Vec2 },
    PointerExit { position: Vec2 },
    PointerDown { position: Vec2, button: MouseButton },
    PointerUp { position: Vec2, button: MouseButton },
    Click { position: Vec2 },
}

impl NodeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NodeEvent::AddedToStage => EventKind::AddedToStage,
            NodeEvent::RemovedFromStage => EventKind::RemovedFromStage,
            NodeEvent::EnterFrame { .. } => EventKind::EnterFrame,
            NodeEvent::PointerEnter { .. } => EventKind::PointerEnter,
            NodeEvent::PointerExit { .. } => EventKind::PointerExit,
            NodeEvent::PointerDown { .. } => EventKind::PointerDown,
            NodeEvent::PointerUp { .. } => EventKind::PointerUp,
            NodeEvent::Click { .. } => EventKind::Click,
        }
    }
}

/// Token returned by [`Stage::on`], used to unregister.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HandlerId(u64);

pub type Handler = Box<dyn FnMut(&mut Stage, NodeId, &NodeEvent)>;

struct HandlerEntry {
    id: HandlerId,
    kind: EventKind,
    /// `None` while the handler is running.
    handler: Option<Handler>,
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    lists: SecondaryMap<NodeId, Vec<HandlerEntry>>,
    owners: HashMap<HandlerId, NodeId>,
    next_id: u64,
}

impl HandlerRegistry {
    fn entry_mut(&mut self, node: NodeId, handler: HandlerId) -> Option<&mut HandlerEntry> {
        self.lists.get_mut(node)?.iter_mut().find(|e| e.id == handler)
    }

    fn take(&mut self, node: NodeId, handler: HandlerId) -> Option<Handler> {
        self.entry_mut(node, handler)?.handler.take()
    }

    /// Puts a handler back after it ran. Dropped if it was unregistered or
    /// its node destroyed in the meantime.
    fn restore(&mut self, node: NodeId, id: HandlerId, handler: Handler) {
        if let Some(entry) = self.entry_mut(node, id) {
            entry.handler = Some(handler);
        }
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) {
        if let Some(list) = self.lists.remove(node) {
            for entry in list {
                self.owners.remove(&entry.id);
            }
        }
    }
}

impl Stage {
    /// Registers `handler` for events of `kind` on `id`.
    pub fn on<F>(&mut self, id: NodeId, kind: EventKind, handler: F) -> Result<HandlerId, SceneError>
    where
        F: FnMut(&mut Stage, NodeId, &NodeEvent) + 'static,
    {
        self.get(id)?;

        let registry = &mut self.handlers;
        let handler_id = HandlerId(registry.next_id);
        registry.next_id += 1;

        let entry = HandlerEntry {
            id: handler_id,
            kind,
            handler: Some(Box::new(handler)),
        };
        match registry.lists.get_mut(id) {
            Some(list) => list.push(entry),
            None => {
                registry.lists.insert(id, vec![entry]);
            }
        }
        registry.owners.insert(handler_id, id);
        Ok(handler_id)
    }

    /// Unregisters a handler. Returns `false` if it was already gone.
    pub fn off(&mut self, handler: HandlerId) -> bool {
        let registry = &mut self.handlers;
        let Some(owner) = registry.owners.remove(&handler) else {
            return false;
        };

        if let Some(list) = registry.lists.get_mut(owner) {
            list.retain(|e| e.id != handler);
        }
        true
    }

    /// `true` if `id` has at least one handler for `kind`.
    pub fn has_handlers(&self, id: NodeId, kind: EventKind) -> bool {
        self.handlers
            .lists
            .get(id)
            .is_some_and(|list| list.iter().any(|e| e.kind == kind))
    }

    /// Runs the handlers of `id` registered for `event.kind()`, in
    /// registration order. Returns how many ran; stale ids run none.
    pub fn dispatch(&mut self, id: NodeId, event: &NodeEvent) -> usize {
        let kind = event.kind();
        let Some(list) = self.handlers.lists.get(id) else {
            return 0;
        };
        let pending: Vec<HandlerId> = list
            .iter()
            .filter(|e| e.kind == kind && e.handler.is_some())
            .map(|e| e.id)
            .collect();

        let mut ran = 0;
        for handler_id in pending {
            let Some(mut handler) = self.handlers.take(id, handler_id) else {
                continue;
            };
            handler(self, id, event);
            ran += 1;
            self.handlers.restore(id, handler_id, handler);
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn click() -> NodeEvent {
        NodeEvent::Click { position: Vec2::zero() }
    }

    // ── registration ──────────────────────────────────────────────────────

    #[test]
    fn handlers_run_for_matching_kind_only() {
        let mut stage = Stage::new();
        let n = stage.insert(Node::container());
        let hits = Rc::new(Cell::new(0));

        let h = Rc::clone(&hits);
        stage.on(n, EventKind::Click, move |_, _, _| h.set(h.get() + 1)).unwrap();

        assert_eq!(stage.dispatch(n, &NodeEvent::PointerEnter { position: Vec2::zero() }), 0);
        assert_eq!(stage.dispatch(n, &click()), 1);
        assert_eq!(hits.get(), 1);
        assert!(stage.has_handlers(n, EventKind::Click));
        assert!(!stage.has_handlers(n, EventKind::PointerUp));
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut stage = Stage::new();
        let n = stage.insert(Node::container());
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let o = Rc::clone(&order);
            stage.on(n, EventKind::Click, move |_, _, _| o.borrow_mut().push(i)).unwrap();
        }
        stage.dispatch(n, &click());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn off_removes_handler() {
        let mut stage = Stage::new();
        let n = stage.insert(Node::container());
        let h = stage.on(n, EventKind::Click, |_, _, _| {}).unwrap();
        assert!(stage.off(h));
        assert!(!stage.off(h));
        assert_eq!(stage.dispatch(n, &click()), 0);
    }

    #[test]
    fn on_stale_node_is_error() {
        let mut stage = Stage::new();
        let n = stage.insert(Node::container());
        stage.destroy(n).unwrap();
        assert!(matches!(
            stage.on(n, EventKind::Click, |_, _, _| {}),
            Err(SceneError::StaleNode(_))
        ));
        assert_eq!(stage.dispatch(n, &click()), 0);
    }

    // ── mutation during dispatch ──────────────────────────────────────────

    #[test]
    fn handler_added_during_dispatch_runs_next_time() {
        let mut stage = Stage::new();
        let n = stage.insert(Node::container());
        let late = Rc::new(Cell::new(0));

        let l = Rc::clone(&late);
        stage
            .on(n, EventKind::Click, move |stage, id, _| {
                let l = Rc::clone(&l);
                stage.on(id, EventKind::Click, move |_, _, _| l.set(l.get() + 1)).unwrap();
            })
            .unwrap();

        assert_eq!(stage.dispatch(n, &click()), 1);
        assert_eq!(late.get(), 0);
        assert_eq!(stage.dispatch(n, &click()), 2);
        assert_eq!(late.get(), 1);
    }

    #[test]
    fn handler_removed_during_dispatch_is_skipped() {
        let mut stage = Stage::new();
        let n = stage.insert(Node::container());
        let second_ran = Rc::new(Cell::new(false));

        let target: Rc<Cell<Option<HandlerId>>> = Rc::new(Cell::new(None));
        let t = Rc::clone(&target);
        stage
            .on(n, EventKind::Click, move |stage, _, _| {
                if let Some(h) = t.get() {
                    stage.off(h);
                }
            })
            .unwrap();
        let s = Rc::clone(&second_ran);
        let h = stage.on(n, EventKind::Click, move |_, _, _| s.set(true)).unwrap();
        target.set(Some(h));

        assert_eq!(stage.dispatch(n, &click()), 1);
        assert!(!second_ran.get());
        assert_eq!(stage.dispatch(n, &click()), 1);
    }

    #[test]
    fn handler_may_destroy_its_node() {
        let mut stage = Stage::new();
        let root = stage.root();
        let n = stage.insert(Node::sprite(None, 1.0, 1.0));
        stage.add_child(root, n).unwrap();
        stage
            .on(n, EventKind::Click, |stage, id, _| {
                stage.destroy(id).unwrap();
            })
            .unwrap();

        assert_eq!(stage.dispatch(n, &click()), 1);
        assert!(!stage.contains(n));
        assert!(stage.children(root).is_empty());
    }

    // ── nested events on the same node ────────────────────────────────────

    #[test]
    fn handler_detaching_its_node_fires_removed_once() {
        let mut stage = Stage::new();
        let root = stage.root();
        let n = stage.insert(Node::sprite(None, 1.0, 1.0));
        stage.add_child(root, n).unwrap();

        let removed = Rc::new(Cell::new(0));
        let r = Rc::clone(&removed);
        stage.on(n, EventKind::RemovedFromStage, move |_, _, _| r.set(r.get() + 1)).unwrap();
        stage
            .on(n, EventKind::Click, |stage, id, _| {
                stage.detach(id).unwrap();
            })
            .unwrap();

        assert_eq!(stage.dispatch(n, &click()), 1);
        assert!(!stage.is_on_stage(n));
        assert_eq!(removed.get(), 1);

        // The click handler is back in place afterwards.
        stage.add_child(root, n).unwrap();
        assert_eq!(stage.dispatch(n, &click()), 1);
        assert_eq!(removed.get(), 2);
    }

    #[test]
    fn added_handler_may_attach_children_to_its_node() {
        let mut stage = Stage::new();
        let root = stage.root();
        let n = stage.insert(Node::container());
        let kid_added = Rc::new(Cell::new(0));
        let kid: Rc<Cell<Option<NodeId>>> = Rc::new(Cell::new(None));

        let (k, slot) = (Rc::clone(&kid_added), Rc::clone(&kid));
        stage
            .on(n, EventKind::AddedToStage, move |stage, id, _| {
                let child = stage.insert(Node::sprite(None, 1.0, 1.0));
                let k = Rc::clone(&k);
                stage.on(child, EventKind::AddedToStage, move |_, _, _| k.set(k.get() + 1)).unwrap();
                stage.add_child(id, child).unwrap();
                slot.set(Some(child));
            })
            .unwrap();

        stage.add_child(root, n).unwrap();

        let child = kid.get().unwrap();
        assert_eq!(stage.children(n), &[child]);
        assert!(stage.is_on_stage(child));
        assert_eq!(kid_added.get(), 1);
    }

    #[test]
    fn nested_dispatch_of_same_kind_skips_running_handler() {
        let mut stage = Stage::new();
        let n = stage.insert(Node::container());
        let inner = Rc::new(Cell::new(None));

        let i = Rc::clone(&inner);
        stage
            .on(n, EventKind::Click, move |stage, id, ev| {
                if i.get().is_none() {
                    i.set(Some(stage.dispatch(id, ev)));
                }
            })
            .unwrap();

        assert_eq!(stage.dispatch(n, &click()), 1);
        assert_eq!(inner.get(), Some(0));
    }
}
