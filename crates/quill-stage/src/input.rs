//! Pointer routing from engine input events to node handlers.

use std::time::{Duration, Instant};

use quill_engine::coords::Vec2;
use quill_engine::input::{InputEvent, InputFrame, MouseButton, MouseButtonState};

use crate::events::NodeEvent;
use crate::node::NodeId;
use crate::stage::Stage;

#[derive(Debug, Copy, Clone)]
pub struct PointerConfig {
    /// Longest press-to-release interval that still counts as a click.
    pub click_window: Duration,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            click_window: Duration::from_millis(300),
        }
    }
}

/// Turns pointer input into per-node enter/exit/down/up/click events.
///
/// Targets are found with [`Stage::hit_test_global`]. Positions handed to
/// handlers are in stage coordinates.
#[derive(Debug, Default)]
pub struct PointerDispatcher {
    config: PointerConfig,
    hovered: Option<NodeId>,
    pressed: Option<(NodeId, Instant)>,
    position: Option<Vec2>,
}

impl PointerDispatcher {
    pub fn new(config: PointerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Node currently under the pointer, if any.
    #[inline]
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    #[inline]
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Routes every event of `frame` in arrival order.
    pub fn process(&mut self, stage: &mut Stage, frame: &InputFrame, now: Instant) {
        for ev in &frame.events {
            self.handle(stage, ev, now);
        }
    }

    pub fn handle(&mut self, stage: &mut Stage, ev: &InputEvent, now: Instant) {
        match ev {
            InputEvent::PointerMoved(m) => {
                let position = m.position;
                self.position = Some(position);
                let hit = pick(stage, position);
                self.set_hovered(stage, hit, position);
            }
            InputEvent::PointerButton(b) => {
                let position = b.position;
                self.position = Some(position);
                let hit = pick(stage, position);
                self.set_hovered(stage, hit, position);

                match b.state {
                    MouseButtonState::Pressed => self.press(stage, hit, position, b.button, now),
                    MouseButtonState::Released => self.release(stage, hit, position, b.button, now),
                }
            }
            InputEvent::PointerLeft => {
                // Without a known position nothing can be hovered.
                if let Some(position) = self.position.take() {
                    self.set_hovered(stage, None, position);
                }
                self.pressed = None;
            }
            _ => {}
        }
    }

    fn set_hovered(&mut self, stage: &mut Stage, hit: Option<NodeId>, position: Vec2) {
        if hit == self.hovered {
            return;
        }
        if let Some(prev) = self.hovered.take() {
            stage.dispatch(prev, &NodeEvent::PointerExit { position });
        }
        self.hovered = hit;
        if let Some(next) = hit {
            stage.dispatch(next, &NodeEvent::PointerEnter { position });
        }
    }

    fn press(&mut self, stage: &mut Stage, hit: Option<NodeId>, position: Vec2, button: MouseButton, now: Instant) {
        if button == MouseButton::Left {
            self.pressed = hit.map(|id| (id, now));
        }
        if let Some(id) = hit {
            stage.dispatch(id, &NodeEvent::PointerDown { position, button });
        }
    }

    fn release(&mut self, stage: &mut Stage, hit: Option<NodeId>, position: Vec2, button: MouseButton, now: Instant) {
        let Some(id) = hit else {
            if button == MouseButton::Left {
                self.pressed = None;
            }
            return;
        };

        stage.dispatch(id, &NodeEvent::PointerUp { position, button });

        if button != MouseButton::Left {
            return;
        }
        let Some((pressed, at)) = self.pressed.take() else {
            return;
        };
        if pressed == id && now.saturating_duration_since(at) <= self.config.click_window {
            stage.dispatch(id, &NodeEvent::Click { position });
        }
    }
}

fn pick(stage: &Stage, position: Vec2) -> Option<NodeId> {
    match stage.hit_test_global(position) {
        Ok(hit) => hit,
        Err(err) => {
            log::debug!("pointer hit test at ({}, {}) failed: {err}", position.x, position.y);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::stage::tests::sprite;
    use quill_engine::input::{Modifiers, PointerButtonEvent, PointerMoveEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(NodeId, EventKind)>>>;

    const ALL: [EventKind; 5] = [
        EventKind::PointerEnter,
        EventKind::PointerExit,
        EventKind::PointerDown,
        EventKind::PointerUp,
        EventKind::Click,
    ];

    /// Unit sprites `a` at x=0 and `b` at x=2, every pointer event logged.
    fn setup() -> (Stage, NodeId, NodeId, Log) {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = sprite(&mut stage, 0.0, 0.0);
        let b = sprite(&mut stage, 2.0, 0.0);
        stage.add_child(root, a).unwrap();
        stage.add_child(root, b).unwrap();

        let log: Log = Rc::default();
        for id in [a, b] {
            for kind in ALL {
                let l = Rc::clone(&log);
                stage.on(id, kind, move |_, node, ev| l.borrow_mut().push((node, ev.kind()))).unwrap();
            }
        }
        (stage, a, b, log)
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerMoveEvent {
            position: Vec2::new(x, y),
        })
    }

    fn button(button: MouseButton, state: MouseButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button,
            state,
            position: Vec2::new(x, y),
            modifiers: Modifiers::default(),
        })
    }

    fn left(state: MouseButtonState, x: f32) -> InputEvent {
        button(MouseButton::Left, state, x, 0.5)
    }

    fn drain(log: &Log) -> Vec<(NodeId, EventKind)> {
        log.borrow_mut().drain(..).collect()
    }

    // ── hover ─────────────────────────────────────────────────────────────

    #[test]
    fn hover_enter_and_exit() {
        let (mut stage, a, b, log) = setup();
        let mut pointer = PointerDispatcher::default();
        let now = Instant::now();

        pointer.handle(&mut stage, &moved(0.5, 0.5), now);
        assert_eq!(drain(&log), vec![(a, EventKind::PointerEnter)]);

        pointer.handle(&mut stage, &moved(0.7, 0.2), now);
        assert!(drain(&log).is_empty());

        pointer.handle(&mut stage, &moved(2.5, 0.5), now);
        assert_eq!(drain(&log), vec![(a, EventKind::PointerExit), (b, EventKind::PointerEnter)]);
        assert_eq!(pointer.hovered(), Some(b));

        pointer.handle(&mut stage, &InputEvent::PointerLeft, now);
        assert_eq!(drain(&log), vec![(b, EventKind::PointerExit)]);
        assert_eq!(pointer.hovered(), None);
    }

    #[test]
    fn moving_into_empty_space_exits() {
        let (mut stage, a, _, log) = setup();
        let mut pointer = PointerDispatcher::default();
        let now = Instant::now();

        pointer.handle(&mut stage, &moved(0.5, 0.5), now);
        pointer.handle(&mut stage, &moved(1.5, 0.5), now);
        assert_eq!(drain(&log), vec![(a, EventKind::PointerEnter), (a, EventKind::PointerExit)]);
    }

    #[test]
    fn leave_reports_last_known_position() {
        let (mut stage, a, _, _) = setup();
        let exits = Rc::new(RefCell::new(Vec::new()));
        let e = Rc::clone(&exits);
        stage
            .on(a, EventKind::PointerExit, move |_, _, ev| e.borrow_mut().push(*ev))
            .unwrap();
        let mut pointer = PointerDispatcher::default();
        let now = Instant::now();

        pointer.handle(&mut stage, &moved(0.25, 0.75), now);
        pointer.handle(&mut stage, &InputEvent::PointerLeft, now);
        assert_eq!(
            *exits.borrow(),
            vec![NodeEvent::PointerExit { position: Vec2::new(0.25, 0.75) }]
        );
        assert_eq!(pointer.position(), None);
    }

    #[test]
    fn leave_without_prior_movement_fires_nothing() {
        let (mut stage, _, _, log) = setup();
        let mut pointer = PointerDispatcher::default();
        pointer.handle(&mut stage, &InputEvent::PointerLeft, Instant::now());
        assert!(drain(&log).is_empty());
        assert_eq!(pointer.hovered(), None);
    }

    // ── clicks ────────────────────────────────────────────────────────────

    #[test]
    fn press_and_release_on_same_node_clicks() {
        let (mut stage, a, _, log) = setup();
        let mut pointer = PointerDispatcher::default();
        let t0 = Instant::now();

        pointer.handle(&mut stage, &moved(0.5, 0.5), t0);
        pointer.handle(&mut stage, &left(MouseButtonState::Pressed, 0.5), t0);
        pointer.handle(
            &mut stage,
            &left(MouseButtonState::Released, 0.5),
            t0 + Duration::from_millis(100),
        );

        assert_eq!(
            drain(&log),
            vec![
                (a, EventKind::PointerEnter),
                (a, EventKind::PointerDown),
                (a, EventKind::PointerUp),
                (a, EventKind::Click),
            ]
        );
    }

    #[test]
    fn slow_release_is_not_a_click() {
        let (mut stage, a, _, log) = setup();
        let mut pointer = PointerDispatcher::new(PointerConfig {
            click_window: Duration::from_millis(50),
        });
        let t0 = Instant::now();

        pointer.handle(&mut stage, &left(MouseButtonState::Pressed, 0.5), t0);
        pointer.handle(
            &mut stage,
            &left(MouseButtonState::Released, 0.5),
            t0 + Duration::from_millis(51),
        );

        let kinds: Vec<_> = drain(&log).into_iter().filter(|&(n, _)| n == a).map(|(_, k)| k).collect();
        assert!(kinds.contains(&EventKind::PointerUp));
        assert!(!kinds.contains(&EventKind::Click));
    }

    #[test]
    fn release_on_other_node_is_not_a_click() {
        let (mut stage, a, b, log) = setup();
        let mut pointer = PointerDispatcher::default();
        let now = Instant::now();

        pointer.handle(&mut stage, &left(MouseButtonState::Pressed, 0.5), now);
        pointer.handle(&mut stage, &left(MouseButtonState::Released, 2.5), now);

        let events = drain(&log);
        assert!(events.contains(&(a, EventKind::PointerDown)));
        assert!(events.contains(&(b, EventKind::PointerUp)));
        assert!(!events.iter().any(|&(_, k)| k == EventKind::Click));
    }

    #[test]
    fn right_button_never_clicks() {
        let (mut stage, a, _, log) = setup();
        let mut pointer = PointerDispatcher::default();
        let now = Instant::now();

        pointer.handle(&mut stage, &button(MouseButton::Right, MouseButtonState::Pressed, 0.5, 0.5), now);
        pointer.handle(&mut stage, &button(MouseButton::Right, MouseButtonState::Released, 0.5, 0.5), now);

        let events = drain(&log);
        assert!(events.contains(&(a, EventKind::PointerDown)));
        assert!(events.contains(&(a, EventKind::PointerUp)));
        assert!(!events.contains(&(a, EventKind::Click)));
    }

    #[test]
    fn node_destroyed_on_press_gets_no_click() {
        let (mut stage, a, _, log) = setup();
        stage
            .on(a, EventKind::PointerDown, |stage, id, _| {
                stage.destroy(id).unwrap();
            })
            .unwrap();
        let mut pointer = PointerDispatcher::default();
        let now = Instant::now();

        pointer.handle(&mut stage, &left(MouseButtonState::Pressed, 0.5), now);
        pointer.handle(&mut stage, &left(MouseButtonState::Released, 0.5), now);

        assert!(!stage.contains(a));
        assert!(!drain(&log).iter().any(|&(_, k)| k == EventKind::Click));
    }

    #[test]
    fn process_routes_frame_events_in_order() {
        let (mut stage, a, b, log) = setup();
        let mut pointer = PointerDispatcher::default();
        let mut frame = InputFrame::default();
        frame.push_event(moved(0.5, 0.5));
        frame.push_event(moved(2.5, 0.5));

        pointer.process(&mut stage, &frame, Instant::now());
        assert_eq!(
            drain(&log),
            vec![
                (a, EventKind::PointerEnter),
                (a, EventKind::PointerExit),
                (b, EventKind::PointerEnter),
            ]
        );
        assert_eq!(pointer.position(), Some(Vec2::new(2.5, 0.5)));
    }
}
