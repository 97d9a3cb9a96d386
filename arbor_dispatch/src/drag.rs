// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-pointer drag gesture recognition.
//!
//! At most one session exists at a time, moving through three states:
//!
//! - **Idle** — no button held.
//! - **Seeded** — a button went down on a node; coordinates are recorded
//!   but the gesture is still ambiguous (could be a click).
//! - **Dragging** — motion exceeded the promotion threshold; the node is
//!   being dragged until the button is released.
//!
//! Promotion uses a per-axis threshold: motion strictly greater than
//! [`DRAG_THRESHOLD_PX`] on either axis promotes, so small jitter in both
//! axes never turns a click into a drag. The node-local grab offset
//! (pointer minus node origin) is captured once at promotion and rides on
//! every `drag`/`dragging` event so consumers can keep the node glued to
//! the pointer.

use kurbo::{Point, Vec2};

/// Per-axis motion beyond which a seeded press becomes a drag.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Seeded,
    Dragging,
}

/// What a motion step asks translation to emit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragMotion<K> {
    /// Nothing to emit.
    None,
    /// The session just promoted: emit one `drag` event.
    Started {
        /// The dragged node.
        node: K,
        /// Node-local grab offset at promotion time.
        offset: Vec2,
    },
    /// The session is active: emit a `dragging` event.
    Moved {
        /// The dragged node.
        node: K,
        /// Node-local grab offset captured at promotion time.
        offset: Vec2,
    },
}

/// The engine-internal drag session.
#[derive(Clone, Debug)]
pub struct DragSession<K> {
    state: State,
    node: Option<K>,
    start: Option<Point>,
    offset: Vec2,
}

impl<K: Copy> Default for DragSession<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy> DragSession<K> {
    /// A fresh, idle session.
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            node: None,
            start: None,
            offset: Vec2::ZERO,
        }
    }

    /// Record a button press on `node`: Idle → Seeded.
    pub fn seed(&mut self, node: K, position: Point) {
        self.state = State::Seeded;
        self.node = Some(node);
        self.start = Some(position);
        self.offset = Vec2::ZERO;
    }

    /// Whether the session has promoted to an active drag.
    pub fn is_dragging(&self) -> bool {
        self.state == State::Dragging
    }

    /// Node held by the session in any non-idle state.
    pub fn node(&self) -> Option<K> {
        self.node
    }

    /// Node to exclude from hit tests: the dragged node, only once the
    /// session is actually dragging.
    pub fn excluded(&self) -> Option<K> {
        if self.is_dragging() { self.node } else { None }
    }

    /// Step the machine for a pointer motion.
    ///
    /// `node_origin` is the seeded node's current world origin, used once at
    /// promotion to capture the grab offset; when the node is gone the
    /// session resets instead of promoting.
    pub fn motion(&mut self, position: Point, node_origin: Option<Point>) -> DragMotion<K> {
        match self.state {
            State::Idle => DragMotion::None,
            State::Seeded => {
                if !self.past_threshold(position) {
                    return DragMotion::None;
                }
                let (Some(node), Some(origin)) = (self.node, node_origin) else {
                    self.reset();
                    return DragMotion::None;
                };
                self.offset = position - origin;
                self.state = State::Dragging;
                DragMotion::Started {
                    node,
                    offset: self.offset,
                }
            }
            State::Dragging => match self.node {
                Some(node) => DragMotion::Moved {
                    node,
                    offset: self.offset,
                },
                None => {
                    self.reset();
                    DragMotion::None
                }
            },
        }
    }

    /// Release the button: returns the dragged node and grab offset when a
    /// drop should be emitted, `None` for the plain-click path. Always
    /// returns to Idle.
    pub fn release(&mut self) -> Option<(K, Vec2)> {
        let result = match self.state {
            State::Dragging => self.node.map(|n| (n, self.offset)),
            _ => None,
        };
        self.reset();
        result
    }

    fn past_threshold(&self, position: Point) -> bool {
        self.start.is_some_and(|s| {
            (position.x - s.x).abs() > DRAG_THRESHOLD_PX
                || (position.y - s.y).abs() > DRAG_THRESHOLD_PX
        })
    }

    fn reset(&mut self) {
        self.state = State::Idle;
        self.node = None;
        self.start = None;
        self.offset = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_without_seed_does_nothing() {
        let mut drag: DragSession<u32> = DragSession::new();
        assert_eq!(drag.motion(Point::new(50.0, 50.0), None), DragMotion::None);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn small_motion_in_both_axes_stays_seeded() {
        let mut drag: DragSession<u32> = DragSession::new();
        drag.seed(7, Point::new(10.0, 10.0));
        // 4 px on both axes: under the per-axis threshold.
        let step = drag.motion(Point::new(14.0, 14.0), Some(Point::ZERO));
        assert_eq!(step, DragMotion::None);
        assert!(!drag.is_dragging());
        // Releasing now is the plain-click path.
        assert_eq!(drag.release(), None);
    }

    #[test]
    fn six_px_on_one_axis_promotes_once() {
        let mut drag: DragSession<u32> = DragSession::new();
        drag.seed(7, Point::new(10.0, 10.0));
        let step = drag.motion(Point::new(16.0, 10.0), Some(Point::new(4.0, 4.0)));
        assert_eq!(
            step,
            DragMotion::Started {
                node: 7,
                offset: Vec2::new(12.0, 6.0),
            }
        );
        assert!(drag.is_dragging());
        // Further motion is Moved, not Started, with the captured offset.
        let step = drag.motion(Point::new(30.0, 40.0), Some(Point::new(4.0, 4.0)));
        assert_eq!(
            step,
            DragMotion::Moved {
                node: 7,
                offset: Vec2::new(12.0, 6.0),
            }
        );
    }

    #[test]
    fn exactly_five_px_does_not_promote() {
        let mut drag: DragSession<u32> = DragSession::new();
        drag.seed(1, Point::new(0.0, 0.0));
        let step = drag.motion(Point::new(5.0, 5.0), Some(Point::ZERO));
        assert_eq!(step, DragMotion::None);
    }

    #[test]
    fn release_while_dragging_reports_drop() {
        let mut drag: DragSession<u32> = DragSession::new();
        drag.seed(3, Point::new(0.0, 0.0));
        drag.motion(Point::new(10.0, 0.0), Some(Point::ZERO));
        assert!(drag.is_dragging());
        assert_eq!(drag.release(), Some((3, Vec2::new(10.0, 0.0))));
        assert!(!drag.is_dragging());
        assert_eq!(drag.node(), None);
    }

    #[test]
    fn excluded_only_while_dragging() {
        let mut drag: DragSession<u32> = DragSession::new();
        assert_eq!(drag.excluded(), None);
        drag.seed(3, Point::new(0.0, 0.0));
        assert_eq!(drag.excluded(), None);
        drag.motion(Point::new(10.0, 0.0), Some(Point::ZERO));
        assert_eq!(drag.excluded(), Some(3));
        drag.release();
        assert_eq!(drag.excluded(), None);
    }

    #[test]
    fn missing_node_origin_resets_instead_of_promoting() {
        let mut drag: DragSession<u32> = DragSession::new();
        drag.seed(3, Point::new(0.0, 0.0));
        let step = drag.motion(Point::new(10.0, 0.0), None);
        assert_eq!(step, DragMotion::None);
        assert!(!drag.is_dragging());
        assert_eq!(drag.node(), None);
    }
}
