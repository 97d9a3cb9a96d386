// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event manager: input translation, queueing, and dispatch.
//!
//! ## Overview
//!
//! [`EventManager`] owns the engine-side state of one scene: the type
//! registry, the pending queue, hover and focus tracking, the pressed-node
//! record, and the drag session. The host feeds it normalized
//! [`RawInput`](crate::input::RawInput) through [`EventManager::translate`],
//! then calls [`EventManager::drain_queue`] once per frame to deliver
//! everything pending.
//!
//! ## Dispatch precedence
//!
//! A type's routing flags pick exactly one delivery shape, in fixed
//! precedence order:
//!
//! 1. `GLOBAL` — the walk is bypassed. The event is split into two clones,
//!    one fanning Target-phase listeners over every node and one fanning the
//!    default-behavior hook, each honoring its own stop flag.
//! 2. no flags ("listener-only") — Target-phase listeners on every node,
//!    never a default-behavior hook.
//! 3. `TARGET_ONLY` — a single delivery at the target.
//! 4. `CAPTURES` / `BUBBLES` — the three-phase walk: ancestors root → parent
//!    in Capture, the target once in Target, parent → root in Bubble.
//!
//! At each visited node, listeners run first and then, unless the event has
//! been stopped or had its default disabled, the node's default-behavior
//! hook. Node references are re-resolved against the live tree at every
//! step: dead, hidden, or disabled nodes are skipped without ending the
//! walk, so listeners may freely mutate the tree mid-dispatch.
//!
//! A panicking listener or default-behavior hook is absorbed and logged;
//! the dispatch continues as if the handler had returned.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kurbo::Point;
use smallvec::SmallVec;

use arbor_event::{
    CoalesceKey, CoalesceStrategy, Event, EventCategory, EventType, EventTypeRegistry, NodeTree,
    PayloadValue, Phase, Routing,
};

use crate::drag::{DragMotion, DragSession};
use crate::hit;
use crate::input::{InputKind, RawInput, WindowChange, WindowId};
use crate::queue::EventQueue;

static TRAVERSING: AtomicBool = AtomicBool::new(false);

/// True while a dispatch walk is executing.
///
/// Setup-time registry mutation must not happen while this is set; hosts
/// can assert on it at their mutation entry points.
pub fn is_traversing() -> bool {
    TRAVERSING.load(Ordering::Relaxed)
}

struct TraversalGuard;

impl TraversalGuard {
    fn enter() -> Self {
        TRAVERSING.store(true, Ordering::Relaxed);
        Self
    }
}

impl Drop for TraversalGuard {
    fn drop(&mut self) {
        TRAVERSING.store(false, Ordering::Relaxed);
    }
}

/// Handles of the standard event types, registered once per manager.
///
/// Translation emits these; applications may also construct and enqueue
/// them directly, or define their own types alongside through the
/// registry handle.
#[derive(Clone, Copy, Debug)]
pub struct StdEvents {
    /// A pointer button went down (critical).
    pub button_down: EventType,
    /// A pointer button came up (critical).
    pub button_up: EventType,
    /// The pointer moved (metered, `Last` per target).
    pub motion: EventType,
    /// The wheel scrolled (metered, `Sum` per target).
    pub wheel: EventType,
    /// Press and release landed on the same node (critical).
    pub click: EventType,
    /// A click with a platform click count of two or more (critical).
    pub double_click: EventType,
    /// The pointer began hovering a node (target-only).
    pub enter: EventType,
    /// The pointer stopped hovering a node (target-only).
    pub leave: EventType,
    /// A drag session promoted (critical).
    pub drag: EventType,
    /// The dragged node followed the pointer (metered, `Last`).
    pub dragging: EventType,
    /// A dragged node was released over a drop target (critical).
    pub drop: EventType,
    /// A key went down.
    pub key_down: EventType,
    /// A key came up.
    pub key_up: EventType,
    /// The pointer entered a different host window (global).
    pub window_enter: EventType,
    /// The pointer left the previously current host window (global).
    pub window_leave: EventType,
    /// The host window gained input focus (global).
    pub window_focus_gained: EventType,
    /// The host window lost input focus (global).
    pub window_focus_lost: EventType,
    /// The host window was resized (global, metered `Last`).
    pub window_resized: EventType,
    /// The user asked to close the host window (global, critical).
    pub window_close_requested: EventType,
}

impl StdEvents {
    /// Define the standard types in `registry` with their routing and
    /// metering policies. Idempotent, like every definition.
    pub fn register(reg: &mut EventTypeRegistry) -> Self {
        use EventCategory::{Key, Pointer, Window};

        let critical = |reg: &mut EventTypeRegistry, cat, name| {
            let ty = reg.define_in(cat, name, true, true, false, false);
            reg.set_critical(ty, true);
            ty
        };
        let metered = |reg: &mut EventTypeRegistry, ty, strategy, key| {
            reg.set_meter_enabled(ty, true);
            reg.set_coalesce_strategy(ty, strategy);
            reg.set_coalesce_key(ty, key);
        };

        let button_down = critical(reg, Pointer, "pointer.button_down");
        let button_up = critical(reg, Pointer, "pointer.button_up");
        let click = critical(reg, Pointer, "pointer.click");
        let double_click = critical(reg, Pointer, "pointer.double_click");
        let drag = critical(reg, Pointer, "pointer.drag");
        let drop = critical(reg, Pointer, "pointer.drop");

        let motion = reg.define_in(Pointer, "pointer.motion", true, true, false, false);
        metered(reg, motion, CoalesceStrategy::Last, CoalesceKey::ByTarget);
        let wheel = reg.define_in(Pointer, "pointer.wheel", true, true, false, false);
        metered(reg, wheel, CoalesceStrategy::Sum, CoalesceKey::ByTarget);
        let dragging = reg.define_in(Pointer, "pointer.dragging", true, true, false, false);
        metered(reg, dragging, CoalesceStrategy::Last, CoalesceKey::Global);

        let enter = reg.define_in(Pointer, "pointer.enter", false, false, true, false);
        let leave = reg.define_in(Pointer, "pointer.leave", false, false, true, false);

        let key_down = reg.define_in(Key, "key.down", true, true, false, false);
        let key_up = reg.define_in(Key, "key.up", true, true, false, false);

        let global = |reg: &mut EventTypeRegistry, name| {
            reg.define_in(Window, name, false, false, false, true)
        };
        let window_enter = global(reg, "window.enter");
        let window_leave = global(reg, "window.leave");
        let window_focus_gained = global(reg, "window.focus_gained");
        let window_focus_lost = global(reg, "window.focus_lost");
        let window_resized = global(reg, "window.resized");
        metered(reg, window_resized, CoalesceStrategy::Last, CoalesceKey::Global);
        let window_close_requested = global(reg, "window.close_requested");
        reg.set_critical(window_close_requested, true);

        Self {
            button_down,
            button_up,
            motion,
            wheel,
            click,
            double_click,
            enter,
            leave,
            drag,
            dragging,
            drop,
            key_down,
            key_up,
            window_enter,
            window_leave,
            window_focus_gained,
            window_focus_lost,
            window_resized,
            window_close_requested,
        }
    }
}

/// Engine-side event state for one scene tree.
pub struct EventManager<T: NodeTree> {
    registry: Rc<RefCell<EventTypeRegistry>>,
    std: StdEvents,
    queue: EventQueue<T::Id>,
    hovered: Option<T::Id>,
    focused: Option<T::Id>,
    down_node: Option<T::Id>,
    last_window: Option<WindowId>,
    drag: DragSession<T::Id>,
}

impl<T: NodeTree> core::fmt::Debug for EventManager<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventManager")
            .field("hovered", &self.hovered)
            .field("focused", &self.focused)
            .field("down_node", &self.down_node)
            .field("last_window", &self.last_window)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl<T: NodeTree> Default for EventManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NodeTree> EventManager<T> {
    /// A manager with a fresh registry holding the standard types.
    pub fn new() -> Self {
        let mut reg = EventTypeRegistry::new();
        let std = StdEvents::register(&mut reg);
        let registry = Rc::new(RefCell::new(reg));
        let queue = EventQueue::new(Rc::clone(&registry));
        Self {
            registry,
            std,
            queue,
            hovered: None,
            focused: None,
            down_node: None,
            last_window: None,
            drag: DragSession::new(),
        }
    }

    /// Shared handle to the type registry, for defining application types.
    pub fn registry(&self) -> Rc<RefCell<EventTypeRegistry>> {
        Rc::clone(&self.registry)
    }

    /// Handles of the standard event types.
    pub fn std_events(&self) -> &StdEvents {
        &self.std
    }

    /// Clonable handle to the pending queue. Listeners hold clones of this
    /// to raise events from inside a dispatch.
    pub fn queue(&self) -> EventQueue<T::Id> {
        self.queue.clone()
    }

    /// Node receiving keyboard events, when any.
    pub fn focus(&self) -> Option<T::Id> {
        self.focused
    }

    /// Route subsequent keyboard events to `node` (or back to the root
    /// with `None`).
    pub fn set_focus(&mut self, node: Option<T::Id>) {
        self.focused = node;
    }

    /// Node currently under the pointer, as of the last translated motion.
    pub fn hovered(&self) -> Option<T::Id> {
        self.hovered
    }

    /// Translate one normalized input into zero or more queued events.
    ///
    /// Performs hit testing against `tree`, synthesizes the derived stream
    /// (enter/leave, click, the drag family, window identity changes), and
    /// enqueues everything. Nothing is dispatched here.
    pub fn translate(&mut self, tree: &T, root: T::Id, input: RawInput) {
        match input.kind {
            InputKind::Button {
                pressed: true,
                button,
                click_count,
                position,
            } => {
                let target =
                    hit::find_top_under(tree, root, position, self.drag.excluded(), true);
                self.down_node = Some(target);
                self.drag.seed(target, position);
                let ev = self.pointer_event(self.std.button_down, target, &input, position);
                ev.set_button(button);
                ev.set_click_count(click_count);
                self.queue.enqueue(ev);
            }
            InputKind::Button {
                pressed: false,
                button,
                click_count,
                position,
            } => {
                let target =
                    hit::find_top_under(tree, root, position, self.drag.excluded(), true);
                let ev = self.pointer_event(self.std.button_up, target, &input, position);
                ev.set_button(button);
                ev.set_click_count(click_count);
                self.queue.enqueue(ev);

                if let Some((dragged, offset)) = self.drag.release() {
                    // The dragged subtree travels with the pointer, so it
                    // must not occlude the drop target beneath it.
                    let drop_target =
                        hit::find_top_under(tree, root, position, Some(dragged), true);
                    let ev = self.pointer_event(self.std.drop, drop_target, &input, position);
                    ev.set_related_target(Some(dragged));
                    ev.set_drag_offset(offset);
                    ev.set_button(button);
                    self.queue.enqueue(ev);
                } else if self.down_node == Some(target) {
                    let ty = if click_count >= 2 {
                        self.std.double_click
                    } else {
                        self.std.click
                    };
                    let ev = self.pointer_event(ty, target, &input, position);
                    ev.set_button(button);
                    ev.set_click_count(click_count);
                    self.queue.enqueue(ev);
                }
                self.down_node = None;
            }
            InputKind::Motion { position } => {
                self.note_window(&input, root);
                self.update_hover(tree, root, &input, position);

                let target =
                    hit::find_top_under(tree, root, position, self.drag.excluded(), true);
                let ev = self.pointer_event(self.std.motion, target, &input, position);
                self.queue.enqueue(ev);

                let origin = self
                    .drag
                    .node()
                    .and_then(|n| tree.bounds(n))
                    .map(|b| b.origin());
                match self.drag.motion(position, origin) {
                    DragMotion::None => {}
                    DragMotion::Started { node, offset } => {
                        let ev = self.pointer_event(self.std.drag, node, &input, position);
                        ev.set_drag_offset(offset);
                        self.queue.enqueue(ev);
                    }
                    DragMotion::Moved { node, offset } => {
                        let ev = self.pointer_event(self.std.dragging, node, &input, position);
                        ev.set_drag_offset(offset);
                        self.queue.enqueue(ev);
                    }
                }
            }
            InputKind::Wheel { delta, position } => {
                let target =
                    hit::find_top_under(tree, root, position, self.drag.excluded(), true);
                let ev = self.pointer_event(self.std.wheel, target, &input, position);
                ev.set_wheel_delta(delta);
                self.queue.enqueue(ev);
            }
            InputKind::Key {
                pressed,
                code,
                modifiers,
            } => {
                // Unfocused keyboard input falls back to the root.
                let target = self.focused.unwrap_or(root);
                let ty = if pressed {
                    self.std.key_down
                } else {
                    self.std.key_up
                };
                let ev = self.base_event(ty, target, &input);
                ev.set_key_code(code);
                ev.set_modifiers(modifiers);
                self.queue.enqueue(ev);
            }
            InputKind::Window(change) => {
                let ty = match change {
                    WindowChange::FocusGained => self.std.window_focus_gained,
                    WindowChange::FocusLost => self.std.window_focus_lost,
                    WindowChange::CloseRequested => self.std.window_close_requested,
                    WindowChange::Resized { width, height } => {
                        let ev = self.base_event(self.std.window_resized, root, &input);
                        ev.set_payload("width", PayloadValue::Float(width));
                        ev.set_payload("height", PayloadValue::Float(height));
                        self.queue.enqueue(ev);
                        return;
                    }
                };
                let ev = self.base_event(ty, root, &input);
                self.queue.enqueue(ev);
            }
        }
    }

    /// Deliver one event through the tree according to its type's routing.
    pub fn dispatch(&self, tree: &mut T, event: &Event<T::Id>, root: T::Id) {
        let routing = {
            let reg = self.registry.borrow();
            log::trace!(
                "dispatch `{}` target {:?}",
                reg.name(event.event_type()),
                event.target(),
            );
            reg.routing(event.event_type())
        };
        let _guard = TraversalGuard::enter();

        if routing.contains(Routing::GLOBAL) {
            self.dispatch_global(tree, event, root);
            return;
        }
        if routing.is_listener_only() {
            self.dispatch_listener_only(tree, event, root);
            return;
        }
        let Some(target) = event.target() else {
            return;
        };
        let walks = !routing.contains(Routing::TARGET_ONLY);

        if walks && routing.contains(Routing::CAPTURES) {
            let mut chain: SmallVec<[T::Id; 8]> = SmallVec::new();
            let mut cur = tree.parent_of(target);
            while let Some(node) = cur {
                chain.push(node);
                cur = tree.parent_of(node);
            }
            for &node in chain.iter().rev() {
                if event.propagation_stopped() {
                    return;
                }
                self.deliver_at(tree, event, node, Phase::Capture);
            }
        }

        if event.propagation_stopped() {
            return;
        }
        self.deliver_at(tree, event, target, Phase::Target);

        if walks && routing.contains(Routing::BUBBLES) {
            // Re-resolve the parent link at each step: a listener may have
            // removed part of the chain while we were below it.
            let mut cur = tree.parent_of(target);
            while let Some(node) = cur {
                if event.propagation_stopped() {
                    return;
                }
                self.deliver_at(tree, event, node, Phase::Bubble);
                cur = tree.parent_of(node);
            }
        }
    }

    /// Dispatch everything pending, including events enqueued by listeners
    /// while the drain is running.
    pub fn drain_queue(&self, tree: &mut T, root: T::Id) {
        // One pop per iteration; no queue borrow is held across a dispatch.
        while let Some(event) = self.queue.pop() {
            self.dispatch(tree, &event, root);
        }
    }

    fn base_event(&self, ty: EventType, target: T::Id, input: &RawInput) -> Event<T::Id> {
        let ev = Event::with_target(ty, target);
        ev.set_timestamp_ms(input.timestamp_ms);
        ev.set_elapsed_time(Duration::from_millis(input.timestamp_ms).as_secs_f64());
        ev
    }

    fn pointer_event(
        &self,
        ty: EventType,
        target: T::Id,
        input: &RawInput,
        position: Point,
    ) -> Event<T::Id> {
        let ev = self.base_event(ty, target, input);
        ev.set_position(position);
        ev
    }

    fn note_window(&mut self, input: &RawInput, root: T::Id) {
        if self.last_window == Some(input.window) {
            return;
        }
        if self.last_window.is_some() {
            self.queue
                .enqueue(self.base_event(self.std.window_leave, root, input));
        }
        self.last_window = Some(input.window);
        self.queue
            .enqueue(self.base_event(self.std.window_enter, root, input));
    }

    fn update_hover(&mut self, tree: &T, root: T::Id, input: &RawInput, position: Point) {
        let hover = hit::find_top_hover(tree, root, position, self.drag.excluded());
        if self.hovered == Some(hover) {
            return;
        }
        if let Some(old) = self.hovered {
            let ev = self.pointer_event(self.std.leave, old, input, position);
            ev.set_related_target(Some(hover));
            self.queue.enqueue(ev);
        }
        let ev = self.pointer_event(self.std.enter, hover, input, position);
        ev.set_related_target(self.hovered);
        self.queue.enqueue(ev);
        self.hovered = Some(hover);
    }

    fn dispatch_global(&self, tree: &mut T, event: &Event<T::Id>, root: T::Id) {
        let order = collect_preorder(tree, root);

        // Independent clones so a stopped listener pass cannot suppress
        // default behavior, and vice versa.
        let listeners = event.clone();
        listeners.set_phase(Phase::Target);
        for &node in &order {
            if listeners.propagation_stopped() {
                break;
            }
            if !deliverable(tree, node) {
                continue;
            }
            listeners.set_current_target(Some(node));
            self.guarded_listeners(tree, node, &listeners, Phase::Target);
        }

        let defaults = event.clone();
        defaults.set_phase(Phase::Target);
        for &node in &order {
            if defaults.propagation_stopped() || defaults.default_behavior_disabled() {
                break;
            }
            if !deliverable(tree, node) {
                continue;
            }
            defaults.set_current_target(Some(node));
            self.guarded_default(tree, node, &defaults);
        }
    }

    fn dispatch_listener_only(&self, tree: &mut T, event: &Event<T::Id>, root: T::Id) {
        event.set_phase(Phase::Target);
        for node in collect_preorder(tree, root) {
            if event.propagation_stopped() {
                break;
            }
            if !deliverable(tree, node) {
                continue;
            }
            event.set_current_target(Some(node));
            self.guarded_listeners(tree, node, event, Phase::Target);
        }
    }

    fn deliver_at(&self, tree: &mut T, event: &Event<T::Id>, node: T::Id, phase: Phase) {
        if !deliverable(tree, node) {
            return;
        }
        event.set_phase(phase);
        event.set_current_target(Some(node));
        self.guarded_listeners(tree, node, event, phase);
        if !event.propagation_stopped() && !event.default_behavior_disabled() {
            self.guarded_default(tree, node, event);
        }
    }

    fn guarded_listeners(&self, tree: &mut T, node: T::Id, event: &Event<T::Id>, phase: Phase) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            tree.trigger_listeners(node, event, phase);
        }));
        if outcome.is_err() {
            let reg = self.registry.borrow();
            log::warn!(
                "listener for `{}` panicked at {:?}; continuing dispatch",
                reg.name(event.event_type()),
                node,
            );
        }
    }

    fn guarded_default(&self, tree: &mut T, node: T::Id, event: &Event<T::Id>) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            tree.default_behavior(node, event);
        }));
        if outcome.is_err() {
            let reg = self.registry.borrow();
            log::warn!(
                "default behavior for `{}` panicked at {:?}; continuing dispatch",
                reg.name(event.event_type()),
                node,
            );
        }
    }
}

fn deliverable<T: NodeTree>(tree: &T, node: T::Id) -> bool {
    tree.contains(node) && !tree.is_hidden(node) && tree.is_enabled(node)
}

/// Preorder node list for fan-out delivery. Hidden subtrees are pruned;
/// liveness is re-checked at delivery time, not here.
fn collect_preorder<T: NodeTree>(tree: &T, root: T::Id) -> Vec<T::Id> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !tree.contains(node) || tree.is_hidden(node) {
            continue;
        }
        out.push(node);
        let mut kids = tree.children_of(node);
        kids.reverse();
        stack.extend(kids);
    }
    out
}
