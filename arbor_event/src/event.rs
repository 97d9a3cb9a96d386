// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dispatch message: one [`Event`] per input occurrence.
//!
//! ## Overview
//!
//! An [`Event`] is created by translation (or by application code), queued,
//! and then walked through the tree. It carries its [`EventType`] handle, the
//! current [`Phase`], target references, input-specific fields, and an open
//! structured payload.
//!
//! Node references are the host tree's handles, stored as `Option<K>`. They
//! never extend a node's lifetime; the dispatcher re-resolves them against
//! the live tree at every traversal step, so a reference to a destroyed node
//! simply stops resolving.
//!
//! ## Interior synchronization
//!
//! All mutable state sits behind one internal lock per instance, because a
//! single Event is legitimately touched from several call sites within one
//! synchronous dispatch (the walk loop, listeners, default-behavior hooks).
//! [`Event::clone`] produces an independent instance with its own lock; the
//! global and listener-only fan-out paths rely on this to split one logical
//! occurrence into independently mutated copies.
//!
//! ## Cancellation
//!
//! [`Event::stop_propagation`] sets a sticky flag: once set, no further
//! phase, listener, or default-behavior processing occurs for the instance.
//! [`Event::set_disable_default_behavior`] independently suppresses only the
//! default-behavior hook; listener delivery is unaffected.

use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use kurbo::{Point, Vec2};

use crate::event_type::EventType;

/// Propagation phase an event is currently in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Root → target (excluding the target).
    Capture,
    /// Delivery at the target itself.
    #[default]
    Target,
    /// Target's parent → root.
    Bubble,
}

bitflags::bitflags! {
    /// Keyboard modifier state carried on key events.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift key.
        const SHIFT = 0b0000_0001;
        /// Control key.
        const CTRL  = 0b0000_0010;
        /// Alt / Option key.
        const ALT   = 0b0000_0100;
        /// Meta / Command / Super key.
        const META  = 0b0000_1000;
    }
}

/// Value stored in an event's open payload map.
#[derive(Clone, Debug, PartialEq)]
pub enum PayloadValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Owned string.
    Str(String),
}

impl PayloadValue {
    /// The contained integer, if this is an [`PayloadValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained float, if this is a [`PayloadValue::Float`].
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct EventState<K> {
    phase: Phase,
    target: Option<K>,
    current_target: Option<K>,
    related_target: Option<K>,
    propagation_stopped: bool,
    default_behavior_disabled: bool,
    timestamp_ms: u64,
    elapsed_time: f64,
    position: Point,
    wheel_delta: Vec2,
    button: u8,
    click_count: u8,
    drag_offset: Vec2,
    key_code: u32,
    modifiers: Modifiers,
    coalesce_count: u32,
    payload: HashMap<String, PayloadValue>,
}

impl<K> Default for EventState<K> {
    fn default() -> Self {
        Self {
            phase: Phase::Target,
            target: None,
            current_target: None,
            related_target: None,
            propagation_stopped: false,
            default_behavior_disabled: false,
            timestamp_ms: 0,
            elapsed_time: 0.0,
            position: Point::ZERO,
            wheel_delta: Vec2::ZERO,
            button: 0,
            click_count: 0,
            drag_offset: Vec2::ZERO,
            key_code: 0,
            modifiers: Modifiers::empty(),
            coalesce_count: 1,
            payload: HashMap::new(),
        }
    }
}

/// One dispatch message, generic over the host tree's node handle `K`.
///
/// Short-lived: created per input occurrence, queued, dispatched, dropped.
/// See the [module docs](self) for the synchronization and cancellation
/// contract.
#[derive(Debug)]
pub struct Event<K> {
    ty: EventType,
    state: Mutex<EventState<K>>,
}

impl<K: Copy> Clone for Event<K> {
    fn clone(&self) -> Self {
        Self {
            ty: self.ty,
            state: Mutex::new(self.state().clone()),
        }
    }
}

impl<K: Copy> Event<K> {
    /// Create an event of the given type with default fields.
    pub fn new(ty: EventType) -> Self {
        Self {
            ty,
            state: Mutex::new(EventState::default()),
        }
    }

    /// Create an event with a target already set.
    pub fn with_target(ty: EventType, target: K) -> Self {
        let ev = Self::new(ty);
        ev.set_target(Some(target));
        ev
    }

    fn state(&self) -> MutexGuard<'_, EventState<K>> {
        // A poisoned lock only means a handler panicked mid-mutation; the
        // fields are all plain values, so keep going with what's there.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The event's type handle.
    pub fn event_type(&self) -> EventType {
        self.ty
    }

    /// Current propagation phase.
    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    /// Set the propagation phase. Called by the dispatcher as the walk moves.
    pub fn set_phase(&self, phase: Phase) {
        self.state().phase = phase;
    }

    /// The node the event is addressed to.
    pub fn target(&self) -> Option<K> {
        self.state().target
    }

    /// Set the addressed node.
    pub fn set_target(&self, target: Option<K>) {
        self.state().target = target;
    }

    /// The node currently being visited by the walk.
    pub fn current_target(&self) -> Option<K> {
        self.state().current_target
    }

    /// Set the node currently being visited.
    pub fn set_current_target(&self, node: Option<K>) {
        self.state().current_target = node;
    }

    /// Secondary node reference (enter/leave counterpart, drag source).
    pub fn related_target(&self) -> Option<K> {
        self.state().related_target
    }

    /// Set the secondary node reference.
    pub fn set_related_target(&self, node: Option<K>) {
        self.state().related_target = node;
    }

    /// Sticky cancellation flag: stop all further processing of this
    /// instance (remaining listeners, default behavior, later phases).
    pub fn stop_propagation(&self) {
        self.state().propagation_stopped = true;
    }

    /// Whether [`Self::stop_propagation`] has been called.
    pub fn propagation_stopped(&self) -> bool {
        self.state().propagation_stopped
    }

    /// Suppress (or re-enable) only the default-behavior hook. Listener
    /// delivery is unaffected.
    pub fn set_disable_default_behavior(&self, disabled: bool) {
        self.state().default_behavior_disabled = disabled;
    }

    /// Whether the default-behavior hook is suppressed.
    pub fn default_behavior_disabled(&self) -> bool {
        self.state().default_behavior_disabled
    }

    /// Timestamp of the originating input, in milliseconds.
    pub fn timestamp_ms(&self) -> u64 {
        self.state().timestamp_ms
    }

    /// Set the originating timestamp.
    pub fn set_timestamp_ms(&self, ts: u64) {
        self.state().timestamp_ms = ts;
    }

    /// Seconds since the host's clock origin, as supplied by translation.
    pub fn elapsed_time(&self) -> f64 {
        self.state().elapsed_time
    }

    /// Set the elapsed-time field.
    pub fn set_elapsed_time(&self, seconds: f64) {
        self.state().elapsed_time = seconds;
    }

    /// Pointer position in world space.
    pub fn position(&self) -> Point {
        self.state().position
    }

    /// Set the pointer position.
    pub fn set_position(&self, pos: Point) {
        self.state().position = pos;
    }

    /// Wheel scroll delta.
    pub fn wheel_delta(&self) -> Vec2 {
        self.state().wheel_delta
    }

    /// Set the wheel scroll delta.
    pub fn set_wheel_delta(&self, delta: Vec2) {
        self.state().wheel_delta = delta;
    }

    /// Pointer button id.
    pub fn button(&self) -> u8 {
        self.state().button
    }

    /// Set the pointer button id.
    pub fn set_button(&self, button: u8) {
        self.state().button = button;
    }

    /// Click count supplied by the platform (1 = single, 2 = double, ...).
    pub fn click_count(&self) -> u8 {
        self.state().click_count
    }

    /// Set the click count.
    pub fn set_click_count(&self, count: u8) {
        self.state().click_count = count;
    }

    /// Node-local pointer offset captured when a drag session started.
    pub fn drag_offset(&self) -> Vec2 {
        self.state().drag_offset
    }

    /// Set the drag offset.
    pub fn set_drag_offset(&self, offset: Vec2) {
        self.state().drag_offset = offset;
    }

    /// Key code for keyboard events.
    pub fn key_code(&self) -> u32 {
        self.state().key_code
    }

    /// Set the key code.
    pub fn set_key_code(&self, code: u32) {
        self.state().key_code = code;
    }

    /// Keyboard modifier state.
    pub fn modifiers(&self) -> Modifiers {
        self.state().modifiers
    }

    /// Set the keyboard modifier state.
    pub fn set_modifiers(&self, modifiers: Modifiers) {
        self.state().modifiers = modifiers;
    }

    /// How many occurrences this entry stands for after coalescing.
    pub fn coalesce_count(&self) -> u32 {
        self.state().coalesce_count
    }

    /// Store a value in the open payload map.
    pub fn set_payload(&self, key: &str, value: PayloadValue) {
        self.state().payload.insert(key.into(), value);
    }

    /// Read a value from the open payload map.
    pub fn payload(&self, key: &str) -> Option<PayloadValue> {
        self.state().payload.get(key).cloned()
    }

    /// Replace this event's fields with `other`'s, keeping our own lock.
    ///
    /// Used by `Last` coalescing to overwrite a pending entry in place.
    pub fn replace_from(&self, other: &Self) {
        let fresh = other.state().clone();
        *self.state() = fresh;
    }

    /// Accumulate `other`'s delta fields into this event.
    ///
    /// Used by `Sum` coalescing: wheel deltas and numeric payload entries
    /// add up, position/timestamp advance to the newest occurrence, and the
    /// occurrence counter grows. `other` must be a distinct instance.
    pub fn accumulate_from(&self, other: &Self) {
        let incoming = other.state().clone();
        let mut state = self.state();
        state.wheel_delta += incoming.wheel_delta;
        state.position = incoming.position;
        state.timestamp_ms = incoming.timestamp_ms;
        state.elapsed_time = incoming.elapsed_time;
        state.coalesce_count += incoming.coalesce_count;
        for (key, value) in incoming.payload {
            let merged = match (state.payload.get(&key), &value) {
                (Some(PayloadValue::Int(a)), PayloadValue::Int(b)) => PayloadValue::Int(a + b),
                (Some(PayloadValue::Float(a)), PayloadValue::Float(b)) => PayloadValue::Float(a + b),
                _ => value,
            };
            state.payload.insert(key, merged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_type::EventTypeRegistry;

    fn ty() -> EventType {
        let mut reg = EventTypeRegistry::new();
        reg.define("test", true, true, false, false)
    }

    #[test]
    fn stop_propagation_is_sticky() {
        let ev: Event<u32> = Event::new(ty());
        assert!(!ev.propagation_stopped());
        ev.stop_propagation();
        assert!(ev.propagation_stopped());
        // There is no way to un-stop.
        ev.stop_propagation();
        assert!(ev.propagation_stopped());
    }

    #[test]
    fn default_behavior_toggle_is_independent_of_stop() {
        let ev: Event<u32> = Event::new(ty());
        ev.set_disable_default_behavior(true);
        assert!(ev.default_behavior_disabled());
        assert!(!ev.propagation_stopped());
        ev.set_disable_default_behavior(false);
        assert!(!ev.default_behavior_disabled());
    }

    #[test]
    fn clone_is_independent() {
        let ev: Event<u32> = Event::with_target(ty(), 7);
        ev.set_position(Point::new(3.0, 4.0));
        let copy = ev.clone();
        copy.stop_propagation();
        copy.set_target(Some(9));
        // The original is untouched by mutations of the copy.
        assert!(!ev.propagation_stopped());
        assert_eq!(ev.target(), Some(7));
        assert_eq!(copy.target(), Some(9));
        assert_eq!(copy.position(), Point::new(3.0, 4.0));
    }

    #[test]
    fn targets_round_trip() {
        let ev: Event<u32> = Event::new(ty());
        ev.set_target(Some(1));
        ev.set_current_target(Some(2));
        ev.set_related_target(Some(3));
        assert_eq!(ev.target(), Some(1));
        assert_eq!(ev.current_target(), Some(2));
        assert_eq!(ev.related_target(), Some(3));
        ev.set_related_target(None);
        assert_eq!(ev.related_target(), None);
    }

    #[test]
    fn replace_from_overwrites_in_place() {
        let a: Event<u32> = Event::with_target(ty(), 1);
        a.set_position(Point::new(1.0, 1.0));
        let b: Event<u32> = Event::with_target(ty(), 2);
        b.set_position(Point::new(9.0, 9.0));
        a.replace_from(&b);
        assert_eq!(a.target(), Some(2));
        assert_eq!(a.position(), Point::new(9.0, 9.0));
    }

    #[test]
    fn accumulate_sums_deltas_and_counts() {
        let a: Event<u32> = Event::new(ty());
        a.set_wheel_delta(Vec2::new(0.0, 1.0));
        a.set_timestamp_ms(10);
        a.set_payload("width", PayloadValue::Int(5));
        let b: Event<u32> = Event::new(ty());
        b.set_wheel_delta(Vec2::new(0.0, 2.5));
        b.set_timestamp_ms(14);
        b.set_position(Point::new(4.0, 4.0));
        b.set_payload("width", PayloadValue::Int(3));

        a.accumulate_from(&b);
        assert_eq!(a.wheel_delta(), Vec2::new(0.0, 3.5));
        assert_eq!(a.timestamp_ms(), 14);
        assert_eq!(a.position(), Point::new(4.0, 4.0));
        assert_eq!(a.coalesce_count(), 2);
        assert_eq!(a.payload("width"), Some(PayloadValue::Int(8)));
    }

    #[test]
    fn payload_is_open_and_typed() {
        let ev: Event<u32> = Event::new(ty());
        ev.set_payload("flag", PayloadValue::Bool(true));
        ev.set_payload("label", PayloadValue::Str("drop-zone".into()));
        assert_eq!(ev.payload("flag"), Some(PayloadValue::Bool(true)));
        assert_eq!(ev.payload("label"), Some(PayloadValue::Str("drop-zone".into())));
        assert_eq!(ev.payload("missing"), None);
    }
}
