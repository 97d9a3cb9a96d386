// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Event: the typed event model under Arbor's dispatch engine.
//!
//! ## Overview
//!
//! This crate holds the leaf pieces the dispatcher in `arbor_dispatch`
//! composes:
//!
//! - [`EventTypeRegistry`](event_type::EventTypeRegistry) — named event
//!   categories with immutable routing flags and a metering/coalescing
//!   policy, defined once at setup and looked up by name.
//! - [`Event`](event::Event) — one dispatch message: type, phase, target
//!   references, structured payload, and sticky cancellation flags behind a
//!   per-instance lock.
//! - [`ListenerSet`](listener::ListenerSet) — the per-node registration
//!   table with priority-then-insertion ordering.
//! - [`NodeTree`](node::NodeTree) — the capability contract an external
//!   display-tree layer implements so the engine can traverse it.
//!
//! Events are generic over the host tree's node handle, so any small,
//! copyable, generation-checked id works as a target reference; references
//! never extend node lifetime and are re-resolved against the live tree at
//! each traversal step.

pub mod event;
pub mod event_type;
pub mod listener;
pub mod node;

pub use event::{Event, Modifiers, PayloadValue, Phase};
pub use event_type::{
    CoalesceKey, CoalesceStrategy, DenseTypeId, EventCategory, EventType, EventTypeRegistry,
    Routing,
};
pub use listener::{ListenerFn, ListenerId, ListenerSet};
pub use node::NodeTree;
