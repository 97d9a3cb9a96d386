// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Dispatch: the event-propagation engine over an external scene tree.
//!
//! ## Overview
//!
//! The engine never owns nodes. The host's display layer implements
//! [`NodeTree`](arbor_event::NodeTree) and the pieces here drive it:
//!
//! - [`input`] — normalized platform input ([`RawInput`](input::RawInput)).
//! - [`hit`] — topmost-node queries with depth/z/visit-order tie-breaking.
//! - [`drag`] — the single-pointer drag session state machine.
//! - [`queue`] — the FIFO pending queue with per-type metering and
//!   coalescing.
//! - [`manager`] — [`EventManager`](manager::EventManager): translation of
//!   raw input into the derived event stream, and three-phase
//!   capture → target → bubble dispatch.
//!
//! A typical frame: the host feeds every platform input through
//! [`EventManager::translate`](manager::EventManager::translate), then calls
//! [`EventManager::drain_queue`](manager::EventManager::drain_queue) once to
//! deliver the pending stream. Listeners raise follow-up events through a
//! cloned queue handle; those land in the same drain pass.

pub mod drag;
pub mod hit;
pub mod input;
pub mod manager;
pub mod queue;

#[cfg(test)]
mod fixture;

pub use drag::{DRAG_THRESHOLD_PX, DragMotion, DragSession};
pub use hit::{find_top_hover, find_top_under};
pub use input::{InputKind, RawInput, WindowChange, WindowId};
pub use manager::{EventManager, StdEvents, is_traversing};
pub use queue::EventQueue;
