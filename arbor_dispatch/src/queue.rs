// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pending-event queue: FIFO with per-type metering.
//!
//! ## Handle
//!
//! [`EventQueue`] is a clonable handle over shared queue storage. The
//! manager drains through one clone while host listeners hold others, so an
//! event raised as a side effect of dispatch lands in the same queue and is
//! processed within the same drain pass. The engine is single-threaded;
//! sharing is `Rc<RefCell<..>>`, and no borrow is held across a dispatch.
//!
//! ## Coalescing
//!
//! Insertion order is preserved unless the event's type opts into metering.
//! A metered enqueue looks for an *open* pending entry under the same
//! coalesce key — one slot per type (`Global`) or per (type, target)
//! (`ByTarget`) — whose age (by input timestamp) is within the type's
//! metering window:
//!
//! - `Last` replaces the pending entry's payload in place.
//! - `Sum` accumulates delta fields into the pending entry.
//! - `None` and `Count` always append (`Count` entries carry an occurrence
//!   counter).
//!
//! A `critical` type first closes any open entry of the same type — the
//! already-queued occurrence keeps its position but stops absorbing
//! newcomers — then appends a fresh entry, preserving relative order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use arbor_event::{CoalesceKey, CoalesceStrategy, Event, EventTypeRegistry};

#[derive(Debug)]
struct Pending<K> {
    event: Event<K>,
    /// Input timestamp at first enqueue; the coalescing window is anchored
    /// here, so a slot cannot absorb newcomers forever.
    enqueued_at_ms: u64,
    /// Still eligible to absorb coalesced newcomers.
    open: bool,
}

/// Clonable handle to the shared pending queue.
#[derive(Debug)]
pub struct EventQueue<K> {
    entries: Rc<RefCell<VecDeque<Pending<K>>>>,
    registry: Rc<RefCell<EventTypeRegistry>>,
}

impl<K> Clone for EventQueue<K> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<K: Copy + Eq> EventQueue<K> {
    /// Create an empty queue sharing the given registry for policy lookups.
    pub fn new(registry: Rc<RefCell<EventTypeRegistry>>) -> Self {
        Self {
            entries: Rc::new(RefCell::new(VecDeque::new())),
            registry,
        }
    }

    /// Append or coalesce one event according to its type's policy.
    pub fn enqueue(&self, event: Event<K>) {
        let ty = event.event_type();
        let (critical, metered, strategy, key, interval_ms) = {
            let reg = self.registry.borrow();
            (
                reg.is_critical(ty),
                reg.meter_enabled(ty),
                reg.coalesce_strategy(ty),
                reg.coalesce_key(ty),
                reg.meter_interval_ms(ty),
            )
        };
        let mut entries = self.entries.borrow_mut();

        if critical {
            // Close any open coalesced slot of this type; it keeps its queue
            // position but stops absorbing newcomers.
            for pending in entries.iter_mut() {
                if pending.open && pending.event.event_type() == ty {
                    pending.open = false;
                }
            }
            entries.push_back(Pending {
                enqueued_at_ms: event.timestamp_ms(),
                event,
                open: false,
            });
            return;
        }

        let merges = metered
            && matches!(strategy, CoalesceStrategy::Last | CoalesceStrategy::Sum);
        if merges {
            let slot = entries.iter_mut().rev().find(|pending| {
                pending.open
                    && pending.event.event_type() == ty
                    && (key == CoalesceKey::Global || pending.event.target() == event.target())
                    && event.timestamp_ms().saturating_sub(pending.enqueued_at_ms) <= interval_ms
            });
            if let Some(pending) = slot {
                match strategy {
                    CoalesceStrategy::Last => pending.event.replace_from(&event),
                    CoalesceStrategy::Sum => pending.event.accumulate_from(&event),
                    _ => unreachable!("merges implies Last or Sum"),
                }
                return;
            }
        }

        entries.push_back(Pending {
            enqueued_at_ms: event.timestamp_ms(),
            event,
            open: merges,
        });
    }

    /// Pop the oldest pending event, if any.
    pub fn pop(&self) -> Option<Event<K>> {
        self.entries.borrow_mut().pop_front().map(|p| p.event)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Non-destructive ordered snapshot of the pending events.
    pub fn snapshot(&self) -> Vec<Event<K>> {
        self.entries.borrow().iter().map(|p| p.event.clone()).collect()
    }

    /// Drop all pending events.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
