// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node listener registration.
//!
//! A [`ListenerSet`] is the table a host tree embeds in each node to back
//! its `trigger_listeners` capability. Listeners are keyed by
//! (event type, phase); higher priority fires first, and listeners sharing
//! a priority fire in insertion order. Removal uses the [`ListenerId`]
//! returned at registration, since Rust closures carry no usable identity.
//!
//! [`ListenerSet::trigger`] re-checks the event's stop flag between
//! callbacks, so a listener that calls `stop_propagation` suppresses the
//! rest of its own node's listeners as well as the remaining walk.

use hashbrown::HashMap;

use crate::event::{Event, Phase};
use crate::event_type::EventType;

/// Identity of a registered listener, returned by [`ListenerSet::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked with the event being delivered.
pub type ListenerFn<K> = Box<dyn FnMut(&Event<K>)>;

struct Entry<K> {
    id: ListenerId,
    priority: i32,
    callback: ListenerFn<K>,
}

/// Ordered listener table for one node.
pub struct ListenerSet<K> {
    next_id: u64,
    table: HashMap<(EventType, Phase), Vec<Entry<K>>>,
}

impl<K> core::fmt::Debug for ListenerSet<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("keys", &self.table.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl<K: Copy> Default for ListenerSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy> ListenerSet<K> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            table: HashMap::new(),
        }
    }

    /// Register a listener for (type, phase).
    ///
    /// Higher `priority` fires first; equal priorities fire in insertion
    /// order. Returns the id used for [`Self::remove`].
    pub fn add(
        &mut self,
        ty: EventType,
        phase: Phase,
        priority: i32,
        callback: ListenerFn<K>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let entries = self.table.entry((ty, phase)).or_default();
        // Insert after the last entry with priority >= ours, keeping the
        // vec sorted descending and same-priority order stable.
        let at = entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(entries.len());
        entries.insert(
            at,
            Entry {
                id,
                priority,
                callback,
            },
        );
        id
    }

    /// Unregister a listener previously returned by [`Self::add`].
    ///
    /// Returns whether a listener was removed.
    pub fn remove(&mut self, ty: EventType, phase: Phase, id: ListenerId) -> bool {
        let Some(entries) = self.table.get_mut(&(ty, phase)) else {
            return false;
        };
        let Some(at) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        entries.remove(at);
        if entries.is_empty() {
            self.table.remove(&(ty, phase));
        }
        true
    }

    /// Whether any listener is registered for (type, phase).
    pub fn has_listener(&self, ty: EventType, phase: Phase) -> bool {
        self.table
            .get(&(ty, phase))
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Run the listeners registered for the event's type in `phase`.
    ///
    /// Stops early if a callback sets the event's sticky stop flag.
    pub fn trigger(&mut self, event: &Event<K>, phase: Phase) {
        let Some(entries) = self.table.get_mut(&(event.event_type(), phase)) else {
            return;
        };
        for entry in entries.iter_mut() {
            if event.propagation_stopped() {
                break;
            }
            (entry.callback)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_type::EventTypeRegistry;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ty() -> EventType {
        let mut reg = EventTypeRegistry::new();
        reg.define("t", true, true, false, false)
    }

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> ListenerFn<u32> {
        let log = Rc::clone(log);
        Box::new(move |_| log.borrow_mut().push(tag))
    }

    #[test]
    fn default_set_is_empty() {
        let set: ListenerSet<u32> = ListenerSet::default();
        assert!(!set.has_listener(ty(), Phase::Target));
    }

    #[test]
    fn same_priority_fires_in_insertion_order() {
        let ty = ty();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set: ListenerSet<u32> = ListenerSet::new();
        set.add(ty, Phase::Target, 0, recorder(&log, "a"));
        set.add(ty, Phase::Target, 0, recorder(&log, "b"));
        set.add(ty, Phase::Target, 0, recorder(&log, "c"));

        set.trigger(&Event::new(ty), Phase::Target);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn higher_priority_fires_first() {
        let ty = ty();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set: ListenerSet<u32> = ListenerSet::new();
        set.add(ty, Phase::Target, 0, recorder(&log, "low"));
        set.add(ty, Phase::Target, 10, recorder(&log, "high"));
        set.add(ty, Phase::Target, 5, recorder(&log, "mid"));

        set.trigger(&Event::new(ty), Phase::Target);
        assert_eq!(*log.borrow(), vec!["high", "mid", "low"]);
    }

    #[test]
    fn phases_are_independent_keys() {
        let ty = ty();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set: ListenerSet<u32> = ListenerSet::new();
        set.add(ty, Phase::Capture, 0, recorder(&log, "capture"));
        set.add(ty, Phase::Bubble, 0, recorder(&log, "bubble"));

        assert!(set.has_listener(ty, Phase::Capture));
        assert!(!set.has_listener(ty, Phase::Target));

        set.trigger(&Event::new(ty), Phase::Bubble);
        assert_eq!(*log.borrow(), vec!["bubble"]);
    }

    #[test]
    fn remove_by_id() {
        let ty = ty();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set: ListenerSet<u32> = ListenerSet::new();
        let a = set.add(ty, Phase::Target, 0, recorder(&log, "a"));
        set.add(ty, Phase::Target, 0, recorder(&log, "b"));

        assert!(set.remove(ty, Phase::Target, a));
        assert!(!set.remove(ty, Phase::Target, a));

        set.trigger(&Event::new(ty), Phase::Target);
        assert_eq!(*log.borrow(), vec!["b"]);
    }

    #[test]
    fn removing_last_listener_clears_has_listener() {
        let ty = ty();
        let mut set: ListenerSet<u32> = ListenerSet::new();
        let id = set.add(ty, Phase::Target, 0, Box::new(|_| {}));
        assert!(set.has_listener(ty, Phase::Target));
        set.remove(ty, Phase::Target, id);
        assert!(!set.has_listener(ty, Phase::Target));
    }

    #[test]
    fn stop_propagation_suppresses_remaining_listeners() {
        let ty = ty();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set: ListenerSet<u32> = ListenerSet::new();
        set.add(ty, Phase::Target, 0, recorder(&log, "first"));
        set.add(ty, Phase::Target, 0, {
            let log = Rc::clone(&log);
            Box::new(move |ev| {
                log.borrow_mut().push("stopper");
                ev.stop_propagation();
            })
        });
        set.add(ty, Phase::Target, 0, recorder(&log, "never"));

        set.trigger(&Event::new(ty), Phase::Target);
        assert_eq!(*log.borrow(), vec!["first", "stopper"]);
    }

    #[test]
    fn trigger_ignores_other_event_types() {
        let mut reg = EventTypeRegistry::new();
        let a = reg.define("a", true, true, false, false);
        let b = reg.define("b", true, true, false, false);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set: ListenerSet<u32> = ListenerSet::new();
        set.add(a, Phase::Target, 0, recorder(&log, "a"));

        set.trigger(&Event::new(b), Phase::Target);
        assert!(log.borrow().is_empty());
    }
}
