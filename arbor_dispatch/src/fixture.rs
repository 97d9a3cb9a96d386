// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test fixture: a minimal slab-backed tree implementing [`NodeTree`].
//!
//! Nodes are dense `u32` indices with an alive flag standing in for a
//! generation check. Listener and default-behavior deliveries are recorded
//! in a shared log so tests can assert exact phase/node sequences. Parent
//! links survive removal, so a dead node's ancestors still receive bubble
//! delivery, matching how generational arenas behave in practice.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Rect;

use arbor_event::{Event, EventType, ListenerFn, ListenerId, ListenerSet, NodeTree, Phase};

/// One recorded delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub(crate) kind: &'static str,
    pub(crate) phase: Phase,
    pub(crate) node: u32,
}

impl Delivery {
    pub(crate) fn listener(phase: Phase, node: u32) -> Self {
        Self {
            kind: "listener",
            phase,
            node,
        }
    }

    pub(crate) fn default(phase: Phase, node: u32) -> Self {
        Self {
            kind: "default",
            phase,
            node,
        }
    }
}

struct TestNode {
    alive: bool,
    parent: Option<u32>,
    children: Vec<u32>,
    bounds: Rect,
    z: i32,
    clickable: bool,
    enabled: bool,
    hidden: bool,
    panics_in_default: bool,
    listeners: ListenerSet<u32>,
}

pub(crate) struct TestTree {
    nodes: Rc<RefCell<Vec<TestNode>>>,
    pub(crate) log: Rc<RefCell<Vec<Delivery>>>,
}

impl TestTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Rc::new(RefCell::new(Vec::new())),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn push(&mut self, parent: Option<u32>, bounds: Rect, z: i32) -> u32 {
        let mut nodes = self.nodes.borrow_mut();
        let id = u32::try_from(nodes.len()).unwrap_or(u32::MAX);
        nodes.push(TestNode {
            alive: true,
            parent,
            children: Vec::new(),
            bounds,
            z,
            clickable: true,
            enabled: true,
            hidden: false,
            panics_in_default: false,
            listeners: ListenerSet::new(),
        });
        if let Some(p) = parent {
            nodes[p as usize].children.push(id);
        }
        id
    }

    pub(crate) fn add_root(&mut self, bounds: Rect) -> u32 {
        self.push(None, bounds, 0)
    }

    pub(crate) fn add(&mut self, parent: u32, bounds: Rect, z: i32) -> u32 {
        self.push(Some(parent), bounds, z)
    }

    pub(crate) fn set_clickable(&mut self, node: u32, clickable: bool) {
        self.nodes.borrow_mut()[node as usize].clickable = clickable;
    }

    pub(crate) fn set_enabled(&mut self, node: u32, enabled: bool) {
        self.nodes.borrow_mut()[node as usize].enabled = enabled;
    }

    pub(crate) fn set_hidden(&mut self, node: u32, hidden: bool) {
        self.nodes.borrow_mut()[node as usize].hidden = hidden;
    }

    pub(crate) fn set_panics_in_default(&mut self, node: u32, panics: bool) {
        self.nodes.borrow_mut()[node as usize].panics_in_default = panics;
    }

    pub(crate) fn remove(&mut self, node: u32) {
        self.nodes.borrow_mut()[node as usize].alive = false;
    }

    pub(crate) fn add_listener(
        &mut self,
        node: u32,
        ty: EventType,
        phase: Phase,
        priority: i32,
        callback: ListenerFn<u32>,
    ) -> ListenerId {
        self.nodes.borrow_mut()[node as usize]
            .listeners
            .add(ty, phase, priority, callback)
    }

    /// Register a listener that records its delivery in the shared log.
    pub(crate) fn add_recording_listener(&mut self, node: u32, ty: EventType, phase: Phase) {
        let log = Rc::clone(&self.log);
        self.add_listener(
            node,
            ty,
            phase,
            0,
            Box::new(move |ev| {
                log.borrow_mut().push(Delivery::listener(ev.phase(), node));
            }),
        );
    }

    /// A callback that marks `victim` dead, for mutate-during-dispatch tests.
    pub(crate) fn killer(&self, victim: u32) -> ListenerFn<u32> {
        let nodes = Rc::clone(&self.nodes);
        Box::new(move |_| {
            nodes.borrow_mut()[victim as usize].alive = false;
        })
    }

    pub(crate) fn deliveries(&self) -> Vec<Delivery> {
        self.log.borrow().clone()
    }
}

impl NodeTree for TestTree {
    type Id = u32;

    fn contains(&self, node: u32) -> bool {
        self.nodes
            .borrow()
            .get(node as usize)
            .is_some_and(|n| n.alive)
    }

    fn parent_of(&self, node: u32) -> Option<u32> {
        self.nodes.borrow().get(node as usize).and_then(|n| n.parent)
    }

    fn children_of(&self, node: u32) -> Vec<u32> {
        self.nodes
            .borrow()
            .get(node as usize)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn bounds(&self, node: u32) -> Option<Rect> {
        let nodes = self.nodes.borrow();
        let n = nodes.get(node as usize)?;
        n.alive.then_some(n.bounds)
    }

    fn z_order(&self, node: u32) -> i32 {
        self.nodes.borrow().get(node as usize).map_or(0, |n| n.z)
    }

    fn is_clickable(&self, node: u32) -> bool {
        self.nodes
            .borrow()
            .get(node as usize)
            .is_some_and(|n| n.clickable)
    }

    fn is_enabled(&self, node: u32) -> bool {
        self.nodes
            .borrow()
            .get(node as usize)
            .is_some_and(|n| n.enabled)
    }

    fn is_hidden(&self, node: u32) -> bool {
        self.nodes
            .borrow()
            .get(node as usize)
            .is_some_and(|n| n.hidden)
    }

    fn trigger_listeners(&mut self, node: u32, event: &Event<u32>, phase: Phase) {
        // Take the set out so callbacks may re-borrow the tree (e.g. to
        // remove nodes) without tripping the RefCell.
        let taken = self
            .nodes
            .borrow_mut()
            .get_mut(node as usize)
            .map(|n| core::mem::take(&mut n.listeners));
        let Some(mut set) = taken else { return };
        set.trigger(event, phase);
        if let Some(n) = self.nodes.borrow_mut().get_mut(node as usize) {
            n.listeners = set;
        }
    }

    fn default_behavior(&mut self, node: u32, event: &Event<u32>) {
        let panics = self
            .nodes
            .borrow()
            .get(node as usize)
            .is_some_and(|n| n.panics_in_default);
        assert!(!panics, "default behavior failure (fixture)");
        self.log
            .borrow_mut()
            .push(Delivery::default(event.phase(), node));
    }
}
