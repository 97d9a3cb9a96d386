// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node capability contract: the minimal interface the dispatcher
//! requires from an external display-tree layer.
//!
//! The engine never owns, allocates, or frees nodes. It reads structure and
//! flags through this trait, keyed by the host's own handle type, and calls
//! back into the host for listener delivery and per-node default behavior.
//!
//! ## Handles
//!
//! [`NodeTree::Id`] should be a small, non-owning, generation-checked handle
//! (an arena slot + generation pair works well). [`NodeTree::contains`] is
//! the resolution step: the dispatcher calls it at every traversal step
//! rather than caching resolution for a whole walk, so host code is free to
//! add, remove, or reparent nodes while a dispatch is in flight. A handle
//! that no longer resolves is treated as absent, never as an error.
//!
//! ## Default behavior
//!
//! [`NodeTree::default_behavior`] is the polymorphic per-node reaction to an
//! event (a button presses, a scroll view scrolls). The dispatcher invokes
//! it generically after a node's listeners, unless the event's propagation
//! was stopped or its default behavior disabled; it never inspects concrete
//! node types itself.

use core::fmt::Debug;
use core::hash::Hash;

use kurbo::Rect;

use crate::event::{Event, Phase};

/// Capability surface over an externally owned tree of visual nodes.
pub trait NodeTree {
    /// Non-owning node handle.
    type Id: Copy + Eq + Hash + Debug;

    /// Whether the handle still resolves to a live node.
    fn contains(&self, node: Self::Id) -> bool;

    /// Parent of `node`, or `None` for the root.
    ///
    /// Hosts may keep reporting the last known parent of a dead handle so
    /// the node's still-live ancestors continue to receive bubble delivery;
    /// returning `None` instead ends the walk early.
    fn parent_of(&self, node: Self::Id) -> Option<Self::Id>;

    /// Children of `node` in z-stable document order.
    fn children_of(&self, node: Self::Id) -> Vec<Self::Id>;

    /// World-space bounds, or `None` for an unresolvable handle.
    fn bounds(&self, node: Self::Id) -> Option<Rect>;

    /// Z-order among siblings; higher is nearer.
    fn z_order(&self, node: Self::Id) -> i32;

    /// Whether the node participates in clickable-only hit tests.
    fn is_clickable(&self, node: Self::Id) -> bool;

    /// Whether listeners and default behavior run at this node.
    fn is_enabled(&self, node: Self::Id) -> bool;

    /// Whether the node (and its subtree, for hit testing) is hidden.
    ///
    /// Hidden nodes are skipped for execution during a walk but the walk
    /// still advances through their position.
    fn is_hidden(&self, node: Self::Id) -> bool;

    /// Run the node's registered listeners for (event type, phase).
    fn trigger_listeners(&mut self, node: Self::Id, event: &Event<Self::Id>, phase: Phase);

    /// The node's default reaction to an event, run after listeners.
    fn default_behavior(&mut self, node: Self::Id, event: &Event<Self::Id>);
}
