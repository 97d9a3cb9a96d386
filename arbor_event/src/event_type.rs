// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event-type registry: named categories of events with immutable routing
//! flags and a metering/coalescing policy.
//!
//! ## Overview
//!
//! Event types are registered once at setup through
//! [`EventTypeRegistry::define`] and looked up by name with
//! [`EventTypeRegistry::lookup`]. A definition is idempotent by name:
//! redefining an existing name returns the existing entry unchanged. The
//! registry is append-only; entries live as long as the registry itself.
//!
//! ## Routing
//!
//! Each type carries [`Routing`] flags. Exactly one of the following governs
//! delivery, with fixed precedence applied by the dispatcher:
//!
//! - [`Routing::GLOBAL`] — delivered to every node, bypassing the tree walk.
//! - [`Routing::TARGET_ONLY`] — delivered to the exact target only.
//! - [`Routing::CAPTURES`] / [`Routing::BUBBLES`] — the three-phase walk.
//! - none set — "listener-only": reaches registered listeners on every node
//!   and never a default-behavior hook.
//!
//! Conflicting combinations are accepted at definition time and resolved by
//! that precedence, never rejected.
//!
//! ## Metering policy
//!
//! High-frequency types (motion, wheel, resize) can opt into metering via
//! [`EventTypeRegistry::set_meter_enabled`]. The queue then merges pending
//! occurrences within [`EventTypeRegistry::meter_interval_ms`] according to
//! the type's [`CoalesceStrategy`] and [`CoalesceKey`]. Policy mutators are
//! setup-time only and are never called during dispatch.
//!
//! ## Dense ids
//!
//! Every type can lazily receive a [`DenseTypeId`]: a small, hashable id
//! allocated from its category's 256-id block with linear-probe fallback
//! once a block spills over. Ids are stable for the registry's lifetime
//! once assigned.

use hashbrown::{HashMap, HashSet};

bitflags::bitflags! {
    /// Routing flags controlling how an event type propagates.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Routing: u8 {
        /// Participates in the capture phase (root → target).
        const CAPTURES    = 0b0000_0001;
        /// Participates in the bubble phase (target → root).
        const BUBBLES     = 0b0000_0010;
        /// Delivered to the exact target only; capture and bubble are skipped.
        const TARGET_ONLY = 0b0000_0100;
        /// Delivered to every node in the tree; the walk is bypassed entirely.
        const GLOBAL      = 0b0000_1000;
    }
}

impl Routing {
    /// True when none of the routing flags are set: the type is
    /// "listener-only" and reaches registered listeners on every node,
    /// never a default-behavior hook.
    pub fn is_listener_only(self) -> bool {
        self.is_empty()
    }
}

/// How pending occurrences of a metered type are merged in the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoalesceStrategy {
    /// Never merge; every occurrence is appended.
    #[default]
    None,
    /// The pending entry is replaced by the newest occurrence.
    Last,
    /// Delta fields (wheel delta, numeric payload) accumulate into the
    /// pending entry instead of appending.
    Sum,
    /// Append like [`Self::None`], stamping an occurrence counter on each
    /// entry.
    Count,
}

/// Granularity of the coalescing slot for a metered type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoalesceKey {
    /// One pending slot per event type.
    #[default]
    Global,
    /// One pending slot per (event type, target) pair.
    ByTarget,
}

/// Id-allocation block for an event type.
///
/// Each category owns a contiguous block of [`EventCategory::BLOCK_SIZE`]
/// dense ids; allocation spills into neighboring space with linear probing
/// once a block is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// Application-defined types with no dedicated block.
    #[default]
    General,
    /// Pointer input and gestures synthesized from it.
    Pointer,
    /// Keyboard input.
    Key,
    /// Window lifecycle.
    Window,
}

impl EventCategory {
    /// Number of dense ids reserved per category block.
    pub const BLOCK_SIZE: u16 = 256;

    const COUNT: usize = 4;

    const fn index(self) -> usize {
        match self {
            Self::General => 0,
            Self::Pointer => 1,
            Self::Key => 2,
            Self::Window => 3,
        }
    }

    const fn block_base(self) -> u16 {
        self.index() as u16 * Self::BLOCK_SIZE
    }
}

/// Handle to a registered event type.
///
/// Cheap to copy, hashable, and stable: handles index the registry's
/// append-only definition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventType(u32);

impl EventType {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Lazily assigned dense id for an event type.
///
/// Unique within a registry and stable once allocated. Useful as a compact
/// hash/array key where the full [`EventType`] handle is too wide a concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DenseTypeId(pub u16);

#[derive(Debug)]
struct TypeDef {
    name: String,
    category: EventCategory,
    routing: Routing,
    critical: bool,
    meter_enabled: bool,
    meter_interval_ms: u64,
    coalesce_strategy: CoalesceStrategy,
    coalesce_key: CoalesceKey,
    dense_id: Option<DenseTypeId>,
}

/// Append-only registry of event types.
///
/// Create one at setup, define the types the application speaks, and hand it
/// to the dispatcher. Lookups during dispatch are read-only; the policy
/// mutators exist for setup code and are never called mid-dispatch.
#[derive(Debug)]
pub struct EventTypeRegistry {
    defs: Vec<TypeDef>,
    by_name: HashMap<String, EventType>,
    next_in_block: [u16; EventCategory::COUNT],
    taken_ids: HashSet<u16>,
}

impl Default for EventTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            defs: Vec::new(),
            by_name: HashMap::new(),
            next_in_block: [0; EventCategory::COUNT],
            taken_ids: HashSet::new(),
        }
    }

    /// Define an event type in the [`EventCategory::General`] block.
    ///
    /// Idempotent by name: if `name` is already registered the existing
    /// handle is returned and the supplied flags are ignored.
    pub fn define(
        &mut self,
        name: &str,
        captures: bool,
        bubbles: bool,
        target_only: bool,
        global: bool,
    ) -> EventType {
        self.define_in(EventCategory::General, name, captures, bubbles, target_only, global)
    }

    /// Define an event type in an explicit id-allocation category.
    pub fn define_in(
        &mut self,
        category: EventCategory,
        name: &str,
        captures: bool,
        bubbles: bool,
        target_only: bool,
        global: bool,
    ) -> EventType {
        if let Some(&existing) = self.by_name.get(name) {
            return existing;
        }
        let mut routing = Routing::empty();
        routing.set(Routing::CAPTURES, captures);
        routing.set(Routing::BUBBLES, bubbles);
        routing.set(Routing::TARGET_ONLY, target_only);
        routing.set(Routing::GLOBAL, global);

        let handle = EventType(u32::try_from(self.defs.len()).unwrap_or(u32::MAX));
        self.defs.push(TypeDef {
            name: name.into(),
            category,
            routing,
            critical: false,
            meter_enabled: false,
            meter_interval_ms: 10,
            coalesce_strategy: CoalesceStrategy::None,
            coalesce_key: CoalesceKey::Global,
            dense_id: None,
        });
        self.by_name.insert(name.into(), handle);
        handle
    }

    /// Look up a previously defined type by name.
    pub fn lookup(&self, name: &str) -> Option<EventType> {
        self.by_name.get(name).copied()
    }

    /// Number of defined types.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True when no types have been defined.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Name of a registered type.
    pub fn name(&self, ty: EventType) -> &str {
        &self.def(ty).name
    }

    /// Category of a registered type.
    pub fn category(&self, ty: EventType) -> EventCategory {
        self.def(ty).category
    }

    /// Routing flags of a registered type.
    pub fn routing(&self, ty: EventType) -> Routing {
        self.def(ty).routing
    }

    /// Whether enqueues of this type flush pending coalesced entries of the
    /// same type before appending.
    pub fn is_critical(&self, ty: EventType) -> bool {
        self.def(ty).critical
    }

    /// Whether the queue meters this type.
    pub fn meter_enabled(&self, ty: EventType) -> bool {
        self.def(ty).meter_enabled
    }

    /// Metering window in milliseconds.
    pub fn meter_interval_ms(&self, ty: EventType) -> u64 {
        self.def(ty).meter_interval_ms
    }

    /// Merge strategy applied inside the metering window.
    pub fn coalesce_strategy(&self, ty: EventType) -> CoalesceStrategy {
        self.def(ty).coalesce_strategy
    }

    /// Slot granularity of the merge strategy.
    pub fn coalesce_key(&self, ty: EventType) -> CoalesceKey {
        self.def(ty).coalesce_key
    }

    /// Mark a type as critical. Setup-time only.
    pub fn set_critical(&mut self, ty: EventType, critical: bool) {
        self.def_mut(ty).critical = critical;
    }

    /// Enable or disable metering for a type. Setup-time only.
    pub fn set_meter_enabled(&mut self, ty: EventType, enabled: bool) {
        self.def_mut(ty).meter_enabled = enabled;
    }

    /// Set the metering window for a type. Setup-time only.
    pub fn set_meter_interval_ms(&mut self, ty: EventType, interval_ms: u64) {
        self.def_mut(ty).meter_interval_ms = interval_ms;
    }

    /// Set the merge strategy for a type. Setup-time only.
    pub fn set_coalesce_strategy(&mut self, ty: EventType, strategy: CoalesceStrategy) {
        self.def_mut(ty).coalesce_strategy = strategy;
    }

    /// Set the slot granularity for a type. Setup-time only.
    pub fn set_coalesce_key(&mut self, ty: EventType, key: CoalesceKey) {
        self.def_mut(ty).coalesce_key = key;
    }

    /// Dense id of a type, allocating it on first request.
    ///
    /// The candidate id is the next free offset in the type's category
    /// block; when the block has spilled over, or the slot is already taken,
    /// allocation probes linearly through the id space. The result is stable
    /// for the registry's lifetime.
    pub fn dense_id(&mut self, ty: EventType) -> DenseTypeId {
        if let Some(id) = self.def(ty).dense_id {
            return id;
        }
        let category = self.def(ty).category;
        let offset = self.next_in_block[category.index()];
        self.next_in_block[category.index()] = offset.wrapping_add(1);

        let mut candidate = category.block_base().wrapping_add(offset);
        while !self.taken_ids.insert(candidate) {
            candidate = candidate.wrapping_add(1);
        }
        let id = DenseTypeId(candidate);
        self.def_mut(ty).dense_id = Some(id);
        id
    }

    fn def(&self, ty: EventType) -> &TypeDef {
        &self.defs[ty.idx()]
    }

    fn def_mut(&mut self, ty: EventType) -> &mut TypeDef {
        &mut self.defs[ty.idx()]
    }
}
