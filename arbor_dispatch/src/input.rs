// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Normalized platform input.
//!
//! The engine does not speak any platform's raw wire format. The host's
//! windowing layer normalizes whatever it receives into [`RawInput`] values
//! and feeds them to the manager's `translate`, which performs hit testing
//! and synthesizes the derived event stream (enter/leave, click, drag).
//!
//! Every input carries a millisecond timestamp from the platform's clock
//! and the identity of the window it arrived in; translation uses the
//! timestamps for coalescing windows and the window identity for
//! window-level enter/leave synthesis, so neither needs a wall clock of its
//! own.

use kurbo::{Point, Vec2};

use arbor_event::Modifiers;

/// Identity of a host window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Window-lifecycle change delivered by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowChange {
    /// The window gained input focus.
    FocusGained,
    /// The window lost input focus.
    FocusLost,
    /// The window was resized to the given dimensions.
    Resized {
        /// New width in logical pixels.
        width: f64,
        /// New height in logical pixels.
        height: f64,
    },
    /// The user asked to close the window.
    CloseRequested,
}

/// Payload of one normalized input occurrence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputKind {
    /// A pointer button went down or up.
    Button {
        /// True for press, false for release.
        pressed: bool,
        /// Device button id.
        button: u8,
        /// Platform-supplied click count (1 = single, 2 = double, ...).
        click_count: u8,
        /// Pointer position in world space.
        position: Point,
    },
    /// The pointer moved.
    Motion {
        /// Pointer position in world space.
        position: Point,
    },
    /// The scroll wheel moved.
    Wheel {
        /// Scroll delta.
        delta: Vec2,
        /// Pointer position in world space.
        position: Point,
    },
    /// A key went down or up.
    Key {
        /// True for press, false for release.
        pressed: bool,
        /// Platform key code.
        code: u32,
        /// Modifier state at the time of the event.
        modifiers: Modifiers,
    },
    /// A window-lifecycle change.
    Window(WindowChange),
}

/// One normalized input occurrence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawInput {
    /// Milliseconds on the platform's monotonic clock.
    pub timestamp_ms: u64,
    /// Window the input arrived in.
    pub window: WindowId,
    /// What happened.
    pub kind: InputKind,
}

impl RawInput {
    /// Pointer button press.
    pub fn button_down(
        timestamp_ms: u64,
        window: WindowId,
        button: u8,
        click_count: u8,
        position: Point,
    ) -> Self {
        Self {
            timestamp_ms,
            window,
            kind: InputKind::Button {
                pressed: true,
                button,
                click_count,
                position,
            },
        }
    }

    /// Pointer button release.
    pub fn button_up(
        timestamp_ms: u64,
        window: WindowId,
        button: u8,
        click_count: u8,
        position: Point,
    ) -> Self {
        Self {
            timestamp_ms,
            window,
            kind: InputKind::Button {
                pressed: false,
                button,
                click_count,
                position,
            },
        }
    }

    /// Pointer motion.
    pub fn motion(timestamp_ms: u64, window: WindowId, position: Point) -> Self {
        Self {
            timestamp_ms,
            window,
            kind: InputKind::Motion { position },
        }
    }

    /// Wheel scroll.
    pub fn wheel(timestamp_ms: u64, window: WindowId, delta: Vec2, position: Point) -> Self {
        Self {
            timestamp_ms,
            window,
            kind: InputKind::Wheel { delta, position },
        }
    }

    /// Key press or release.
    pub fn key(
        timestamp_ms: u64,
        window: WindowId,
        pressed: bool,
        code: u32,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            timestamp_ms,
            window,
            kind: InputKind::Key {
                pressed,
                code,
                modifiers,
            },
        }
    }

    /// Window-lifecycle change.
    pub fn window(timestamp_ms: u64, window: WindowId, change: WindowChange) -> Self {
        Self {
            timestamp_ms,
            window,
            kind: InputKind::Window(change),
        }
    }
}
