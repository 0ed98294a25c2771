//! # Host Simulation Port
//!
//! Runs the scheduling core off-target. Interrupt masking is simulated with
//! a flag, and context switches are recorded instead of performed, so the
//! effect of a rotation can be observed through the dispatcher hook.

use core::cell::Cell;

use super::Port;
use crate::thread::ThreadId;

/// A recorded dispatcher call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub from: Option<ThreadId>,
    pub to: Option<ThreadId>,
}

/// Simulation port for host builds and tests.
#[derive(Debug)]
pub struct HostPort {
    interrupts_enabled: Cell<bool>,
    mask_depth: Cell<u32>,
    max_mask_depth: Cell<u32>,
    switches: u32,
    last_switch: Option<Switch>,
    switched_while_masked: bool,
}

impl HostPort {
    /// A port with interrupts enabled and no recorded switches.
    pub const fn new() -> Self {
        Self {
            interrupts_enabled: Cell::new(true),
            mask_depth: Cell::new(0),
            max_mask_depth: Cell::new(0),
            switches: 0,
            last_switch: None,
            switched_while_masked: false,
        }
    }

    /// Number of dispatcher calls so far.
    pub fn switches(&self) -> u32 {
        self.switches
    }

    /// Most recent dispatcher call.
    pub fn last_switch(&self) -> Option<Switch> {
        self.last_switch
    }

    /// Whether interrupts are currently enabled.
    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled.get()
    }

    /// Deepest interrupt-mask nesting observed.
    pub fn max_mask_depth(&self) -> u32 {
        self.max_mask_depth.get()
    }

    /// Whether the dispatcher was ever entered with interrupts masked.
    pub fn switched_while_masked(&self) -> bool {
        self.switched_while_masked
    }
}

impl Default for HostPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for HostPort {
    fn disable_interrupts(&self) -> bool {
        let was_enabled = self.interrupts_enabled.replace(false);
        let depth = self.mask_depth.get() + 1;
        self.mask_depth.set(depth);
        self.max_mask_depth.set(self.max_mask_depth.get().max(depth));
        was_enabled
    }

    fn restore_interrupts(&self, was_enabled: bool) {
        self.mask_depth.set(self.mask_depth.get().saturating_sub(1));
        if was_enabled {
            self.interrupts_enabled.set(true);
        }
    }

    fn context_switch(&mut self, from: Option<ThreadId>, to: Option<ThreadId>) {
        if !self.interrupts_enabled.get() {
            self.switched_while_masked = true;
        }
        self.switches += 1;
        self.last_switch = Some(Switch { from, to });
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
