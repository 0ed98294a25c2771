//! # Cortex-M4 Port Layer
//!
//! Hardware-specific primitives for the ARM Cortex-M4 (Thumb-2) processor:
//! PRIMASK-based interrupt masking for the dispatch-disable counter, and
//! PendSV-based deferred context switching for the dispatcher hook.
//!
//! ## Context Switch Mechanism
//!
//! The dispatcher hook does not switch stacks itself. It records the
//! outgoing and incoming threads and pends PendSV; the PendSV handler
//! (owned by the firmware, which also owns the thread stacks) performs the
//! register save/restore once no other ISR is active.
//!
//! ## Interrupt Priorities
//!
//! - PendSV: `PENDSV_PRIORITY` (lowest) — runs only when no other ISR is
//!   active, so a switch never preempts an application handler.

use cortex_m::interrupt;
use cortex_m::register::primask;

use super::Port;
use crate::config::PENDSV_PRIORITY;
use crate::thread::ThreadId;

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// Trigger a PendSV exception to perform a context switch.
///
/// Sets the PENDSVSET bit in the Interrupt Control and State Register (ICSR).
#[inline]
pub fn trigger_pendsv() {
    // ICSR address: 0xE000_ED04, PENDSVSET = bit 28
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

// ---------------------------------------------------------------------------
// Interrupt priority configuration
// ---------------------------------------------------------------------------

/// Set PendSV to the lowest interrupt priority.
pub fn set_interrupt_priorities() {
    unsafe {
        // System Handler Priority Register 3 (SHPR3): 0xE000_ED20
        // Bits [23:16] = PendSV priority
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        let val = (val & !(0xFF << 16)) | ((PENDSV_PRIORITY as u32) << 16);
        core::ptr::write_volatile(shpr3, val);
    }
}

// ---------------------------------------------------------------------------
// Port implementation
// ---------------------------------------------------------------------------

/// Cortex-M4 implementation of [`Port`].
pub struct CortexM4Port {
    /// Switch requested by the dispatcher and not yet taken by PendSV.
    pending: Option<(Option<ThreadId>, Option<ThreadId>)>,
}

impl CortexM4Port {
    /// Create the port and program the PendSV priority.
    pub fn new() -> Self {
        set_interrupt_priorities();
        Self { pending: None }
    }

    /// Take the switch the PendSV handler should perform, if any.
    /// Call with interrupts masked (from PendSV or inside `interrupt::free`).
    pub fn take_pending(&mut self) -> Option<(Option<ThreadId>, Option<ThreadId>)> {
        self.pending.take()
    }
}

impl Port for CortexM4Port {
    #[inline]
    fn disable_interrupts(&self) -> bool {
        let was_enabled = primask::read().is_inactive();
        interrupt::disable();
        was_enabled
    }

    #[inline]
    fn restore_interrupts(&self, was_enabled: bool) {
        if was_enabled {
            // Safety: only re-enables what `disable_interrupts` masked.
            unsafe { interrupt::enable() }
        }
    }

    fn context_switch(&mut self, from: Option<ThreadId>, to: Option<ThreadId>) {
        self.pending = Some((from, to));
        trigger_pendsv();
    }
}
