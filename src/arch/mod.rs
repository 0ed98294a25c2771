//! # Architecture Abstraction Layer
//!
//! Provides the hardware boundary for the scheduling core: the interrupt
//! mask pair that protects the dispatch-disable counter, and the dispatcher
//! hook that performs the actual context switch. Currently implements the
//! Cortex-M4 port plus a host simulation port; extensible to other
//! architectures by adding sibling modules.

use crate::thread::ThreadId;

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(not(target_arch = "arm"))]
pub mod host;

/// Platform primitives consumed by the scheduler.
pub trait Port {
    /// Mask interrupts. Returns whether they were enabled before, to be
    /// handed back to [`Port::restore_interrupts`].
    fn disable_interrupts(&self) -> bool;

    /// Undo a matching [`Port::disable_interrupts`].
    fn restore_interrupts(&self, was_enabled: bool);

    /// Dispatcher hook. Called once dispatching is re-enabled and the
    /// thread selected to run differs from the one in the running slot.
    /// `to` is `None` when no thread is ready.
    fn context_switch(&mut self, from: Option<ThreadId>, to: Option<ThreadId>);
}
