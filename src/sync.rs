//! # Synchronization Primitives
//!
//! Two layers protect the ready-queue store:
//!
//! - [`critical_section`]: interrupts masked through the [`Port`] for the
//!   few instructions that touch the dispatch-disable counter and the
//!   pending ISR work.
//! - [`DispatchGuard`]: the nestable "dispatching disabled" section. While
//!   any guard is alive no context switch happens, although interrupts are
//!   still taken. Dropping the outermost guard applies deferred ISR work and
//!   lets the dispatcher run.
//!
//! ```text
//!   free ──disable_dispatch()──► held(1) ──► held(2) ... held(2) ──► held(1) ──drop──► free
//!                                                                               │
//!                                                                        dispatcher hook
//! ```

use core::ops::{Deref, DerefMut};

use crate::arch::Port;
use crate::scheduler::Scheduler;

/// Execute a closure with interrupts masked, restoring the previous mask
/// state on exit.
///
/// # Usage
/// ```ignore
/// sync::critical_section(&port, || {
///     // touch state shared with interrupt handlers
/// });
/// ```
///
/// Keep these as short as possible; they add directly to interrupt latency.
#[inline]
pub fn critical_section<P, F, R>(port: &P, f: F) -> R
where
    P: Port + ?Sized,
    F: FnOnce() -> R,
{
    let was_enabled = port.disable_interrupts();
    let r = f();
    port.restore_interrupts(was_enabled);
    r
}

/// Scoped dispatch-disable section over a [`Scheduler`].
///
/// Created by [`Scheduler::disable_dispatch`]. Dereferences to the
/// scheduler, so everything done through the guard runs with dispatching
/// disabled, including nested `disable_dispatch()` calls. Release happens
/// on drop, on every exit path.
#[must_use = "dispatching is re-enabled as soon as the guard is dropped"]
pub struct DispatchGuard<'a, P: Port> {
    sched: &'a mut Scheduler<P>,
}

impl<'a, P: Port> DispatchGuard<'a, P> {
    pub(crate) fn new(sched: &'a mut Scheduler<P>) -> Self {
        sched.enter_dispatch_disabled();
        Self { sched }
    }
}

impl<P: Port> Deref for DispatchGuard<'_, P> {
    type Target = Scheduler<P>;

    fn deref(&self) -> &Scheduler<P> {
        self.sched
    }
}

impl<P: Port> DerefMut for DispatchGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut Scheduler<P> {
        self.sched
    }
}

impl<P: Port> Drop for DispatchGuard<'_, P> {
    fn drop(&mut self) {
        self.sched.leave_dispatch_disabled();
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
