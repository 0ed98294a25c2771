//! # Kernel API
//!
//! Application-facing entry points. These validate raw ITRON arguments,
//! translate them into the internal priority space and forward them to a
//! [`Scheduler`]. The scheduler is passed in explicitly; there is no global
//! instance.
//!
//! ## Rotate-priority request
//!
//! ```text
//! rot_rdq(sched, tskpri)
//!   ├─► priority::to_internal(tskpri)   ← reject out of range, no state change
//!   └─► sched.rotate_priority(p)
//!         ├─► disable dispatching
//!         ├─► p == running priority ? self-yield : rotate_ready_queue(p)
//!         └─► enable dispatching        ← dispatcher may switch threads
//! ```

use crate::arch::Port;
use crate::error::{self, Er, Result};
use crate::priority::{self, Priority};
use crate::scheduler::Scheduler;
use crate::thread::ThreadId;

/// Rotate the ready queue of the priority named by `tskpri` (ITRON
/// numbering, `[MIN_PRIORITY, MAX_PRIORITY]`).
///
/// If `tskpri` is the running thread's priority the running thread yields
/// to the next thread of that priority; otherwise the head of that level
/// moves to its tail and the running thread is unaffected.
///
/// # Errors
/// `InvalidPriority` if `tskpri` is out of range. Nothing is modified.
///
/// # Example
/// ```ignore
/// kernel::rot_rdq(&mut sched, 5)?;
/// ```
pub fn rot_rdq<P: Port>(sched: &mut Scheduler<P>, tskpri: i32) -> Result<()> {
    let priority = priority::to_internal(tskpri).map_err(|e| {
        log::warn!("rot_rdq: rejected priority {}", tskpri);
        e
    })?;
    log::trace!("rot_rdq({}) -> level {}", tskpri, priority.index());
    sched.rotate_priority(priority);
    Ok(())
}

/// [`rot_rdq`] returning the ITRON status code (`E_OK` or `E_PAR`).
pub fn rot_rdq_er<P: Port>(sched: &mut Scheduler<P>, tskpri: i32) -> Er {
    error::to_er(rot_rdq(sched, tskpri))
}

/// Attach a thread at ITRON priority `tskpri` and make it ready.
///
/// # Errors
/// `InvalidPriority` for an out-of-range priority, `TooManyThreads` when
/// the descriptor table is full.
pub fn start_thread<P: Port>(sched: &mut Scheduler<P>, tskpri: i32) -> Result<ThreadId> {
    let priority = priority::to_internal(tskpri)?;
    let id = sched.attach_thread(priority)?;
    sched.make_ready(id)?;
    Ok(id)
}

/// ITRON priority of `id`, or `None` if it is not attached.
pub fn thread_priority<P: Port>(sched: &Scheduler<P>, id: ThreadId) -> Option<i32> {
    sched
        .thread(id)
        .map(|tcb| priority::to_external(tcb.priority))
}

/// Change the priority of `id` to ITRON priority `tskpri`.
pub fn change_priority<P: Port>(sched: &mut Scheduler<P>, id: ThreadId, tskpri: i32) -> Result<()> {
    let priority: Priority = priority::to_internal(tskpri)?;
    sched.change_priority(id, priority)
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
