//! # Scheduler
//!
//! The scheduling context: thread table, ready-queue store, running slot
//! and the dispatch-disable counter, owned by one [`Scheduler`] value that
//! is passed by reference to every operation. Independent instances do not
//! share state.
//!
//! ## Rotation
//!
//! - **Self-yield** ([`Scheduler::yield_processor`]): the running thread
//!   moves to the tail of its own priority's queue; the new head becomes
//!   the selected thread and is switched in when dispatching is re-enabled.
//! - **Explicit rotate** ([`Scheduler::rotate_ready_queue`]): the head of an
//!   arbitrary level moves to its tail. A level other than the running
//!   thread's cannot hold the selected thread, so nothing is switched.
//! - [`Scheduler::rotate_priority`] picks between the two: a request naming
//!   the running thread's own priority is a self-yield.
//!
//! ## Dispatching
//!
//! Every mutation runs under a [`DispatchGuard`]. When the outermost guard
//! drops, deferred interrupt work is applied, the head of the most urgent
//! non-empty queue is selected, and if it differs from the running slot the
//! port's dispatcher hook is called.
//!
//! ## Invariants (whenever no guard is held)
//!
//! 1. At most one thread is `Running`; it occupies the running slot, and
//!    the slot is empty only when no thread is queued.
//! 2. The running thread is the head of its own queue.
//! 3. That queue is the most urgent non-empty one.
//! 4. Every `Ready`/`Running` thread is queued exactly once, at its own
//!    priority; `Blocked` threads are not queued.

use crate::arch::Port;
use crate::config::MAX_THREADS;
use crate::error::{fatal, OrFatal, Result, SchedError, Violation};
use crate::priority::Priority;
use crate::ready_queue::ReadyQueues;
use crate::sync::{critical_section, DispatchGuard};
use crate::thread::{ThreadControlBlock, ThreadId, ThreadState};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The scheduling context.
pub struct Scheduler<P: Port> {
    port: P,

    /// Fixed-size descriptor table; `active` marks allocated slots.
    threads: [ThreadControlBlock; MAX_THREADS],

    ready: ReadyQueues,

    /// Running slot.
    executing: Option<ThreadId>,

    /// Dispatch-disable nesting counter. Only touched with interrupts
    /// masked.
    disable_level: u32,

    /// Set when something happened that may change the selected thread.
    dispatch_necessary: bool,

    /// Wakeups requested from interrupt context while dispatching was
    /// disabled, one bit per `ThreadId`.
    pending_ready: u32,

    /// Number of dispatcher calls.
    context_switches: u32,
}

impl<P: Port> Scheduler<P> {
    /// Create an empty scheduler on top of `port`.
    pub const fn new(port: P) -> Self {
        Self {
            port,
            threads: [ThreadControlBlock::EMPTY; MAX_THREADS],
            ready: ReadyQueues::new(),
            executing: None,
            disable_level: 0,
            dispatch_necessary: false,
            pending_ready: 0,
            context_switches: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch-disable section
    // -----------------------------------------------------------------------

    /// Disable dispatching until the returned guard is dropped. Nests.
    pub fn disable_dispatch(&mut self) -> DispatchGuard<'_, P> {
        DispatchGuard::new(self)
    }

    pub(crate) fn enter_dispatch_disabled(&mut self) {
        let level = critical_section(&self.port, || {
            self.disable_level += 1;
            self.disable_level
        });
        log::trace!("dispatch disabled (level {})", level);
    }

    pub(crate) fn leave_dispatch_disabled(&mut self) {
        let outermost = critical_section(&self.port, || match self.disable_level {
            0 => None,
            1 => Some(true),
            _ => {
                self.disable_level -= 1;
                Some(false)
            }
        });

        match outermost {
            None => fatal(SchedError::InvariantViolation(Violation::StateMismatch)),
            Some(false) => return,
            Some(true) => {}
        }

        // Still at level 1: nothing else may dispatch while the heir is chosen.
        self.apply_deferred_wakeups();
        let switch = self.select_heir();

        critical_section(&self.port, || {
            self.disable_level = 0;
            self.dispatch_necessary = false;
        });
        log::trace!("dispatch enabled");

        if let Some((from, to)) = switch {
            self.port.context_switch(from, to);
        }
    }

    /// Enqueue threads woken from interrupt context while dispatching was
    /// disabled.
    fn apply_deferred_wakeups(&mut self) {
        let pending = critical_section(&self.port, || core::mem::take(&mut self.pending_ready));
        if pending == 0 {
            return;
        }

        for index in 0..MAX_THREADS {
            if pending & (1 << index) == 0 {
                continue;
            }
            let Some(id) = ThreadId::new(index) else {
                continue;
            };
            let tcb = self.threads[index];
            if !tcb.active || tcb.state != ThreadState::Blocked {
                log::debug!("deferred wakeup of T{} dropped: not blocked", index);
                continue;
            }
            if let Err(e) = self.ready.enqueue_tail(tcb.priority, id) {
                fatal(e);
            }
            self.threads[index].state = ThreadState::Ready;
            log::debug!("deferred wakeup of T{} applied", index);
        }
    }

    /// Point the running slot at the head of the most urgent queue. Returns
    /// the switch to perform, if the slot changed.
    fn select_heir(&mut self) -> Option<(Option<ThreadId>, Option<ThreadId>)> {
        let heir = self.ready.highest();
        let current = self.executing;

        if heir == current {
            if let Some(h) = heir {
                // Blocked and readied again inside one section.
                self.threads[h.index()].state = ThreadState::Running;
            }
            return None;
        }

        if let Some(c) = current {
            let tcb = &mut self.threads[c.index()];
            if tcb.state == ThreadState::Running {
                tcb.state = ThreadState::Ready;
            }
        }
        if let Some(h) = heir {
            let tcb = &mut self.threads[h.index()];
            tcb.state = ThreadState::Running;
            tcb.record_dispatch();
        }

        self.executing = heir;
        self.context_switches = self.context_switches.wrapping_add(1);
        log::debug!(
            "dispatch: {:?} -> {:?}",
            current.map(ThreadId::index),
            heir.map(ThreadId::index)
        );
        Some((current, heir))
    }

    // -----------------------------------------------------------------------
    // Rotation
    // -----------------------------------------------------------------------

    /// Rotate the ready queue at `priority`: a self-yield if it is the
    /// running thread's priority, an explicit rotate otherwise.
    ///
    /// A running thread already blocked earlier in the caller's section is
    /// no longer in the queue; the remaining threads of that level are then
    /// rotated explicitly.
    ///
    /// # Panics
    /// Halts through [`fatal`] under the same conditions as
    /// [`yield_processor`](Self::yield_processor).
    pub fn rotate_priority(&mut self, priority: Priority) {
        let mut guard = self.disable_dispatch();
        let outermost = guard.disable_level == 1;
        let running_priority = guard
            .executing
            .map(|r| guard.threads[r.index()].priority);

        if running_priority == Some(priority) && guard.yield_running(outermost) {
            return;
        }
        guard.rotate_ready_queue(priority);
    }

    /// Give up the processor to the next thread of the running thread's
    /// priority. A no-op when the running thread is alone at its level.
    ///
    /// Inside an enclosing dispatch-disabled section earlier work may
    /// already have moved the running thread off the head of its queue; it
    /// is then moved behind its peers from wherever it is.
    ///
    /// # Panics
    /// Halts through [`fatal`] if, with no enclosing section, the running
    /// thread is not queued or not the head of its own queue.
    pub fn yield_processor(&mut self) {
        let mut guard = self.disable_dispatch();
        let outermost = guard.disable_level == 1;
        guard.yield_running(outermost);
    }

    /// Move the running thread behind its peers. `outermost` is whether the
    /// caller's guard is the only one held, in which case the running
    /// thread must be the head of its queue. Returns `false` if there is no
    /// running thread or it is not queued any more.
    fn yield_running(&mut self, outermost: bool) -> bool {
        let Some(running) = self.executing else {
            return false;
        };
        let Some(priority) = self.ready.queued_priority(running) else {
            if outermost {
                fatal(SchedError::InvariantViolation(Violation::RunningNotQueued));
            }
            // Blocked earlier in this section
            return false;
        };

        if self.ready.head(priority) == Some(running) {
            if !self.ready.rotate(priority) {
                return true;
            }
        } else if outermost {
            fatal(SchedError::InvariantViolation(Violation::RunningNotHead));
        } else {
            if let Err(e) = self.ready.remove(running) {
                fatal(e);
            }
            if let Err(e) = self.ready.enqueue_tail(priority, running) {
                fatal(e);
            }
        }

        self.threads[running.index()].record_yield();
        self.dispatch_necessary = true;
        log::trace!("T{} yields at level {}", running.index(), priority.index());
        true
    }

    /// Move the head of the queue at `priority` to its tail, whichever
    /// thread is running. Fewer than two entries: no-op.
    pub fn rotate_ready_queue(&mut self, priority: Priority) {
        let mut guard = self.disable_dispatch();
        if guard.ready.rotate(priority) && guard.ready.highest_priority() == Some(priority) {
            guard.dispatch_necessary = true;
        }
    }

    // -----------------------------------------------------------------------
    // Thread lifecycle
    // -----------------------------------------------------------------------

    /// Attach a descriptor for a new thread at `priority`. The thread
    /// starts `Blocked`.
    ///
    /// # Errors
    /// `TooManyThreads` if every slot is in use.
    pub fn attach_thread(&mut self, priority: Priority) -> Result<ThreadId> {
        let mut guard = self.disable_dispatch();
        let index = guard
            .threads
            .iter()
            .position(|t| !t.active)
            .ok_or(SchedError::TooManyThreads)?;
        let id = ThreadId::new(index).ok_or(SchedError::TooManyThreads)?;
        guard.threads[index].init(id, priority);
        log::debug!("attach T{} at level {}", index, priority.index());
        Ok(id)
    }

    /// Release a descriptor. A queued thread is blocked first.
    pub fn detach_thread(&mut self, id: ThreadId) -> Result<()> {
        let mut guard = self.disable_dispatch();
        guard.check_attached(id)?;
        if guard.threads[id.index()].state.is_queued() {
            guard.block(id)?;
        }
        guard.pending_ready &= !id.bit();
        guard.threads[id.index()] = ThreadControlBlock::EMPTY;
        log::debug!("detach T{}", id.index());
        Ok(())
    }

    /// Thread-becomes-ready event: append `id` to its priority's queue.
    ///
    /// # Panics
    /// Halts through [`fatal`] if `id` is already queued.
    pub fn make_ready(&mut self, id: ThreadId) -> Result<()> {
        let mut guard = self.disable_dispatch();
        guard.check_attached(id)?;
        let priority = guard.threads[id.index()].priority;
        guard.ready.enqueue_tail(priority, id).or_fatal()?;
        guard.threads[id.index()].state = ThreadState::Ready;
        guard.dispatch_necessary = true;
        Ok(())
    }

    /// Thread-becomes-blocked event: unlink `id` from its queue.
    ///
    /// # Panics
    /// Halts through [`fatal`] if `id` is not queued.
    pub fn block(&mut self, id: ThreadId) -> Result<()> {
        let mut guard = self.disable_dispatch();
        guard.check_attached(id)?;
        guard.ready.remove(id).or_fatal()?;
        guard.threads[id.index()].state = ThreadState::Blocked;
        guard.dispatch_necessary = true;
        Ok(())
    }

    /// Wake `id` from interrupt context. With dispatching disabled the
    /// queues are left alone and the wakeup is applied when the outermost
    /// guard drops.
    pub fn isr_make_ready(&mut self, id: ThreadId) -> Result<()> {
        self.check_attached(id)?;
        let deferred = critical_section(&self.port, || {
            if self.disable_level == 0 {
                return false;
            }
            self.pending_ready |= id.bit();
            self.dispatch_necessary = true;
            true
        });

        if deferred {
            log::trace!("wakeup of T{} deferred", id.index());
            return Ok(());
        }
        if self.threads[id.index()].state != ThreadState::Blocked {
            return Ok(());
        }
        self.make_ready(id)
    }

    /// Change the priority of `id`. A queued thread moves to the tail of
    /// its new level.
    pub fn change_priority(&mut self, id: ThreadId, priority: Priority) -> Result<()> {
        let mut guard = self.disable_dispatch();
        guard.check_attached(id)?;
        if guard.threads[id.index()].priority == priority {
            return Ok(());
        }

        if guard.threads[id.index()].state.is_queued() {
            guard.ready.remove(id).or_fatal()?;
            guard.threads[id.index()].priority = priority;
            guard.ready.enqueue_tail(priority, id).or_fatal()?;
            guard.dispatch_necessary = true;
        } else {
            guard.threads[id.index()].priority = priority;
        }
        log::debug!("T{} moved to level {}", id.index(), priority.index());
        Ok(())
    }

    fn check_attached(&self, id: ThreadId) -> Result<()> {
        if self.threads[id.index()].active {
            Ok(())
        } else {
            Err(SchedError::NoSuchThread)
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Thread in the running slot.
    #[inline]
    pub fn running_thread(&self) -> Option<ThreadId> {
        self.executing
    }

    /// Descriptor of an attached thread.
    pub fn thread(&self, id: ThreadId) -> Option<&ThreadControlBlock> {
        let tcb = &self.threads[id.index()];
        tcb.active.then_some(tcb)
    }

    /// Read access to the ready-queue store.
    #[inline]
    pub fn ready_queues(&self) -> &ReadyQueues {
        &self.ready
    }

    /// Current dispatch-disable nesting depth (`0` = free).
    #[inline]
    pub fn dispatch_disable_level(&self) -> u32 {
        self.disable_level
    }

    /// Whether a dispatch re-evaluation is pending for the current section.
    #[inline]
    pub fn dispatch_necessary(&self) -> bool {
        self.dispatch_necessary
    }

    /// Number of dispatcher calls so far.
    #[inline]
    pub fn context_switches(&self) -> u32 {
        self.context_switches
    }

    /// The platform port.
    #[inline]
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutable access to the platform port.
    #[inline]
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Check the structural invariants listed in the module docs. Only
    /// meaningful with no guard held.
    pub fn check_invariants(&self) -> Result<()> {
        let broken = |v| Err(SchedError::InvariantViolation(v));

        self.ready.verify()?;

        let mut running = 0;
        for (index, tcb) in self.threads.iter().enumerate() {
            let Some(id) = ThreadId::new(index) else {
                continue;
            };
            let queued_at = self.ready.queued_priority(id);
            if !tcb.active {
                if queued_at.is_some() {
                    return broken(Violation::StateMismatch);
                }
                continue;
            }
            if tcb.state.is_queued() != queued_at.is_some() {
                return broken(Violation::StateMismatch);
            }
            if queued_at.is_some() && queued_at != Some(tcb.priority) {
                return broken(Violation::StateMismatch);
            }
            if tcb.state == ThreadState::Running {
                running += 1;
                if self.executing != Some(id) {
                    return broken(Violation::StateMismatch);
                }
            } else if tcb.is_runnable() && self.executing == Some(id) {
                return broken(Violation::StateMismatch);
            }
        }

        match self.executing {
            None => {
                if running != 0 || !self.ready.is_empty() {
                    return broken(Violation::RunningNotQueued);
                }
            }
            Some(r) => {
                let priority = self.threads[r.index()].priority;
                if running != 1 {
                    return broken(Violation::StateMismatch);
                }
                if !self.ready.is_queued(r) {
                    return broken(Violation::RunningNotQueued);
                }
                if self.ready.head(priority) != Some(r) {
                    return broken(Violation::RunningNotHead);
                }
                if self
                    .ready
                    .highest_priority()
                    .is_some_and(|top| top.is_more_urgent_than(priority))
                {
                    return broken(Violation::RunningNotHighest);
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::host::{HostPort, Switch};

    fn p(i: usize) -> Priority {
        Priority::new(i).unwrap()
    }

    fn spawn(sched: &mut Scheduler<HostPort>, prio: Priority) -> ThreadId {
        let id = sched.attach_thread(prio).unwrap();
        sched.make_ready(id).unwrap();
        id
    }

    fn order(sched: &Scheduler<HostPort>, prio: Priority) -> Vec<ThreadId> {
        sched.ready_queues().iter(prio).collect()
    }

    #[test]
    fn test_first_ready_thread_is_dispatched() {
        let mut sched = Scheduler::new(HostPort::new());
        assert_eq!(sched.running_thread(), None);

        let t0 = spawn(&mut sched, p(4));
        assert_eq!(sched.running_thread(), Some(t0));
        assert_eq!(sched.thread(t0).unwrap().state, ThreadState::Running);
        assert_eq!(sched.port().switches(), 1);
        assert_eq!(sched.port().last_switch(), Some(Switch { from: None, to: Some(t0) }));
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_more_urgent_thread_preempts() {
        let mut sched = Scheduler::new(HostPort::new());
        let low = spawn(&mut sched, p(9));
        let high = spawn(&mut sched, p(2));

        assert_eq!(sched.running_thread(), Some(high));
        assert_eq!(sched.thread(low).unwrap().state, ThreadState::Ready);
        assert_eq!(sched.context_switches(), 2);
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_self_yield_rotates_running_level() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(3));
        let t1 = spawn(&mut sched, p(3));
        let t2 = spawn(&mut sched, p(3));
        assert_eq!(sched.running_thread(), Some(t0));

        sched.yield_processor();
        assert_eq!(order(&sched, p(3)), [t1, t2, t0]);
        assert_eq!(sched.running_thread(), Some(t1));
        assert_eq!(sched.thread(t0).unwrap().yields, 1);
        assert_eq!(sched.thread(t0).unwrap().state, ThreadState::Ready);
        assert_eq!(sched.port().last_switch(), Some(Switch { from: Some(t0), to: Some(t1) }));
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_yield_alone_is_noop() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(3));
        let switches = sched.port().switches();

        sched.yield_processor();
        assert_eq!(sched.running_thread(), Some(t0));
        assert_eq!(sched.port().switches(), switches);
        assert_eq!(sched.thread(t0).unwrap().yields, 0);
    }

    #[test]
    fn test_explicit_rotate_leaves_running_thread() {
        let mut sched = Scheduler::new(HostPort::new());
        let run = spawn(&mut sched, p(4));
        let a = spawn(&mut sched, p(8));
        let b = spawn(&mut sched, p(8));
        let c = spawn(&mut sched, p(8));
        let switches = sched.port().switches();

        sched.rotate_priority(p(8));
        assert_eq!(order(&sched, p(8)), [b, c, a]);
        assert_eq!(sched.running_thread(), Some(run));
        assert_eq!(sched.port().switches(), switches);
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_rotate_priority_self_yield_branch() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(0));
        let t1 = spawn(&mut sched, p(0));

        sched.rotate_priority(p(0));
        assert_eq!(sched.running_thread(), Some(t1));
        assert_eq!(sched.thread(t0).unwrap().yields, 1);
        sched.rotate_priority(p(0));
        assert_eq!(sched.running_thread(), Some(t0));
    }

    #[test]
    fn test_block_running_thread_dispatches_next() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(1));
        let t1 = spawn(&mut sched, p(5));

        sched.block(t0).unwrap();
        assert_eq!(sched.running_thread(), Some(t1));
        assert_eq!(sched.thread(t0).unwrap().state, ThreadState::Blocked);
        sched.check_invariants().unwrap();

        sched.block(t1).unwrap();
        assert_eq!(sched.running_thread(), None);
        assert_eq!(sched.port().last_switch(), Some(Switch { from: Some(t1), to: None }));
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_block_and_ready_in_one_section() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(1));
        let switches = sched.port().switches();
        {
            let mut guard = sched.disable_dispatch();
            guard.block(t0).unwrap();
            guard.make_ready(t0).unwrap();
        }
        assert_eq!(sched.running_thread(), Some(t0));
        assert_eq!(sched.thread(t0).unwrap().state, ThreadState::Running);
        assert_eq!(sched.port().switches(), switches);
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_no_switch_until_outermost_release() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(2));
        let t1 = spawn(&mut sched, p(2));
        let switches = sched.port().switches();
        {
            let mut outer = sched.disable_dispatch();
            {
                let mut inner = outer.disable_dispatch();
                inner.yield_processor();
            }
            assert_eq!(outer.port().switches(), switches);
            assert_eq!(outer.running_thread(), Some(t0));
            assert!(outer.dispatch_necessary());
        }
        assert_eq!(sched.running_thread(), Some(t1));
        assert_eq!(sched.port().switches(), switches + 1);
        assert!(!sched.dispatch_necessary());
        assert!(!sched.port().switched_while_masked());
    }

    #[test]
    fn test_repeated_yield_in_one_section() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(2));
        let t1 = spawn(&mut sched, p(2));
        let t2 = spawn(&mut sched, p(2));
        {
            let mut guard = sched.disable_dispatch();
            guard.yield_processor();
            // t0 is no longer the head, but is still the running thread
            guard.yield_processor();
            assert_eq!(guard.ready_queues().iter(p(2)).collect::<Vec<_>>(), [t1, t2, t0]);
        }
        assert_eq!(sched.running_thread(), Some(t1));
        assert_eq!(sched.thread(t0).unwrap().yields, 2);
        sched.check_invariants().unwrap();
    }

    #[test]
    #[should_panic(expected = "fatal scheduler error")]
    fn test_yield_with_running_thread_off_head_is_fatal() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(2));
        spawn(&mut sched, p(2));
        // Corrupt the order behind the scheduler's back
        sched.ready.rotate(p(2));
        assert_eq!(sched.running_thread(), Some(t0));
        sched.yield_processor();
    }

    #[test]
    #[should_panic(expected = "fatal scheduler error")]
    fn test_rot_rdq_with_running_thread_off_head_is_fatal() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(2));
        spawn(&mut sched, p(2));
        spawn(&mut sched, p(2));
        sched.ready.rotate(p(2));
        assert_eq!(sched.running_thread(), Some(t0));
        let _ = crate::kernel::rot_rdq(&mut sched, 3);
    }

    #[test]
    #[should_panic(expected = "fatal scheduler error")]
    fn test_rotate_priority_with_running_thread_unqueued_is_fatal() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(2));
        spawn(&mut sched, p(2));
        sched.ready.remove(t0).unwrap();
        sched.rotate_priority(p(2));
    }

    #[test]
    fn test_rot_rdq_after_blocking_running_thread_in_section() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(2));
        let t1 = spawn(&mut sched, p(2));
        let t2 = spawn(&mut sched, p(2));
        {
            let mut guard = sched.disable_dispatch();
            guard.block(t0).unwrap();
            // Still in the running slot until the guard drops
            assert_eq!(guard.running_thread(), Some(t0));
            crate::kernel::rot_rdq(&mut *guard, 3).unwrap();
            assert_eq!(guard.ready_queues().iter(p(2)).collect::<Vec<_>>(), [t2, t1]);
            assert_eq!(guard.thread(t0).unwrap().yields, 0);
        }
        assert_eq!(sched.running_thread(), Some(t2));
        assert_eq!(sched.thread(t0).unwrap().state, ThreadState::Blocked);
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_check_invariants_detects_more_urgent_ready_thread() {
        let mut sched = Scheduler::new(HostPort::new());
        spawn(&mut sched, p(9));
        let high = sched.attach_thread(p(1)).unwrap();
        // Queue a more urgent thread without going through the dispatcher
        sched.ready.enqueue_tail(p(1), high).unwrap();
        sched.threads[high.index()].state = ThreadState::Ready;
        assert_eq!(
            sched.check_invariants(),
            Err(SchedError::InvariantViolation(Violation::RunningNotHighest))
        );
    }

    #[test]
    fn test_isr_wakeup_deferred_while_disabled() {
        let mut sched = Scheduler::new(HostPort::new());
        let low = spawn(&mut sched, p(10));
        let high = sched.attach_thread(p(1)).unwrap();
        {
            let mut guard = sched.disable_dispatch();
            guard.isr_make_ready(high).unwrap();
            assert!(!guard.ready_queues().is_queued(high));
            assert_eq!(guard.thread(high).unwrap().state, ThreadState::Blocked);
            assert_eq!(guard.running_thread(), Some(low));
        }
        assert_eq!(sched.running_thread(), Some(high));
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_isr_wakeup_immediate_when_enabled() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = sched.attach_thread(p(7)).unwrap();
        sched.isr_make_ready(t0).unwrap();
        assert_eq!(sched.running_thread(), Some(t0));

        // A second wakeup of a ready thread is ignored
        sched.isr_make_ready(t0).unwrap();
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_change_priority_requeues_at_tail() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(6));
        let t1 = spawn(&mut sched, p(3));
        let t2 = spawn(&mut sched, p(3));
        assert_eq!(sched.running_thread(), Some(t1));

        sched.change_priority(t0, p(3)).unwrap();
        assert_eq!(order(&sched, p(3)), [t1, t2, t0]);
        assert_eq!(sched.ready_queues().len(p(6)), 0);

        sched.change_priority(t2, p(0)).unwrap();
        assert_eq!(sched.running_thread(), Some(t2));
        sched.check_invariants().unwrap();
    }

    #[test]
    fn test_attach_detach_and_errors() {
        let mut sched = Scheduler::new(HostPort::new());
        let ids: Vec<ThreadId> = (0..MAX_THREADS)
            .map(|_| sched.attach_thread(p(20)).unwrap())
            .collect();
        assert_eq!(sched.attach_thread(p(20)), Err(SchedError::TooManyThreads));

        sched.make_ready(ids[0]).unwrap();
        sched.detach_thread(ids[0]).unwrap();
        assert!(sched.thread(ids[0]).is_none());
        assert_eq!(sched.running_thread(), None);
        assert_eq!(sched.make_ready(ids[0]), Err(SchedError::NoSuchThread));
        assert_eq!(sched.block(ids[0]), Err(SchedError::NoSuchThread));
        assert!(sched.attach_thread(p(20)).is_ok());
        sched.check_invariants().unwrap();
    }

    #[test]
    #[should_panic(expected = "fatal scheduler error")]
    fn test_double_ready_is_fatal() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = spawn(&mut sched, p(1));
        let _ = sched.make_ready(t0);
    }

    #[test]
    #[should_panic(expected = "fatal scheduler error")]
    fn test_block_of_blocked_thread_is_fatal() {
        let mut sched = Scheduler::new(HostPort::new());
        let t0 = sched.attach_thread(p(1)).unwrap();
        let _ = sched.block(t0);
    }
}
