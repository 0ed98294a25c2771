//! # Thread Control Block
//!
//! The scheduler's view of a thread: identity, current priority and
//! execution state. Queue links are kept by the ready-queue store, not here,
//! so the store can check membership without trusting descriptor state.

use crate::config::MAX_THREADS;
use crate::priority::Priority;

// ---------------------------------------------------------------------------
// Thread identity
// ---------------------------------------------------------------------------

/// Index of a descriptor in the scheduler's thread table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(u8);

impl ThreadId {
    /// Checked constructor; `None` outside the thread table.
    pub const fn new(index: usize) -> Option<Self> {
        if index < MAX_THREADS {
            Some(ThreadId(index as u8))
        } else {
            None
        }
    }

    /// Table index of this thread.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-bit mask for this thread, used by the pending-wakeup set.
    #[inline]
    pub(crate) const fn bit(self) -> u32 {
        1 << self.0
    }
}

// ---------------------------------------------------------------------------
// Thread state machine
// ---------------------------------------------------------------------------

/// Execution state of a thread.
///
/// ```text
///   ┌──────────┐      dispatch        ┌─────────┐
///   │  Ready   │ ───────────────────► │ Running │
///   └──────────┘ ◄─────────────────── └─────────┘
///        ▲          yield / preempt        │
///        │ make_ready                      │ block
///        │          ┌──────────┐           │
///        └───────── │ Blocked  │ ◄─────────┘
///                   └──────────┘
/// ```
///
/// `Ready` and `Running` threads are linked into exactly one ready queue;
/// `Blocked` threads are in none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Queued, waiting for the processor.
    Ready,
    /// Occupies the running slot (and the head of its queue).
    Running,
    /// Not eligible to run; not queued.
    Blocked,
}

impl ThreadState {
    /// Whether a thread in this state must be linked into a ready queue.
    #[inline]
    pub const fn is_queued(self) -> bool {
        matches!(self, ThreadState::Ready | ThreadState::Running)
    }
}

// ---------------------------------------------------------------------------
// Thread Control Block
// ---------------------------------------------------------------------------

/// Thread Control Block (TCB). Stored in a fixed table inside the
/// scheduler; `active` marks an allocated slot.
#[derive(Debug, Clone, Copy)]
pub struct ThreadControlBlock {
    /// Table index of this descriptor.
    pub id: ThreadId,

    /// Current priority. Changed only while dispatching is disabled.
    pub priority: Priority,

    /// Current execution state.
    pub state: ThreadState,

    /// Whether this slot holds an attached thread.
    pub active: bool,

    /// Number of times this thread gave up the processor through a
    /// self-yield.
    pub yields: u32,

    /// Number of times this thread was switched in.
    pub dispatches: u32,
}

impl ThreadControlBlock {
    /// An unallocated slot.
    pub const EMPTY: Self = Self {
        id: ThreadId(0),
        priority: Priority::LOWEST,
        state: ThreadState::Blocked,
        active: false,
        yields: 0,
        dispatches: 0,
    };

    /// Initialize a slot for a newly attached thread. New threads start
    /// `Blocked`; they join a ready queue through `make_ready`.
    pub fn init(&mut self, id: ThreadId, priority: Priority) {
        *self = Self {
            id,
            priority,
            state: ThreadState::Blocked,
            active: true,
            yields: 0,
            dispatches: 0,
        };
    }

    /// Record a voluntary yield.
    pub fn record_yield(&mut self) {
        self.yields = self.yields.wrapping_add(1);
    }

    /// Record that this thread was switched in.
    pub fn record_dispatch(&mut self) {
        self.dispatches = self.dispatches.wrapping_add(1);
    }

    /// Check if this thread is eligible to be queued (attached and Ready).
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.active && self.state == ThreadState::Ready
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
