//! # Ready-Queue Store
//!
//! One FIFO sequence of runnable threads per internal priority level.
//!
//! ## Layout
//!
//! Sequences are intrusive doubly linked lists whose links live in
//! fixed arrays indexed by `ThreadId`, so every operation is O(1) and the
//! store needs no heap:
//!
//! ```text
//!   heads[p] ──► T3 ⇄ T7 ⇄ T1 ◄── tails[p]
//!   queued_at[T3] = queued_at[T7] = queued_at[T1] = Some(p)
//! ```
//!
//! A two-level bitmap tracks non-empty levels. `major` has bit `w` set when
//! `minor[w]` is non-zero; `minor[w]` bit `b` covers level `w * 32 + b`.
//! The most urgent non-empty level is two `trailing_zeros` away.
//!
//! ## Rotation
//!
//! Each sequence is a ring for rotation purposes: [`ReadyQueues::rotate`]
//! relinks the head after the tail without touching anything else.
//!
//! The store knows nothing about the running slot or dispatching; callers
//! must hold the dispatch guard around every mutation.

use crate::config::{MAX_THREADS, NUM_PRIORITIES};
use crate::error::{Result, SchedError, Violation};
use crate::priority::Priority;
use crate::thread::ThreadId;

const MINOR_WORDS: usize = (NUM_PRIORITIES + 31) / 32;

/// Per-priority ready queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyQueues {
    heads: [Option<ThreadId>; NUM_PRIORITIES],
    tails: [Option<ThreadId>; NUM_PRIORITIES],
    lens: [u8; NUM_PRIORITIES],

    next: [Option<ThreadId>; MAX_THREADS],
    prev: [Option<ThreadId>; MAX_THREADS],
    /// Level each thread is linked into, `None` when not queued.
    queued_at: [Option<Priority>; MAX_THREADS],

    major: u8,
    minor: [u32; MINOR_WORDS],
}

impl ReadyQueues {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            heads: [None; NUM_PRIORITIES],
            tails: [None; NUM_PRIORITIES],
            lens: [0; NUM_PRIORITIES],
            next: [None; MAX_THREADS],
            prev: [None; MAX_THREADS],
            queued_at: [None; MAX_THREADS],
            major: 0,
            minor: [0; MINOR_WORDS],
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Append `thread` to the sequence for `priority`.
    ///
    /// # Errors
    /// `InvariantViolation(AlreadyQueued)` if `thread` is linked into any
    /// sequence. Nothing is modified in that case.
    pub fn enqueue_tail(&mut self, priority: Priority, thread: ThreadId) -> Result<()> {
        let t = thread.index();
        if self.queued_at[t].is_some() {
            return Err(SchedError::InvariantViolation(Violation::AlreadyQueued));
        }

        let p = priority.index();
        self.prev[t] = self.tails[p];
        self.next[t] = None;
        match self.tails[p] {
            Some(tail) => self.next[tail.index()] = Some(thread),
            None => self.heads[p] = Some(thread),
        }
        self.tails[p] = Some(thread);
        self.lens[p] += 1;
        self.queued_at[t] = Some(priority);
        self.mark(priority);

        log::trace!("enqueue T{} at level {}", t, p);
        Ok(())
    }

    /// Remove and return the head of the sequence for `priority`.
    ///
    /// # Errors
    /// `EmptyQueue` if the sequence has no entries.
    pub fn dequeue_head(&mut self, priority: Priority) -> Result<ThreadId> {
        let head = self.heads[priority.index()].ok_or(SchedError::EmptyQueue)?;
        self.unlink(head, priority);
        Ok(head)
    }

    /// Unlink `thread` from whichever sequence holds it and return that
    /// sequence's priority.
    ///
    /// # Errors
    /// `InvariantViolation(NotQueued)` if `thread` is not queued.
    pub fn remove(&mut self, thread: ThreadId) -> Result<Priority> {
        let priority = self.queued_at[thread.index()]
            .ok_or(SchedError::InvariantViolation(Violation::NotQueued))?;
        self.unlink(thread, priority);
        Ok(priority)
    }

    /// Move the head of the sequence for `priority` to its tail.
    ///
    /// Sequences with fewer than two entries are left untouched. Returns
    /// `true` if the order changed.
    pub fn rotate(&mut self, priority: Priority) -> bool {
        let p = priority.index();
        if self.lens[p] < 2 {
            return false;
        }
        let (Some(head), Some(tail)) = (self.heads[p], self.tails[p]) else {
            return false;
        };
        let h = head.index();
        let Some(new_head) = self.next[h] else {
            return false;
        };

        self.heads[p] = Some(new_head);
        self.prev[new_head.index()] = None;

        self.next[tail.index()] = Some(head);
        self.prev[h] = Some(tail);
        self.next[h] = None;
        self.tails[p] = Some(head);

        log::trace!("rotate level {}: T{} -> tail, T{} now head", p, h, new_head.index());
        true
    }

    fn unlink(&mut self, thread: ThreadId, priority: Priority) {
        let t = thread.index();
        let p = priority.index();
        let prev = self.prev[t];
        let next = self.next[t];

        match prev {
            Some(prev) => self.next[prev.index()] = next,
            None => self.heads[p] = next,
        }
        match next {
            Some(next) => self.prev[next.index()] = prev,
            None => self.tails[p] = prev,
        }

        self.prev[t] = None;
        self.next[t] = None;
        self.queued_at[t] = None;
        self.lens[p] -= 1;
        if self.lens[p] == 0 {
            self.unmark(priority);
        }

        log::trace!("dequeue T{} from level {}", t, p);
    }

    // -----------------------------------------------------------------------
    // Bitmap
    // -----------------------------------------------------------------------

    fn mark(&mut self, priority: Priority) {
        let (word, bit) = (priority.index() / 32, priority.index() % 32);
        self.minor[word] |= 1 << bit;
        self.major |= 1 << word;
    }

    fn unmark(&mut self, priority: Priority) {
        let (word, bit) = (priority.index() / 32, priority.index() % 32);
        self.minor[word] &= !(1 << bit);
        if self.minor[word] == 0 {
            self.major &= !(1 << word);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Most urgent non-empty level, if any.
    pub fn highest_priority(&self) -> Option<Priority> {
        if self.major == 0 {
            return None;
        }
        let word = self.major.trailing_zeros() as usize;
        let bit = self.minor[word].trailing_zeros() as usize;
        Priority::new(word * 32 + bit).ok()
    }

    /// Head of the most urgent non-empty sequence: the thread that should
    /// be running.
    pub fn highest(&self) -> Option<ThreadId> {
        self.highest_priority().and_then(|p| self.head(p))
    }

    /// Head of the sequence for `priority`.
    #[inline]
    pub fn head(&self, priority: Priority) -> Option<ThreadId> {
        self.heads[priority.index()]
    }

    /// Number of threads queued at `priority`.
    #[inline]
    pub fn len(&self, priority: Priority) -> usize {
        self.lens[priority.index()] as usize
    }

    /// Whether no thread is queued at any level.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.major == 0
    }

    /// Whether `thread` is linked into any sequence.
    #[inline]
    pub fn is_queued(&self, thread: ThreadId) -> bool {
        self.queued_at[thread.index()].is_some()
    }

    /// Level `thread` is queued at.
    #[inline]
    pub fn queued_priority(&self, thread: ThreadId) -> Option<Priority> {
        self.queued_at[thread.index()]
    }

    /// Iterate the sequence for `priority` front to back.
    pub fn iter(&self, priority: Priority) -> Iter<'_> {
        Iter {
            queues: self,
            cursor: self.heads[priority.index()],
            remaining: self.lens[priority.index()] as usize,
        }
    }

    /// Walk every sequence and check that links, lengths, membership and
    /// the bitmap agree. No thread may appear twice or in two sequences.
    pub fn verify(&self) -> Result<()> {
        let broken = SchedError::InvariantViolation(Violation::StateMismatch);
        let mut seen: u32 = 0;
        let mut total = 0usize;

        for p in 0..NUM_PRIORITIES {
            let mut cursor = self.heads[p];
            let mut prev: Option<ThreadId> = None;
            let mut count = 0usize;

            while let Some(t) = cursor {
                if seen & t.bit() != 0 {
                    return Err(SchedError::InvariantViolation(Violation::AlreadyQueued));
                }
                seen |= t.bit();
                count += 1;

                if self.prev[t.index()] != prev
                    || self.queued_at[t.index()].map(Priority::index) != Some(p)
                {
                    return Err(broken);
                }
                prev = cursor;
                cursor = self.next[t.index()];
            }

            let marked = self.minor[p / 32] & (1 << (p % 32)) != 0;
            if count != self.lens[p] as usize || self.tails[p] != prev || marked != (count > 0) {
                return Err(broken);
            }
            total += count;
        }

        let linked = self.queued_at.iter().filter(|q| q.is_some()).count();
        if linked != total {
            return Err(SchedError::InvariantViolation(Violation::NotQueued));
        }
        for (word, bits) in self.minor.iter().enumerate() {
            if (self.major & (1 << word) != 0) != (*bits != 0) {
                return Err(broken);
            }
        }
        Ok(())
    }
}

impl Default for ReadyQueues {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over one ready-queue sequence.
pub struct Iter<'a> {
    queues: &'a ReadyQueues,
    cursor: Option<ThreadId>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = ThreadId;

    fn next(&mut self) -> Option<ThreadId> {
        // Bounded by the recorded length so a corrupted ring cannot loop.
        if self.remaining == 0 {
            return None;
        }
        let current = self.cursor?;
        self.remaining -= 1;
        self.cursor = self.queues.next[current.index()];
        Some(current)
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
