//! # Error Types
//!
//! The error taxonomy of the scheduling core and its mapping onto ITRON
//! status codes.
//!
//! Only `InvalidPriority` (and the descriptor-table errors of the lifecycle
//! glue) are meant to reach a caller as a value. `EmptyQueue` and
//! `InvariantViolation` mean the ready-queue store is already corrupt; the
//! scheduler hands them to [`fatal`], which halts.

use core::fmt;

/// Result type alias for scheduling-core operations.
pub type Result<T> = core::result::Result<T, SchedError>;

/// Which structural invariant was found broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Thread is already linked into a ready queue.
    AlreadyQueued,
    /// Thread was expected in a ready queue but is not linked anywhere.
    NotQueued,
    /// Running thread is not the head of its own priority's queue.
    RunningNotHead,
    /// Running thread's queue is not the most urgent non-empty queue.
    RunningNotHighest,
    /// Running slot names a thread that is not queued at all.
    RunningNotQueued,
    /// Descriptor state disagrees with queue membership.
    StateMismatch,
}

impl Violation {
    fn as_str(self) -> &'static str {
        match self {
            Violation::AlreadyQueued => "thread already queued",
            Violation::NotQueued => "thread not queued",
            Violation::RunningNotHead => "running thread is not head of its queue",
            Violation::RunningNotHighest => "running thread is not in the most urgent queue",
            Violation::RunningNotQueued => "running thread is not queued",
            Violation::StateMismatch => "thread state disagrees with queue membership",
        }
    }
}

/// Errors raised by the scheduling core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Priority outside `[MIN_PRIORITY, MAX_PRIORITY]` (or an internal
    /// index outside `[0, NUM_PRIORITIES)`). Recoverable, no side effects.
    InvalidPriority,
    /// Dequeue from an empty ready queue.
    EmptyQueue,
    /// The ready-queue structure or running slot is inconsistent.
    InvariantViolation(Violation),
    /// Thread id does not name an attached descriptor.
    NoSuchThread,
    /// Descriptor table has no free slot.
    TooManyThreads,
}

impl SchedError {
    /// Whether this error signals corruption rather than a bad request.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, SchedError::EmptyQueue | SchedError::InvariantViolation(_))
    }

    /// ITRON status code for this error.
    pub const fn er(&self) -> Er {
        match self {
            SchedError::InvalidPriority => E_PAR,
            SchedError::EmptyQueue => E_SYS,
            SchedError::InvariantViolation(_) => E_SYS,
            SchedError::NoSuchThread => E_ID,
            SchedError::TooManyThreads => E_NOMEM,
        }
    }
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidPriority => f.write_str("priority out of range"),
            SchedError::EmptyQueue => f.write_str("dequeue from empty ready queue"),
            SchedError::InvariantViolation(v) => write!(f, "invariant violation: {}", v.as_str()),
            SchedError::NoSuchThread => f.write_str("no such thread"),
            SchedError::TooManyThreads => f.write_str("thread table full"),
        }
    }
}

// ---------------------------------------------------------------------------
// ITRON status codes
// ---------------------------------------------------------------------------

/// ITRON error code (`ER`). Zero is success, negative values are errors.
pub type Er = i32;

/// Normal completion.
pub const E_OK: Er = 0;
/// System error.
pub const E_SYS: Er = -5;
/// Insufficient memory.
pub const E_NOMEM: Er = -10;
/// Invalid object id.
pub const E_ID: Er = -18;
/// Parameter error.
pub const E_PAR: Er = -33;

/// Collapse a core result into an ITRON status code.
pub fn to_er(result: Result<()>) -> Er {
    match result {
        Ok(()) => E_OK,
        Err(e) => e.er(),
    }
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

/// Halt on a corrupted scheduler. Continuing could dispatch a thread that
/// is already running or that no longer exists.
#[cold]
#[track_caller]
pub fn fatal(err: SchedError) -> ! {
    log::error!("fatal scheduler error: {}", err);
    panic!("fatal scheduler error: {}", err)
}

/// Escalate internal-corruption errors to [`fatal`], pass the rest through.
pub(crate) trait OrFatal<T> {
    fn or_fatal(self) -> Result<T>;
}

impl<T> OrFatal<T> for Result<T> {
    #[track_caller]
    fn or_fatal(self) -> Result<T> {
        match self {
            Err(e) if e.is_fatal() => fatal(e),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_er_codes() {
        assert_eq!(SchedError::InvalidPriority.er(), E_PAR);
        assert_eq!(SchedError::EmptyQueue.er(), E_SYS);
        assert_eq!(SchedError::NoSuchThread.er(), E_ID);
        assert_eq!(SchedError::TooManyThreads.er(), E_NOMEM);
        assert_eq!(to_er(Ok(())), E_OK);
        assert_eq!(to_er(Err(SchedError::InvalidPriority)), -33);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!SchedError::InvalidPriority.is_fatal());
        assert!(!SchedError::NoSuchThread.is_fatal());
        assert!(SchedError::EmptyQueue.is_fatal());
        assert!(SchedError::InvariantViolation(Violation::AlreadyQueued).is_fatal());
    }

    #[test]
    fn test_or_fatal_passes_recoverable_errors() {
        let r: Result<()> = Err(SchedError::InvalidPriority);
        assert_eq!(r.or_fatal(), Err(SchedError::InvalidPriority));
        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.or_fatal(), Ok(7));
    }

    #[test]
    #[should_panic(expected = "fatal scheduler error")]
    fn test_or_fatal_halts_on_corruption() {
        let r: Result<()> = Err(SchedError::EmptyQueue);
        let _ = r.or_fatal();
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SchedError::InvariantViolation(Violation::RunningNotHead).to_string(),
            "invariant violation: running thread is not head of its queue"
        );
    }
}
