//! # ReadyQ Configuration
//!
//! Compile-time constants governing the ready-queue store and the port.
//! All limits are fixed at compile time — no dynamic allocation.

/// Most urgent priority in the application-facing (ITRON) numbering.
pub const MIN_PRIORITY: i32 = 1;

/// Least urgent priority in the application-facing (ITRON) numbering.
/// Requests outside `[MIN_PRIORITY, MAX_PRIORITY]` are rejected with
/// `SchedError::InvalidPriority` before any state is touched.
pub const MAX_PRIORITY: i32 = 255;

/// Number of internal priority levels, one ready queue each.
/// Internal level `0` is the most urgent.
pub const NUM_PRIORITIES: usize = (MAX_PRIORITY - MIN_PRIORITY + 1) as usize;

/// Maximum number of thread descriptors the scheduler can track.
/// Bounds the descriptor table and the per-queue link arrays. Must fit
/// in the 32-bit pending-wakeup mask used for deferred ISR work.
pub const MAX_THREADS: usize = 16;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Priority byte programmed for PendSV on Cortex-M4. Lowest urgency, so a
/// context switch never preempts an application ISR.
pub const PENDSV_PRIORITY: u8 = 0xFF;

const _: () = assert!(MAX_THREADS <= 32);
const _: () = assert!(NUM_PRIORITIES <= 256);
const _: () = assert!(MIN_PRIORITY >= 1 && MAX_PRIORITY >= MIN_PRIORITY);
