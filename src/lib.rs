//! # ReadyQ — Ready-Queue Rotation Core
//!
//! The scheduling core of a single-processor real-time kernel: per-priority
//! ready queues, the nestable dispatch-disable section that protects them,
//! and the ITRON `rot_rdq` operation that rotates a priority level.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Threads                  │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │        rot_rdq() · start_thread() · change_priority()   │
//! ├────────────────────────────────────────────────────────┤
//! │  Priority Mapping (priority.rs)                         │
//! │    to_internal() · to_external()                        │
//! ├──────────────────────────────┬─────────────────────────┤
//! │  Scheduler (scheduler.rs)    │  Sync (sync.rs)          │
//! │  ─ rotate_priority()         │  ─ critical_section()    │
//! │  ─ yield_processor()         │  ─ DispatchGuard         │
//! │  ─ rotate_ready_queue()      │                          │
//! │  ─ make_ready() · block()    │                          │
//! ├──────────────────────────────┴─────────────────────────┤
//! │  Ready-Queue Store (ready_queue.rs)                     │
//! │    enqueue_tail · dequeue_head · rotate · bitmap        │
//! ├────────────────────────────────────────────────────────┤
//! │  Thread Model (thread.rs)   ThreadId · TCB · State      │
//! ├────────────────────────────────────────────────────────┤
//! │  Port (arch/)   cortex_m4 · host                        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Priorities
//!
//! Applications use ITRON priorities `1..=255`, 1 being the most urgent.
//! Internally these are queue indices `0..=254` in the same order.
//!
//! ## Memory Model
//!
//! - **No heap**: all state lives in one [`scheduler::Scheduler`] value
//! - **No globals**: every operation takes the scheduler by reference
//! - **Fixed tables**: `MAX_THREADS` descriptors, `NUM_PRIORITIES` queues
//! - **Interrupts**: masked only around the dispatch-disable counter; queue
//!   mutations run with dispatching disabled, not with interrupts masked

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod priority;
pub mod thread;
pub mod ready_queue;
pub mod arch;
pub mod sync;
pub mod scheduler;
pub mod kernel;

pub use error::{Result, SchedError};
pub use priority::Priority;
pub use scheduler::Scheduler;
pub use thread::{ThreadId, ThreadState};
