//! # ReadyQ Demo Firmware
//!
//! Drives the rotation core on a Cortex-M4 with four threads:
//!
//! | ITRON priority | Threads | Rotation |
//! |----------------|---------|----------|
//! | 3 | 2 | self-yield (running level) |
//! | 9 | 2 | explicit rotate, running thread untouched |
//!
//! The main loop acts as a time-slice tick: it self-yields level 3 (the
//! running level) and explicitly rotates level 9, which never changes the
//! running thread. Every dispatcher call pends PendSV; the handler here
//! only acknowledges the request, since stack switching belongs to the
//! thread-creation layer this demo does not include.
//!
//! Build with `--features firmware` for a `thumbv7em-none-eabihf` target.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::{entry, exception};
use panic_halt as _;

use readyq::arch::cortex_m4::CortexM4Port;
use readyq::config::SYSTEM_CLOCK_HZ;
use readyq::kernel;
use readyq::Scheduler;

/// PendSV requests seen so far.
static PENDSV_COUNT: AtomicU32 = AtomicU32::new(0);

#[exception]
fn PendSV() {
    PENDSV_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Firmware entry point. Attaches the demo threads and rotates their
/// levels forever.
#[entry]
fn main() -> ! {
    let mut sched = Scheduler::new(CortexM4Port::new());

    // Levels 3 and 9: two peers each
    for tskpri in [3, 3, 9, 9] {
        if kernel::start_thread(&mut sched, tskpri).is_err() {
            panic!("failed to start demo thread");
        }
    }

    loop {
        // ~10 ticks per second at the default clock
        cortex_m::asm::delay(SYSTEM_CLOCK_HZ / 10);

        for tskpri in [9, 3] {
            if kernel::rot_rdq(&mut sched, tskpri).is_err() {
                panic!("failed to rotate demo level");
            }
        }

        // The port keeps the last request until PendSV consumes it
        cortex_m::interrupt::free(|_cs| {
            let _ = sched.port_mut().take_pending();
        });
    }
}
