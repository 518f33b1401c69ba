// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture support for ARMv{6,7,8}-M.
//!
//! # Interrupt masking
//!
//! The kernel core protects the control-block table with the coarsest tool
//! available: `PRIMASK`, which masks every exception of configurable priority.
//! That includes `SysTick` and `PendSV`, which is where the (external)
//! dispatcher runs, so holding `PRIMASK` is sufficient to keep the table from
//! being inspected or changed underneath us.
//!
//! We record whether interrupts were enabled on the way in and only re-enable
//! them on the way out if they were. This is what lets admission run both
//! before the scheduler starts (interrupts masked since boot, and they stay
//! that way) and afterwards.
//!
//! # Initial frames
//!
//! On exception return the processor pops `r0-r3, r12, lr, pc, xPSR` from the
//! process stack, and our dispatcher pops `r4-r11` just below that. See
//! `crate::stack` for the layout this implies.

use core::sync::atomic::{fence, Ordering};

use cortex_m::register::primask;

cfg_if::cfg_if! {
    if #[cfg(feature = "klog-semihosting")] {
        macro_rules! klog {
            ($($tt:tt)*) => {
                cortex_m_semihosting::hprintln!($($tt)*)
            };
        }
    } else if #[cfg(feature = "klog-itm")] {
        macro_rules! klog {
            ($($tt:tt)*) => {
                // Safety: the ITM stimulus port is write-only from our side
                // and tolerates unsynchronized writers; at worst messages
                // interleave.
                #[allow(unused_unsafe)]
                unsafe {
                    let itm = cortex_m::peripheral::ITM::PTR
                        as *mut cortex_m::peripheral::itm::RegisterBlock;
                    let stim = &mut (*itm).stim[0];
                    cortex_m::iprintln!(stim, $($tt)*);
                }
            };
        }
    } else {
        macro_rules! klog {
            ($($tt:tt)*) => {{
                let _ = format_args!($($tt)*);
            }};
        }
    }
}

macro_rules! uassert {
    ($cond : expr) => {
        if !$cond {
            panic!("Assertion failed!");
        }
    };
}

/// State of `PRIMASK` observed by `disable_interrupts`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct InterruptState {
    was_masked: bool,
}

/// Masks all configurable-priority interrupts, returning the previous state
/// for `restore_interrupts`.
#[inline(always)]
pub fn disable_interrupts() -> InterruptState {
    let was_masked = primask::read().is_inactive();
    cortex_m::interrupt::disable();
    InterruptState { was_masked }
}

/// Undoes one `disable_interrupts`.
#[inline(always)]
pub fn restore_interrupts(state: InterruptState) {
    if !state.was_masked {
        // Safety: interrupts were enabled when the matching
        // `disable_interrupts` ran, so we are not inside anyone else's
        // critical section.
        unsafe { cortex_m::interrupt::enable() }
    }
}

pub fn interrupts_masked() -> bool {
    primask::read().is_inactive()
}

/// Stops the machine. Used once a fatal condition has been recorded for the
/// debugger.
pub fn halt() -> ! {
    cortex_m::interrupt::disable();
    loop {
        // Platform-independent NOP
        fence(Ordering::SeqCst);
    }
}
