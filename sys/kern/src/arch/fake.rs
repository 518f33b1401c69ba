// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simulated machine for hosted builds.
//!
//! The global interrupt mask is modeled per host thread, so that tests running
//! in parallel each see their own "CPU".

use std::cell::Cell;

macro_rules! klog {
    ($($tt:tt)*) => {
        std::println!($($tt)*)
    };
}

macro_rules! uassert {
    ($cond:expr) => {
        assert!($cond)
    };
}

std::thread_local! {
    static MASKED: Cell<bool> = const { Cell::new(false) };
    static MASK_COUNT: Cell<u32> = const { Cell::new(0) };
}

/// State of the simulated mask observed by `disable_interrupts`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use]
pub struct InterruptState {
    was_masked: bool,
}

pub fn disable_interrupts() -> InterruptState {
    MASK_COUNT.with(|c| c.set(c.get() + 1));
    InterruptState {
        was_masked: MASKED.with(|m| m.replace(true)),
    }
}

pub fn restore_interrupts(state: InterruptState) {
    if !state.was_masked {
        MASKED.with(|m| m.set(false));
    }
}

pub fn interrupts_masked() -> bool {
    MASKED.with(Cell::get)
}

/// Number of times `disable_interrupts` has run on this thread.
pub fn mask_count() -> u32 {
    MASK_COUNT.with(Cell::get)
}

/// Simulates reset: interrupts unmasked, counters cleared.
pub fn reset_interrupts() {
    MASKED.with(|m| m.set(false));
    MASK_COUNT.with(|c| c.set(0));
}

/// Stops the simulated machine.
pub fn halt() -> ! {
    panic!("SYSTEM HALTED");
}
