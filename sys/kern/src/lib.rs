// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RTK kernel core.
//!
//! This is the part of a small preemptive kernel for single-core M-profile
//! microcontrollers that owns process and thread bookkeeping:
//!
//! - the fixed-size table of process and thread control blocks (`task`),
//! - the initial stack frame each thread is first dispatched through
//!   (`stack`),
//! - admission of new threads into that table (`admit`), and
//! - the boot sequence that sets it up (`startup`).
//!
//! The scheduling policy and the context-switch routine that actually run
//! threads live elsewhere; this crate defines the in-memory contract they
//! consume.
//!
//! # Design principles
//!
//! 1. Static configuration. The table's dimensions and the stack size are
//!    fixed at build time (see `build.rs`), and nothing is ever allocated.
//! 2. A strong preference for safe code where reasonable. Nothing here
//!    currently needs `unsafe` outside of `arch` and `fail`.
//! 3. Simple algorithms over clever ones. The table is small; a linear scan is
//!    fine.

#![cfg_attr(target_os = "none", no_std)]

#[macro_use]
pub mod arch;

pub mod admit;
pub mod err;
pub mod fail;
pub mod stack;
pub mod startup;
pub mod task;

pub use admit::{add_foreground_thread, os_add_foreground_thread};
pub use startup::{os_init, Board};
pub use task::ControlBlocks;

include!(concat!(env!("OUT_DIR"), "/kconfig.rs"));
