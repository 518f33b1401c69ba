// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thread admission.
//!
//! Admission is the only way the control-block table changes after boot. It
//! claims a `Ready` slot in the foreground process, gives it an initial stack
//! frame, and marks it `Running` so the scheduler will consider it.
//!
//! The scheduler and dispatcher look at the table from interrupt context, so
//! the whole operation runs with interrupts masked. The mask is put back the
//! way we found it on every path out, including the failing ones.

use abi::{
    EntryPoint, OsStatus, Priority, ThreadId, ThreadStatus, FOREGROUND_PROCESS,
};

use crate::arch::InterruptGuard;
use crate::err::KernError;
use crate::stack::{self, STACK_SIZE};
use crate::task::ControlBlocks;

/// Admits a thread running `entry` into the foreground process.
///
/// `stack_size` is the stack the caller wants, in bytes. Every thread gets the
/// same fixed-size stack, so this is only checked against `STACK_SIZE`; zero
/// means "whatever the default is".
///
/// Slots are claimed lowest-numbered first, including slots the scheduler
/// has handed back by setting them `Ready` again. On success the claimed
/// thread's ID is returned, and exactly that thread's status, stack and
/// priority have changed. On failure nothing has changed.
pub fn add_foreground_thread<const P: usize, const T: usize>(
    blocks: &mut ControlBlocks<P, T>,
    entry: EntryPoint,
    stack_size: u32,
    priority: Priority,
) -> Result<ThreadId, KernError> {
    let _masked = InterruptGuard::new();

    if stack_size as usize > STACK_SIZE {
        klog!(
            "admit: {} byte stack requested, have {}",
            stack_size,
            STACK_SIZE
        );
        return Err(KernError::StackTooLarge {
            requested: stack_size,
        });
    }

    let process = &blocks.processes[FOREGROUND_PROCESS.index()];
    let Some(tid) = process.first_ready() else {
        klog!("admit: no ready slot in foreground process");
        return Err(KernError::OutOfResource);
    };

    stack::build_initial_frame(blocks, FOREGROUND_PROCESS, tid, entry);

    let thread =
        &mut blocks.processes[FOREGROUND_PROCESS.index()].threads[tid.index()];
    thread.status = ThreadStatus::Running;
    thread.priority = priority;

    klog!(
        "admit: thread {} entry {:#010x} priority {}",
        tid.0,
        entry.addr(),
        priority.0
    );
    Ok(tid)
}

/// C-shaped wrapper around `add_foreground_thread`, for callers that only
/// want a status code.
pub fn os_add_foreground_thread<const P: usize, const T: usize>(
    blocks: &mut ControlBlocks<P, T>,
    entry: EntryPoint,
    stack_size: u32,
    priority: u32,
) -> OsStatus {
    match add_foreground_thread(blocks, entry, stack_size, Priority(priority)) {
        Ok(_) => OsStatus::Success,
        Err(e) => e.into(),
    }
}
