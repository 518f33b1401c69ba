// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The control-block table: every process, and every thread of every process.
//!
//! This is the single source of truth for scheduling state. Its shape is fixed
//! at compile time and it never grows, shrinks, or frees anything; thread
//! slots are recycled by changing their status, not by reallocation.
//!
//! The records are `repr(C)` because the context-switch routine reads them
//! directly. In particular it expects a thread's saved stack pointer at offset
//! zero of the thread record.

use abi::{
    DataSection, Priority, ProcessId, ThreadId, ThreadStatus,
    FOREGROUND_PROCESS,
};

use crate::err::KernError;
use crate::stack::{RegisterFrame, StackMem};
use crate::{MAXIMUM_NUMBER_OF_PROCESSES, MAXIMUM_NUMBER_OF_THREADS};

/// Thread control block.
#[repr(C)] // so location of stack_pointer is predictable
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(test, derive(Clone))]
pub struct Thread {
    /// Current top of the live contents of `stack`. Null until the thread is
    /// admitted.
    pub(crate) stack_pointer: *mut u32,
    // NOTE: it is critical that the above field appear first!
    pub(crate) id: ThreadId,
    pub(crate) status: ThreadStatus,
    pub(crate) priority: Priority,
    pub(crate) stack: StackMem,
}

impl Thread {
    /// Creates a thread record with every field at its zero value. In
    /// particular, the thread is `Ready`.
    pub const fn new() -> Self {
        Self {
            stack_pointer: core::ptr::null_mut(),
            id: ThreadId(0),
            status: ThreadStatus::Ready,
            priority: Priority(0),
            stack: StackMem::new(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn stack(&self) -> &StackMem {
        &self.stack
    }

    pub fn stack_pointer(&self) -> *const u32 {
        self.stack_pointer
    }

    /// Word offset of the stack pointer from the base of the stack, or `None`
    /// if it doesn't point into this thread's stack (never set, or the table
    /// has moved since it was).
    pub fn stack_pointer_offset(&self) -> Option<usize> {
        let base = self.stack.base() as usize;
        let offset = (self.stack_pointer as usize).checked_sub(base)? / 4;
        (offset < crate::STACK_WORDS).then_some(offset)
    }

    /// The register image the dispatcher will pop on first entry.
    pub fn initial_frame(&self) -> &RegisterFrame {
        self.stack.frame()
    }

    /// Checks the overflow guard at the bottom of the stack. Only meaningful
    /// once the thread has been admitted.
    pub fn stack_guard_intact(&self) -> bool {
        self.stack.guard_intact()
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// Process control block.
///
/// Admission never writes here; claiming a thread changes only that thread's
/// record.
#[repr(C)]
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(test, derive(Clone))]
pub struct Process<const THREADS: usize> {
    pub(crate) id: ProcessId,
    /// Base of the process's writable data, handed to each thread in `r9`.
    pub(crate) data_section: Option<DataSection>,
    pub(crate) threads: [Thread; THREADS],
}

impl<const THREADS: usize> Process<THREADS> {
    pub fn new() -> Self {
        Self {
            id: ProcessId(0),
            data_section: None,
            threads: core::array::from_fn(|_| Thread::new()),
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Number of thread slots currently claimed, i.e. not `Ready`.
    ///
    /// Slots are recycled by the scheduler setting them back to `Ready`, so
    /// this is computed from the statuses rather than kept as a counter.
    pub fn thread_count(&self) -> u32 {
        self.threads
            .iter()
            .filter(|t| t.status != ThreadStatus::Ready)
            .count() as u32
    }

    pub fn data_section(&self) -> Option<DataSection> {
        self.data_section
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn thread(&self, tid: ThreadId) -> Option<&Thread> {
        self.threads.get(tid.index())
    }

    /// Finds the lowest-numbered thread slot that is `Ready`.
    pub fn first_ready(&self) -> Option<ThreadId> {
        self.threads
            .iter()
            .position(|t| t.status == ThreadStatus::Ready)
            .map(|i| ThreadId(i as u8))
    }
}

impl<const THREADS: usize> Default for Process<THREADS> {
    fn default() -> Self {
        Self::new()
    }
}

/// The control-block table.
///
/// The default dimensions come from the kernel configuration; other shapes
/// are mostly useful for tests.
///
/// Once threads have been admitted, the table must stay put: their saved
/// stack pointers are absolute addresses into it. On target that means
/// placing it in static storage before calling `startup::os_init`. For the
/// same reason the table is not `Clone` outside of tests: a copy's saved
/// stack pointers would still point into the original.
#[repr(transparent)]
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(test, derive(Clone))]
pub struct ControlBlocks<
    const PROCESSES: usize = MAXIMUM_NUMBER_OF_PROCESSES,
    const THREADS: usize = MAXIMUM_NUMBER_OF_THREADS,
> {
    pub(crate) processes: [Process<THREADS>; PROCESSES],
}

impl<const PROCESSES: usize, const THREADS: usize>
    ControlBlocks<PROCESSES, THREADS>
{
    /// Identifiers are stored as `u8`, and admission always targets process
    /// 0, so it had better exist.
    const SHAPE_OK: () = assert!(
        PROCESSES >= 1 && PROCESSES <= 256 && THREADS <= 256,
        "control-block table dimensions out of range"
    );

    /// Creates a table with every record at its zero value. Call
    /// `initialize` (normally via `startup::os_init`) before use.
    pub fn new() -> Self {
        let () = Self::SHAPE_OK;
        Self {
            processes: core::array::from_fn(|_| Process::new()),
        }
    }

    /// Numbers every process and thread by its position.
    ///
    /// Status fields are left alone: they start out `Ready`, which is what
    /// we want. This is not safe to call again once threads have been
    /// admitted, since it would renumber live state; that is the caller's
    /// responsibility.
    pub fn initialize(&mut self) {
        for (pid, process) in self.processes.iter_mut().enumerate() {
            process.id = ProcessId(pid as u8);
            for (tid, thread) in process.threads.iter_mut().enumerate() {
                thread.id = ThreadId(tid as u8);
            }
        }
    }

    pub fn processes(&self) -> &[Process<THREADS>] {
        &self.processes
    }

    pub fn process(&self, pid: ProcessId) -> Option<&Process<THREADS>> {
        self.processes.get(pid.index())
    }

    pub fn thread(&self, pid: ProcessId, tid: ThreadId) -> Option<&Thread> {
        self.process(pid)?.thread(tid)
    }

    /// The process that foreground threads are admitted into.
    pub fn foreground(&self) -> &Process<THREADS> {
        &self.processes[FOREGROUND_PROCESS.index()]
    }

    /// Records the data section of process `pid`. Threads admitted from now
    /// on get it in `r9`; threads already admitted are not updated.
    pub fn set_data_section(
        &mut self,
        pid: ProcessId,
        data_section: Option<DataSection>,
    ) -> Result<(), KernError> {
        let process = self
            .processes
            .get_mut(pid.index())
            .ok_or(KernError::BadProcess(pid))?;
        process.data_section = data_section;
        Ok(())
    }
}

impl<const PROCESSES: usize, const THREADS: usize> Default
    for ControlBlocks<PROCESSES, THREADS>
{
    fn default() -> Self {
        Self::new()
    }
}
