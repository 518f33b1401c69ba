// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thread stacks and their initial register frames.
//!
//! # Hardware contract
//!
//! Everything in this module is shared with the context-switch routine, which
//! is hand-written and lives outside the kernel core. That routine resumes a
//! thread by loading its saved stack pointer, popping `r4-r11`, and performing
//! an exception return, which pops the hardware frame (`r0-r3, r12, lr, pc,
//! xPSR`). A thread that has never run is resumed the same way, so admission
//! has to leave a frame on its stack that looks exactly like what a
//! preempted thread would have left behind.
//!
//! Word offsets from the base of a stack of `N = STACK_WORDS` words:
//!
//! | offset   | contents                                    |
//! |----------|---------------------------------------------|
//! | `0`      | overflow guard, `STACK_GUARD_VALUE`         |
//! | `N - 16` | `r4`; initial stack pointer points here     |
//! | `N - 11` | `r9`; process data section, if any          |
//! | `N - 8`  | `r0`; start of the hardware frame           |
//! | `N - 2`  | `pc`; thread entry point                    |
//! | `N - 1`  | `xPSR`; `DEFAULT_STACK_PSR_VALUE`           |
//!
//! These offsets are load-bearing. Don't reorder `RegisterFrame` without
//! changing the dispatcher to match.

use abi::{EntryPoint, ProcessId, ThreadId, ThreadStatus};
use static_assertions::{assert_eq_size, const_assert, const_assert_eq};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::task::ControlBlocks;
pub use crate::STACK_WORDS;

/// Words reserved at the top of each stack for the register frame.
pub const FRAME_WORDS: usize = 16;

/// Size of each thread's stack in bytes.
pub const STACK_SIZE: usize = STACK_WORDS * 4;

/// Word offset of the initial stack pointer (the base of the frame).
pub const INITIAL_STACK_POINTER: usize = STACK_WORDS - FRAME_WORDS;
/// Word offset of the saved `r9`.
pub const STACK_LOCATION_R9: usize = INITIAL_STACK_POINTER + 5;
/// Word offset of the saved `pc`.
pub const STACK_LOCATION_PC: usize = STACK_WORDS - 2;
/// Word offset of the saved `xPSR`.
pub const STACK_LOCATION_PSR: usize = STACK_WORDS - 1;
/// Word offset of the overflow guard; the lowest word of the stack.
pub const END_OF_STACK: usize = 0;

/// Initially we just set the Thumb Mode bit, the minimum required.
pub const DEFAULT_STACK_PSR_VALUE: u32 = 1 << 24;

/// Sentinel stored at `END_OF_STACK`. A thread that overruns its stack
/// clobbers this before it clobbers anything else.
pub const STACK_GUARD_VALUE: u32 = 0x1234_5678;

/// Register image at the top of a thread's stack, lowest address first.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(C)]
pub struct RegisterFrame {
    // Saved and restored by the dispatcher.
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    // Stacked by the processor on exception entry.
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

/// A thread's stack: free space, topped by the register frame.
///
/// This lives inline in the thread's control block, so its address is fixed
/// for as long as the table is.
#[derive(Clone, Debug, Eq, PartialEq, IntoBytes, Immutable)]
#[repr(C, align(8))]
pub struct StackMem {
    body: [u32; INITIAL_STACK_POINTER],
    frame: RegisterFrame,
}

assert_eq_size!(RegisterFrame, [u32; FRAME_WORDS]);
assert_eq_size!(StackMem, [u32; STACK_WORDS]);
const_assert!(STACK_WORDS > FRAME_WORDS);
// The frame base must keep the stack 8-byte aligned.
const_assert_eq!(INITIAL_STACK_POINTER % 2, 0);
const_assert_eq!(
    core::mem::offset_of!(StackMem, frame),
    INITIAL_STACK_POINTER * 4
);
const_assert_eq!(
    core::mem::offset_of!(RegisterFrame, r9),
    (STACK_LOCATION_R9 - INITIAL_STACK_POINTER) * 4
);
const_assert_eq!(
    core::mem::offset_of!(RegisterFrame, pc),
    (STACK_LOCATION_PC - INITIAL_STACK_POINTER) * 4
);
const_assert_eq!(
    core::mem::offset_of!(RegisterFrame, xpsr),
    (STACK_LOCATION_PSR - INITIAL_STACK_POINTER) * 4
);

impl StackMem {
    pub const fn new() -> Self {
        Self {
            body: [0; INITIAL_STACK_POINTER],
            frame: RegisterFrame {
                r4: 0,
                r5: 0,
                r6: 0,
                r7: 0,
                r8: 0,
                r9: 0,
                r10: 0,
                r11: 0,
                r0: 0,
                r1: 0,
                r2: 0,
                r3: 0,
                r12: 0,
                lr: 0,
                pc: 0,
                xpsr: 0,
            },
        }
    }

    /// Reads the word at `offset` from the base of the stack.
    pub fn word(&self, offset: usize) -> Option<u32> {
        if let Some(w) = self.body.get(offset) {
            return Some(*w);
        }
        let frame: &[u32; FRAME_WORDS] =
            zerocopy::transmute_ref!(&self.frame);
        frame.get(offset - INITIAL_STACK_POINTER).copied()
    }

    pub fn frame(&self) -> &RegisterFrame {
        &self.frame
    }

    /// Address of the lowest word.
    pub fn base(&self) -> *const u32 {
        self.body.as_ptr()
    }

    pub fn guard_intact(&self) -> bool {
        self.body[END_OF_STACK] == STACK_GUARD_VALUE
    }
}

impl Default for StackMem {
    fn default() -> Self {
        Self::new()
    }
}

/// Prepares the stack of thread `tid` of process `pid` so that the first
/// exception return into it enters `entry`.
///
/// Only the stack pointer and the guard, `xPSR`, `pc` and (with a data
/// section) `r9` words are written; everything else keeps its prior contents.
///
/// # Panics
///
/// If `pid` or `tid` is out of range, or the thread is not `Ready`. Admission
/// only calls this for the slot it is about to claim.
pub(crate) fn build_initial_frame<const P: usize, const T: usize>(
    blocks: &mut ControlBlocks<P, T>,
    pid: ProcessId,
    tid: ThreadId,
    entry: EntryPoint,
) {
    let process = &mut blocks.processes[pid.index()];
    let data_section = process.data_section;
    let thread = &mut process.threads[tid.index()];
    uassert!(thread.status == ThreadStatus::Ready);

    let stack = &mut thread.stack;
    thread.stack_pointer = core::ptr::addr_of_mut!(stack.frame).cast::<u32>();
    stack.frame.xpsr = DEFAULT_STACK_PSR_VALUE;
    stack.body[END_OF_STACK] = STACK_GUARD_VALUE;
    stack.frame.pc = entry.addr();
    if let Some(data) = data_section {
        stack.frame.r9 = data.addr();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abi::DataSection;

    fn booted() -> ControlBlocks<1, 2> {
        let mut blocks = ControlBlocks::new();
        blocks.initialize();
        blocks
    }

    #[test]
    fn frame_without_data_section() {
        let mut blocks = booted();
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(1),
            EntryPoint::from_addr(0x0800_0401),
        );

        let thread = blocks.thread(ProcessId(0), ThreadId(1)).unwrap();
        let stack = thread.stack();
        assert_eq!(stack.word(STACK_LOCATION_PC), Some(0x0800_0401));
        assert_eq!(
            stack.word(STACK_LOCATION_PSR),
            Some(DEFAULT_STACK_PSR_VALUE)
        );
        assert_eq!(stack.word(END_OF_STACK), Some(STACK_GUARD_VALUE));
        assert_eq!(stack.word(STACK_LOCATION_R9), Some(0));
        assert_eq!(
            thread.stack_pointer_offset(),
            Some(INITIAL_STACK_POINTER)
        );

        // Thread 0 was not touched.
        let other = blocks.thread(ProcessId(0), ThreadId(0)).unwrap();
        assert_eq!(other.stack(), &StackMem::new());
        assert!(other.stack_pointer().is_null());
    }

    #[test]
    fn frame_with_data_section_preloads_r9() {
        let mut blocks = booted();
        blocks
            .set_data_section(ProcessId(0), DataSection::new(0x2000_1000))
            .unwrap();
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(0),
            EntryPoint::from_addr(0x0800_0201),
        );

        let frame = blocks
            .thread(ProcessId(0), ThreadId(0))
            .unwrap()
            .initial_frame();
        assert_eq!(frame.r9, 0x2000_1000);
        assert_eq!(frame.pc, 0x0800_0201);
        assert_eq!(frame.xpsr, DEFAULT_STACK_PSR_VALUE);
    }

    #[test]
    fn frame_bytes_match_exception_layout() {
        let mut blocks = booted();
        blocks
            .set_data_section(ProcessId(0), DataSection::new(0xAABB_CCDD))
            .unwrap();
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(0),
            EntryPoint::from_addr(0x1122_3344),
        );
        let stack = blocks.thread(ProcessId(0), ThreadId(0)).unwrap().stack();
        let bytes = stack.as_bytes();
        let at = |word: usize| &bytes[word * 4..word * 4 + 4];

        // Words are stored little-endian, like the hardware stacks them.
        let le = |v: u32| v.to_le_bytes();
        assert_eq!(at(STACK_WORDS - 11), le(0xAABB_CCDD));
        assert_eq!(at(STACK_WORDS - 2), le(0x1122_3344));
        assert_eq!(at(STACK_WORDS - 1), le(0x0100_0000));
        assert_eq!(at(0), le(0x1234_5678));
    }

    #[test]
    fn stack_pointer_is_eight_byte_aligned() {
        let mut blocks = booted();
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(0),
            EntryPoint::from_addr(0x0800_0001),
        );
        let sp = blocks
            .thread(ProcessId(0), ThreadId(0))
            .unwrap()
            .stack_pointer();
        assert_eq!(sp as usize % 8, 0);
    }

    #[test]
    fn prior_register_contents_survive() {
        let mut blocks = booted();
        blocks.processes[0].threads[0].stack.frame.r4 = 0xdead_beef;
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(0),
            EntryPoint::from_addr(0x0800_0001),
        );
        let frame = blocks
            .thread(ProcessId(0), ThreadId(0))
            .unwrap()
            .initial_frame();
        assert_eq!(frame.r4, 0xdead_beef);
        assert_eq!(frame.r9, 0);
    }

    #[test]
    fn guard_detects_overrun() {
        let mut blocks = booted();
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(0),
            EntryPoint::from_addr(0x0800_0001),
        );
        assert!(blocks.processes[0].threads[0].stack_guard_intact());

        blocks.processes[0].threads[0].stack.body[END_OF_STACK] = 0x0000_0042;
        assert!(!blocks.processes[0].threads[0].stack_guard_intact());
    }

    #[test]
    fn word_reads_past_the_end_are_none() {
        let stack = StackMem::new();
        assert_eq!(stack.word(STACK_WORDS - 1), Some(0));
        assert_eq!(stack.word(STACK_WORDS), None);
    }

    #[test]
    #[should_panic]
    fn refuses_a_claimed_thread() {
        let mut blocks = booted();
        blocks.processes[0].threads[0].status = ThreadStatus::Running;
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(0),
            EntryPoint::from_addr(0x0800_0001),
        );
    }

    #[test]
    #[should_panic]
    fn out_of_range_thread_panics() {
        let mut blocks = booted();
        build_initial_frame(
            &mut blocks,
            ProcessId(0),
            ThreadId(2),
            EntryPoint::from_addr(0x0800_0001),
        );
    }
}
