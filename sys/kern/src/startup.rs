// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel startup.

use crate::err::{BoardFault, BootError};
use crate::stack::STACK_SIZE;
use crate::task::ControlBlocks;

/// Board-specific bring-up that the kernel sequences during boot but does not
/// implement.
///
/// Both operations are called exactly once, with interrupts masked. An error
/// from either is fatal.
pub trait Board {
    /// Configures the system time base.
    fn set_system_clock(&mut self) -> Result<(), BoardFault>;

    /// Brings up the diagnostic console.
    fn initialize_uart(&mut self) -> Result<(), BoardFault>;
}

/// The kernel's boot sequence.
///
/// We currently expect an application to provide its own `main`-equivalent
/// function, which places the control-block table somewhere it will not move
/// and then calls this, before admitting any threads.
///
/// Interrupts are masked first, since clock and console setup can raise
/// spurious interrupts before the table exists, and stay masked on return;
/// unmasking is up to whoever launches the first thread.
///
/// This does not return if the board fails to come up.
pub fn os_init<const P: usize, const T: usize>(
    board: &mut impl Board,
    blocks: &mut ControlBlocks<P, T>,
) {
    // Deliberately never restored.
    let _ = crate::arch::disable_interrupts();

    if let Err(fault) = board.set_system_clock() {
        crate::fail::die(BootError::Clock(fault));
    }
    if let Err(fault) = board.initialize_uart() {
        crate::fail::die(BootError::Console(fault));
    }
    blocks.initialize();

    klog!(
        "kernel: {} processes, {} threads each, {} byte stacks",
        P,
        T,
        STACK_SIZE
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch;
    use abi::{ProcessId, ThreadStatus};

    #[derive(Debug, Eq, PartialEq)]
    enum Step {
        Clock { masked: bool },
        Uart { masked: bool },
    }

    #[derive(Default)]
    struct FakeBoard {
        steps: std::vec::Vec<Step>,
        clock_fault: Option<BoardFault>,
        uart_fault: Option<BoardFault>,
    }

    impl Board for FakeBoard {
        fn set_system_clock(&mut self) -> Result<(), BoardFault> {
            self.steps.push(Step::Clock {
                masked: arch::interrupts_masked(),
            });
            self.clock_fault.map_or(Ok(()), Err)
        }

        fn initialize_uart(&mut self) -> Result<(), BoardFault> {
            self.steps.push(Step::Uart {
                masked: arch::interrupts_masked(),
            });
            self.uart_fault.map_or(Ok(()), Err)
        }
    }

    #[test]
    fn boot_sequence_order() {
        arch::reset_interrupts();
        let mut board = FakeBoard::default();
        let mut blocks = ControlBlocks::<2, 4>::new();

        os_init(&mut board, &mut blocks);

        assert_eq!(
            board.steps,
            [Step::Clock { masked: true }, Step::Uart { masked: true }]
        );
        assert!(arch::interrupts_masked());
    }

    #[test]
    fn boot_leaves_table_numbered_and_ready() {
        arch::reset_interrupts();
        let mut blocks = ControlBlocks::<3, 4>::new();
        os_init(&mut FakeBoard::default(), &mut blocks);

        for (p, process) in blocks.processes().iter().enumerate() {
            assert_eq!(process.id(), ProcessId(p as u8));
            assert_eq!(process.thread_count(), 0);
            for (t, thread) in process.threads().iter().enumerate() {
                assert_eq!(thread.id().index(), t);
                assert_eq!(thread.status(), ThreadStatus::Ready);
            }
        }
    }

    #[test]
    #[should_panic(expected = "SYSTEM HALTED")]
    fn clock_failure_is_fatal() {
        arch::reset_interrupts();
        let mut board = FakeBoard {
            clock_fault: Some(BoardFault(1)),
            ..Default::default()
        };
        os_init(&mut board, &mut ControlBlocks::<1, 1>::new());
    }

    #[test]
    fn console_is_not_started_after_clock_failure() {
        arch::reset_interrupts();
        let mut board = FakeBoard {
            clock_fault: Some(BoardFault(1)),
            ..Default::default()
        };
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            os_init(&mut board, &mut ControlBlocks::<1, 1>::new())
        }));
        assert!(r.is_err());
        assert_eq!(board.steps, [Step::Clock { masked: true }]);
    }

    #[test]
    #[should_panic(expected = "SYSTEM HALTED")]
    fn console_failure_is_fatal() {
        arch::reset_interrupts();
        let mut board = FakeBoard {
            uart_fault: Some(BoardFault(7)),
            ..Default::default()
        };
        os_init(&mut board, &mut ControlBlocks::<1, 1>::new());
    }
}
