// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common error-handling support.
//!
//! There are two kinds of failure in the kernel core:
//!
//! - Recoverable errors reported to the caller of an entry point
//!   (`KernError`). These never leave the control-block table partially
//!   modified.
//! - Boot-time collaborator failures (`BootError`), which are fatal and are
//!   handed to `crate::fail::die`.
//!
//! Passing an out-of-range identifier to an internal routine is neither: it's
//! a bug, and bounds-checked indexing turns it into a panic.

use core::fmt;

use abi::{OsStatus, ProcessId};

/// An error returned from a kernel entry point.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KernError {
    /// Every thread slot of the target process is in use.
    OutOfResource,
    /// The requested stack, in bytes, exceeds the fixed per-thread stack.
    StackTooLarge { requested: u32 },
    /// The process index is outside the control-block table.
    BadProcess(ProcessId),
}

impl From<KernError> for OsStatus {
    fn from(e: KernError) -> Self {
        match e {
            KernError::OutOfResource => OsStatus::OutOfResource,
            KernError::StackTooLarge { .. } => OsStatus::StackTooLarge,
            KernError::BadProcess(_) => OsStatus::BadProcess,
        }
    }
}

/// Convenience conversion to a raw response code.
impl From<KernError> for u32 {
    fn from(e: KernError) -> Self {
        OsStatus::from(e).into()
    }
}

impl fmt::Display for KernError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfResource => f.write_str("no free thread slot"),
            Self::StackTooLarge { requested } => write!(
                f,
                "stack of {requested} bytes exceeds {} byte limit",
                crate::stack::STACK_SIZE
            ),
            Self::BadProcess(pid) => write!(f, "no process {}", pid.0),
        }
    }
}

/// Opaque failure code reported by a `Board` collaborator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoardFault(pub u32);

/// A boot step that could not be completed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootError {
    Clock(BoardFault),
    Console(BoardFault),
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clock(BoardFault(code)) => {
                write!(f, "boot: clock setup failed ({code:#x})")
            }
            Self::Console(BoardFault(code)) => {
                write!(f, "boot: console setup failed ({code:#x})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_onto_status_codes() {
        assert_eq!(
            OsStatus::from(KernError::OutOfResource),
            OsStatus::OutOfResource
        );
        assert_eq!(
            u32::from(KernError::StackTooLarge { requested: 4096 }),
            OsStatus::StackTooLarge as u32
        );
        assert_eq!(
            OsStatus::from(KernError::BadProcess(ProcessId(9))),
            OsStatus::BadProcess
        );
    }

    #[test]
    fn boot_errors_name_the_step() {
        let msg = std::format!("{}", BootError::Console(BoardFault(0x2a)));
        assert_eq!(msg, "boot: console setup failed (0x2a)");
    }
}
