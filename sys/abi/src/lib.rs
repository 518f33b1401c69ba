// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel ABI definitions, shared between the kernel, the context-switch
//! routine, and applications.
//!
//! Everything in here is part of the in-memory contract with code the kernel
//! does not own (the dispatcher in particular), so the representations are
//! pinned with `repr` attributes and should not be changed casually.

#![cfg_attr(not(test), no_std)]

use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Index of the foreground process, the only process that threads can
/// currently be admitted into.
pub const FOREGROUND_PROCESS: ProcessId = ProcessId(0);

/// Names a process by its position in the control-block table.
///
/// A process's identifier is its index; the two are never allowed to differ.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct ProcessId(pub u8);

impl ProcessId {
    /// Extracts the table index named by this ID.
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }
}

/// Names a thread by its position within its owning process.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct ThreadId(pub u8);

impl ThreadId {
    /// Extracts the table index named by this ID.
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }
}

/// Indicates priority of a thread.
///
/// The kernel core stores this value on admission and never interprets it;
/// whether numerically lower or higher values are more important is up to the
/// scheduler.
///
/// Note that this type *deliberately* does not implement `PartialOrd`/`Ord`,
/// so that code comparing priorities has to go through the scheduler's own
/// notion of importance.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct Priority(pub u32);

/// Lifecycle state of a thread slot.
///
/// The zero value is `Ready`. Freshly created control blocks are therefore
/// admissible without an explicit per-thread pass, and the dispatcher can rely
/// on a zeroed status word meaning "free".
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
#[repr(u32)]
pub enum ThreadStatus {
    /// Slot is free and may be claimed by admission.
    #[default]
    Ready = 0,
    /// Slot holds an admitted thread that the scheduler may dispatch.
    Running = 1,
    /// Reserved for the scheduler; never set by the kernel core.
    Blocked = 2,
}

/// Address of a thread's entry function.
///
/// The kernel never calls through this; it only embeds the address in the
/// thread's initial stack frame. On M-profile parts function addresses already
/// carry the Thumb bit, and it is preserved as given.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct EntryPoint(u32);

impl EntryPoint {
    /// Wraps a raw code address.
    pub const fn from_addr(addr: u32) -> Self {
        Self(addr)
    }

    /// Takes the address of a thread body.
    ///
    /// Code addresses are 32 bits wide on every target the kernel runs on.
    /// Host builds, which only simulate the kernel, keep the low 32 bits.
    pub fn from_fn(body: extern "C" fn()) -> Self {
        Self(body as usize as u32)
    }

    pub const fn addr(self) -> u32 {
        self.0
    }
}

/// Base address of a process's data section.
///
/// This is loaded into `r9` of every thread of the process so that
/// position-independent code can find its writable data. A null section is
/// represented by the absence of a `DataSection`, not by a zero address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct DataSection(NonZeroU32);

impl DataSection {
    /// Wraps a raw address, returning `None` for null.
    pub const fn new(addr: u32) -> Option<Self> {
        match NonZeroU32::new(addr) {
            Some(a) => Some(Self(a)),
            None => None,
        }
    }

    pub const fn addr(self) -> u32 {
        self.0.get()
    }
}

/// Status codes returned across the C-shaped kernel entry points.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u32)]
pub enum OsStatus {
    Success = 0,
    /// No free thread slot in the target process.
    OutOfResource = 1,
    /// Requested stack is larger than the fixed per-thread stack.
    StackTooLarge = 2,
    /// Process index out of range for the control-block table.
    BadProcess = 3,
}

impl From<OsStatus> for u32 {
    fn from(s: OsStatus) -> Self {
        s as u32
    }
}
