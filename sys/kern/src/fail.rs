// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Support for recording kernel failures such that they can be found by
//! tooling.
//!
//! On target, this module defines the following binary interface to
//! debuggers:
//!
//! - `KERNEL_HAS_FAILED` is a `bool`. It is false from reset, and set to true
//!   if the kernel reaches `die` (either explicitly, e.g. because a board
//!   collaborator could not be brought up during boot, or as a result of a
//!   `panic!`).
//!
//! - `KERNEL_EPITAPH` is an array of `u8`. `die` writes as much of the failure
//!   reason into it (as UTF-8) as fits, padded with NULs.
//!
//! Hosted builds log the reason and then halt the simulated machine, which
//! panics.

use core::fmt::Display;

#[cfg(target_os = "none")]
use core::fmt::Write;

/// Flag that gets set to `true` by all failure reporting functions, giving
/// tools a one-stop-shop for doing kernel triage.
#[cfg(target_os = "none")]
#[used]
#[no_mangle]
static mut KERNEL_HAS_FAILED: bool = false;

#[cfg(target_os = "none")]
const EPITAPH_LEN: usize = 128;

#[cfg(target_os = "none")]
#[used]
#[no_mangle]
static mut KERNEL_EPITAPH: [u8; EPITAPH_LEN] = [0; EPITAPH_LEN];

#[cfg(target_os = "none")]
fn begin_epitaph() -> &'static mut [u8; EPITAPH_LEN] {
    // Safety: we only get here from `die`, which never returns, so nothing
    // else on this core reads or writes the flag concurrently with us.
    let previous_fail = unsafe {
        core::ptr::replace(core::ptr::addr_of_mut!(KERNEL_HAS_FAILED), true)
    };
    if previous_fail {
        // Recursive failure; the first epitaph is the interesting one.
        crate::arch::halt();
    }

    // Safety: only one execution of this function can observe the flag
    // clear, so this reference is unique.
    unsafe { &mut *core::ptr::addr_of_mut!(KERNEL_EPITAPH) }
}

/// Records `msg` as the reason the kernel stopped, and stops.
#[inline(always)]
pub fn die(msg: impl Display) -> ! {
    die_impl(&msg)
}

#[cfg(target_os = "none")]
#[inline(never)]
fn die_impl(msg: &dyn Display) -> ! {
    let buf = begin_epitaph();
    let mut writer = Eulogist { dest: buf };
    write!(writer, "{msg}").ok();

    crate::arch::halt()
}

#[cfg(not(target_os = "none"))]
#[inline(never)]
fn die_impl(msg: &dyn Display) -> ! {
    klog!("kernel died: {}", msg);
    crate::arch::halt()
}

#[cfg(target_os = "none")]
struct Eulogist {
    dest: &'static mut [u8],
}

#[cfg(target_os = "none")]
impl Write for Eulogist {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let s = s.as_bytes();
        let n = s.len().min(self.dest.len());
        let (dest, leftovers) = {
            let taken = core::mem::take(&mut self.dest);
            taken.split_at_mut(n)
        };
        dest.copy_from_slice(&s[..n]);
        self.dest = leftovers;
        Ok(())
    }
}

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    die(info)
}
