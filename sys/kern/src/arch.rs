// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture-specific support.
//!
//! In practice, this works by
//!
//! - Conditionally defining a nested module (below).
//! - `pub use`-ing its contents
//!
//! Thus, all architecture-specific types and functions show up right here in
//! the `arch` module, magically tailored for the current target.
//!
//! For this to work, each architecture support module must define the same set
//! of names:
//!
//! - `klog!`, the kernel logging macro, and `uassert!`.
//! - `InterruptState`, a snapshot of the global interrupt mask.
//! - `disable_interrupts` / `restore_interrupts`, which must nest.
//! - `interrupts_masked`, to inspect the current mask.
//! - `halt`, for fatal conditions.

cfg_if::cfg_if! {
    // Note: cfg_if! is slightly touchy about ordering and expression
    // complexity; this chain seems to be the best compromise.

    if #[cfg(all(target_arch = "arm", target_os = "none"))] {
        #[macro_use]
        pub mod arm_m;
        pub use arm_m::*;
    } else if #[cfg(not(target_os = "none"))] {
        // Hosted builds simulate the machine so the kernel's table logic can
        // be exercised by tests.
        #[macro_use]
        pub mod fake;
        pub use fake::*;
    } else {
        compile_error!("support for this architecture not implemented");
    }
}

/// Keeps interrupts masked for as long as it lives, then puts the mask back
/// the way it found it.
///
/// Because the previous state is restored rather than unconditionally
/// unmasking, guards may be nested, and taking one while interrupts are
/// already masked (e.g. during boot) leaves them masked.
#[must_use]
pub struct InterruptGuard(InterruptState);

impl InterruptGuard {
    pub fn new() -> Self {
        Self(disable_interrupts())
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        restore_interrupts(self.0);
    }
}
