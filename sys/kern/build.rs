// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;

/// Words at the top of every stack reserved for the initial register frame.
/// Must agree with `stack::FRAME_WORDS`.
const FRAME_WORDS: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    generate_kconfig()?;
    Ok(())
}

fn generate_kconfig() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-env-changed=RTK_KCONFIG");
    let kconfig: KernelConfig = match env::var("RTK_KCONFIG") {
        Ok(text) => ron::de::from_str(&text)?,
        Err(_) => KernelConfig::default(),
    };
    kconfig.check()?;

    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    let mut file = File::create(out.join("kconfig.rs"))?;

    writeln!(file, "// See build.rs for details")?;
    writeln!(
        file,
        "pub const MAXIMUM_NUMBER_OF_PROCESSES: usize = {};",
        kconfig.processes
    )?;
    writeln!(
        file,
        "pub const MAXIMUM_NUMBER_OF_THREADS: usize = {};",
        kconfig.threads
    )?;
    writeln!(file, "pub const STACK_WORDS: usize = {};", kconfig.stack_words)?;

    Ok(())
}

/// Shape of the kernel's static tables, passed in by the application build as
/// a RON struct in `RTK_KCONFIG`, e.g.
///
/// ```text
/// (processes: 1, threads: 8, stack_words: 256)
/// ```
///
/// Missing fields take their defaults.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct KernelConfig {
    processes: usize,
    threads: usize,
    stack_words: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            processes: 1,
            threads: 4,
            stack_words: 128,
        }
    }
}

impl KernelConfig {
    fn check(&self) -> Result<(), String> {
        // Identifiers are stored as u8, and process 0 must exist to admit
        // foreground threads into.
        if !(1..=256).contains(&self.processes) {
            return Err(format!(
                "kconfig: processes must be 1..=256, got {}",
                self.processes
            ));
        }
        if !(1..=256).contains(&self.threads) {
            return Err(format!(
                "kconfig: threads must be 1..=256, got {}",
                self.threads
            ));
        }
        // The guard word sits below the register frame, and the frame base
        // has to land on an 8-byte boundary.
        if self.stack_words <= FRAME_WORDS || self.stack_words % 2 != 0 {
            return Err(format!(
                "kconfig: stack_words must be even and larger than {}, got {}",
                FRAME_WORDS, self.stack_words
            ));
        }
        Ok(())
    }
}
