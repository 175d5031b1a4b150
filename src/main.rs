//! `paws` launcher: resolve the prebuilt binary for this host and run it.
//!
//! The launcher takes no flags of its own; every command-line argument is
//! forwarded verbatim to the resolved binary, and configuration happens
//! through environment variables (`PAWS_BINARY_PATH`, `FORCE_MUSL`). Exit
//! code is 1 when no compatible binary exists, otherwise the child's own.

use std::env;
use std::ffi::OsString;
use std::process;

use paws_launcher::delegate::delegate;
use paws_launcher::output;
use paws_launcher::policy::choose_libc;
use paws_launcher::probe::{AndroidEvidence, SystemRunner, detect_libc};
use paws_launcher::resolver::{EnvSnapshot, HostArch, HostOs, resolve};

/// Target triple of the launcher itself, emitted by build.rs.
const LAUNCHER_TARGET: &str = env!("TARGET");

fn main() {
    let env_snapshot = EnvSnapshot::capture();
    let arch = HostArch::detect();
    let os = HostOs::detect();
    let runner = SystemRunner;

    // Android evidence only matters on Linux; skip the getprop probe
    // everywhere else.
    let android = os == HostOs::Linux && AndroidEvidence::collect(&runner, &env_snapshot).is_android();

    // Lazy: evaluated only for non-Android Linux without FORCE_MUSL.
    let libc = || choose_libc(&detect_libc(&runner));

    let resolution = resolve(arch, os, &env_snapshot, android, libc);

    let Some(binary) = resolution.into_path() else {
        output::fail(
            "Error:",
            &format!(
                "no compatible paws binary for this platform: {} ({})",
                env::consts::OS,
                env::consts::ARCH
            ),
        );
        output::detail(&format!("launcher target: {LAUNCHER_TARGET}"));
        output::detail("Please check if your system is supported.");
        process::exit(1);
    };

    let args: Vec<OsString> = env::args_os().skip(1).collect();

    match delegate(&binary, &args) {
        Ok(exit) => process::exit(exit.parent_exit_code()),
        Err(e) => {
            output::fail("Error:", &format!("{e:#}"));
            output::detail("Please check if your system is supported, or set PAWS_BINARY_PATH to a working binary.");
            process::exit(1);
        }
    }
}
