//! Process delegation: run the resolved binary and mirror its outcome.
//!
//! The child inherits the parent's standard streams and receives the parent's
//! arguments verbatim. On Unix, a SIGINT delivered to the launcher while the
//! child runs is forwarded to the child; on Windows the child's own console
//! signal handling is relied upon and no forwarding is attempted.

use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

/// Terminal state of the delegated child.
///
/// `Code` is the normal path and propagates unchanged as the launcher's own
/// exit code. `Signal` covers a Unix child killed by a signal; the launcher
/// exits with the shell convention 128+signal rather than hanging with no
/// defined status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Code(i32),
    Signal(i32),
}

impl ChildExit {
    /// Exit code the launcher itself should terminate with.
    pub fn parent_exit_code(self) -> i32 {
        match self {
            ChildExit::Code(code) => code,
            ChildExit::Signal(signal) => 128 + signal,
        }
    }
}

/// Launch `binary` with `args` and block until it terminates.
///
/// Fails when the binary does not exist on disk (there is no fallback binary
/// and no retry) or when the OS refuses to spawn it. Both are surfaced to the
/// caller; nothing at this stage is absorbed silently.
pub fn delegate(binary: &Path, args: &[OsString]) -> Result<ChildExit> {
    if !binary.exists() {
        bail!("binary not found at {}", binary.display());
    }

    #[cfg(unix)]
    signals::install_sigint_forwarder().context("failed to install SIGINT forwarder")?;

    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("failed to launch {}", binary.display()))?;

    #[cfg(unix)]
    signals::set_child(child.id() as i32);

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {}", binary.display()))?;

    #[cfg(unix)]
    signals::clear_child();

    if let Some(code) = status.code() {
        return Ok(ChildExit::Code(code));
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Ok(ChildExit::Signal(signal));
        }
    }

    // No exit code and no signal is not observable on supported platforms.
    bail!("child exited with an indeterminate status");
}

// ---------------------------------------------------------------------------
// SIGINT forwarding (Unix)
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod signals {
    //! Async-safe SIGINT forwarding.
    //!
    //! The handler runs in signal context: it may only touch atomics and call
    //! async-signal-safe functions, so the child pid lives in an atomic and
    //! the handler does nothing but `kill`. No forwarding happens before the
    //! child is registered or after it is cleared.

    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
    use std::sync::atomic::{AtomicI32, Ordering};

    /// Pid of the running child; 0 means no child to forward to.
    static CHILD_PID: AtomicI32 = AtomicI32::new(0);

    pub fn set_child(pid: i32) {
        CHILD_PID.store(pid, Ordering::SeqCst);
    }

    pub fn clear_child() {
        CHILD_PID.store(0, Ordering::SeqCst);
    }

    extern "C" fn forward_to_child(signum: libc::c_int) {
        let pid = CHILD_PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, signum);
            }
        }
    }

    /// Install the forwarding handler for SIGINT.
    ///
    /// SA_RESTART keeps the parent's `wait` on the child from returning EINTR
    /// when the handler fires.
    pub fn install_sigint_forwarder() -> nix::Result<()> {
        let action = SigAction::new(
            SigHandler::Handler(forward_to_child),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        unsafe { signal::sigaction(Signal::SIGINT, &action) }.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
