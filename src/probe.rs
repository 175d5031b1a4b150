//! Host environment probing: Android detection and Linux libc classification.
//!
//! Everything in this module is best-effort and never fails. A diagnostic
//! command that is missing, errors, or produces garbage degrades to the
//! "signal absent" / `LibcFamily::Unknown` classification; the caller's
//! fail-safe policy (see `policy`) absorbs the uncertainty.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::resolver::EnvSnapshot;

/// Marker substring in `PREFIX` that identifies a Termux environment.
const TERMUX_PREFIX_MARKER: &str = "com.termux";

/// Android system file whose presence identifies an Android host.
const ANDROID_BUILD_PROP: &str = "/system/build.prop";

/// Signature substring (lowercased match) that identifies musl's `ldd` output.
const MUSL_SIGNATURE: &str = "musl";

// ---------------------------------------------------------------------------
// Diagnostic runner capability
// ---------------------------------------------------------------------------

/// Captured output of one diagnostic command invocation.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Capability to run short-lived external diagnostic commands.
///
/// Injected into the probe functions so tests can substitute deterministic
/// fakes without touching the real system. An `Err` means the command could
/// not be invoked at all (binary missing); a command that ran but exited
/// non-zero is an `Ok` with `success: false`.
pub trait DiagnosticRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<DiagnosticOutput>;
}

/// Real runner backed by `std::process::Command`.
///
/// Stdin is closed so a misbehaving diagnostic cannot block on input. No
/// timeout is applied; this matches the established launcher behavior (a hung
/// diagnostic stalls resolution, see DESIGN.md).
pub struct SystemRunner;

impl DiagnosticRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<DiagnosticOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        Ok(DiagnosticOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Android detection
// ---------------------------------------------------------------------------

/// The four independent Android signals, gathered up front so classification
/// is a pure function with no ambient reads.
#[derive(Debug, Clone, Default)]
pub struct AndroidEvidence {
    /// `getprop ro.build.version.release` ran and exited 0. Output content is
    /// irrelevant; only successful invocation matters.
    pub getprop_succeeded: bool,
    /// `PREFIX` contains the Termux app id.
    pub termux_prefix: bool,
    /// `ANDROID_ROOT` or `ANDROID_DATA` is set (presence, not value).
    pub android_env_var: bool,
    /// `/system/build.prop` exists on disk.
    pub build_prop_exists: bool,
}

impl AndroidEvidence {
    /// Gather all four signals from the live system.
    ///
    /// A runner failure for `getprop` (not installed on virtually every
    /// non-Android host) simply records that signal as absent.
    pub fn collect(runner: &dyn DiagnosticRunner, env: &EnvSnapshot) -> Self {
        let getprop_succeeded = runner
            .run("getprop", &["ro.build.version.release"])
            .map(|out| out.success)
            .unwrap_or(false);

        Self {
            getprop_succeeded,
            termux_prefix: env
                .prefix
                .as_deref()
                .is_some_and(|p| p.contains(TERMUX_PREFIX_MARKER)),
            android_env_var: env.android_root_set || env.android_data_set,
            build_prop_exists: Path::new(ANDROID_BUILD_PROP).exists(),
        }
    }

    /// Ordered evaluation, first true signal wins. Absence of all evidence
    /// means "not Android" — an accepted limitation of the heuristic.
    pub fn is_android(&self) -> bool {
        self.getprop_succeeded
            || self.termux_prefix
            || self.android_env_var
            || self.build_prop_exists
    }
}

// ---------------------------------------------------------------------------
// Libc detection
// ---------------------------------------------------------------------------

/// The C library family a Linux host exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibcFamily {
    Gnu,
    Musl,
    Unknown,
}

/// Result of probing the host's C library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibcProbe {
    pub family: LibcFamily,
    /// `major.minor` when the family is GNU and a version was extractable.
    /// musl needs no version (its binaries are selected unconditionally).
    pub version: Option<String>,
}

impl LibcProbe {
    pub fn unknown() -> Self {
        Self {
            family: LibcFamily::Unknown,
            version: None,
        }
    }
}

/// Classify the host's libc by interrogating the dynamic linker.
///
/// `ldd --version` is tried first; musl's `ldd` identifies itself in the
/// banner, glibc's prints a version number. When `ldd` runs but yields no
/// parseable version, `getconf GNU_LIBC_VERSION` is consulted as a GNU
/// specific fallback. Only a failure to invoke `ldd` at all classifies the
/// host as `Unknown`.
pub fn detect_libc(runner: &dyn DiagnosticRunner) -> LibcProbe {
    let ldd = match runner.run("ldd", &["--version"]) {
        Ok(out) => out,
        Err(_) => return LibcProbe::unknown(),
    };

    // glibc historically printed the banner on stdout while some builds emit
    // it on stderr. Inspect both.
    let banner = format!("{}{}", ldd.stderr, ldd.stdout);

    if banner.to_lowercase().contains(MUSL_SIGNATURE) {
        return LibcProbe {
            family: LibcFamily::Musl,
            version: None,
        };
    }

    if let Some(version) = extract_major_minor(&banner) {
        return LibcProbe {
            family: LibcFamily::Gnu,
            version: Some(version),
        };
    }

    // GNU-specific fallback. Errors here are ignored; the banner already told
    // us this is not musl, so GNU-without-version is the honest answer.
    if let Ok(out) = runner.run("getconf", &["GNU_LIBC_VERSION"])
        && let Some(version) = extract_major_minor(&out.stdout)
    {
        return LibcProbe {
            family: LibcFamily::Gnu,
            version: Some(version),
        };
    }

    LibcProbe {
        family: LibcFamily::Gnu,
        version: None,
    }
}

/// Extract the first `major.minor` decimal token from free-form text
/// (e.g., "2.39" out of "ldd (Ubuntu GLIBC 2.39-0ubuntu8) 2.39").
///
/// Token boundaries are non-digit, non-dot characters, so "2.39-0ubuntu8"
/// yields "2.39" and a stray "v2.39.1" yields "2.39" from its first two
/// numeric components.
pub fn extract_major_minor(text: &str) -> Option<String> {
    for token in text.split(|c: char| !c.is_ascii_digit() && c != '.') {
        let mut parts = token.split('.');
        if let (Some(major), Some(minor)) = (parts.next(), parts.next())
            && !major.is_empty()
            && !minor.is_empty()
            && major.bytes().all(|b| b.is_ascii_digit())
            && minor.bytes().all(|b| b.is_ascii_digit())
        {
            return Some(format!("{major}.{minor}"));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Scripted runner for tests: maps a program name to a canned outcome.
///
/// Programs without an entry behave as "binary missing" (spawn error), which
/// is exactly how a non-Android host responds to `getprop`.
pub struct FakeRunner {
    responses: HashMap<String, DiagnosticOutput>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    pub fn respond(mut self, program: &str, output: DiagnosticOutput) -> Self {
        self.responses.insert(program.to_string(), output);
        self
    }

    /// Convenience: program succeeds with the given stderr text (where glibc's
    /// `ldd` banner usually lands in practice).
    pub fn respond_stderr(self, program: &str, stderr: &str) -> Self {
        self.respond(
            program,
            DiagnosticOutput {
                success: true,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticRunner for FakeRunner {
    fn run(&self, program: &str, _args: &[&str]) -> std::io::Result<DiagnosticOutput> {
        match self.responses.get(program) {
            Some(out) => Ok(out.clone()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_env() -> EnvSnapshot {
        EnvSnapshot::default()
    }

    // -----------------------------------------------------------------------
    // Android evidence
    // -----------------------------------------------------------------------

    #[test]
    fn no_signals_means_not_android() {
        let runner = FakeRunner::new();
        let evidence = AndroidEvidence::collect(&runner, &empty_env());
        assert!(!evidence.is_android());
    }

    #[test]
    fn getprop_success_alone_is_android() {
        let runner = FakeRunner::new().respond(
            "getprop",
            DiagnosticOutput {
                success: true,
                stdout: "14\n".to_string(),
                stderr: String::new(),
            },
        );
        let evidence = AndroidEvidence::collect(&runner, &empty_env());
        assert!(evidence.is_android());
    }

    #[test]
    fn getprop_output_content_is_irrelevant() {
        // Success with empty output still counts.
        let runner = FakeRunner::new().respond(
            "getprop",
            DiagnosticOutput {
                success: true,
                stdout: String::new(),
                stderr: String::new(),
            },
        );
        let evidence = AndroidEvidence::collect(&runner, &empty_env());
        assert!(evidence.is_android());
    }

    #[test]
    fn getprop_nonzero_exit_is_not_android() {
        let runner = FakeRunner::new().respond(
            "getprop",
            DiagnosticOutput {
                success: false,
                stdout: String::new(),
                stderr: "getprop: not found\n".to_string(),
            },
        );
        let evidence = AndroidEvidence::collect(&runner, &empty_env());
        assert!(!evidence.is_android());
    }

    #[test]
    fn termux_prefix_alone_is_android() {
        let env = EnvSnapshot {
            prefix: Some("/data/data/com.termux/files/usr".to_string()),
            ..EnvSnapshot::default()
        };
        let evidence = AndroidEvidence::collect(&FakeRunner::new(), &env);
        assert!(evidence.is_android());
    }

    #[test]
    fn non_termux_prefix_is_not_android() {
        let env = EnvSnapshot {
            prefix: Some("/usr/local".to_string()),
            ..EnvSnapshot::default()
        };
        let evidence = AndroidEvidence::collect(&FakeRunner::new(), &env);
        assert!(!evidence.is_android());
    }

    #[test]
    fn android_root_alone_is_android() {
        let env = EnvSnapshot {
            android_root_set: true,
            ..EnvSnapshot::default()
        };
        let evidence = AndroidEvidence::collect(&FakeRunner::new(), &env);
        assert!(evidence.is_android());
    }

    #[test]
    fn android_data_alone_is_android() {
        let env = EnvSnapshot {
            android_data_set: true,
            ..EnvSnapshot::default()
        };
        let evidence = AndroidEvidence::collect(&FakeRunner::new(), &env);
        assert!(evidence.is_android());
    }

    #[test]
    fn build_prop_signal_alone_is_android() {
        // Construct the evidence directly; the collector reads the real
        // filesystem and this host is not Android.
        let evidence = AndroidEvidence {
            build_prop_exists: true,
            ..AndroidEvidence::default()
        };
        assert!(evidence.is_android());
    }

    // -----------------------------------------------------------------------
    // Libc detection
    // -----------------------------------------------------------------------

    #[test]
    fn ldd_missing_classifies_unknown() {
        let probe = detect_libc(&FakeRunner::new());
        assert_eq!(probe, LibcProbe::unknown());
    }

    #[test]
    fn musl_signature_on_stderr() {
        let runner = FakeRunner::new().respond_stderr("ldd", "musl libc (x86_64)\nVersion 1.2.5\n");
        let probe = detect_libc(&runner);
        assert_eq!(probe.family, LibcFamily::Musl);
        assert_eq!(probe.version, None);
    }

    #[test]
    fn musl_signature_wins_over_version_text() {
        // musl's banner contains a version number too; the signature must
        // short-circuit before any version extraction.
        let runner = FakeRunner::new().respond_stderr("ldd", "musl libc\nVersion 1.2.5\n");
        let probe = detect_libc(&runner);
        assert_eq!(probe.family, LibcFamily::Musl);
    }

    #[test]
    fn glibc_banner_on_stderr_yields_gnu_version() {
        let runner =
            FakeRunner::new().respond_stderr("ldd", "ldd (Ubuntu GLIBC 2.39-0ubuntu8.4) 2.39\n");
        let probe = detect_libc(&runner);
        assert_eq!(probe.family, LibcFamily::Gnu);
        assert_eq!(probe.version.as_deref(), Some("2.39"));
    }

    #[test]
    fn glibc_banner_on_stdout_yields_gnu_version() {
        let runner = FakeRunner::new().respond(
            "ldd",
            DiagnosticOutput {
                success: true,
                stdout: "ldd (GNU libc) 2.31\n".to_string(),
                stderr: String::new(),
            },
        );
        let probe = detect_libc(&runner);
        assert_eq!(probe.family, LibcFamily::Gnu);
        assert_eq!(probe.version.as_deref(), Some("2.31"));
    }

    #[test]
    fn getconf_fallback_when_ldd_has_no_version() {
        let runner = FakeRunner::new()
            .respond_stderr("ldd", "usage: ldd [OPTION]... FILE...\n")
            .respond(
                "getconf",
                DiagnosticOutput {
                    success: true,
                    stdout: "glibc 2.40\n".to_string(),
                    stderr: String::new(),
                },
            );
        let probe = detect_libc(&runner);
        assert_eq!(probe.family, LibcFamily::Gnu);
        assert_eq!(probe.version.as_deref(), Some("2.40"));
    }

    #[test]
    fn no_version_anywhere_is_gnu_without_version() {
        let runner = FakeRunner::new().respond_stderr("ldd", "usage: ldd FILE\n");
        let probe = detect_libc(&runner);
        assert_eq!(probe.family, LibcFamily::Gnu);
        assert_eq!(probe.version, None);
    }

    // -----------------------------------------------------------------------
    // Version token extraction
    // -----------------------------------------------------------------------

    #[test]
    fn extracts_first_major_minor() {
        assert_eq!(
            extract_major_minor("ldd (GNU libc) 2.39").as_deref(),
            Some("2.39")
        );
    }

    #[test]
    fn extracts_from_distro_decorated_version() {
        assert_eq!(
            extract_major_minor("ldd (Ubuntu GLIBC 2.35-0ubuntu3) 2.35").as_deref(),
            Some("2.35")
        );
    }

    #[test]
    fn extracts_major_minor_from_three_component_version() {
        assert_eq!(extract_major_minor("glibc 2.39.1").as_deref(), Some("2.39"));
    }

    #[test]
    fn no_version_token_yields_none() {
        assert_eq!(extract_major_minor("no digits here"), None);
        assert_eq!(extract_major_minor("lonely 2 and . apart"), None);
        assert_eq!(extract_major_minor(""), None);
    }
}
