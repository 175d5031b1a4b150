//! Binary resolution: map the classified host to exactly one prebuilt binary.
//!
//! The compatibility table below is the single source of truth for which
//! target triples ship in the install tree. Resolution is total and
//! deterministic: identical inputs always yield the same `Resolution`, and a
//! host outside the table yields `Unsupported` rather than an error or a
//! guess.

use std::env;
use std::path::{Path, PathBuf};

use crate::policy::LibcChoice;

/// Absolute override: short-circuits resolution entirely, returned verbatim.
pub const BINARY_PATH_ENV_VAR: &str = "PAWS_BINARY_PATH";

/// When set to `1` on Linux, skips the libc probe and forces musl.
pub const FORCE_MUSL_ENV_VAR: &str = "FORCE_MUSL";

/// Android signal env vars (presence matters, values do not).
pub const ANDROID_ROOT_ENV_VAR: &str = "ANDROID_ROOT";
pub const ANDROID_DATA_ENV_VAR: &str = "ANDROID_DATA";

/// Termux sets this to its app-private usr prefix.
pub const PREFIX_ENV_VAR: &str = "PREFIX";

/// Subdirectory of the launcher's install location holding the binaries.
const BIN_DIR_NAME: &str = "bin";

// ---------------------------------------------------------------------------
// Host classification
// ---------------------------------------------------------------------------

/// CPU architecture of the host, normalized to the install tree's naming.
///
/// Anything outside the two shipped architectures is `Unrecognized` — a
/// legitimate state that resolves to `Unsupported`, never a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArch {
    X64,
    Arm64,
    Unrecognized,
}

impl HostArch {
    /// Classify the architecture this launcher was compiled for.
    pub fn detect() -> Self {
        Self::from_raw(env::consts::ARCH)
    }

    /// Normalize a raw `std::env::consts::ARCH` value.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "x86_64" => HostArch::X64,
            "aarch64" => HostArch::Arm64,
            _ => HostArch::Unrecognized,
        }
    }

    /// Directory name under `bin/<os>/` for this architecture.
    pub fn dir_name(self) -> Option<&'static str> {
        match self {
            HostArch::X64 => Some("x64"),
            HostArch::Arm64 => Some("arm64"),
            HostArch::Unrecognized => None,
        }
    }
}

/// Operating system as reported by the platform, before Android refinement.
///
/// Android never appears here: no OS reports it directly. It is derived from
/// `Linux` plus heuristic evidence and layered on as [`EffectiveOs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Linux,
    Windows,
    Unrecognized,
}

impl HostOs {
    /// Classify the OS this launcher was compiled for.
    pub fn detect() -> Self {
        Self::from_raw(env::consts::OS)
    }

    /// Normalize a raw `std::env::consts::OS` value.
    ///
    /// A launcher compiled for an Android target reports `"android"` here;
    /// it is classified as Linux so the evidence-based refinement stays the
    /// single path that produces [`EffectiveOs::Android`].
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "macos" => HostOs::MacOs,
            "linux" | "android" => HostOs::Linux,
            "windows" => HostOs::Windows,
            _ => HostOs::Unrecognized,
        }
    }

    /// Refine the observed OS with the Android evidence verdict.
    pub fn refine(self, is_android: bool) -> EffectiveOs {
        match self {
            HostOs::Linux if is_android => EffectiveOs::Android,
            HostOs::MacOs => EffectiveOs::MacOs,
            HostOs::Linux => EffectiveOs::Linux,
            HostOs::Windows => EffectiveOs::Windows,
            HostOs::Unrecognized => EffectiveOs::Unrecognized,
        }
    }
}

/// Operating system after Android refinement; the table's OS dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveOs {
    MacOs,
    Linux,
    Windows,
    Android,
    Unrecognized,
}

impl EffectiveOs {
    /// Directory name under `bin/` for this OS. These are the raw platform
    /// names the install tree has always used.
    pub fn dir_name(self) -> Option<&'static str> {
        match self {
            EffectiveOs::MacOs => Some("darwin"),
            EffectiveOs::Linux => Some("linux"),
            EffectiveOs::Windows => Some("win32"),
            EffectiveOs::Android => Some("android"),
            EffectiveOs::Unrecognized => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Environment snapshot
// ---------------------------------------------------------------------------

/// Read-once snapshot of every environment variable resolution consults.
///
/// Captured at startup and immutable afterwards, so the probe, resolver, and
/// tests all see one coherent view instead of racing on process-global env.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    /// `PAWS_BINARY_PATH`, taken verbatim.
    pub binary_path_override: Option<String>,
    /// `FORCE_MUSL` was set to exactly `1`.
    pub force_musl: bool,
    /// `PREFIX` value, inspected for the Termux marker.
    pub prefix: Option<String>,
    pub android_root_set: bool,
    pub android_data_set: bool,
}

impl EnvSnapshot {
    /// Capture the live process environment.
    pub fn capture() -> Self {
        Self {
            binary_path_override: env::var(BINARY_PATH_ENV_VAR).ok(),
            force_musl: env::var(FORCE_MUSL_ENV_VAR).is_ok_and(|v| v == "1"),
            prefix: env::var(PREFIX_ENV_VAR).ok(),
            android_root_set: env::var(ANDROID_ROOT_ENV_VAR).is_ok(),
            android_data_set: env::var(ANDROID_DATA_ENV_VAR).is_ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compatibility table
// ---------------------------------------------------------------------------

/// One officially supported (OS, arch[, libc]) combination and its binary.
#[derive(Debug, Clone, Copy)]
pub struct BinaryTarget {
    pub os: EffectiveOs,
    pub arch: HostArch,
    /// `Some` only for Linux, where binaries come in two libc flavors.
    pub libc: Option<LibcChoice>,
    /// Filename embedding the target triple (`.exe` suffixed on Windows).
    pub filename: &'static str,
}

/// Every shipped binary. A combination absent here is unsupported by
/// definition; the table is never consulted for overrides.
pub const COMPATIBILITY_TABLE: &[BinaryTarget] = &[
    BinaryTarget {
        os: EffectiveOs::MacOs,
        arch: HostArch::X64,
        libc: None,
        filename: "paws-x86_64-apple-darwin",
    },
    BinaryTarget {
        os: EffectiveOs::MacOs,
        arch: HostArch::Arm64,
        libc: None,
        filename: "paws-aarch64-apple-darwin",
    },
    BinaryTarget {
        os: EffectiveOs::Linux,
        arch: HostArch::X64,
        libc: Some(LibcChoice::Gnu),
        filename: "paws-x86_64-unknown-linux-gnu",
    },
    BinaryTarget {
        os: EffectiveOs::Linux,
        arch: HostArch::X64,
        libc: Some(LibcChoice::Musl),
        filename: "paws-x86_64-unknown-linux-musl",
    },
    BinaryTarget {
        os: EffectiveOs::Linux,
        arch: HostArch::Arm64,
        libc: Some(LibcChoice::Gnu),
        filename: "paws-aarch64-unknown-linux-gnu",
    },
    BinaryTarget {
        os: EffectiveOs::Linux,
        arch: HostArch::Arm64,
        libc: Some(LibcChoice::Musl),
        filename: "paws-aarch64-unknown-linux-musl",
    },
    BinaryTarget {
        os: EffectiveOs::Windows,
        arch: HostArch::X64,
        libc: None,
        filename: "paws-x86_64-pc-windows-msvc.exe",
    },
    BinaryTarget {
        os: EffectiveOs::Windows,
        arch: HostArch::Arm64,
        libc: None,
        filename: "paws-aarch64-pc-windows-msvc.exe",
    },
    BinaryTarget {
        os: EffectiveOs::Android,
        arch: HostArch::Arm64,
        libc: None,
        filename: "paws-aarch64-linux-android",
    },
];

/// Table lookup. `libc` participates only for entries that carry a flavor.
fn lookup(os: EffectiveOs, arch: HostArch, libc: Option<LibcChoice>) -> Option<&'static str> {
    COMPATIBILITY_TABLE
        .iter()
        .find(|t| t.os == os && t.arch == arch && t.libc == libc)
        .map(|t| t.filename)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of binary resolution. Total: no partial or ambiguous states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `PAWS_BINARY_PATH` override, verbatim and unvalidated.
    Override(PathBuf),
    /// Table hit: full path into the install tree.
    Found(PathBuf),
    /// No table entry for this host. The delegate turns this into the fatal
    /// user-visible error.
    Unsupported,
}

impl Resolution {
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Resolution::Override(p) | Resolution::Found(p) => Some(p),
            Resolution::Unsupported => None,
        }
    }
}

/// Resolve the binary for a classified host against an install tree rooted at
/// `base_dir`.
///
/// `android` is the Android-evidence verdict for this run; `libc` supplies the
/// policy choice lazily, so non-Linux hosts (and `FORCE_MUSL` runs) never pay
/// for a libc probe.
pub fn resolve_in(
    base_dir: &Path,
    arch: HostArch,
    os: HostOs,
    env: &EnvSnapshot,
    android: bool,
    libc: impl FnOnce() -> LibcChoice,
) -> Resolution {
    // The override beats everything, including the Android branch.
    if let Some(path) = &env.binary_path_override {
        return Resolution::Override(PathBuf::from(path));
    }

    let effective_os = os.refine(android);

    let chosen_libc = match effective_os {
        EffectiveOs::Linux => {
            if env.force_musl {
                Some(LibcChoice::Musl)
            } else {
                Some(libc())
            }
        }
        _ => None,
    };

    match lookup(effective_os, arch, chosen_libc) {
        Some(filename) => {
            // Both dir_name calls are Some here: lookup only succeeds for
            // recognized OS/arch combinations.
            let (Some(os_dir), Some(arch_dir)) = (effective_os.dir_name(), arch.dir_name()) else {
                return Resolution::Unsupported;
            };
            Resolution::Found(
                base_dir
                    .join(BIN_DIR_NAME)
                    .join(os_dir)
                    .join(arch_dir)
                    .join(filename),
            )
        }
        None => Resolution::Unsupported,
    }
}

/// Resolve against the real install tree, rooted next to the launcher binary.
pub fn resolve(
    arch: HostArch,
    os: HostOs,
    env: &EnvSnapshot,
    android: bool,
    libc: impl FnOnce() -> LibcChoice,
) -> Resolution {
    let base_dir = launcher_dir().unwrap_or_else(|| PathBuf::from("."));
    resolve_in(&base_dir, arch, os, env, android, libc)
}

/// Directory containing the launcher's own executable.
fn launcher_dir() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
