//! Libc compatibility policy: which Linux binary flavor to run.
//!
//! The GNU binaries are dynamically linked against glibc 2.39; running them on
//! an older glibc fails at exec time with a symbol-version error. The musl
//! binaries are statically linked and run anywhere. The policy is therefore
//! deliberately asymmetric: GNU is chosen only on positive proof of a
//! sufficient glibc, and every uncertain outcome falls back to musl.

use std::cmp::Ordering;

use crate::probe::{LibcFamily, LibcProbe};

/// Minimum glibc the GNU binaries were built against.
pub const MIN_GLIBC: LibcVersion = LibcVersion {
    major: 2,
    minor: 39,
};

/// A `major.minor` glibc version, compared numerically per component.
///
/// Numeric comparison matters: "2.4" < "2.39" as floats but 2.4 < 2.39 is
/// false component-wise, and glibc minor versions routinely exceed 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibcVersion {
    pub major: u32,
    pub minor: u32,
}

impl LibcVersion {
    /// Parse a strict `major.minor` string. Anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let (major, minor) = text.trim().split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl PartialOrd for LibcVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LibcVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor).cmp(&(other.major, other.minor))
    }
}

/// The two Linux binary flavors shipped in the install tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibcChoice {
    Gnu,
    Musl,
}

impl LibcChoice {
    /// Directory/table key for this flavor.
    pub fn as_str(self) -> &'static str {
        match self {
            LibcChoice::Gnu => "gnu",
            LibcChoice::Musl => "musl",
        }
    }
}

/// Decide which Linux binary flavor to run for the probed libc.
///
/// GNU requires all three: family is GNU, a version was extracted, and that
/// version is at least `MIN_GLIBC`. Explicit musl, `Unknown` family, and GNU
/// with a missing or unparseable version all resolve to musl.
pub fn choose_libc(probe: &LibcProbe) -> LibcChoice {
    match probe.family {
        LibcFamily::Gnu => {
            let sufficient = probe
                .version
                .as_deref()
                .and_then(LibcVersion::parse)
                .is_some_and(|v| v >= MIN_GLIBC);
            if sufficient {
                LibcChoice::Gnu
            } else {
                LibcChoice::Musl
            }
        }
        LibcFamily::Musl | LibcFamily::Unknown => LibcChoice::Musl,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gnu(version: Option<&str>) -> LibcProbe {
        LibcProbe {
            family: LibcFamily::Gnu,
            version: version.map(str::to_string),
        }
    }

    #[test]
    fn gnu_at_minimum_version_selects_gnu() {
        assert_eq!(choose_libc(&gnu(Some("2.39"))), LibcChoice::Gnu);
    }

    #[test]
    fn gnu_above_minimum_selects_gnu() {
        assert_eq!(choose_libc(&gnu(Some("2.40"))), LibcChoice::Gnu);
        assert_eq!(choose_libc(&gnu(Some("3.0"))), LibcChoice::Gnu);
    }

    #[test]
    fn gnu_below_minimum_selects_musl() {
        assert_eq!(choose_libc(&gnu(Some("2.38"))), LibcChoice::Musl);
        assert_eq!(choose_libc(&gnu(Some("2.31"))), LibcChoice::Musl);
    }

    #[test]
    fn gnu_short_minor_compares_numerically() {
        // 2.4 is an ancient glibc, not 2.40. Float parsing would get this wrong.
        assert_eq!(choose_libc(&gnu(Some("2.4"))), LibcChoice::Musl);
    }

    #[test]
    fn gnu_without_version_selects_musl() {
        assert_eq!(choose_libc(&gnu(None)), LibcChoice::Musl);
    }

    #[test]
    fn gnu_with_garbage_version_selects_musl() {
        assert_eq!(choose_libc(&gnu(Some("not-a-version"))), LibcChoice::Musl);
        assert_eq!(choose_libc(&gnu(Some("2"))), LibcChoice::Musl);
        assert_eq!(choose_libc(&gnu(Some(""))), LibcChoice::Musl);
    }

    #[test]
    fn musl_family_selects_musl() {
        let probe = LibcProbe {
            family: LibcFamily::Musl,
            version: None,
        };
        assert_eq!(choose_libc(&probe), LibcChoice::Musl);
    }

    #[test]
    fn unknown_family_selects_musl_not_gnu() {
        // The fail-safe asymmetry: uncertainty never resolves to the
        // dynamically linked flavor.
        assert_eq!(choose_libc(&LibcProbe::unknown()), LibcChoice::Musl);
    }

    #[test]
    fn version_ordering_is_component_wise() {
        let v2_39 = LibcVersion::parse("2.39").unwrap();
        let v2_4 = LibcVersion::parse("2.4").unwrap();
        let v2_40 = LibcVersion::parse("2.40").unwrap();
        assert!(v2_4 < v2_39);
        assert!(v2_39 < v2_40);
        assert!(v2_39 >= MIN_GLIBC);
        assert!(v2_4 < MIN_GLIBC);
    }

    #[test]
    fn version_parse_rejects_non_major_minor() {
        assert_eq!(LibcVersion::parse("2"), None);
        assert_eq!(LibcVersion::parse("2."), None);
        assert_eq!(LibcVersion::parse(".39"), None);
        assert_eq!(LibcVersion::parse("a.b"), None);
    }

    #[test]
    fn version_parse_accepts_surrounding_whitespace() {
        assert_eq!(
            LibcVersion::parse(" 2.39\n"),
            Some(LibcVersion {
                major: 2,
                minor: 39
            })
        );
    }
}
