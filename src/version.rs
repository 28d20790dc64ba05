//! version
//!
//! Spec version numbers and their compatibility rule.
//!
//! # Compatibility
//!
//! A provided version satisfies a requested one when the majors match and
//! the provided minor is at least the requested minor. Series 0 is the
//! exception: pre-1.0 specs guarantee nothing across minors, so a 0.x
//! version satisfies only its exact minor.
//!
//! # Example
//!
//! ```
//! use specbind::version::Version;
//!
//! let provided = Version::parse("v1.3").unwrap();
//! let requested = Version::parse("1.1").unwrap();
//! assert!(provided.satisfies(&requested));
//! assert!(!requested.satisfies(&provided));
//! ```

use serde::{Deserialize, Serialize};

use crate::fault::{Fault, FaultKind};

/// A `major.minor` spec version.
///
/// Ordering is by major, then minor. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major version. Incompatible across values; series 0 is
    /// experimental.
    pub major: u64,
    /// Minor version. Backwards-compatible within a major series >= 1.
    pub minor: u64,
}

impl Version {
    /// Create a version from its parts.
    pub fn new(major: u64, minor: u64) -> Self {
        Version { major, minor }
    }

    /// Parse `"<major>.<minor>"` or `"v<major>.<minor>"`.
    ///
    /// # Errors
    ///
    /// Returns a `VersionParse` fault on any other shape.
    pub fn parse(input: &str) -> Result<Self, Fault> {
        let malformed = || {
            Fault::new(FaultKind::VersionParse {
                input: input.to_string(),
            })
        };
        let digits = input.strip_prefix('v').unwrap_or(input);
        let (major, minor) = digits.split_once('.').ok_or_else(malformed)?;
        let major = major.parse().map_err(|_| malformed())?;
        let minor = minor.parse().map_err(|_| malformed())?;
        Ok(Version { major, minor })
    }

    /// Whether this version can serve a request for `requested`.
    ///
    /// True when the majors are equal and `self.minor >= requested.minor`;
    /// for major 0, only an identical minor qualifies.
    pub fn satisfies(&self, requested: &Version) -> bool {
        if self.major != requested.major {
            return false;
        }
        if self.major == 0 {
            return self.minor == requested.minor;
        }
        self.minor >= requested.minor
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

impl std::str::FromStr for Version {
    type Err = Fault;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Version::parse(input)
    }
}

impl TryFrom<String> for Version {
    type Error = Fault;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Version::parse(&input)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_v_prefixed_forms() {
        assert_eq!(Version::parse("1.0").unwrap(), Version::new(1, 0));
        assert_eq!(Version::parse("v2.13").unwrap(), Version::new(2, 13));
        assert_eq!(Version::parse("v0.1").unwrap(), Version::new(0, 1));
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", "v", "1", "v1", "1.x", "x.1", "1.2.3", "one.two"] {
            let fault = Version::parse(input).unwrap_err();
            assert_eq!(fault.code(), "VersionParse", "input {input:?}");
        }
    }

    #[test]
    fn orders_by_major_then_minor() {
        assert!(Version::new(0, 9) < Version::new(1, 0));
        assert!(Version::new(1, 0) < Version::new(1, 2));
        assert!(Version::new(2, 0) > Version::new(1, 99));
    }

    #[test]
    fn later_minors_satisfy_earlier_requests() {
        assert!(Version::new(1, 3).satisfies(&Version::new(1, 1)));
        assert!(Version::new(1, 1).satisfies(&Version::new(1, 1)));
        assert!(!Version::new(1, 0).satisfies(&Version::new(1, 1)));
    }

    #[test]
    fn majors_never_cross_satisfy() {
        assert!(!Version::new(2, 0).satisfies(&Version::new(1, 0)));
        assert!(!Version::new(1, 9).satisfies(&Version::new(2, 0)));
    }

    #[test]
    fn series_zero_requires_exact_minor() {
        assert!(Version::new(0, 1).satisfies(&Version::new(0, 1)));
        assert!(!Version::new(0, 2).satisfies(&Version::new(0, 1)));
        assert!(!Version::new(0, 1).satisfies(&Version::new(0, 2)));
    }

    #[test]
    fn displays_with_v_prefix() {
        assert_eq!(Version::new(0, 1).to_string(), "v0.1");
        assert_eq!(Version::new(12, 34).to_string(), "v12.34");
    }
}
