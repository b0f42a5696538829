//! Release version parsing and comparison.
//!
//! Modules in a stack use two conventions: dashed releases (`v01-17-10`,
//! `v00-09-06-pre`) and dotted numbers (`4.8.7`, `2.0.4.5`). Both parse into a
//! list of numeric components compared left to right, with missing trailing
//! components treated as zero. A trailing alphabetic suffix is ignored.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d+(?:[.-]\d+)*)(?:[-_.+][A-Za-z][\w.+-]*)?$")
        .expect("version pattern is valid")
});

/// Result of comparing a detected version against a required one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    Older,
    Equal,
    Newer,
}

impl VersionOrdering {
    /// Equal or newer than the requirement.
    pub fn is_at_least(&self) -> bool {
        !matches!(self, VersionOrdering::Older)
    }

    /// Older than or equal to the requirement.
    pub fn is_at_most(&self) -> bool {
        !matches!(self, VersionOrdering::Newer)
    }
}

impl From<Ordering> for VersionOrdering {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => VersionOrdering::Older,
            Ordering::Equal => VersionOrdering::Equal,
            Ordering::Greater => VersionOrdering::Newer,
        }
    }
}

/// A version string that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed version `{version}`")]
pub struct MalformedVersion {
    pub version: String,
}

/// What to do when a detected version cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedVersionPolicy {
    /// Treat the module as newer than any requirement (development checkouts
    /// such as `HEAD` land here)
    #[default]
    AssumeNewer,
    /// Abort the run
    Fatal,
}

impl FromStr for MalformedVersionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assume-newer" => Ok(MalformedVersionPolicy::AssumeNewer),
            "fatal" => Ok(MalformedVersionPolicy::Fatal),
            _ => Err(format!(
                "invalid version policy '{}'; expected 'assume-newer' or 'fatal'",
                s
            )),
        }
    }
}

/// A parsed release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    components: Vec<u64>,
}

impl ReleaseVersion {
    /// Parse a version string in either convention.
    pub fn parse(s: &str) -> Result<Self, MalformedVersion> {
        let malformed = || MalformedVersion {
            version: s.to_string(),
        };

        let caps = VERSION_RE.captures(s.trim()).ok_or_else(malformed)?;
        let components = caps[1]
            .split(['.', '-'])
            .map(|c| c.parse::<u64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReleaseVersion { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Component-wise comparison, padding the shorter version with zeros.
    pub fn compare(&self, other: &ReleaseVersion) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Compare `current` against `required`.
pub fn evaluate(current: &str, required: &str) -> Result<VersionOrdering, MalformedVersion> {
    let current = ReleaseVersion::parse(current)?;
    let required = ReleaseVersion::parse(required)?;
    Ok(current.compare(&required).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashed_versions() {
        assert_eq!(
            evaluate("v00-09-05", "v00-09-06").unwrap(),
            VersionOrdering::Older
        );
        assert_eq!(
            evaluate("v00-09-06", "v00-09-06").unwrap(),
            VersionOrdering::Equal
        );
        assert_eq!(
            evaluate("v01-00", "v00-09-06").unwrap(),
            VersionOrdering::Newer
        );
    }

    #[test]
    fn test_dotted_versions() {
        assert_eq!(evaluate("3.3.8", "4.0").unwrap(), VersionOrdering::Older);
        assert_eq!(evaluate("4.8.7", "4.0").unwrap(), VersionOrdering::Newer);
        assert_eq!(evaluate("2.0.4.5", "2.0.4.6").unwrap(), VersionOrdering::Older);
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(evaluate("4", "4.0.0").unwrap(), VersionOrdering::Equal);
        assert_eq!(evaluate("v01", "v01-00-00").unwrap(), VersionOrdering::Equal);
    }

    #[test]
    fn test_suffix_is_ignored() {
        assert_eq!(
            evaluate("v01-12-03-pre", "v01-12-03").unwrap(),
            VersionOrdering::Equal
        );
        assert_eq!(evaluate("4.8.7-rc1", "4.8.7").unwrap(), VersionOrdering::Equal);
    }

    #[test]
    fn test_malformed() {
        let err = evaluate("HEAD", "v00-09-06").unwrap_err();
        assert_eq!(err.version, "HEAD");
        assert!(evaluate("v01-00", "").is_err());
        assert!(ReleaseVersion::parse("1..2").is_err());
    }

    #[test]
    fn test_ordering_helpers() {
        assert!(VersionOrdering::Equal.is_at_least());
        assert!(VersionOrdering::Equal.is_at_most());
        assert!(!VersionOrdering::Older.is_at_least());
        assert!(!VersionOrdering::Newer.is_at_most());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "assume-newer".parse::<MalformedVersionPolicy>(),
            Ok(MalformedVersionPolicy::AssumeNewer)
        );
        assert_eq!(
            "Fatal".parse::<MalformedVersionPolicy>(),
            Ok(MalformedVersionPolicy::Fatal)
        );
        assert!("ignore".parse::<MalformedVersionPolicy>().is_err());
    }
}
