//! Version requests and the cache-version key.

use regex::Regex;
use semver::Version;
use std::fmt;
use std::sync::OnceLock;

/// The sentinel meaning "always re-resolve the newest release".
pub const LATEST: &str = "latest";

/// A user-supplied version request.
///
/// # Example
///
/// ```rust
/// use clj_provision::VersionRequest;
///
/// assert!(VersionRequest::parse("latest").is_latest());
/// assert_eq!(VersionRequest::parse("1.2.3").pinned(), Some("1.2.3"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionRequest {
    /// The `latest` sentinel.
    Latest,
    /// A concrete version string, kept verbatim.
    Pinned(String),
}

impl VersionRequest {
    /// Interpret an input string. Only the exact sentinel `latest` maps to
    /// [`VersionRequest::Latest`]; the input is not trimmed.
    pub fn parse(input: &str) -> Self {
        if input == LATEST {
            Self::Latest
        } else {
            Self::Pinned(input.to_string())
        }
    }

    /// Whether this is the `latest` sentinel.
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    /// The pinned version, if any.
    pub fn pinned(&self) -> Option<&str> {
        match self {
            Self::Latest => None,
            Self::Pinned(v) => Some(v),
        }
    }

    /// The version component of the cache key.
    ///
    /// `latest` passes through unchanged, so `latest` entries live under
    /// their own key and are never shared with a pinned request. Every
    /// other string is used verbatim.
    pub fn cache_version(&self) -> &str {
        match self {
            Self::Latest => LATEST,
            Self::Pinned(v) => v,
        }
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_version())
    }
}

/// Cache-version normalization over a raw string.
pub fn normalize(version: &str) -> String {
    VersionRequest::parse(version).cache_version().to_string()
}

/// Version syntax a tool accepts for pinned requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VersionSyntax {
    /// Full semantic version (`1.3.186`, `2.8.3`).
    Semver,
    /// `X.Y.Z` with an optional `-suffix` (`2.11.2`, `2.10.0-RC1`).
    DottedWithSuffix,
    /// Four numeric components (`1.11.1.1435`).
    FourPart,
    /// Three numeric components, leading zeros allowed (`2024.03.13`).
    ThreePart,
}

impl VersionSyntax {
    /// Check a pinned version, returning the form used in download URLs.
    ///
    /// A single leading `v` is accepted and stripped when `allow_v_prefix`
    /// is set.
    pub(crate) fn check<'a>(&self, version: &'a str, allow_v_prefix: bool) -> Option<&'a str> {
        let candidate = if allow_v_prefix {
            version.strip_prefix('v').unwrap_or(version)
        } else {
            version
        };

        let ok = match self {
            Self::Semver => Version::parse(candidate).is_ok(),
            Self::DottedWithSuffix => dotted_with_suffix().is_match(candidate),
            Self::FourPart => four_part().is_match(candidate),
            Self::ThreePart => three_part().is_match(candidate),
        };
        ok.then_some(candidate)
    }

    /// Short description for error messages.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Semver => "a semantic version such as 1.2.3",
            Self::DottedWithSuffix => "a version such as 2.11.2 or 2.10.0-RC1",
            Self::FourPart => "a four-part version such as 1.11.1.1435",
            Self::ThreePart => "a three-part version such as 2024.03.13",
        }
    }
}

fn dotted_with_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compiled(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.]+)?$"))
}

fn four_part() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compiled(r"^\d+\.\d+\.\d+\.\d+$"))
}

fn three_part() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compiled(r"^\d+\.\d+\.\d+$"))
}

fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid version regex")
}
