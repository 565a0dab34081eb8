//! Release version parsing for the update badge.
//!
//! Accepts `MAJOR.MINOR.PATCH` with an optional leading `v` and an optional
//! `-pre.release` suffix. Build metadata (`+...`) is ignored.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d+)\.(\d+)\.(\d+)(?:-([0-9A-Za-z.-]+))?(?:\+[0-9A-Za-z.-]+)?$")
        .expect("valid regex")
});

/// One dot-separated pre-release identifier. Numeric identifiers sort before
/// alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreIdent {
    Numeric(u64),
    Alpha(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<PreIdent>,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::Validation(format!("Invalid version string: '{input}'"));
        let caps = VERSION_RE.captures(input.trim()).ok_or_else(invalid)?;
        let number = |i: usize| caps[i].parse::<u64>().map_err(|_| invalid());

        let pre = match caps.get(4) {
            Some(m) => m
                .as_str()
                .split('.')
                .map(|ident| {
                    if ident.is_empty() {
                        Err(invalid())
                    } else if ident.bytes().all(|b| b.is_ascii_digit()) {
                        ident.parse().map(PreIdent::Numeric).map_err(|_| invalid())
                    } else {
                        Ok(PreIdent::Alpha(ident.to_string()))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // A release outranks any of its pre-releases.
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        for (i, ident) in self.pre.iter().enumerate() {
            f.write_str(if i == 0 { "-" } else { "." })?;
            match ident {
                PreIdent::Numeric(n) => write!(f, "{n}")?,
                PreIdent::Alpha(s) => f.write_str(s)?,
            }
        }
        Ok(())
    }
}

/// Whether `latest` is newer than `current`. Unparseable input never
/// advertises an update.
pub fn update_available(current: &str, latest: &str) -> bool {
    match (Version::parse(current), Version::parse(latest)) {
        (Ok(current), Ok(latest)) => latest > current,
        _ => false,
    }
}
