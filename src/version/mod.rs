// src/version/mod.rs

//! Version handling and constraint satisfaction for package relations
//!
//! This module provides version parsing and comparison for Debian-style
//! versions (`[epoch:]upstream[-revision]`) using the dpkg ordering rules,
//! plus the relation operators found in `Depends`-style fields.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// A parsed Debian version with epoch, upstream and revision components
#[derive(Debug, Clone)]
pub struct DebVersion {
    pub epoch: u64,
    pub upstream: String,
    pub revision: Option<String>,
}

impl DebVersion {
    /// Parse a Debian version string
    ///
    /// Format: [epoch:]upstream[-revision]
    /// Examples:
    /// - "1.2.3" → epoch=0, upstream="1.2.3", revision=None
    /// - "2:1.2.3" → epoch=2, upstream="1.2.3", revision=None
    /// - "1.2.3-4ubuntu1" → epoch=0, upstream="1.2.3", revision=Some("4ubuntu1")
    /// - "1:2.3-rc1-5" → epoch=1, upstream="2.3-rc1", revision=Some("5")
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty version string".to_string()));
        }
        if s.contains(char::is_whitespace) {
            return Err(Error::ParseError(format!(
                "Version '{}' contains whitespace",
                s
            )));
        }

        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => {
                let epoch = e.parse::<u64>().map_err(|_| {
                    Error::ParseError(format!("Invalid epoch '{}' in version '{}'", e, s))
                })?;
                (epoch, r)
            }
            None => (0, s),
        };

        // The revision starts after the last hyphen; upstream may contain hyphens
        let (upstream, revision) = match rest.rsplit_once('-') {
            Some((u, r)) => (u.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };

        if upstream.is_empty() {
            return Err(Error::ParseError(format!(
                "Empty upstream component in '{}'",
                s
            )));
        }
        if !upstream.starts_with(|c: char| c.is_ascii_digit()) {
            tracing::debug!("Version '{}' does not start with a digit", s);
        }

        Ok(Self {
            epoch,
            upstream,
            revision,
        })
    }

    /// Compare two Debian versions
    pub fn compare(&self, other: &DebVersion) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(&self.upstream, &other.upstream))
            .then_with(|| {
                verrevcmp(
                    self.revision.as_deref().unwrap_or(""),
                    other.revision.as_deref().unwrap_or(""),
                )
            })
    }
}

/// Sort weight of a single character in the non-digit parts of a version
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

/// dpkg's alternating non-digit/digit comparison
fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let digit_at = |s: &[u8], i: usize| s.get(i).is_some_and(|c| c.is_ascii_digit());
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        // Non-digit prefix, compared with '~' sorting before everything
        while (i < a.len() && !digit_at(a, i)) || (j < b.len() && !digit_at(b, j)) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        // Numeric part, leading zeros ignored
        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while digit_at(a, i) && digit_at(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
        if digit_at(a, i) {
            return Ordering::Greater;
        }
        if digit_at(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(ref revision) = self.revision {
            write!(f, "-{}", revision)?;
        }
        Ok(())
    }
}

impl PartialEq for DebVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for DebVersion {}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Relation operators allowed in Debian relationship fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any version is acceptable
    Any,
    /// `<<` strictly earlier
    LessThan(DebVersion),
    /// `<=` earlier or equal
    LessOrEqual(DebVersion),
    /// `=` exactly equal
    Exact(DebVersion),
    /// `>=` later or equal
    GreaterOrEqual(DebVersion),
    /// `>>` strictly later
    GreaterThan(DebVersion),
}

impl VersionConstraint {
    /// Parse the inside of a relation's parentheses
    ///
    /// Examples:
    /// - ">= 1.2-3" → GreaterOrEqual(1.2-3)
    /// - "<< 2.0" → LessThan(2.0)
    /// - "= 1:1.5" → Exact(1:1.5)
    ///
    /// The obsolete `<` and `>` operators mean `<=` and `>=`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Ok(VersionConstraint::Any);
        }

        let constraint = if let Some(rest) = s.strip_prefix("<<") {
            VersionConstraint::LessThan(DebVersion::parse(rest)?)
        } else if let Some(rest) = s.strip_prefix("<=") {
            VersionConstraint::LessOrEqual(DebVersion::parse(rest)?)
        } else if let Some(rest) = s.strip_prefix(">>") {
            VersionConstraint::GreaterThan(DebVersion::parse(rest)?)
        } else if let Some(rest) = s.strip_prefix(">=") {
            VersionConstraint::GreaterOrEqual(DebVersion::parse(rest)?)
        } else if let Some(rest) = s.strip_prefix('=') {
            VersionConstraint::Exact(DebVersion::parse(rest)?)
        } else if let Some(rest) = s.strip_prefix('<') {
            VersionConstraint::LessOrEqual(DebVersion::parse(rest)?)
        } else if let Some(rest) = s.strip_prefix('>') {
            VersionConstraint::GreaterOrEqual(DebVersion::parse(rest)?)
        } else {
            return Err(Error::ParseError(format!(
                "Missing relation operator in '{}'",
                s
            )));
        };

        Ok(constraint)
    }

    /// Check if a version satisfies this constraint
    pub fn satisfies(&self, version: &DebVersion) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::LessThan(v) => version < v,
            VersionConstraint::LessOrEqual(v) => version <= v,
            VersionConstraint::Exact(v) => version == v,
            VersionConstraint::GreaterOrEqual(v) => version >= v,
            VersionConstraint::GreaterThan(v) => version > v,
        }
    }

    /// Whether the constraint restricts the version at all
    pub fn is_versioned(&self) -> bool {
        !matches!(self, VersionConstraint::Any)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, ""),
            VersionConstraint::LessThan(v) => write!(f, "<< {}", v),
            VersionConstraint::LessOrEqual(v) => write!(f, "<= {}", v),
            VersionConstraint::Exact(v) => write!(f, "= {}", v),
            VersionConstraint::GreaterOrEqual(v) => write!(f, ">= {}", v),
            VersionConstraint::GreaterThan(v) => write!(f, ">> {}", v),
        }
    }
}
