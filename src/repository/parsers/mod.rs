// src/repository/parsers/mod.rs

//! Package metadata parsers
//!
//! Both APT `Packages` lists and the dpkg `status` database use the
//! RFC 822-like control format, so a single Debian parser covers them.

pub mod debian;

/// One stanza of package metadata, as found in an index or the status file
///
/// Relationship fields are kept as raw text; the universe parses them once
/// every package name is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRecord {
    /// Package name
    pub name: String,

    /// Version string, `[epoch:]upstream[-revision]`
    pub version: String,

    /// Architecture (amd64, all, ...)
    pub architecture: Option<String>,

    /// Priority field (required, important, standard, optional, extra)
    pub priority: Option<String>,

    pub pre_depends: Option<String>,
    pub depends: Option<String>,
    pub recommends: Option<String>,
    pub suggests: Option<String>,
    pub conflicts: Option<String>,
    pub breaks: Option<String>,
    pub provides: Option<String>,

    /// Whether dpkg reports this version as the one currently on the system
    pub installed: bool,
}

impl PackageRecord {
    /// Create a minimal record for testing
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }
}
