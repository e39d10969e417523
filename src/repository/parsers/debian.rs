// src/repository/parsers/debian.rs

//! Debian/Ubuntu package metadata parser
//!
//! Parses APT `Packages` lists and the dpkg `status` database, which use the
//! RFC 822-like format (similar to email headers with key: value pairs).

use super::PackageRecord;
use crate::error::{Error, Result};
use serde::Deserialize;
use tracing::debug;

/// Status words (third field of `Status:`) for which dpkg has a version on disk
const CURRENT_STATES: &[&str] = &[
    "installed",
    "half-installed",
    "half-configured",
    "unpacked",
    "triggers-awaited",
    "triggers-pending",
];

/// Control stanza structure for rfc822-like parsing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ControlStanza {
    package: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(rename = "Pre-Depends", default)]
    pre_depends: Option<String>,
    #[serde(default)]
    depends: Option<String>,
    #[serde(default)]
    recommends: Option<String>,
    #[serde(default)]
    suggests: Option<String>,
    #[serde(default)]
    conflicts: Option<String>,
    #[serde(default)]
    breaks: Option<String>,
    #[serde(default)]
    provides: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl ControlStanza {
    fn into_record(self, installed: bool) -> Option<PackageRecord> {
        let Some(version) = self.version else {
            debug!("Skipping stanza for {} without a version", self.package);
            return None;
        };

        Some(PackageRecord {
            name: self.package,
            version,
            architecture: self.architecture,
            priority: self.priority,
            pre_depends: self.pre_depends,
            depends: self.depends,
            recommends: self.recommends,
            suggests: self.suggests,
            conflicts: self.conflicts,
            breaks: self.breaks,
            provides: self.provides,
            installed,
        })
    }
}

fn parse_stanzas(content: &str) -> Result<Vec<ControlStanza>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    rfc822_like::from_str(content)
        .map_err(|e| Error::ParseError(format!("Failed to parse control stanzas: {}", e)))
}

/// Whether a `Status:` value means a version of the package is on the system
pub fn is_current_status(status: &str) -> bool {
    status
        .split_whitespace()
        .nth(2)
        .is_some_and(|state| CURRENT_STATES.contains(&state))
}

/// Parse an APT `Packages` list; every record is an available, not installed, version
pub fn parse_packages(content: &str) -> Result<Vec<PackageRecord>> {
    let records: Vec<PackageRecord> = parse_stanzas(content)?
        .into_iter()
        .filter_map(|stanza| stanza.into_record(false))
        .collect();

    debug!("Parsed {} package entries", records.len());
    Ok(records)
}

/// Parse the dpkg status database, keeping only versions present on the system
pub fn parse_status(content: &str) -> Result<Vec<PackageRecord>> {
    let mut records = Vec::new();

    for stanza in parse_stanzas(content)? {
        let current = stanza.status.as_deref().is_some_and(is_current_status);
        if !current {
            debug!(
                "Ignoring {} with status {:?}",
                stanza.package,
                stanza.status.as_deref().unwrap_or("")
            );
            continue;
        }
        records.extend(stanza.into_record(true));
    }

    debug!("Parsed {} installed status entries", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGES: &str = "Package: bash
Version: 5.2.15-2
Architecture: amd64
Priority: required
Pre-Depends: libc6 (>= 2.36), libtinfo6 (>= 6)
Depends: base-files (>= 2.1.12), debianutils (>= 5.6-0.1)
Recommends: bash-completion
Description: GNU Bourne Again SHell
 Bash is an sh-compatible command language interpreter.

Package: mawk
Version: 1.3.4.20200120-3.1
Architecture: amd64
Priority: required
Provides: awk
Description: Pattern scanning and text processing language
";

    const STATUS: &str = "Package: bash
Status: install ok installed
Priority: required
Version: 5.2.15-2
Architecture: amd64

Package: oldlib
Status: deinstall ok config-files
Version: 1.0-1
Architecture: amd64

Package: gone
Status: purge ok not-installed
Architecture: amd64

Package: halfway
Status: install reinstreq half-configured
Version: 0.9-1
Architecture: all
";

    #[test]
    fn test_parse_packages() {
        let records = parse_packages(PACKAGES).unwrap();
        assert_eq!(records.len(), 2);

        let bash = &records[0];
        assert_eq!(bash.name, "bash");
        assert_eq!(bash.version, "5.2.15-2");
        assert_eq!(bash.priority.as_deref(), Some("required"));
        assert_eq!(
            bash.pre_depends.as_deref(),
            Some("libc6 (>= 2.36), libtinfo6 (>= 6)")
        );
        assert_eq!(bash.recommends.as_deref(), Some("bash-completion"));
        assert!(!bash.installed);

        assert_eq!(records[1].provides.as_deref(), Some("awk"));
    }

    #[test]
    fn test_parse_status_keeps_current_versions() {
        let records = parse_status(STATUS).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["bash", "halfway"]);
        assert!(records.iter().all(|r| r.installed));
    }

    #[test]
    fn test_is_current_status() {
        assert!(is_current_status("install ok installed"));
        assert!(is_current_status("hold ok unpacked"));
        assert!(!is_current_status("deinstall ok config-files"));
        assert!(!is_current_status("purge ok not-installed"));
        assert!(!is_current_status("garbage"));
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(parse_packages("").unwrap().is_empty());
        assert!(parse_status("\n\n").unwrap().is_empty());
    }
}
