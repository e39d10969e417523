// src/scan/overrides.rs

//! Exclusion and inclusion lists
//!
//! Both lists are line oriented. Blank lines and lines starting with `#` are
//! skipped. Every other line of the exclusion list names a package. A line
//! of the inclusion list is either a `Priority: <tier>` directive selecting
//! the base set, or a package, optionally as `name=version`.
//!
//! Names that cannot be resolved produce warnings; loading never fails on
//! them.

use crate::error::{Error, Result};
use crate::universe::{PackageId, Policy, Priority, Universe, VersionId};
use crate::version::DebVersion;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

const PRIORITY_DIRECTIVE: &str = "Priority: ";

/// Resolved override lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overrides {
    /// Packages that must not be installed, in list order
    pub excluded: Vec<PackageId>,
    /// Packages that must be installed, with the version to install
    pub included: Vec<(PackageId, VersionId)>,
    /// Candidates at or above this tier form the base set
    pub reference_priority: Priority,
    /// Lines that could not be resolved
    pub warnings: Vec<String>,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            excluded: Vec::new(),
            included: Vec::new(),
            reference_priority: Priority::Required,
            warnings: Vec::new(),
        }
    }
}

impl Overrides {
    /// Read both lists from disk; a missing file counts as empty
    pub fn load(universe: &Universe, policy: &Policy, no: &Path, yes: &Path) -> Result<Self> {
        let no_text = read_list(no)?;
        let yes_text = read_list(yes)?;
        Ok(Self::parse(universe, policy, &no_text, &yes_text))
    }

    /// Resolve list contents against the universe
    pub fn parse(universe: &Universe, policy: &Policy, no: &str, yes: &str) -> Self {
        let mut overrides = Self::default();
        let mut seen = BTreeSet::new();

        for line in entries(no) {
            match resolve_name(universe, line) {
                Ok(pkg) => {
                    if seen.insert(pkg) {
                        overrides.excluded.push(pkg);
                    }
                }
                Err(message) => overrides.warn(message),
            }
        }

        for line in entries(yes) {
            if let Some(tier) = line.strip_prefix(PRIORITY_DIRECTIVE) {
                match parse_tier(tier) {
                    Some(priority) => {
                        debug!("Reference priority set to {}", priority);
                        overrides.reference_priority = priority;
                    }
                    None => overrides.warn(format!("Unsupported priority directive '{}'", line)),
                }
                continue;
            }

            match resolve_inclusion(universe, policy, line) {
                Ok((pkg, version)) => {
                    match overrides.included.iter_mut().find(|(p, _)| *p == pkg) {
                        Some(entry) => entry.1 = version,
                        None => overrides.included.push((pkg, version)),
                    }
                }
                Err(message) => overrides.warn(message),
            }
        }

        debug!(
            "Overrides: {} excluded, {} included, reference priority {}",
            overrides.excluded.len(),
            overrides.included.len(),
            overrides.reference_priority
        );
        overrides
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

fn read_list(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist, treating as empty", path.display());
            Ok(String::new())
        }
        Err(e) => Err(Error::Io(io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", path.display(), e),
        ))),
    }
}

/// Meaningful lines of a list
fn entries(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Only these tiers can select the base set
fn parse_tier(tier: &str) -> Option<Priority> {
    match tier.parse() {
        Ok(p @ (Priority::Required | Priority::Important | Priority::Standard)) => Some(p),
        _ => None,
    }
}

/// Resolve a name to a real package, going through a sole provider if needed
fn resolve_name(universe: &Universe, name: &str) -> std::result::Result<PackageId, String> {
    let Some(pkg) = universe.find(name) else {
        return Err(format!("Unable to locate package {}", name));
    };
    if !universe.package(pkg).is_virtual() {
        return Ok(pkg);
    }

    let providers: BTreeSet<PackageId> = universe
        .providers(pkg)
        .iter()
        .map(|prv| universe.version(prv.version).package)
        .collect();
    match providers.len() {
        0 => Err(format!("Unable to locate package {}", name)),
        1 => {
            let provider = providers.into_iter().next().unwrap_or(pkg);
            debug!(
                "{} is provided only by {}",
                name,
                universe.package(provider).name
            );
            Ok(provider)
        }
        _ => {
            let names: Vec<&str> = providers
                .iter()
                .map(|&p| universe.package(p).name.as_str())
                .collect();
            Err(format!(
                "{} is a virtual package provided by {}; select one explicitly",
                name,
                names.join(", ")
            ))
        }
    }
}

/// Resolve an inclusion line to the package and the version to install
fn resolve_inclusion(
    universe: &Universe,
    policy: &Policy,
    line: &str,
) -> std::result::Result<(PackageId, VersionId), String> {
    let (name, wanted) = match line.split_once('=') {
        Some((name, version)) => (name.trim(), Some(version.trim())),
        None => (line, None),
    };
    let pkg = resolve_name(universe, name)?;
    let pkg_name = &universe.package(pkg).name;

    match wanted {
        Some(version) => {
            let parsed = DebVersion::parse(version)
                .map_err(|e| format!("Bad version for {}: {}", pkg_name, e))?;
            universe
                .find_version(pkg, &parsed)
                .map(|v| (pkg, v))
                .ok_or_else(|| format!("Version '{}' for '{}' was not found", version, pkg_name))
        }
        None => policy
            .candidate(pkg)
            .map(|v| (pkg, v))
            .ok_or_else(|| format!("Package {} has no installation candidate", pkg_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::tests::universe;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const PACKAGES: &str = "Package: vim
Version: 2:9.0-1
Priority: optional

Package: vim
Version: 2:8.2-1
Priority: optional

Package: postfix
Version: 3.7-1
Provides: mail-transport-agent

Package: exim4
Version: 4.96-1
Provides: mail-transport-agent

Package: mawk
Version: 1.3.4-3
Provides: awk

Package: tools
Version: 1-1
Depends: nothing-provides-this
";

    fn parse(no: &str, yes: &str) -> (Universe, Overrides) {
        let u = universe(PACKAGES, "");
        let policy = Policy::new(&u, &BTreeMap::new()).unwrap();
        let overrides = Overrides::parse(&u, &policy, no, yes);
        (u, overrides)
    }

    fn names(u: &Universe, ids: &[PackageId]) -> Vec<String> {
        ids.iter().map(|&p| u.package(p).name.clone()).collect()
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let (u, overrides) = parse("# removed on purpose\n\nvim\n  \npostfix\nvim\n", "");
        assert_eq!(names(&u, &overrides.excluded), vec!["vim", "postfix"]);
        assert!(overrides.warnings.is_empty());
        assert_eq!(overrides.reference_priority, Priority::Required);
    }

    #[test]
    fn test_unknown_names_are_warnings() {
        let (u, overrides) = parse("nosuchpkg\nvim\n", "alsonot\n");
        assert_eq!(names(&u, &overrides.excluded), vec!["vim"]);
        assert!(overrides.included.is_empty());
        assert_eq!(overrides.warnings.len(), 2);
        assert!(overrides.warnings[0].contains("nosuchpkg"));
    }

    #[test]
    fn test_priority_directive_last_wins() {
        let (_, overrides) = parse("", "Priority: standard\nPriority: important\n");
        assert_eq!(overrides.reference_priority, Priority::Important);
        assert!(overrides.included.is_empty());

        let (_, overrides) = parse("", "Priority: optional\n");
        assert_eq!(overrides.reference_priority, Priority::Required);
        assert_eq!(overrides.warnings.len(), 1);
    }

    #[test]
    fn test_priority_directive_must_match_exactly() {
        let (_, overrides) = parse("", "Priority:standard\nPriority:   standard\n");
        assert_eq!(overrides.reference_priority, Priority::Required);
        assert_eq!(overrides.warnings.len(), 2);
    }

    #[test]
    fn test_inclusion_uses_candidate_or_exact_version() {
        let (u, overrides) = parse("", "vim\n");
        let vim = u.find("vim").unwrap();
        assert_eq!(overrides.included, vec![(vim, u.package(vim).versions[0])]);

        let (u, overrides) = parse("", "vim=2:8.2-1\n");
        assert_eq!(overrides.included, vec![(vim, u.package(vim).versions[1])]);

        let (_, overrides) = parse("", "vim=7.0\n");
        assert!(overrides.included.is_empty());
        assert!(overrides.warnings[0].contains("7.0"));
    }

    #[test]
    fn test_virtual_names() {
        let (u, overrides) = parse("awk\nmail-transport-agent\n", "nothing-provides-this\n");
        assert_eq!(names(&u, &overrides.excluded), vec!["mawk"]);
        assert_eq!(overrides.warnings.len(), 2);
        assert!(overrides.warnings[0].contains("exim4, postfix"));
    }

    #[test]
    fn test_missing_files_are_empty() {
        let dir = TempDir::new().unwrap();
        let u = universe(PACKAGES, "");
        let policy = Policy::new(&u, &BTreeMap::new()).unwrap();

        let yes = dir.path().join("yes.txt");
        fs::write(&yes, "Priority: standard\nvim\n").unwrap();
        let overrides =
            Overrides::load(&u, &policy, &dir.path().join("no.txt"), &yes).unwrap();

        assert!(overrides.excluded.is_empty());
        assert_eq!(overrides.included.len(), 1);
        assert_eq!(overrides.reference_priority, Priority::Standard);
    }
}
