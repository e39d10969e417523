// src/universe/mod.rs

//! The package universe
//!
//! Every known package, its versions, their relationships and provides,
//! the reverse indices used to walk from a package to whatever names it,
//! and the real installed state reported by dpkg.
//!
//! The universe is immutable once built. Hypothetical install states live in
//! [`crate::depcache::DepCache`], which only borrows the universe, so the
//! real current versions can never be overwritten by a simulation.

pub mod policy;
pub mod priority;
pub mod relation;

use crate::error::{Error, Result};
use crate::repository::PackageRecord;
use crate::version::DebVersion;
use relation::{RawRelation, parse_provides_field, parse_relation_field};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, warn};

pub use policy::Policy;
pub use priority::Priority;
pub use relation::{DepKind, DependencyGroup, Provide, Relation};

/// Stable package identifier; also the package's position in iteration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId(pub u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable version identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(pub u32);

impl VersionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A package name, real or virtual
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    /// Known versions, highest first
    pub versions: Vec<VersionId>,
}

impl Package {
    /// Virtual packages only exist as relation targets or provided names
    pub fn is_virtual(&self) -> bool {
        self.versions.is_empty()
    }
}

/// One concrete version of a package
#[derive(Debug, Clone)]
pub struct Version {
    pub id: VersionId,
    pub package: PackageId,
    pub version: DebVersion,
    pub priority: Priority,
    pub depends: Vec<DependencyGroup>,
    pub provides: Vec<Provide>,
}

/// Points at one alternative of one relationship group of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepRef {
    /// The version declaring the relationship
    pub version: VersionId,
    pub group: usize,
    pub alternative: usize,
}

/// Points at one entry of a version's `Provides`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProvideRef {
    pub version: VersionId,
    pub index: usize,
}

/// All packages known to the system
#[derive(Debug)]
pub struct Universe {
    packages: Vec<Package>,
    versions: Vec<Version>,
    by_name: HashMap<String, PackageId>,
    /// Per target package: relation alternatives naming it
    reverse_depends: Vec<Vec<DepRef>>,
    /// Per target package: provides entries naming it
    providers: Vec<Vec<ProvideRef>>,
    /// Real current version per package
    installed: Vec<Option<VersionId>>,
}

/// A record's relationship fields with names still unresolved
struct ParsedRecord {
    record: PackageRecord,
    version: DebVersion,
    groups: Vec<(DepKind, Vec<RawRelation>)>,
    provides: Vec<(String, Option<DebVersion>)>,
}

impl ParsedRecord {
    fn parse(record: PackageRecord) -> Result<Self> {
        let context = |e: Error| {
            Error::ParseError(format!("{} {}: {}", record.name, record.version, e))
        };

        let version = DebVersion::parse(&record.version).map_err(context)?;

        let fields = [
            (DepKind::PreDepends, &record.pre_depends),
            (DepKind::Depends, &record.depends),
            (DepKind::Recommends, &record.recommends),
            (DepKind::Suggests, &record.suggests),
            (DepKind::Conflicts, &record.conflicts),
            (DepKind::Breaks, &record.breaks),
        ];
        let mut groups = Vec::new();
        for (kind, field) in fields {
            if let Some(text) = field {
                for group in parse_relation_field(text).map_err(context)? {
                    groups.push((kind, group));
                }
            }
        }

        let provides = match &record.provides {
            Some(text) => parse_provides_field(text).map_err(context)?,
            None => Vec::new(),
        };

        Ok(Self {
            record,
            version,
            groups,
            provides,
        })
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.record.name.as_str())
            .chain(
                self.groups
                    .iter()
                    .flat_map(|(_, alts)| alts.iter().map(|r| r.name.as_str())),
            )
            .chain(self.provides.iter().map(|(name, _)| name.as_str()))
    }
}

impl Universe {
    /// Build the universe from index and status records
    ///
    /// Records with the same name and version are merged; the merged
    /// version is installed if any of its records is.
    pub fn from_records(records: Vec<PackageRecord>) -> Result<Self> {
        // Merge duplicate (name, version) records, keeping the first stanza's fields
        let mut merged: BTreeMap<String, Vec<ParsedRecord>> = BTreeMap::new();
        for record in records {
            let parsed = ParsedRecord::parse(record)?;
            let versions = merged.entry(parsed.record.name.clone()).or_default();
            match versions.iter_mut().find(|p| p.version == parsed.version) {
                Some(existing) => existing.record.installed |= parsed.record.installed,
                None => versions.push(parsed),
            }
        }

        // Every mentioned name becomes a package; ids follow name order
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for parsed in merged.values().flatten() {
            names.extend(parsed.names());
        }
        let by_name: HashMap<String, PackageId> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), PackageId(i as u32)))
            .collect();
        let mut packages: Vec<Package> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Package {
                id: PackageId(i as u32),
                name: name.to_string(),
                versions: Vec::new(),
            })
            .collect();

        let package_count = packages.len();
        let mut versions = Vec::new();
        let mut installed = vec![None; package_count];
        let mut reverse_depends = vec![Vec::new(); package_count];
        let mut providers = vec![Vec::new(); package_count];

        for (name, mut parsed_versions) in merged {
            let package = by_name[&name];
            parsed_versions.sort_by(|a, b| b.version.cmp(&a.version));

            for parsed in parsed_versions {
                let id = VersionId(versions.len() as u32);

                let depends: Vec<DependencyGroup> = parsed
                    .groups
                    .into_iter()
                    .map(|(kind, alternatives)| DependencyGroup {
                        kind,
                        alternatives: alternatives
                            .into_iter()
                            .map(|raw| Relation {
                                target: by_name[&raw.name],
                                constraint: raw.constraint,
                            })
                            .collect(),
                    })
                    .collect();
                for (group, dep) in depends.iter().enumerate() {
                    for (alternative, relation) in dep.alternatives.iter().enumerate() {
                        reverse_depends[relation.target.index()].push(DepRef {
                            version: id,
                            group,
                            alternative,
                        });
                    }
                }

                let provides: Vec<Provide> = parsed
                    .provides
                    .into_iter()
                    .map(|(name, version)| Provide {
                        target: by_name[&name],
                        version,
                    })
                    .collect();
                for (index, provide) in provides.iter().enumerate() {
                    providers[provide.target.index()].push(ProvideRef { version: id, index });
                }

                if parsed.record.installed {
                    match installed[package.index()] {
                        None => installed[package.index()] = Some(id),
                        Some(_) => warn!(
                            "{} has several installed versions; keeping the highest",
                            name
                        ),
                    }
                }

                packages[package.index()].versions.push(id);
                versions.push(Version {
                    id,
                    package,
                    version: parsed.version,
                    priority: Priority::from_field(parsed.record.priority.as_deref()),
                    depends,
                    provides,
                });
            }
        }

        info!(
            "Built universe: {} packages, {} versions, {} installed",
            packages.len(),
            versions.len(),
            installed.iter().filter(|v| v.is_some()).count()
        );

        Ok(Self {
            packages,
            versions,
            by_name,
            reverse_depends,
            providers,
            installed,
        })
    }

    /// Number of packages, including virtual ones
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// All packages in iteration (name) order
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    /// All package ids in iteration order
    pub fn package_ids(&self) -> impl Iterator<Item = PackageId> + use<> {
        (0..self.packages.len() as u32).map(PackageId)
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn version(&self, id: VersionId) -> &Version {
        &self.versions[id.index()]
    }

    /// Look up a package by exact name
    pub fn find(&self, name: &str) -> Option<PackageId> {
        self.by_name.get(name).copied()
    }

    /// Find a specific version of a package
    pub fn find_version(&self, package: PackageId, version: &DebVersion) -> Option<VersionId> {
        self.package(package)
            .versions
            .iter()
            .copied()
            .find(|&v| self.version(v).version == *version)
    }

    /// The real current version of a package
    pub fn installed(&self, package: PackageId) -> Option<VersionId> {
        self.installed[package.index()]
    }

    /// Copy of the real current version of every package
    pub fn installed_snapshot(&self) -> Vec<Option<VersionId>> {
        self.installed.clone()
    }

    /// Relation alternatives naming this package
    pub fn reverse_depends(&self, package: PackageId) -> &[DepRef] {
        &self.reverse_depends[package.index()]
    }

    /// Provides entries naming this package
    pub fn providers(&self, package: PackageId) -> &[ProvideRef] {
        &self.providers[package.index()]
    }

    pub fn group(&self, dep: DepRef) -> &DependencyGroup {
        &self.version(dep.version).depends[dep.group]
    }

    pub fn relation(&self, dep: DepRef) -> &Relation {
        &self.group(dep).alternatives[dep.alternative]
    }

    pub fn provide(&self, prv: ProvideRef) -> &Provide {
        &self.version(prv.version).provides[prv.index]
    }

    /// Package declaring the relation
    pub fn parent_package(&self, dep: DepRef) -> PackageId {
        self.version(dep.version).package
    }

    /// Whether `version` is a version of the relation's target meeting its constraint
    pub fn relation_matches(&self, relation: &Relation, version: VersionId) -> bool {
        let ver = self.version(version);
        ver.package == relation.target && relation.constraint.satisfies(&ver.version)
    }

    /// Whether a provide of the relation's target satisfies the relation
    pub fn provide_matches(&self, relation: &Relation, provide: &Provide) -> bool {
        if provide.target != relation.target {
            return false;
        }
        match &provide.version {
            Some(v) => relation.constraint.satisfies(v),
            None => !relation.constraint.is_versioned(),
        }
    }

    /// Human readable `name version`
    pub fn describe(&self, version: VersionId) -> String {
        let ver = self.version(version);
        format!("{} {}", self.package(ver.package).name, ver.version)
    }

    /// Human readable relation, e.g. `libc6 (>= 2.36)`
    pub fn describe_relation(&self, relation: &Relation) -> String {
        let name = &self.package(relation.target).name;
        if relation.constraint.is_versioned() {
            format!("{} ({})", name, relation.constraint)
        } else {
            name.clone()
        }
    }
}
