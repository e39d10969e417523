// src/universe/policy.rs

//! Candidate version selection
//!
//! The candidate is the version that would be installed for a package if
//! nothing else constrained the choice: the highest known version, unless
//! a pin selects another one.

use super::{PackageId, Universe, VersionId};
use crate::error::{Error, Result};
use crate::version::DebVersion;
use std::collections::BTreeMap;
use tracing::debug;

/// Candidate version per package
#[derive(Debug, Clone)]
pub struct Policy {
    candidates: Vec<Option<VersionId>>,
}

impl Policy {
    /// Build the policy, applying `pins` (package name → version string)
    ///
    /// A pin naming an unknown package or version fails the whole build.
    pub fn new(universe: &Universe, pins: &BTreeMap<String, String>) -> Result<Self> {
        let mut candidates: Vec<Option<VersionId>> = universe
            .packages()
            .map(|pkg| pkg.versions.first().copied())
            .collect();

        for (name, version) in pins {
            let package = universe.find(name).ok_or_else(|| {
                Error::PolicyError(format!("Pinned package {} is not known", name))
            })?;
            let wanted = DebVersion::parse(version)
                .map_err(|e| Error::PolicyError(format!("Pin for {}: {}", name, e)))?;
            let pinned = universe.find_version(package, &wanted).ok_or_else(|| {
                Error::PolicyError(format!("Pinned version {} of {} is not known", version, name))
            })?;

            debug!("Pinning {} to {}", name, version);
            candidates[package.index()] = Some(pinned);
        }

        Ok(Self { candidates })
    }

    /// The candidate version of a package, if it has one
    pub fn candidate(&self, package: PackageId) -> Option<VersionId> {
        self.candidates[package.index()]
    }
}
