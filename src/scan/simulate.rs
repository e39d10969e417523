// src/scan/simulate.rs

//! Clean-slate reinstall simulation
//!
//! Plans an install on a machine with nothing installed: the base set of
//! packages at or above the reference priority, minus the exclusions, plus
//! the inclusions, with dependencies pulled in and conflicts resolved in a
//! single batch.

use super::ScanInfo;
use super::overrides::Overrides;
use crate::depcache::{ActionGroup, DepCache, DepCacheOptions};
use crate::universe::{PackageId, Policy, Priority, Universe};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A resolved plan over a blank installed state
///
/// The only way forward is [`Simulation::reconcile`], which consumes it.
#[derive(Debug)]
pub struct Simulation<'u> {
    pub(super) cache: DepCache<'u>,
    pub(super) info: Vec<ScanInfo>,
    pub(super) broken: usize,
}

impl<'u> Simulation<'u> {
    pub fn cache(&self) -> &DepCache<'u> {
        &self.cache
    }

    pub fn info(&self, pkg: PackageId) -> &ScanInfo {
        &self.info[pkg.index()]
    }

    /// Packages left broken by the resolver
    pub fn broken(&self) -> usize {
        self.broken
    }
}

/// Whether the candidate of `pkg` belongs to the base set
fn in_base(cache: &DepCache<'_>, pkg: PackageId, reference: Priority) -> bool {
    cache
        .state(pkg)
        .candidate
        .is_some_and(|v| cache.universe().version(v).priority.is_at_least(reference))
}

/// Plan a clean-slate install honouring the overrides
pub fn simulate<'u>(
    universe: &'u Universe,
    policy: &Policy,
    overrides: &Overrides,
    options: DepCacheOptions,
) -> Simulation<'u> {
    let mut info: Vec<ScanInfo> = universe
        .package_ids()
        .map(|pkg| ScanInfo {
            orig_cur: universe.installed(pkg),
            orig_cand: policy.candidate(pkg),
            in_no: false,
            in_yes: false,
        })
        .collect();

    // Nothing is installed in the simulated world
    let mut cache = DepCache::new(
        universe,
        policy,
        vec![None; universe.package_count()],
        options,
    );

    let outcome = {
        let mut group = ActionGroup::new(&mut cache);
        let mut auto_install = BTreeSet::new();

        for scan_info in &info {
            if let Some(candidate) = scan_info.orig_cand {
                group.set_candidate(candidate);
            }
        }

        for pkg in universe.package_ids() {
            if in_base(group.cache(), pkg, overrides.reference_priority) {
                group.protect(pkg);
                group.mark_install(pkg, false);
                auto_install.insert(pkg);
            }
        }
        debug!("Base set: {} packages", auto_install.len());

        for &pkg in &overrides.excluded {
            info[pkg.index()].in_no = true;
            group.protect(pkg);
            group.remove(pkg);
            group.mark_delete(pkg);
            group.mark_protected(pkg);
        }

        for &(pkg, version) in &overrides.included {
            info[pkg.index()].in_yes = true;
            group.protect(pkg);
            group.set_candidate(version);
            if !group.mark_install(pkg, false) {
                debug!("{} is excluded, not installing", universe.package(pkg).name);
            }
            auto_install.insert(pkg);
        }

        for pkg in auto_install {
            let st = group.cache().state(pkg);
            if st.inst_broken() || st.inst_policy_broken() {
                group.mark_install(pkg, true);
            }
        }

        group.commit()
    };

    if !outcome.is_clean() {
        warn!(
            "{} packages remain broken after {} resolver passes",
            outcome.broken, outcome.passes
        );
    }

    // The resolver does not unmark dependencies of packages it backed out
    let garbage: Vec<PackageId> = universe
        .package_ids()
        .filter(|&pkg| cache.state(pkg).garbage)
        .collect();
    let mut sweep = ActionGroup::without_resolver(&mut cache);
    for &pkg in &garbage {
        sweep.mark_delete(pkg);
    }
    sweep.commit();

    info!(
        "Simulated install: {} packages, {} garbage removed",
        universe
            .package_ids()
            .filter(|&pkg| cache.state(pkg).install.is_some())
            .count(),
        garbage.len()
    );
    debug!(
        "{} planned packages miss an important soft relation",
        cache.policy_broken_count()
    );

    Simulation {
        cache,
        info,
        broken: outcome.broken,
    }
}
