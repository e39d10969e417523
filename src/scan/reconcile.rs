// src/scan/reconcile.rs

//! Laying the simulated plan over the real installed state

use super::ScanInfo;
use super::simulate::Simulation;
use crate::depcache::{DepCache, StateCache};
use crate::universe::{PackageId, Universe, VersionId};
use tracing::debug;

/// The simulated plan measured against what is really installed
///
/// Read only: nothing here can resolve or mark again.
#[derive(Debug)]
pub struct ReconciledPlan<'u> {
    cache: DepCache<'u>,
    info: Vec<ScanInfo>,
    broken: usize,
}

impl<'u> Simulation<'u> {
    /// Restore the real current versions under the plan
    ///
    /// Install choices are kept as simulated; only modes and derived flags
    /// are recomputed. Consuming the simulation makes this a one-time step.
    pub fn reconcile(self) -> ReconciledPlan<'u> {
        let Simulation {
            mut cache,
            info,
            broken,
        } = self;

        let real: Vec<Option<VersionId>> = info.iter().map(|i| i.orig_cur).collect();
        cache.rebase_current(&real);
        debug!(
            "Reconciled plan: {} broken against the installed system",
            cache.broken_count()
        );

        ReconciledPlan {
            cache,
            info,
            broken,
        }
    }
}

impl<'u> ReconciledPlan<'u> {
    pub fn universe(&self) -> &'u Universe {
        self.cache.universe()
    }

    pub fn cache(&self) -> &DepCache<'u> {
        &self.cache
    }

    pub fn state(&self, pkg: PackageId) -> &StateCache {
        self.cache.state(pkg)
    }

    pub fn info(&self, pkg: PackageId) -> &ScanInfo {
        &self.info[pkg.index()]
    }

    /// Packages the simulation left broken
    pub fn broken(&self) -> usize {
        self.broken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depcache::DepCacheOptions;
    use crate::scan::overrides::Overrides;
    use crate::scan::simulate::simulate;
    use crate::universe::Policy;
    use crate::universe::tests::universe;
    use std::collections::BTreeMap;

    const PACKAGES: &str = "Package: kernel
Version: 6.1-2
Priority: required
Depends: firmware

Package: kernel
Version: 6.1-1
Priority: required

Package: firmware
Version: 1-1

Package: game
Version: 1-1
";

    const STATUS: &str = "Package: kernel
Status: install ok installed
Version: 6.1-1

Package: game
Status: install ok installed
Version: 1-1
";

    fn reconciled(u: &Universe) -> ReconciledPlan<'_> {
        let policy = Policy::new(u, &BTreeMap::new()).unwrap();
        let overrides = Overrides::parse(u, &policy, "", "");
        simulate(u, &policy, &overrides, DepCacheOptions::default()).reconcile()
    }

    #[test]
    fn test_current_versions_restored() {
        let u = universe(PACKAGES, STATUS);
        let plan = reconciled(&u);
        for pkg in u.package_ids() {
            assert_eq!(plan.state(pkg).current, u.installed(pkg));
            assert_eq!(plan.info(pkg).orig_cur, u.installed(pkg));
        }
    }

    #[test]
    fn test_modes_derived_from_real_state() {
        let u = universe(PACKAGES, STATUS);
        let plan = reconciled(&u);

        let kernel = plan.state(u.find("kernel").unwrap());
        assert!(kernel.install());
        assert!(!kernel.new_install());
        assert!(plan.cache().is_upgrade(u.find("kernel").unwrap()));

        assert!(plan.state(u.find("firmware").unwrap()).new_install());
        assert!(plan.state(u.find("game").unwrap()).delete());
        assert_eq!(plan.broken(), 0);
    }

    #[test]
    fn test_unchanged_package_is_keep() {
        let status = "Package: kernel\nStatus: install ok installed\nVersion: 6.1-2\n\n\
                      Package: firmware\nStatus: install ok installed\nVersion: 1-1\n";
        let u = universe(PACKAGES, status);
        let plan = reconciled(&u);

        assert!(plan.state(u.find("kernel").unwrap()).keep());
        assert!(plan.state(u.find("firmware").unwrap()).keep());
        assert!(plan.state(u.find("game").unwrap()).keep());
    }
}
