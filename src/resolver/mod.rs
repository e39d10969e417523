// src/resolver/mod.rs

//! Problem resolver
//!
//! Repairs a [`DepCache`] plan whose hard relations are violated. Broken
//! packages are visited in score order; an unsatisfied dependency is fixed
//! by installing an alternative, and when that is impossible, or when two
//! packages conflict, the lower scored, unprotected side is unmarked.
//!
//! Protected packages keep their decision even if that leaves them broken.
//! Packages flagged for removal are marked absent before resolution starts.

use crate::depcache::DepCache;
use crate::universe::{DependencyGroup, PackageId};
use tracing::debug;

/// Tracing target for the resolver
pub const RESOLVER: &str = "disposal::resolver";

/// Score bonus that keeps protected packages above everything else
const PROTECTED_BONUS: i64 = 1_000_000;

/// Extra passes beyond one per package before giving up
const EXTRA_PASSES: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    protected: bool,
    to_remove: bool,
    /// Backed out once; not offered as an alternative again
    rejected: bool,
}

/// Result of a resolution run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOutcome {
    /// Packages still broken afterwards
    pub broken: usize,
    /// Passes over the broken set
    pub passes: usize,
}

impl ResolveOutcome {
    pub fn is_clean(&self) -> bool {
        self.broken == 0
    }
}

/// Resolver state: protection and removal flags per package
#[derive(Debug, Clone)]
pub struct ProblemResolver {
    flags: Vec<Flags>,
}

impl ProblemResolver {
    pub fn new(package_count: usize) -> Self {
        Self {
            flags: vec![Flags::default(); package_count],
        }
    }

    pub fn protect(&mut self, pkg: PackageId) {
        self.flags[pkg.index()].protected = true;
    }

    pub fn remove(&mut self, pkg: PackageId) {
        self.flags[pkg.index()].to_remove = true;
    }

    pub fn is_protected(&self, pkg: PackageId) -> bool {
        self.flags[pkg.index()].protected
    }

    /// Rank packages: priority of the candidate plus important dependents
    fn make_scores(&self, cache: &DepCache<'_>) -> Vec<i64> {
        let u = cache.universe();
        u.package_ids()
            .map(|pkg| {
                let st = cache.state(pkg);
                let mut score = st
                    .candidate
                    .or(st.install)
                    .map_or(0, |v| u.version(v).priority.score());

                for &dep in u.reverse_depends(pkg) {
                    let parent = cache.state(u.parent_package(dep));
                    let group = u.group(dep);
                    if parent.install == Some(dep.version)
                        && !group.kind.is_negative()
                        && cache.is_important(group.kind)
                    {
                        score += 1;
                    }
                }

                if self.is_protected(pkg) {
                    score += PROTECTED_BONUS;
                }
                score
            })
            .collect()
    }

    /// Repair the plan as far as possible
    pub fn resolve(&mut self, cache: &mut DepCache<'_>) -> ResolveOutcome {
        let u = cache.universe();
        let scores = self.make_scores(cache);

        for pkg in u.package_ids() {
            if self.flags[pkg.index()].to_remove && !cache.mark_delete(pkg) {
                debug!(target: RESOLVER, "Could not remove {}", u.package(pkg).name);
            }
        }

        let limit = u.package_count() + EXTRA_PASSES;
        let mut passes = 0;
        while passes < limit {
            let mut broken: Vec<PackageId> = u
                .package_ids()
                .filter(|&pkg| cache.state(pkg).inst_broken())
                .collect();
            if broken.is_empty() {
                break;
            }
            passes += 1;
            broken.sort_by(|a, b| {
                scores[b.index()]
                    .cmp(&scores[a.index()])
                    .then_with(|| a.cmp(b))
            });

            debug!(target: RESOLVER, "Pass {}: {} broken", passes, broken.len());

            let mut changed = false;
            for pkg in broken {
                if cache.state(pkg).inst_broken() {
                    changed |= self.fix(cache, pkg, &scores);
                }
            }
            if !changed {
                break;
            }
        }

        let broken = cache.broken_count();
        if broken > 0 {
            debug!(target: RESOLVER, "{} packages left broken after {} passes", broken, passes);
        }
        ResolveOutcome { broken, passes }
    }

    /// Try to fix one broken package; returns whether the plan changed
    fn fix(&mut self, cache: &mut DepCache<'_>, pkg: PackageId, scores: &[i64]) -> bool {
        let u = cache.universe();
        let Some(install) = cache.state(pkg).install else {
            return false;
        };

        let mut changed = false;
        for group in &u.version(install).depends {
            if !group.kind.is_critical() || cache.group_satisfied(pkg, group) {
                continue;
            }

            if group.kind.is_negative() {
                for other in cache.violators(pkg, group) {
                    let keep_other = self.is_protected(other)
                        || (!self.is_protected(pkg) && scores[other.index()] > scores[pkg.index()]);
                    if !keep_other {
                        changed |= self.unmark(cache, other);
                    } else if self.unmark(cache, pkg) {
                        return true;
                    }
                }
            } else if self.install_alternative(cache, pkg, group) {
                changed = true;
            } else if self.unmark(cache, pkg) {
                return true;
            } else {
                debug!(
                    target: RESOLVER,
                    "Leaving {} broken: {} cannot be satisfied",
                    u.describe(install),
                    group.kind.field_name()
                );
            }
        }
        changed
    }

    fn install_alternative(
        &mut self,
        cache: &mut DepCache<'_>,
        pkg: PackageId,
        group: &DependencyGroup,
    ) -> bool {
        let u = cache.universe();
        let targets: Vec<PackageId> = group
            .alternatives
            .iter()
            .flat_map(|relation| cache.installable_all(relation))
            .collect();

        for target in targets {
            let flags = self.flags[target.index()];
            if flags.protected || flags.to_remove || flags.rejected {
                continue;
            }
            debug!(
                target: RESOLVER,
                "Installing {} for {}",
                u.package(target).name,
                u.package(pkg).name
            );
            if cache.mark_install(target, true, false) && cache.group_satisfied(pkg, group) {
                return true;
            }
        }
        false
    }

    /// Back a package out of the plan: to its current version, then to nothing
    fn unmark(&mut self, cache: &mut DepCache<'_>, pkg: PackageId) -> bool {
        if self.is_protected(pkg) {
            return false;
        }

        let before = cache.state(pkg).install;
        if before != cache.state(pkg).current {
            cache.mark_keep(pkg);
        } else {
            cache.mark_delete(pkg);
        }

        let after = cache.state(pkg).install;
        if after != before {
            debug!(target: RESOLVER, "Unmarking {}", cache.universe().package(pkg).name);
            self.flags[pkg.index()].rejected = true;
        }
        after != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depcache::DepCacheOptions;
    use crate::universe::tests::universe;
    use crate::universe::{Policy, Universe};
    use std::collections::BTreeMap;

    const PACKAGES: &str = "Package: web
Version: 1-1
Priority: optional
Depends: httpd

Package: apache
Version: 2.4-1
Priority: optional
Provides: httpd
Conflicts: nginx

Package: nginx
Version: 1.22-1
Priority: standard
Provides: httpd

Package: broken-app
Version: 1-1
Depends: libgone (>= 2)

Package: libgone
Version: 1-1
";

    fn blank_cache(u: &Universe) -> DepCache<'_> {
        let policy = Policy::new(u, &BTreeMap::new()).unwrap();
        DepCache::new(u, &policy, vec![None; u.package_count()], DepCacheOptions::default())
    }

    #[test]
    fn test_resolve_installs_missing_dependency() {
        let u = universe(PACKAGES, "");
        let mut cache = blank_cache(&u);
        let web = u.find("web").unwrap();
        cache.mark_install(web, false, true);

        let outcome = ProblemResolver::new(u.package_count()).resolve(&mut cache);
        assert!(outcome.is_clean());
        // first provider in name order
        assert!(cache.state(u.find("apache").unwrap()).install());
    }

    #[test]
    fn test_conflict_unmarks_lower_score() {
        let u = universe(PACKAGES, "");
        let mut cache = blank_cache(&u);
        let apache = u.find("apache").unwrap();
        let nginx = u.find("nginx").unwrap();
        cache.mark_install(apache, false, true);
        cache.mark_install(nginx, false, true);

        let outcome = ProblemResolver::new(u.package_count()).resolve(&mut cache);
        assert!(outcome.is_clean());
        assert!(cache.state(nginx).install());
        assert!(cache.state(apache).install.is_none());
    }

    #[test]
    fn test_required_outranks_important_in_conflict() {
        let u = universe(
            "Package: imp
Version: 1-1
Priority: important
Conflicts: req

Package: req
Version: 1-1
Priority: required
",
            "",
        );
        let mut cache = blank_cache(&u);
        let imp = u.find("imp").unwrap();
        let req = u.find("req").unwrap();
        cache.mark_install(imp, false, true);
        cache.mark_install(req, false, true);

        let outcome = ProblemResolver::new(u.package_count()).resolve(&mut cache);
        assert!(outcome.is_clean());
        assert!(cache.state(req).install());
        assert!(cache.state(imp).install.is_none());
    }

    #[test]
    fn test_protected_side_wins_conflict() {
        let u = universe(PACKAGES, "");
        let mut cache = blank_cache(&u);
        let apache = u.find("apache").unwrap();
        let nginx = u.find("nginx").unwrap();
        cache.mark_install(apache, false, true);
        cache.mark_install(nginx, false, true);

        let mut resolver = ProblemResolver::new(u.package_count());
        resolver.protect(apache);
        assert!(resolver.resolve(&mut cache).is_clean());
        assert!(cache.state(apache).install());
        assert!(cache.state(nginx).install.is_none());
    }

    #[test]
    fn test_both_protected_stays_broken() {
        let u = universe(PACKAGES, "");
        let mut cache = blank_cache(&u);
        let apache = u.find("apache").unwrap();
        let nginx = u.find("nginx").unwrap();
        cache.mark_install(apache, false, true);
        cache.mark_install(nginx, false, true);

        let mut resolver = ProblemResolver::new(u.package_count());
        resolver.protect(apache);
        resolver.protect(nginx);
        let outcome = resolver.resolve(&mut cache);
        assert_eq!(outcome.broken, 1);
    }

    #[test]
    fn test_unsatisfiable_request_is_dropped() {
        let u = universe(PACKAGES, "");
        let mut cache = blank_cache(&u);
        let app = u.find("broken-app").unwrap();
        cache.mark_install(app, true, true);
        assert!(cache.state(app).inst_broken());

        let outcome = ProblemResolver::new(u.package_count()).resolve(&mut cache);
        assert!(outcome.is_clean());
        assert!(cache.state(app).install.is_none());
    }

    #[test]
    fn test_removal_flag_applied_first() {
        let u = universe(PACKAGES, "");
        let mut cache = blank_cache(&u);
        let apache = u.find("apache").unwrap();
        let web = u.find("web").unwrap();
        cache.mark_install(web, true, true);
        assert!(cache.state(apache).install());

        let mut resolver = ProblemResolver::new(u.package_count());
        resolver.remove(apache);
        assert!(resolver.resolve(&mut cache).is_clean());
        assert!(cache.state(apache).install.is_none());
        assert!(cache.state(u.find("nginx").unwrap()).install());
    }
}
