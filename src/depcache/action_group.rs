// src/depcache/action_group.rs

use super::DepCache;
use crate::resolver::{ProblemResolver, ResolveOutcome};
use crate::universe::{PackageId, VersionId};

/// A batch of marks resolved together
///
/// Marks made through the group are applied to the cache immediately, but
/// conflict resolution and the garbage sweep run once, on [`commit`].
///
/// [`commit`]: ActionGroup::commit
#[must_use = "marks in an action group are only resolved when it is committed"]
pub struct ActionGroup<'c, 'u> {
    cache: &'c mut DepCache<'u>,
    resolver: Option<ProblemResolver>,
}

impl<'c, 'u> ActionGroup<'c, 'u> {
    /// Group whose commit runs the problem resolver
    pub fn new(cache: &'c mut DepCache<'u>) -> Self {
        let resolver = ProblemResolver::new(cache.universe().package_count());
        Self {
            cache,
            resolver: Some(resolver),
        }
    }

    /// Group whose commit only sweeps garbage
    pub fn without_resolver(cache: &'c mut DepCache<'u>) -> Self {
        Self {
            cache,
            resolver: None,
        }
    }

    pub fn cache(&self) -> &DepCache<'u> {
        self.cache
    }

    /// Tell the resolver not to change this package's decision
    pub fn protect(&mut self, pkg: PackageId) {
        if let Some(resolver) = &mut self.resolver {
            resolver.protect(pkg);
        }
    }

    /// Tell the resolver this package must end up absent
    pub fn remove(&mut self, pkg: PackageId) {
        if let Some(resolver) = &mut self.resolver {
            resolver.remove(pkg);
        }
    }

    pub fn mark_protected(&mut self, pkg: PackageId) {
        self.cache.mark_protected(pkg);
    }

    pub fn set_candidate(&mut self, version: VersionId) {
        self.cache.set_candidate(version);
    }

    /// Request an install on the user's behalf
    pub fn mark_install(&mut self, pkg: PackageId, auto_inst: bool) -> bool {
        self.cache.mark_install(pkg, auto_inst, true)
    }

    pub fn mark_delete(&mut self, pkg: PackageId) -> bool {
        self.cache.mark_delete(pkg)
    }

    /// Resolve once, then recompute garbage
    pub fn commit(self) -> ResolveOutcome {
        let outcome = match self.resolver {
            Some(mut resolver) => resolver.resolve(self.cache),
            None => ResolveOutcome {
                broken: self.cache.broken_count(),
                passes: 0,
            },
        };
        self.cache.mark_and_sweep();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depcache::DepCacheOptions;
    use crate::universe::Policy;
    use crate::universe::tests::universe;
    use std::collections::BTreeMap;

    const PACKAGES: &str = "Package: editor
Version: 2-1
Depends: runtime

Package: runtime
Version: 1-1

Package: plugin
Version: 1-1
Depends: missing
";

    #[test]
    fn test_commit_resolves_and_sweeps() {
        let u = universe(PACKAGES, "");
        let policy = Policy::new(&u, &BTreeMap::new()).unwrap();
        let mut cache = DepCache::new(
            &u,
            &policy,
            vec![None; u.package_count()],
            DepCacheOptions::default(),
        );
        let editor = u.find("editor").unwrap();
        let plugin = u.find("plugin").unwrap();

        let mut group = ActionGroup::new(&mut cache);
        group.mark_install(editor, false);
        group.mark_install(plugin, false);
        assert_eq!(group.cache().broken_count(), 2);

        let outcome = group.commit();
        assert_eq!(outcome.broken, 0);
        assert!(cache.state(u.find("runtime").unwrap()).install());
        // unsatisfiable request is dropped
        assert!(cache.state(plugin).install.is_none());
        assert!(!cache.state(editor).garbage);
    }

    #[test]
    fn test_commit_without_resolver_leaves_breakage() {
        let u = universe(PACKAGES, "");
        let policy = Policy::new(&u, &BTreeMap::new()).unwrap();
        let mut cache = DepCache::new(
            &u,
            &policy,
            vec![None; u.package_count()],
            DepCacheOptions::default(),
        );

        let mut group = ActionGroup::without_resolver(&mut cache);
        group.mark_install(u.find("editor").unwrap(), false);
        let outcome = group.commit();

        assert_eq!(outcome.broken, 1);
        assert_eq!(outcome.passes, 0);
    }
}
