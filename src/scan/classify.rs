// src/scan/classify.rs

//! Diff between plan and installed state, with notability
//!
//! A change is notable when it is directly explained: it was requested by an
//! override, or a package that stays put depends on it. Changes that only
//! follow from another change are incidental. Only direct reverse
//! dependencies are inspected.

use super::reconcile::ReconciledPlan;
use super::{Change, ChangeKind};
use crate::universe::{DepRef, PackageId, Universe, VersionId};

/// Relations naming `pkg` that `version` satisfies, directly or through a provide
pub(crate) fn reverse_dependents(
    universe: &Universe,
    pkg: PackageId,
    version: VersionId,
) -> Vec<DepRef> {
    let mut deps: Vec<DepRef> = universe
        .reverse_depends(pkg)
        .iter()
        .copied()
        .filter(|&dep| universe.relation_matches(universe.relation(dep), version))
        .collect();

    for provide in &universe.version(version).provides {
        deps.extend(
            universe
                .reverse_depends(provide.target)
                .iter()
                .copied()
                .filter(|&dep| universe.provide_matches(universe.relation(dep), provide)),
        );
    }
    deps
}

/// Whether a new install is requested or needed by a package that is not itself new
pub fn notable_new_install(plan: &ReconciledPlan<'_>, pkg: PackageId) -> bool {
    if plan.info(pkg).in_yes {
        return true;
    }
    let Some(install) = plan.state(pkg).install else {
        return false;
    };

    let u = plan.universe();
    reverse_dependents(u, pkg, install).into_iter().any(|dep| {
        let kind = u.group(dep).kind;
        let parent = plan.state(u.parent_package(dep));
        !kind.is_negative()
            && plan.cache().is_important(kind)
            && !parent.new_install()
            && parent.install == Some(dep.version)
    })
}

/// Whether a removal is requested or not explained by another removal
pub fn notable_remove(plan: &ReconciledPlan<'_>, pkg: PackageId) -> bool {
    if plan.info(pkg).in_no {
        return true;
    }
    let Some(current) = plan.state(pkg).current else {
        return true;
    };

    let u = plan.universe();
    !reverse_dependents(u, pkg, current).into_iter().any(|dep| {
        let kind = u.group(dep).kind;
        let parent = plan.state(u.parent_package(dep));
        !kind.is_negative()
            && plan.cache().is_important(kind)
            && parent.delete()
            && parent.current == Some(dep.version)
    })
}

/// Every new install and removal, in package order
pub fn diff(plan: &ReconciledPlan<'_>) -> Vec<Change> {
    let u = plan.universe();
    u.package_ids()
        .filter_map(|pkg| {
            let st = plan.state(pkg);
            let (kind, notable) = if st.new_install() {
                (ChangeKind::Install, notable_new_install(plan, pkg))
            } else if st.delete() {
                (ChangeKind::Remove, notable_remove(plan, pkg))
            } else {
                return None;
            };
            Some(Change {
                name: u.package(pkg).name.clone(),
                kind,
                notable,
            })
        })
        .collect()
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

    const PACKAGES: &str = "Package: shell
Version: 2-1
Priority: required
Depends: libreadline, pager

Package: libreadline
Version: 8-1
Depends: readline-common

Package: readline-common
Version: 8-1

Package: less
Version: 590-1
Provides: pager

Package: desktop
Version: 1-1
Depends: toolkit

Package: toolkit
Version: 3-1
Depends: fonts

Package: fonts
Version: 1-1

Package: stray
Version: 1-1
";

    fn changes(status: &str, no: &str, yes: &str) -> Vec<(String, char, bool)> {
        let u = universe(PACKAGES, status);
        let policy = Policy::new(&u, &BTreeMap::new()).unwrap();
        let overrides = Overrides::parse(&u, &policy, no, yes);
        let plan = simulate(&u, &policy, &overrides, DepCacheOptions::default()).reconcile();
        diff(&plan)
            .into_iter()
            .map(|c| (c.name, c.kind.sign(), c.notable))
            .collect()
    }

    fn installed(names: &[&str]) -> String {
        let versions = BTreeMap::from([
            ("shell", "2-1"),
            ("libreadline", "8-1"),
            ("readline-common", "8-1"),
            ("less", "590-1"),
            ("desktop", "1-1"),
            ("toolkit", "3-1"),
            ("fonts", "1-1"),
            ("stray", "1-1"),
        ]);
        names
            .iter()
            .map(|n| {
                format!(
                    "Package: {}\nStatus: install ok installed\nVersion: {}\n",
                    n, versions[n]
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_chain_below_new_install_is_incidental() {
        let status = installed(&["shell", "less"]);
        let result = changes(&status, "", "");
        assert_eq!(
            result,
            vec![
                ("libreadline".to_string(), '+', true),
                ("readline-common".to_string(), '+', false),
            ]
        );
    }

    #[test]
    fn test_provided_dependency_is_notable() {
        let status = installed(&["shell", "libreadline", "readline-common"]);
        let result = changes(&status, "", "");
        assert_eq!(result, vec![("less".to_string(), '+', true)]);
    }

    #[test]
    fn test_removal_cascade_is_incidental() {
        let status = installed(&[
            "shell",
            "libreadline",
            "readline-common",
            "less",
            "desktop",
            "toolkit",
            "fonts",
        ]);
        let result = changes(&status, "", "");
        assert_eq!(
            result,
            vec![
                ("desktop".to_string(), '-', true),
                ("fonts".to_string(), '-', false),
                ("toolkit".to_string(), '-', false),
            ]
        );
    }

    #[test]
    fn test_explicit_overrides_are_notable() {
        let status = installed(&[
            "shell",
            "libreadline",
            "readline-common",
            "less",
            "toolkit",
            "fonts",
        ]);
        // without the exclusion, fonts would be incidental below toolkit
        let result = changes(&status, "fonts\n", "stray\n");
        assert_eq!(
            result,
            vec![
                ("fonts".to_string(), '-', true),
                ("stray".to_string(), '+', true),
                ("toolkit".to_string(), '-', true),
            ]
        );
    }
}
