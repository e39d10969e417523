// src/depcache/mod.rs

//! Install plan state
//!
//! A [`DepCache`] layers a plan over the immutable [`Universe`]: for every
//! package it tracks the current version the plan starts from, the policy
//! candidate, the version the plan would install, and the derived broken
//! flags. The current versions are an explicit snapshot handed in at
//! construction, so a plan can start from the real system or from a blank
//! slate without touching the universe.
//!
//! Marks are cheap and local. Conflict resolution lives in
//! [`crate::resolver`]; batching of marks into a single resolution pass is
//! done with an [`ActionGroup`].

mod action_group;

use crate::universe::{
    DepKind, DependencyGroup, PackageId, Policy, Relation, Universe, VersionId,
};
use std::collections::BTreeSet;
use tracing::debug;

pub use action_group::ActionGroup;

/// Tracing target for mark operations
pub const MARKER: &str = "disposal::marker";
/// Tracing target for dependency auto-installation
pub const AUTOINSTALL: &str = "disposal::autoinstall";
/// Tracing target for the garbage sweep
pub const AUTOREMOVE: &str = "disposal::autoremove";

/// Recursion limit for auto-installing dependencies
const MAX_AUTO_INSTALL_DEPTH: usize = 3000;

/// What the plan does with a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Leave the current version (or absence) alone
    #[default]
    Keep,
    /// Install the candidate version
    Install,
    /// Remove the current version
    Delete,
}

/// Which soft relations count as important
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepCacheOptions {
    pub install_recommends: bool,
    pub install_suggests: bool,
}

impl Default for DepCacheOptions {
    fn default() -> Self {
        Self {
            install_recommends: true,
            install_suggests: false,
        }
    }
}

/// Plan state of one package
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    pub current: Option<VersionId>,
    pub candidate: Option<VersionId>,
    pub install: Option<VersionId>,
    pub mode: Mode,
    /// Installed only to satisfy something else
    pub auto: bool,
    /// Not reachable from any manually installed package
    pub garbage: bool,
    /// The mode may no longer change
    pub protected: bool,
    inst_broken: bool,
    inst_policy_broken: bool,
}

impl StateCache {
    /// Will be installed where nothing is installed now
    pub fn new_install(&self) -> bool {
        self.mode == Mode::Install && self.current.is_none()
    }

    /// Will be removed
    pub fn delete(&self) -> bool {
        self.mode == Mode::Delete
    }

    pub fn keep(&self) -> bool {
        self.mode == Mode::Keep
    }

    pub fn install(&self) -> bool {
        self.mode == Mode::Install
    }

    /// An important hard or negative relation of the install version is violated
    pub fn inst_broken(&self) -> bool {
        self.inst_broken
    }

    /// An important soft relation of the install version is unsatisfied
    pub fn inst_policy_broken(&self) -> bool {
        self.inst_policy_broken
    }
}

/// Install plan over a universe
#[derive(Debug, Clone)]
pub struct DepCache<'u> {
    universe: &'u Universe,
    options: DepCacheOptions,
    states: Vec<StateCache>,
}

impl<'u> DepCache<'u> {
    /// Build a plan starting from the given current versions
    ///
    /// Every package starts in keep mode with candidates taken from `policy`.
    pub fn new(
        universe: &'u Universe,
        policy: &Policy,
        current: Vec<Option<VersionId>>,
        options: DepCacheOptions,
    ) -> Self {
        let states = universe
            .package_ids()
            .map(|pkg| {
                let current = current[pkg.index()];
                StateCache {
                    current,
                    candidate: policy.candidate(pkg),
                    install: current,
                    ..Default::default()
                }
            })
            .collect();

        let mut cache = Self {
            universe,
            options,
            states,
        };
        cache.update();
        cache
    }

    pub fn universe(&self) -> &'u Universe {
        self.universe
    }

    pub fn state(&self, pkg: PackageId) -> &StateCache {
        &self.states[pkg.index()]
    }

    /// Number of packages whose install version is broken
    pub fn broken_count(&self) -> usize {
        self.states.iter().filter(|s| s.inst_broken).count()
    }

    /// Number of packages with unsatisfied important soft relations
    pub fn policy_broken_count(&self) -> usize {
        self.states.iter().filter(|s| s.inst_policy_broken).count()
    }

    /// Whether a relation kind is followed for installs, garbage and notability
    pub fn is_important(&self, kind: DepKind) -> bool {
        match kind {
            DepKind::Recommends => self.options.install_recommends,
            DepKind::Suggests => self.options.install_suggests,
            _ => kind.is_critical(),
        }
    }

    /// Install mode over an older current version
    pub fn is_upgrade(&self, pkg: PackageId) -> bool {
        let st = self.state(pkg);
        match (st.mode, st.current, st.install) {
            (Mode::Install, Some(cur), Some(inst)) => {
                self.universe.version(inst).version > self.universe.version(cur).version
            }
            _ => false,
        }
    }

    /// Install mode over a newer current version
    pub fn is_downgrade(&self, pkg: PackageId) -> bool {
        let st = self.state(pkg);
        match (st.mode, st.current, st.install) {
            (Mode::Install, Some(cur), Some(inst)) => {
                self.universe.version(inst).version < self.universe.version(cur).version
            }
            _ => false,
        }
    }

    fn name(&self, pkg: PackageId) -> &'u str {
        &self.universe.package(pkg).name
    }

    fn installing(&self, version: VersionId) -> bool {
        let pkg = self.universe.version(version).package;
        self.states[pkg.index()].install == Some(version)
    }

    /// Whether the plan's install versions satisfy one alternative
    pub fn relation_satisfied(&self, relation: &Relation) -> bool {
        let u = self.universe;
        if let Some(v) = self.states[relation.target.index()].install {
            if u.relation_matches(relation, v) {
                return true;
            }
        }
        u.providers(relation.target).iter().any(|&prv| {
            self.installing(prv.version) && u.provide_matches(relation, u.provide(prv))
        })
    }

    /// Packages other than `owner` whose install versions a negative group forbids
    pub fn violators(&self, owner: PackageId, group: &DependencyGroup) -> Vec<PackageId> {
        let u = self.universe;
        let mut found = BTreeSet::new();

        for relation in &group.alternatives {
            if relation.target != owner {
                if let Some(v) = self.states[relation.target.index()].install {
                    if u.relation_matches(relation, v) {
                        found.insert(relation.target);
                    }
                }
            }
            for &prv in u.providers(relation.target) {
                let provider = u.version(prv.version).package;
                if provider != owner
                    && self.installing(prv.version)
                    && u.provide_matches(relation, u.provide(prv))
                {
                    found.insert(provider);
                }
            }
        }

        found.into_iter().collect()
    }

    /// Whether a group of `owner`'s install version holds against the plan
    pub fn group_satisfied(&self, owner: PackageId, group: &DependencyGroup) -> bool {
        if group.kind.is_negative() {
            self.violators(owner, group).is_empty()
        } else {
            group
                .alternatives
                .iter()
                .any(|relation| self.relation_satisfied(relation))
        }
    }

    /// A package the plan could install to satisfy `relation`
    ///
    /// The target itself is preferred when its candidate matches; otherwise the
    /// first package whose candidate provides the name. Protected packages
    /// are never offered.
    pub fn installable_for(&self, relation: &Relation) -> Option<PackageId> {
        self.installable_all(relation).into_iter().next()
    }

    /// Every package the plan could install to satisfy `relation`, preferred first
    pub fn installable_all(&self, relation: &Relation) -> Vec<PackageId> {
        let u = self.universe;
        let mut found = Vec::new();

        let target = &self.states[relation.target.index()];
        if let Some(candidate) = target.candidate {
            if !target.protected && u.relation_matches(relation, candidate) {
                found.push(relation.target);
            }
        }

        for &prv in u.providers(relation.target) {
            let provider = u.version(prv.version).package;
            let st = &self.states[provider.index()];
            if st.candidate == Some(prv.version)
                && !st.protected
                && u.provide_matches(relation, u.provide(prv))
                && !found.contains(&provider)
            {
                found.push(provider);
            }
        }
        found
    }

    fn compute_flags(&self, pkg: PackageId) -> (bool, bool) {
        let Some(install) = self.states[pkg.index()].install else {
            return (false, false);
        };

        let mut broken = false;
        let mut policy_broken = false;
        for group in &self.universe.version(install).depends {
            if !self.is_important(group.kind) || self.group_satisfied(pkg, group) {
                continue;
            }
            if group.kind.is_critical() {
                broken = true;
            } else {
                policy_broken = true;
            }
        }
        (broken, policy_broken)
    }

    fn recompute(&mut self, pkg: PackageId) {
        let (broken, policy_broken) = self.compute_flags(pkg);
        let st = &mut self.states[pkg.index()];
        st.inst_broken = broken;
        st.inst_policy_broken = policy_broken;
    }

    /// Recompute a package whose install version changed, and everything naming it
    fn refresh(&mut self, pkg: PackageId, old: Option<VersionId>, new: Option<VersionId>) {
        let u = self.universe;
        let mut affected = BTreeSet::from([pkg]);

        let provided = [old, new]
            .into_iter()
            .flatten()
            .flat_map(|v| u.version(v).provides.iter().map(|p| p.target));
        for target in std::iter::once(pkg).chain(provided) {
            for &dep in u.reverse_depends(target) {
                affected.insert(u.parent_package(dep));
            }
        }

        for affected_pkg in affected {
            self.recompute(affected_pkg);
        }
    }

    /// Recompute every derived flag from scratch
    pub fn update(&mut self) {
        for pkg in self.universe.package_ids() {
            self.recompute(pkg);
        }
    }

    /// Make `version` the candidate of its package
    pub fn set_candidate(&mut self, version: VersionId) {
        let pkg = self.universe.version(version).package;
        let st = &mut self.states[pkg.index()];
        st.candidate = Some(version);

        if st.mode == Mode::Install && st.install != Some(version) {
            let old = st.install;
            st.install = Some(version);
            self.refresh(pkg, old, Some(version));
        }
    }

    /// Freeze the package's mode
    pub fn mark_protected(&mut self, pkg: PackageId) {
        self.states[pkg.index()].protected = true;
    }

    /// Plan to install the candidate of `pkg`
    ///
    /// With `auto_inst`, unsatisfied important dependencies are installed
    /// too, recursively. Returns false if the package cannot be installed.
    pub fn mark_install(&mut self, pkg: PackageId, auto_inst: bool, from_user: bool) -> bool {
        self.mark_install_depth(pkg, auto_inst, 0, from_user)
    }

    fn mark_install_depth(
        &mut self,
        pkg: PackageId,
        auto_inst: bool,
        depth: usize,
        from_user: bool,
    ) -> bool {
        let u = self.universe;
        let indent = " ".repeat(depth);

        let Some(candidate) = self.states[pkg.index()].candidate else {
            debug!(target: MARKER, "{}{} has no installation candidate", indent, self.name(pkg));
            return false;
        };

        if self.states[pkg.index()].install != Some(candidate) {
            if self.states[pkg.index()].protected {
                debug!(target: MARKER, "{}Not installing protected {}", indent, self.name(pkg));
                return false;
            }
            if depth > MAX_AUTO_INSTALL_DEPTH {
                return false;
            }

            let st = &mut self.states[pkg.index()];
            let old = st.install;
            let newly = st.current.is_none() && old.is_none();
            st.install = Some(candidate);
            st.mode = if st.current == Some(candidate) {
                Mode::Keep
            } else {
                Mode::Install
            };
            if from_user {
                if st.current.is_none() {
                    st.auto = false;
                }
            } else if newly {
                st.auto = true;
            }

            debug!(target: MARKER, "{}MarkInstall {}", indent, u.describe(candidate));
            self.refresh(pkg, old, Some(candidate));
        }

        if !auto_inst || depth >= MAX_AUTO_INSTALL_DEPTH {
            return true;
        }

        for group in &u.version(candidate).depends {
            if group.kind.is_negative()
                || !self.is_important(group.kind)
                || self.group_satisfied(pkg, group)
            {
                continue;
            }

            let mut satisfied = false;
            for relation in &group.alternatives {
                let Some(target) = self.installable_for(relation) else {
                    continue;
                };
                debug!(
                    target: AUTOINSTALL,
                    "{}{} {} {}: installing {}",
                    indent,
                    self.name(pkg),
                    group.kind.field_name(),
                    u.describe_relation(relation),
                    self.name(target)
                );
                if self.mark_install_depth(target, true, depth + 1, false)
                    && self.group_satisfied(pkg, group)
                {
                    satisfied = true;
                    break;
                }
            }

            if !satisfied {
                debug!(
                    target: AUTOINSTALL,
                    "{}{}: nothing installable for a {} group",
                    indent,
                    self.name(pkg),
                    group.kind.field_name()
                );
            }
        }

        true
    }

    /// Plan to have no version of `pkg`
    ///
    /// A package with no current version ends up in keep mode.
    pub fn mark_delete(&mut self, pkg: PackageId) -> bool {
        let st = &self.states[pkg.index()];
        let mode = if st.current.is_some() {
            Mode::Delete
        } else {
            Mode::Keep
        };
        if st.install.is_none() && st.mode == mode {
            return true;
        }
        if st.protected {
            debug!(target: MARKER, "Not removing protected {}", self.name(pkg));
            return false;
        }

        let st = &mut self.states[pkg.index()];
        let old = st.install;
        st.install = None;
        st.mode = mode;

        debug!(target: MARKER, "MarkDelete {}", self.name(pkg));
        self.refresh(pkg, old, None);
        true
    }

    /// Plan to leave `pkg` at its current version
    pub fn mark_keep(&mut self, pkg: PackageId) -> bool {
        let st = &self.states[pkg.index()];
        if st.install == st.current && st.mode == Mode::Keep {
            return true;
        }
        if st.protected {
            debug!(target: MARKER, "Not keeping protected {}", self.name(pkg));
            return false;
        }

        let st = &mut self.states[pkg.index()];
        let old = st.install;
        st.install = st.current;
        st.mode = Mode::Keep;
        let new = st.install;

        debug!(target: MARKER, "MarkKeep {}", self.name(pkg));
        self.refresh(pkg, old, new);
        true
    }

    /// Swap in a different set of current versions without resolving
    ///
    /// Install choices stay as planned. A package whose planned version equals
    /// its new current version becomes a keep; one planned to have nothing but
    /// with a current version becomes a delete; any other mode stands. Derived
    /// flags are then recomputed.
    pub fn rebase_current(&mut self, current: &[Option<VersionId>]) {
        for (st, &cur) in self.states.iter_mut().zip(current) {
            st.current = cur;
            if st.install == st.current {
                st.mode = Mode::Keep;
            } else if st.install.is_none() && st.current.is_some() {
                st.mode = Mode::Delete;
            }
        }
        self.update();
    }

    /// Flag packages no manually installed package needs as garbage
    pub fn mark_and_sweep(&mut self) {
        let u = self.universe;
        let mut marked = vec![false; self.states.len()];
        let mut stack: Vec<PackageId> = u
            .package_ids()
            .filter(|&pkg| {
                let st = &self.states[pkg.index()];
                st.install.is_some() && !st.auto
            })
            .collect();

        while let Some(pkg) = stack.pop() {
            if std::mem::replace(&mut marked[pkg.index()], true) {
                continue;
            }
            let Some(install) = self.states[pkg.index()].install else {
                continue;
            };

            for group in &u.version(install).depends {
                if group.kind.is_negative() || !self.is_important(group.kind) {
                    continue;
                }
                for relation in &group.alternatives {
                    if let Some(v) = self.states[relation.target.index()].install {
                        if u.relation_matches(relation, v) {
                            stack.push(relation.target);
                        }
                    }
                    for &prv in u.providers(relation.target) {
                        if self.installing(prv.version)
                            && u.provide_matches(relation, u.provide(prv))
                        {
                            stack.push(u.version(prv.version).package);
                        }
                    }
                }
            }
        }

        for pkg in u.package_ids() {
            let st = &mut self.states[pkg.index()];
            st.garbage =
                !marked[pkg.index()] && (st.current.is_some() || st.mode == Mode::Install);
            if st.garbage {
                debug!(target: AUTOREMOVE, "Garbage: {}", u.package(pkg).name);
            }
        }
    }
}
