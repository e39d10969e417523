// src/scan/mod.rs

//! Reinstall audit
//!
//! Answers: if this machine were reinstalled from scratch with only the
//! priority base set and the override lists, which packages would differ
//! from what is installed now, and which of those differences are notable?
//!
//! The scan runs in four stages:
//! - [`overrides`]: read and resolve the exclusion and inclusion lists
//! - [`simulate`]: plan a clean-slate install in one resolver batch
//! - [`reconcile`]: measure the plan against the real installed state
//! - [`classify`]: list the differences and mark each notable or incidental

pub mod classify;
pub mod overrides;
pub mod reconcile;
pub mod simulate;

use crate::config::Config;
use crate::db;
use crate::depcache::DepCacheOptions;
use crate::error::Result;
use crate::repository;
use crate::universe::{Policy, Universe, VersionId};
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};

pub use overrides::Overrides;
pub use reconcile::ReconciledPlan;
pub use simulate::{Simulation, simulate};

/// What the scan remembers about each package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanInfo {
    /// Really installed version
    pub orig_cur: Option<VersionId>,
    /// Candidate chosen by the policy before any override
    pub orig_cand: Option<VersionId>,
    /// Named in the exclusion list
    pub in_no: bool,
    /// Named in the inclusion list
    pub in_yes: bool,
}

/// Direction of a difference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Would be installed but is not installed now
    Install,
    /// Is installed now but would not be
    Remove,
}

impl ChangeKind {
    pub fn sign(&self) -> char {
        match self {
            ChangeKind::Install => '+',
            ChangeKind::Remove => '-',
        }
    }
}

/// One package that differs between the reinstall and the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub kind: ChangeKind,
    pub notable: bool,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.notable {
            f.write_str("  ")?;
        }
        write!(f, "{}{}", self.name, self.kind.sign())
    }
}

/// Outcome of a scan
///
/// Displays as the result lines, one per change, incidental ones indented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub changes: Vec<Change>,
    /// Packages the resolver could not fix
    pub broken: usize,
    /// Override lines that could not be resolved
    pub warnings: Vec<String>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn notable(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(|c| c.notable)
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.changes {
            writeln!(f, "{}", change)?;
        }
        Ok(())
    }
}

/// Where a scan reads its inputs from
#[derive(Debug, Clone)]
pub struct ScanSources {
    pub no: PathBuf,
    pub yes: PathBuf,
    pub status: PathBuf,
    pub lists: PathBuf,
    pub cache: Option<PathBuf>,
}

impl ScanSources {
    pub fn from_config(config: &Config) -> Self {
        Self {
            no: config.state.no.clone(),
            yes: config.state.yes.clone(),
            status: config.dpkg.status.clone(),
            lists: config.apt.lists.clone(),
            cache: config.cache.path.clone(),
        }
    }
}

/// Run the audit over an already built universe
pub fn run(
    universe: &Universe,
    policy: &Policy,
    overrides: &Overrides,
    options: DepCacheOptions,
) -> ScanReport {
    let plan = simulate(universe, policy, overrides, options).reconcile();

    let cache = plan.cache();
    let upgrades = universe.package_ids().filter(|&p| cache.is_upgrade(p)).count();
    let downgrades = universe.package_ids().filter(|&p| cache.is_downgrade(p)).count();
    debug!("Plan also upgrades {} and downgrades {} packages", upgrades, downgrades);

    let report = ScanReport {
        changes: classify::diff(&plan),
        broken: plan.broken(),
        warnings: overrides.warnings.clone(),
    };
    info!(
        "Scan found {} differences, {} notable",
        report.changes.len(),
        report.notable().count()
    );
    report
}

/// Load everything from disk and run the audit
pub fn scan(config: &Config, sources: &ScanSources) -> Result<ScanReport> {
    let records = match &sources.cache {
        Some(path) => {
            info!("Reading package records from cache {}", path.display());
            let conn = db::open(path)?;
            let mut records = db::load_records(&conn)?;
            records.extend(repository::load_status_records(&sources.status)?);
            records
        }
        None => repository::load_records(&sources.lists, &sources.status)?,
    };

    let universe = Universe::from_records(records)?;
    let policy = Policy::new(&universe, &config.pins)?;
    let overrides = Overrides::load(&universe, &policy, &sources.no, &sources.yes)?;

    Ok(run(&universe, &policy, &overrides, config.depcache_options()))
}

/// Write the result lines to `out` and the scan diagnostics to `err`
///
/// `<n> broken` precedes the results when the resolver left packages broken;
/// `no changes` follows an empty result.
pub fn write_report<O: Write, E: Write>(
    report: &ScanReport,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    if report.broken != 0 {
        writeln!(err, "{} broken", report.broken)?;
    }
    write!(out, "{}", report)?;
    out.flush()?;
    if report.is_empty() {
        writeln!(err, "no changes")?;
    }
    Ok(())
}
