// src/config.rs
//! Configuration file parsing
//!
//! Supports TOML configuration files with the following sections:
//! - [state] - Override list locations
//! - [dpkg] - Installed state
//! - [apt] - Package index location and relation handling
//! - [cache] - Optional SQLite package cache
//! - [debug] - Engine tracing switches
//! - [pins] - Candidate version pins
//!
//! Individual keys can be overridden afterwards with `section.key=value`
//! strings, as given to `-o`.

use crate::depcache::{AUTOINSTALL, AUTOREMOVE, DepCacheOptions, MARKER};
use crate::error::{Error, Result};
use crate::resolver::RESOLVER;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub state: StateSection,

    #[serde(default)]
    pub dpkg: DpkgSection,

    #[serde(default)]
    pub apt: AptSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub debug: DebugSection,

    /// Package name to pinned candidate version
    #[serde(default)]
    pub pins: BTreeMap<String, String>,
}

/// Override list locations
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSection {
    /// Packages that must not be installed
    #[serde(default = "default_no")]
    pub no: PathBuf,

    /// Packages that must be installed, plus the optional priority directive
    #[serde(default = "default_yes")]
    pub yes: PathBuf,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            no: default_no(),
            yes: default_yes(),
        }
    }
}

fn default_no() -> PathBuf {
    PathBuf::from("no.txt")
}

fn default_yes() -> PathBuf {
    PathBuf::from("yes.txt")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DpkgSection {
    /// dpkg status file
    #[serde(default = "default_status")]
    pub status: PathBuf,
}

impl Default for DpkgSection {
    fn default() -> Self {
        Self {
            status: default_status(),
        }
    }
}

fn default_status() -> PathBuf {
    PathBuf::from("/var/lib/dpkg/status")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AptSection {
    /// Directory holding `*_Packages` index files
    #[serde(default = "default_lists")]
    pub lists: PathBuf,

    /// Treat Recommends as important
    #[serde(default = "default_true")]
    pub install_recommends: bool,

    /// Treat Suggests as important
    #[serde(default)]
    pub install_suggests: bool,
}

impl Default for AptSection {
    fn default() -> Self {
        Self {
            lists: default_lists(),
            install_recommends: true,
            install_suggests: false,
        }
    }
}

fn default_lists() -> PathBuf {
    PathBuf::from("/var/lib/apt/lists")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Read package records from this SQLite cache instead of the indexes
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugSection {
    #[serde(default)]
    pub marker: bool,

    #[serde(default)]
    pub autoinstall: bool,

    #[serde(default)]
    pub problem_resolver: bool,

    #[serde(default)]
    pub autoremove: bool,
}

impl DebugSection {
    /// Tracing targets to raise to debug level
    pub fn targets(&self) -> Vec<&'static str> {
        [
            (self.marker, MARKER),
            (self.autoinstall, AUTOINSTALL),
            (self.problem_resolver, RESOLVER),
            (self.autoremove, AUTOREMOVE),
        ]
        .into_iter()
        .filter_map(|(enabled, target)| enabled.then_some(target))
        .collect()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Load the file if one is given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply one `section.key=value` override
    pub fn set_option(&mut self, option: &str) -> Result<()> {
        let (key, value) = option.split_once('=').ok_or_else(|| {
            Error::ConfigError(format!("Option '{}' is not of the form key=value", option))
        })?;
        let key = key.trim();
        let value = value.trim();

        if let Some(package) = key.strip_prefix("pins.") {
            if package.is_empty() {
                return Err(Error::ConfigError("Empty package name in pin".to_string()));
            }
            self.pins.insert(package.to_string(), value.to_string());
            return Ok(());
        }

        match key {
            "state.no" => self.state.no = PathBuf::from(value),
            "state.yes" => self.state.yes = PathBuf::from(value),
            "dpkg.status" => self.dpkg.status = PathBuf::from(value),
            "apt.lists" => self.apt.lists = PathBuf::from(value),
            "apt.install_recommends" => self.apt.install_recommends = parse_bool(key, value)?,
            "apt.install_suggests" => self.apt.install_suggests = parse_bool(key, value)?,
            "cache.path" => {
                self.cache.path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "debug.marker" => self.debug.marker = parse_bool(key, value)?,
            "debug.autoinstall" => self.debug.autoinstall = parse_bool(key, value)?,
            "debug.problem_resolver" => self.debug.problem_resolver = parse_bool(key, value)?,
            "debug.autoremove" => self.debug.autoremove = parse_bool(key, value)?,
            _ => return Err(Error::ConfigError(format!("Unknown option '{}'", key))),
        }
        Ok(())
    }

    /// Apply several overrides in order
    pub fn apply_options<S: AsRef<str>>(&mut self, options: &[S]) -> Result<()> {
        for option in options {
            self.set_option(option.as_ref())?;
        }
        Ok(())
    }

    pub fn depcache_options(&self) -> DepCacheOptions {
        DepCacheOptions {
            install_recommends: self.apt.install_recommends,
            install_suggests: self.apt.install_suggests,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::ConfigError(format!(
            "Option '{}' expects a boolean, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.state.no, PathBuf::from("no.txt"));
        assert_eq!(config.state.yes, PathBuf::from("yes.txt"));
        assert_eq!(config.dpkg.status, PathBuf::from("/var/lib/dpkg/status"));
        assert!(config.apt.install_recommends);
        assert!(!config.apt.install_suggests);
        assert!(config.cache.path.is_none());
        assert!(config.debug.targets().is_empty());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
[state]
no = "/etc/disposal/no.txt"

[apt]
install_recommends = false

[debug]
marker = true

[pins]
linux-image-amd64 = "6.1.0-1"
"#,
        )
        .unwrap();

        assert_eq!(config.state.no, PathBuf::from("/etc/disposal/no.txt"));
        assert_eq!(config.state.yes, PathBuf::from("yes.txt"));
        assert!(!config.apt.install_recommends);
        assert_eq!(config.apt.lists, PathBuf::from("/var/lib/apt/lists"));
        assert_eq!(config.debug.targets(), vec![MARKER]);
        assert_eq!(config.pins["linux-image-amd64"], "6.1.0-1");
    }

    #[test]
    fn test_unknown_section_is_error() {
        assert!(matches!(
            Config::parse("[bogus]\nkey = 1\n"),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_set_option_overrides() {
        let mut config = Config::default();
        config
            .apply_options(&[
                "state.yes=/tmp/yes.txt",
                "apt.install_suggests=yes",
                "debug.problem_resolver=1",
                "pins.bash=5.2-1",
                "cache.path=/tmp/cache.db",
            ])
            .unwrap();

        assert_eq!(config.state.yes, PathBuf::from("/tmp/yes.txt"));
        assert!(config.depcache_options().install_suggests);
        assert_eq!(config.debug.targets(), vec![RESOLVER]);
        assert_eq!(config.pins["bash"], "5.2-1");
        assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/cache.db")));
    }

    #[test]
    fn test_set_option_rejects_bad_input() {
        let mut config = Config::default();
        assert!(config.set_option("no-equals-sign").is_err());
        assert!(config.set_option("apt.nonsense=1").is_err());
        assert!(config.set_option("debug.marker=maybe").is_err());
    }
}
