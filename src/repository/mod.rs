// src/repository/mod.rs

//! Package index discovery and loading
//!
//! This module provides functionality for:
//! - Locating APT `Packages` lists in a lists directory
//! - Decompressing gzip, xz and zstd compressed lists
//! - Reading the dpkg status database
//! - Producing the package records the universe is built from

pub mod parsers;

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use xz2::read::XzDecoder;

pub use parsers::PackageRecord;

/// File name endings recognised as package lists
const INDEX_SUFFIXES: &[&str] = &["_Packages", "_Packages.gz", "_Packages.xz", "_Packages.zst"];

/// Find all package lists in an APT lists directory, sorted by file name
pub fn find_index_files(lists_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(lists_dir).map_err(|e| {
        Error::IndexError(format!(
            "Failed to read lists directory {}: {}",
            lists_dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_index = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| INDEX_SUFFIXES.iter().any(|s| name.ends_with(s)));
        if is_index && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    debug!(
        "Found {} index files in {}",
        files.len(),
        lists_dir.display()
    );
    Ok(files)
}

/// Read a package list, decompressing based on its extension
pub fn read_index_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        Error::IndexError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let name = path.to_string_lossy();
    let mut reader: Box<dyn Read> = if name.ends_with(".gz") {
        Box::new(GzDecoder::new(file))
    } else if name.ends_with(".xz") {
        Box::new(XzDecoder::new(file))
    } else if name.ends_with(".zst") {
        Box::new(zstd::Decoder::new(file).map_err(|e| {
            Error::IndexError(format!("Failed to create zstd decoder: {}", e))
        })?)
    } else {
        Box::new(file)
    };

    let mut content = String::new();
    reader.read_to_string(&mut content).map_err(|e| {
        Error::IndexError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    debug!("Read {} bytes from {}", content.len(), path.display());
    Ok(content)
}

/// Load package records from index text and status text
pub fn load_from_str(packages: &str, status: &str) -> Result<Vec<PackageRecord>> {
    let mut records = parsers::debian::parse_packages(packages)?;
    records.extend(parsers::debian::parse_status(status)?);
    Ok(records)
}

/// Load the available versions from every package list in an APT lists directory
pub fn load_index_records(lists_dir: &Path) -> Result<Vec<PackageRecord>> {
    let mut records = Vec::new();

    let index_files = find_index_files(lists_dir)?;
    if index_files.is_empty() {
        warn!(
            "No package lists found in {}; only installed packages are known",
            lists_dir.display()
        );
    }

    for path in &index_files {
        let content = read_index_file(path)?;
        let parsed = parsers::debian::parse_packages(&content).map_err(|e| {
            Error::ParseError(format!("{}: {}", path.display(), e))
        })?;
        records.extend(parsed);
    }

    info!(
        "Loaded {} index records from {} lists",
        records.len(),
        index_files.len()
    );
    Ok(records)
}

/// Load the versions dpkg reports as present on the system
pub fn load_status_records(status_path: &Path) -> Result<Vec<PackageRecord>> {
    let status = fs::read_to_string(status_path).map_err(|e| {
        Error::IndexError(format!(
            "Failed to read dpkg status {}: {}",
            status_path.display(),
            e
        ))
    })?;
    let records = parsers::debian::parse_status(&status)?;

    debug!(
        "Loaded {} installed records from {}",
        records.len(),
        status_path.display()
    );
    Ok(records)
}

/// Load package records from an APT lists directory and a dpkg status file
pub fn load_records(lists_dir: &Path, status_path: &Path) -> Result<Vec<PackageRecord>> {
    let mut records = load_index_records(lists_dir)?;
    records.extend(load_status_records(status_path)?);
    Ok(records)
}
