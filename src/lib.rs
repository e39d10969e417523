// src/lib.rs

//! Disposal
//!
//! Audits a Debian-style system against a from-scratch reinstall: which
//! packages would be added or removed if the machine were rebuilt from the
//! priority base set plus explicit include and exclude lists, and which of
//! those differences are directly explained.
//!
//! # Architecture
//!
//! - Universe: immutable package graph built from APT lists and dpkg status
//! - DepCache: install plans layered over the universe, one per current-state snapshot
//! - Resolver: priority-ordered repair of broken plans, run once per action group
//! - Scan: simulate, reconcile against reality, classify the diff

pub mod config;
pub mod db;
pub mod depcache;
mod error;
pub mod repository;
pub mod resolver;
pub mod scan;
pub mod universe;
pub mod version;

pub use error::{Error, Result};
