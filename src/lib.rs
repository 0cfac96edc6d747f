// src/lib.rs

//! aptrepo: APT repository builder
//!
//! Turns a flat directory of Debian binary packages into a repository that
//! apt can consume, without a running reprepro or apt-ftparchive.
//!
//! # Architecture
//!
//! - Control files: one data-driven parser/serializer, field tables per file kind
//! - Pool: archives copied to `pool/<component>/<letter>/<package>/`
//! - Index: records bucketed per component and architecture, `all` fanned out
//! - Release: Packages, Packages.gz and Release files with checksum blocks

pub mod control;
mod error;
pub mod packages;
pub mod repository;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
pub use repository::{AptWriter, BuildReport, Configuration};
