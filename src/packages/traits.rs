// src/packages/traits.rs

//! Common traits for package archive readers

use crate::control::ControlFile;
use crate::error::Result;
use std::path::Path;

/// A binary package archive whose control metadata can be indexed
pub trait PackageArchive {
    /// Read the control metadata of the archive at `path`
    ///
    /// Returns `Ok(None)` when the archive carries no control metadata.
    /// Malformed archives and I/O failures are errors.
    fn read(path: &Path) -> Result<Option<Self>>
    where
        Self: Sized;

    /// Path of the archive on disk
    fn path(&self) -> &Path;

    /// Parsed control stanza
    fn control(&self) -> &ControlFile;

    /// Take ownership of the control stanza
    fn into_control(self) -> ControlFile;

    /// Get the package name
    fn name(&self) -> Option<&str> {
        self.control().get("Package")
    }

    /// Get the package version
    fn version(&self) -> Option<&str> {
        self.control().get("Version")
    }

    /// Get the package architecture (e.g., "amd64", "all")
    fn architecture(&self) -> Option<&str> {
        self.control().get("Architecture")
    }
}
