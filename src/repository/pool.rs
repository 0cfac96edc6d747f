// src/repository/pool.rs

//! Pool layout: `pool/<component>/<first letter>/<package>/<file>`

use crate::error::{Error, Result};
use filetime::FileTime;
use std::fs;
use std::path::{Component as PathComponent, Path, PathBuf};
use tracing::info;

/// Whether `name` is a Debian package name: `[a-z0-9][a-z0-9+.-]+`
///
/// The name becomes a directory of the pool, so anything else is refused.
pub fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    name.len() >= 2
        && (first.is_ascii_lowercase() || first.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '-'))
}

/// The package pool below a repository root
#[derive(Debug, Clone)]
pub struct Pool {
    target_root: PathBuf,
    root: PathBuf,
}

impl Pool {
    pub fn new(target_root: &Path) -> Self {
        Self {
            target_root: target_root.to_path_buf(),
            root: target_root.join("pool"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical location of a package archive inside the pool
    pub fn target_path(&self, component: &str, package_name: &str, file_name: &str) -> Result<PathBuf> {
        if !is_valid_package_name(package_name) {
            return Err(Error::InvalidPackage {
                path: PathBuf::from(file_name),
                reason: format!("invalid package name '{}'", package_name),
            });
        }
        let first = &package_name[..1];

        Ok(self
            .root
            .join(component)
            .join(first)
            .join(package_name)
            .join(file_name))
    }

    /// Path of a pool file relative to the repository root, `/`-separated
    pub fn relative_filename(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.target_root).map_err(|_| {
            Error::InvalidConfiguration(format!(
                "{} is outside of {}",
                path.display(),
                self.target_root.display()
            ))
        })?;

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                PathComponent::Normal(part) => parts.push(part.to_string_lossy()),
                _ => {
                    return Err(Error::InvalidConfiguration(format!(
                        "{} is not a plain path below {}",
                        path.display(),
                        self.target_root.display()
                    )));
                }
            }
        }

        Ok(parts.join("/"))
    }

    /// Copy `source` to `target`, keeping permissions and timestamps
    ///
    /// Parent directories are created as needed; an existing file is replaced.
    pub fn copy_into(&self, source: &Path, target: &Path) -> Result<()> {
        info!("Copy artifact: {}", target.display());

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        // fs::copy carries the permission bits over
        fs::copy(source, target).map_err(|e| {
            Error::IoError(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                target.display(),
                e
            ))
        })?;

        let metadata = fs::metadata(source)
            .map_err(|e| Error::IoError(format!("Failed to stat {}: {}", source.display(), e)))?;
        filetime::set_file_times(
            target,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )
        .map_err(|e| {
            Error::IoError(format!("Failed to set file times on {}: {}", target.display(), e))
        })?;

        Ok(())
    }
}
