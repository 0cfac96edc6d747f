// src/repository/release.rs

//! Packages and Release file generation for the `dists/` tree

use super::config::{Component, Distribution};
use super::digest::DigestTable;
use super::index::{PackageIndex, PackageRecord};
use crate::control::{
    COMPONENT_RELEASE_FIELDS, ControlFile, DISTRIBUTION_RELEASE_FIELDS, FieldSchema,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Files listed in the checksum blocks, per `binary-<arch>` directory
const INDEX_FILES: &[&str] = &["Packages", "Packages.gz", "Release"];

/// Render an instant the way Release files carry their `Date`
///
/// e.g. `Wed, 02 Oct 2024 10:00:00 UTC`
pub fn format_utc_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S UTC").to_string()
}

/// Writes the index files of one repository below `<target>/dists`
pub struct ReleaseWriter<'a> {
    dists_root: PathBuf,
    architectures: &'a BTreeSet<String>,
    digests: DigestTable,
    date: String,
}

impl<'a> ReleaseWriter<'a> {
    pub fn new(
        target_root: &Path,
        architectures: &'a BTreeSet<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            dists_root: target_root.join("dists"),
            architectures,
            digests: DigestTable::release()?,
            date: format_utc_timestamp(timestamp),
        })
    }

    /// Write every package list of `distribution`, then its Release file
    ///
    /// Returns the paths of all files written, in write order.
    pub fn write_distribution(
        &self,
        distribution: &Distribution,
        index: &PackageIndex,
    ) -> Result<Vec<PathBuf>> {
        let dist_dir = self.dists_root.join(distribution.name());
        create_dir(&dist_dir)?;

        let mut written = Vec::new();

        for component in distribution.components() {
            let key = component.key();
            for arch in self.architectures {
                let records = index.bucket(&key, arch);
                if records.is_empty() {
                    debug!("No packages for {} on {}", key, arch);
                    continue;
                }
                written.extend(self.write_package_list(
                    &dist_dir,
                    distribution,
                    component,
                    arch,
                    records,
                )?);
            }
        }

        written.push(self.write_release(&dist_dir, distribution)?);
        Ok(written)
    }

    fn write_package_list(
        &self,
        dist_dir: &Path,
        distribution: &Distribution,
        component: &Component,
        architecture: &str,
        records: &[Rc<PackageRecord>],
    ) -> Result<Vec<PathBuf>> {
        let dir = dist_dir
            .join(component.name())
            .join(format!("binary-{}", architecture));
        create_dir(&dir)?;

        let mut packages = String::new();
        for record in records {
            packages.push_str(&record.to_stanza());
            packages.push('\n');
        }

        let packages_path = dir.join("Packages");
        info!("Writing: {}", packages_path.display());
        write_atomically(&packages_path, packages.as_bytes())?;

        let gz_path = dir.join("Packages.gz");
        debug!("Compressing: {}", packages_path.display());
        write_atomically(&gz_path, &gzip(packages.as_bytes(), &gz_path)?)?;

        let mut release = ControlFile::new();
        release.set("Component", component.name());
        release.set("Architecture", architecture);
        release.set("Label", component.label());
        release.set("Origin", distribution.origin());

        let release_path = dir.join("Release");
        write_stanza(&release_path, &release, COMPONENT_RELEASE_FIELDS)?;

        Ok(vec![packages_path, gz_path, release_path])
    }

    fn write_release(&self, dist_dir: &Path, distribution: &Distribution) -> Result<PathBuf> {
        let components: Vec<&str> = distribution
            .components()
            .iter()
            .map(Component::name)
            .collect();
        let architectures: Vec<&str> = self.architectures.iter().map(String::as_str).collect();

        let mut release = ControlFile::new();
        release.set("Origin", distribution.origin());
        release.set("Label", distribution.label());
        release.set("Codename", distribution.name());
        release.set("Date", self.date.as_str());
        release.set("Architectures", architectures.join(" "));
        release.set("Components", components.join(" "));
        release.set_opt("Description", distribution.description());

        for (field, block) in self.checksum_blocks(dist_dir, distribution)? {
            release.set(field, block);
        }

        let path = dist_dir.join("Release");
        write_stanza(&path, &release, DISTRIBUTION_RELEASE_FIELDS)?;

        Ok(path)
    }

    /// One checksum block per release digest over every existing index file
    ///
    /// Each file is hashed once for all algorithms. Every block starts with
    /// an empty line so the field serializes as a bare `MD5Sum:` header.
    fn checksum_blocks(
        &self,
        dist_dir: &Path,
        distribution: &Distribution,
    ) -> Result<Vec<(&'static str, String)>> {
        let mut blocks: Vec<(&'static str, String)> = self
            .digests
            .iter()
            .map(|digester| (digester.field, String::new()))
            .collect();

        for component in distribution.components() {
            for arch in self.architectures {
                for file in INDEX_FILES {
                    let relative = format!("{}/binary-{}/{}", component.name(), arch, file);
                    let path = dist_dir
                        .join(component.name())
                        .join(format!("binary-{}", arch))
                        .join(file);
                    if !path.is_file() {
                        continue;
                    }

                    let size = fs::metadata(&path)
                        .map_err(|e| {
                            Error::IoError(format!("Failed to stat {}: {}", path.display(), e))
                        })?
                        .len();

                    let digests = self.digests.digest_file(&path)?;
                    for ((_, block), (_, hex)) in blocks.iter_mut().zip(digests) {
                        block.push('\n');
                        block.push_str(&checksum_line(&hex, size, &relative));
                    }
                }
            }
        }

        Ok(blocks)
    }
}

/// `<hex> <size right-aligned to 20> <path>`; the stanza writer adds the indent
fn checksum_line(hex: &str, size: u64, path: &str) -> String {
    format!("{} {:>20} {}", hex, size, path)
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::IoError(format!("Failed to create directory {}: {}", dir.display(), e)))
}

fn gzip(content: &[u8], path: &Path) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content)
        .and_then(|_| encoder.finish())
        .map_err(|e| Error::IoError(format!("Failed to compress {}: {}", path.display(), e)))
}

/// Serialize a stanza with `schema` once all its mandatory fields are set
fn write_stanza(path: &Path, stanza: &ControlFile, schema: &[FieldSchema]) -> Result<()> {
    let missing = stanza.missing_fields(schema);
    if !missing.is_empty() {
        return Err(Error::InvalidConfiguration(format!(
            "{} lacks mandatory fields: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    info!("Writing: {}", path.display());
    write_atomically(path, stanza.to_stanza(schema).as_bytes())
}

/// Mode of index files; temporary files start out owner-only
const INDEX_FILE_MODE: u32 = 0o644;

/// Write through a temporary file in the same directory, then rename
fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(dir).map_err(|e| {
        Error::IoError(format!("Failed to create temporary file in {}: {}", dir.display(), e))
    })?;
    file.write_all(content)
        .and_then(|_| file.flush())
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(INDEX_FILE_MODE))
            .map_err(|e| {
                Error::IoError(format!("Failed to set permissions of {}: {}", path.display(), e))
            })?;
    }

    file.persist(path)
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e.error)))?;

    Ok(())
}
