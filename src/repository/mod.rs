// src/repository/mod.rs

//! APT repository generation
//!
//! This module turns a directory of `.deb` archives into a repository tree:
//! - Copying archives into a deterministic `pool/` layout
//! - Indexing control metadata per component and architecture
//! - Writing `Packages`, `Packages.gz` and `Release` files under `dists/`
//! - Checksumming every index file in the distribution `Release`

pub mod assign;
pub mod config;
pub mod digest;
pub mod index;
pub mod pool;
pub mod release;

pub use assign::{ComponentAssigner, FirstComponent};
pub use config::{Component, ComponentKey, Configuration, Distribution};
pub use index::{PackageIndex, PackageRecord};

use crate::error::{Error, Result};
use crate::packages::{DebPackage, PackageArchive};
use chrono::{DateTime, Utc};
use digest::DigestTable;
use pool::Pool;
use release::ReleaseWriter;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension of the archives picked up from the source directory
const PACKAGE_EXTENSION: &str = "deb";

/// Outcome of a repository build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Archives found in the source directory
    pub archives: usize,
    /// Archives without control metadata or without a component
    pub skipped: usize,
    /// Archives copied into the pool
    pub copied: usize,
    /// Copied archives whose architecture is not configured
    pub unindexed: usize,
    /// Records over all Packages files
    pub index_entries: usize,
    /// Index and Release files, in write order
    pub files_written: Vec<PathBuf>,
}

/// Builds an APT repository from a directory of `.deb` archives
///
/// The writer owns its configuration, so it cannot change while a build
/// runs. A build refuses to touch an existing target directory.
pub struct AptWriter<A: ComponentAssigner = FirstComponent> {
    configuration: Configuration,
    assigner: A,
    timestamp: Option<DateTime<Utc>>,
}

impl AptWriter<FirstComponent> {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            assigner: FirstComponent,
            timestamp: None,
        }
    }
}

impl<A: ComponentAssigner> AptWriter<A> {
    /// Replace the component routing policy
    pub fn with_assigner<B: ComponentAssigner>(self, assigner: B) -> AptWriter<B> {
        AptWriter {
            configuration: self.configuration,
            assigner,
            timestamp: self.timestamp,
        }
    }

    /// Pin the `Date` of Release files, for reproducible output
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Run the build
    ///
    /// Fails before writing anything if the target exists, the source is not
    /// a directory or the configuration is invalid. Any later failure aborts
    /// the build and leaves the partial output in place.
    pub fn build(&self) -> Result<BuildReport> {
        let config = &self.configuration;
        let target = config.target_folder();
        let source = config.source_folder();

        if target.exists() {
            return Err(Error::TargetExists(target.to_path_buf()));
        }
        if !source.is_dir() {
            return Err(Error::SourceNotDirectory(source.to_path_buf()));
        }
        config.validate()?;

        info!("Building repository in {}", target.display());

        let pool = Pool::new(target);
        create_dir(pool.root())?;
        create_dir(&target.join("dists"))?;

        let digests = DigestTable::package()?;
        let mut index = PackageIndex::new();
        let mut report = BuildReport::default();

        for archive in discover_archives(source)? {
            report.archives += 1;
            self.process_archive(&archive, &pool, &digests, &mut index, &mut report)?;
        }

        let writer = ReleaseWriter::new(
            target,
            config.architectures(),
            self.timestamp.unwrap_or_else(Utc::now),
        )?;
        for distribution in config.distributions() {
            let written = writer.write_distribution(distribution, &index)?;
            report.files_written.extend(written);
        }

        report.index_entries = index.len();

        info!(
            "Repository complete: {} archives copied, {} skipped",
            report.copied, report.skipped
        );

        Ok(report)
    }

    fn process_archive(
        &self,
        path: &Path,
        pool: &Pool,
        digests: &DigestTable,
        index: &mut PackageIndex,
        report: &mut BuildReport,
    ) -> Result<()> {
        debug!("Reading: {}", path.display());

        let Some(package) = DebPackage::read(path)? else {
            warn!("Skipping {}: no control metadata", path.display());
            report.skipped += 1;
            return Ok(());
        };

        let name = package
            .name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::InvalidPackage {
                path: path.to_path_buf(),
                reason: "missing Package field".to_string(),
            })?
            .to_string();
        if !pool::is_valid_package_name(&name) {
            return Err(Error::InvalidPackage {
                path: path.to_path_buf(),
                reason: format!("invalid package name '{}'", name),
            });
        }

        let Some(component) = self.assigner.assign(&self.configuration, package.control()) else {
            warn!("Skipping {}: no component assigned", path.display());
            report.skipped += 1;
            return Ok(());
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidPackage {
                path: path.to_path_buf(),
                reason: "no file name".to_string(),
            })?;
        let pool_path = pool.target_path(component.name(), &name, &file_name)?;

        // The copy and the index must agree with the Filename computed above
        let confirmed = self.assigner.assign(&self.configuration, package.control());
        if confirmed != Some(component) {
            return Err(Error::InvalidConfiguration(format!(
                "Component assignment for {} is not deterministic",
                path.display()
            )));
        }

        let size = fs::metadata(path)
            .map_err(|e| Error::IoError(format!("Failed to stat {}: {}", path.display(), e)))?
            .len();

        let mut control = package.into_control();
        control.set("Filename", pool.relative_filename(&pool_path)?);
        control.set("Size", size.to_string());
        for (field, hex) in digests.digest_file(path)? {
            control.set(field, hex);
        }

        pool.copy_into(path, &pool_path)?;
        report.copied += 1;

        let entries = index.add(
            &component.key(),
            PackageRecord::new(control),
            self.configuration.architectures(),
        );
        if entries == 0 {
            report.unindexed += 1;
        }

        Ok(())
    }
}

/// `.deb` files of `source` that can be opened, sorted by file name
fn discover_archives(source: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(source).map_err(|e| {
        Error::IoError(format!("Failed to read directory {}: {}", source.display(), e))
    })?;

    let mut archives = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| {
                Error::IoError(format!("Failed to read directory {}: {}", source.display(), e))
            })?
            .path();

        let is_package = path
            .extension()
            .is_some_and(|ext| ext == PACKAGE_EXTENSION);
        if !is_package || !path.is_file() {
            continue;
        }

        if let Err(e) = File::open(&path) {
            debug!("Ignoring unreadable {}: {}", path.display(), e);
            continue;
        }

        archives.push(path);
    }

    archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(archives)
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::IoError(format!("Failed to create directory {}: {}", dir.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlFile;
    use crate::test_utils::{DebBuilder, control, write_file};
    use chrono::TimeZone;
    use std::cell::Cell;

    fn configuration(source: &Path, target: &Path) -> Configuration {
        Configuration::new(source, target).with_distribution(
            Distribution::new("devel")
                .unwrap()
                .with_component(Component::new("main").unwrap()),
        )
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 2, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_discover_archives_sorted_and_filtered() {
        let source = tempfile::tempdir().unwrap();
        write_file(source.path(), "zeta.deb", b"z");
        write_file(source.path(), "alpha.deb", b"a");
        write_file(source.path(), "notes.txt", b"n");
        fs::create_dir(source.path().join("dir.deb")).unwrap();

        let archives = discover_archives(source.path()).unwrap();
        let names: Vec<_> = archives
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha.deb", "zeta.deb"]);
    }

    #[test]
    fn test_build_report() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let target = target.path().join("repo");

        let foo = DebBuilder::new(&control("foo", "amd64")).build();
        let bar = DebBuilder::new(&control("bar", "arm64")).build();
        let empty = DebBuilder::new("").without_control().build();
        write_file(source.path(), "foo_1.0_amd64.deb", &foo);
        write_file(source.path(), "bar_1.0_arm64.deb", &bar);
        write_file(source.path(), "empty.deb", &empty);

        let report = AptWriter::new(configuration(source.path(), &target))
            .with_timestamp(timestamp())
            .build()
            .unwrap();

        assert_eq!(report.archives, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.copied, 2);
        assert_eq!(report.unindexed, 1);
        assert_eq!(report.index_entries, 1);
        assert_eq!(report.files_written.len(), 4);

        assert!(target.join("pool/main/b/bar/bar_1.0_arm64.deb").is_file());
        assert!(!target.join("dists/devel/main/binary-arm64").exists());

        let release = fs::read_to_string(target.join("dists/devel/Release")).unwrap();
        assert!(release.contains("Date: Wed, 02 Oct 2024 10:00:00 UTC\n"));
    }

    #[test]
    fn test_record_fields() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let target = target.path().join("repo");

        let deb = DebBuilder::new(&control("foo", "amd64")).build();
        let path = write_file(source.path(), "foo.deb", &deb);

        AptWriter::new(configuration(source.path(), &target))
            .build()
            .unwrap();

        let packages = fs::read(target.join("dists/devel/main/binary-amd64/Packages")).unwrap();
        let stanza = ControlFile::parse(&packages).unwrap();

        assert_eq!(stanza.get("Filename"), Some("pool/main/f/foo/foo.deb"));
        assert_eq!(stanza.get("Size"), Some(deb.len().to_string().as_str()));
        assert_eq!(
            stanza.get("MD5sum").map(str::to_string),
            Some(digest::digest_file(&path, digest::DigestAlgorithm::Md5).unwrap())
        );
        assert!(stanza.get("SHA1").is_some());
        assert!(stanza.get("SHA256").is_some());
    }

    #[test]
    fn test_missing_package_field_is_fatal() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let target = target.path().join("repo");

        let deb = DebBuilder::new("Version: 1.0\nArchitecture: amd64\n").build();
        write_file(source.path(), "nameless.deb", &deb);

        let result = AptWriter::new(configuration(source.path(), &target)).build();
        assert!(matches!(result, Err(Error::InvalidPackage { .. })));
    }

    #[test]
    fn test_traversing_package_name_is_fatal() {
        let source = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let target = scratch.path().join("a/b/repo");

        let deb = DebBuilder::new("Package: ../../../escaped\nVersion: 1.0\nArchitecture: amd64\n").build();
        write_file(source.path(), "escape.deb", &deb);

        let result = AptWriter::new(configuration(source.path(), &target)).build();
        match result {
            Err(Error::InvalidPackage { path, reason }) => {
                assert_eq!(path, source.path().join("escape.deb"));
                assert!(reason.contains("../../../escaped"));
            }
            other => panic!("expected an invalid package error, got {:?}", other),
        }

        assert!(!scratch.path().join("a/escaped").exists());
        assert!(!scratch.path().join("a/b/escaped").exists());
        assert!(!target.join("escaped").exists());
    }

    #[test]
    fn test_preflight_errors() {
        let source = tempfile::tempdir().unwrap();
        let existing = tempfile::tempdir().unwrap();

        let result = AptWriter::new(configuration(source.path(), existing.path())).build();
        assert!(matches!(result, Err(Error::TargetExists(_))));

        let target = existing.path().join("repo");
        let missing = source.path().join("missing");
        let result = AptWriter::new(configuration(&missing, &target)).build();
        assert!(matches!(result, Err(Error::SourceNotDirectory(_))));
        assert!(!target.exists());

        let config = Configuration::new(source.path(), &target);
        let result = AptWriter::new(config).build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
        assert!(!target.exists());

        let config = configuration(source.path(), &target).with_architectures(["amd64", "bad/arch"]);
        let result = AptWriter::new(config).build();
        assert!(matches!(result, Err(Error::InvalidName { .. })));
        assert!(!target.exists());
    }

    /// Alternates between the first two components of the first distribution
    struct Flapping {
        calls: Cell<usize>,
    }

    impl ComponentAssigner for Flapping {
        fn assign<'c>(
            &self,
            configuration: &'c Configuration,
            _control: &ControlFile,
        ) -> Option<&'c Component> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            configuration.distributions()[0].components().get(call % 2)
        }
    }

    #[test]
    fn test_nondeterministic_assigner_is_fatal() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let target = target.path().join("repo");

        let deb = DebBuilder::new(&control("foo", "amd64")).build();
        write_file(source.path(), "foo.deb", &deb);

        let config = Configuration::new(source.path(), &target).with_distribution(
            Distribution::new("devel")
                .unwrap()
                .with_component(Component::new("main").unwrap())
                .with_component(Component::new("contrib").unwrap()),
        );

        let result = AptWriter::new(config)
            .with_assigner(Flapping { calls: Cell::new(0) })
            .build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
        assert!(!target.join("pool/main/f/foo/foo.deb").exists());
    }

    struct Nowhere;

    impl ComponentAssigner for Nowhere {
        fn assign<'c>(&self, _: &'c Configuration, _: &ControlFile) -> Option<&'c Component> {
            None
        }
    }

    #[test]
    fn test_unassigned_archive_is_skipped() {
        let source = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let target = target.path().join("repo");

        let deb = DebBuilder::new(&control("foo", "amd64")).build();
        write_file(source.path(), "foo.deb", &deb);

        let report = AptWriter::new(configuration(source.path(), &target))
            .with_assigner(Nowhere)
            .build()
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.copied, 0);
        assert!(target.join("dists/devel/Release").is_file());
    }
}
