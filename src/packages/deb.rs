// src/packages/deb.rs

//! Debian package format reader
//!
//! A .deb is an AR archive holding `debian-binary`, a `control.tar.*` bundle
//! and a `data.tar.*` payload. Repository indexing only needs the `control`
//! file from the control bundle.

use crate::control::ControlFile;
use crate::error::{Error, Result};
use crate::packages::traits::PackageArchive;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;

/// Compression of the control bundle, derived from its member name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlCompression {
    Gzip,
    Xz,
    Zstd,
    None,
}

impl ControlCompression {
    /// Map an AR member name to the control bundle it denotes
    fn from_member_name(name: &str) -> Option<Self> {
        // GNU ar terminates member names with '/'
        match name.trim_end_matches('/') {
            "control.tar.gz" => Some(Self::Gzip),
            "control.tar.xz" => Some(Self::Xz),
            "control.tar.zst" => Some(Self::Zstd),
            "control.tar" => Some(Self::None),
            _ => None,
        }
    }

    fn decoder<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(GzDecoder::new(reader)),
            Self::Xz => Box::new(XzDecoder::new(reader)),
            Self::Zstd => Box::new(
                zstd::Decoder::new(reader)
                    .map_err(|e| Error::ArchiveError(format!("Failed to create zstd decoder: {}", e)))?,
            ),
            Self::None => Box::new(reader),
        })
    }
}

/// Control metadata of a Debian binary package
#[derive(Debug, Clone)]
pub struct DebPackage {
    package_path: PathBuf,
    control: ControlFile,
}

impl DebPackage {
    /// Scan a control bundle for the `control` member
    fn read_control_member<R: Read>(reader: R, path: &Path) -> Result<Option<ControlFile>> {
        let mut archive = Archive::new(reader);

        let entries = archive.entries().map_err(|e| {
            Error::ArchiveError(format!("Failed to read control bundle of {}: {}", path.display(), e))
        })?;

        for entry in entries {
            let mut entry = entry.map_err(|e| {
                Error::ArchiveError(format!("Failed to read control entry of {}: {}", path.display(), e))
            })?;

            let entry_path = entry
                .path()
                .map_err(|e| {
                    Error::ArchiveError(format!("Failed to get entry path in {}: {}", path.display(), e))
                })?
                .to_string_lossy()
                .to_string();

            if entry_path == "./control" || entry_path == "control" {
                let mut content = Vec::new();
                entry.read_to_end(&mut content).map_err(|e| {
                    Error::ArchiveError(format!("Failed to read control file of {}: {}", path.display(), e))
                })?;
                let control = ControlFile::parse(&content).map_err(|e| {
                    Error::ParseError(format!("Invalid control file in {}: {}", path.display(), e))
                })?;
                return Ok(Some(control));
            }
        }

        Ok(None)
    }
}

impl PackageArchive for DebPackage {
    fn read(path: &Path) -> Result<Option<Self>> {
        debug!("Reading Debian package: {}", path.display());

        let file = File::open(path)
            .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

        let mut archive = ar::Archive::new(file);

        while let Some(entry) = archive.next_entry() {
            let entry = entry.map_err(|e| {
                Error::ArchiveError(format!("Failed to read AR entry of {}: {}", path.display(), e))
            })?;

            let member = String::from_utf8_lossy(entry.header().identifier()).to_string();
            let Some(compression) = ControlCompression::from_member_name(&member) else {
                continue;
            };

            debug!("Found control bundle {} in {}", member, path.display());

            // Only the first control bundle counts
            let reader = compression.decoder(entry)?;
            let control = Self::read_control_member(reader, path)?;
            if control.is_none() {
                debug!("No control file in {} of {}", member, path.display());
            }
            return Ok(control.map(|control| Self {
                package_path: path.to_path_buf(),
                control,
            }));
        }

        debug!("No control metadata in {}", path.display());
        Ok(None)
    }

    fn path(&self) -> &Path {
        &self.package_path
    }

    fn control(&self) -> &ControlFile {
        &self.control
    }

    fn into_control(self) -> ControlFile {
        self.control
    }
}
