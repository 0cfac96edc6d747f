// src/repository/digest.rs

//! Checksums for Packages and Release files
//!
//! Both index formats carry the same three digests, but they spell the MD5
//! field differently: `MD5sum` in a Packages stanza, `MD5Sum` in a Release
//! file. The two tables below keep that difference in one place.

use crate::error::{Error, Result};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Resolve an algorithm by its conventional name (`MD5`, `SHA-1`, `SHA-256`, ...)
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA-1" | "SHA1" => Ok(Self::Sha1),
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            _ => Err(Error::UnknownDigest(name.to_string())),
        }
    }

    fn hasher(self) -> Hasher {
        match self {
            Self::Md5 => Hasher::Md5(Md5::new()),
            Self::Sha1 => Hasher::Sha1(Sha1::new()),
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }
}

/// Streaming hasher for one algorithm
enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => format!("{:x}", h.finalize()),
            Self::Sha1(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Feeds every written chunk to a set of hashers
struct MultiHasher {
    hashers: Vec<Hasher>,
}

impl Write for MultiHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for hasher in &mut self.hashers {
            hasher.update(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn hash_file(path: &Path, algorithms: &[DigestAlgorithm]) -> Result<Vec<String>> {
    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut sink = MultiHasher {
        hashers: algorithms.iter().map(|a| a.hasher()).collect(),
    };

    // io::copy moves the file through a fixed-size buffer
    io::copy(&mut BufReader::new(file), &mut sink)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

    Ok(sink
        .hashers
        .into_iter()
        .map(Hasher::finalize_hex)
        .collect())
}

/// Lowercase hex digest of a file's content
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String> {
    let mut digests = hash_file(path, &[algorithm])?;
    Ok(digests.remove(0))
}

/// A digest algorithm together with the field name it is emitted under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digester {
    pub field: &'static str,
    pub algorithm: DigestAlgorithm,
}

/// An ordered set of named digests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestTable {
    digesters: Vec<Digester>,
}

impl DigestTable {
    /// Build a table from `(field name, algorithm name)` pairs
    pub fn from_names(entries: &[(&'static str, &str)]) -> Result<Self> {
        let digesters = entries
            .iter()
            .map(|&(field, algorithm)| {
                Ok(Digester {
                    field,
                    algorithm: DigestAlgorithm::from_name(algorithm)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { digesters })
    }

    /// Digest fields of a Packages stanza
    pub fn package() -> Result<Self> {
        // "MD5sum" here versus "MD5Sum" in Release files is how dpkg spells it
        Self::from_names(&[("MD5sum", "MD5"), ("SHA1", "SHA-1"), ("SHA256", "SHA-256")])
    }

    /// Checksum blocks of a Release file
    pub fn release() -> Result<Self> {
        Self::from_names(&[("MD5Sum", "MD5"), ("SHA1", "SHA-1"), ("SHA256", "SHA-256")])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Digester> {
        self.digesters.iter()
    }

    /// Compute every digest of the table in a single pass over the file
    ///
    /// Returns `(field name, hex digest)` pairs in table order.
    pub fn digest_file(&self, path: &Path) -> Result<Vec<(&'static str, String)>> {
        let algorithms: Vec<_> = self.digesters.iter().map(|d| d.algorithm).collect();
        let digests = hash_file(path, &algorithms)?;

        Ok(self
            .digesters
            .iter()
            .map(|d| d.field)
            .zip(digests)
            .collect())
    }
}
