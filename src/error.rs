// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for aptrepo
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error with the failing operation and path already formatted
    #[error("I/O error: {0}")]
    IoError(String),

    /// Malformed package archive (ar container, compression or tar stream)
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// Control file could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Package metadata is unusable (missing or empty mandatory field)
    #[error("Invalid package {path}: {reason}")]
    InvalidPackage { path: PathBuf, reason: String },

    /// Distribution, component or architecture name outside the safe charset
    #[error("Invalid {kind} name: '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// Inconsistent repository configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The build refuses to write into an existing directory
    #[error("The target path must not exist: {0}")]
    TargetExists(PathBuf),

    /// The source path is missing or is not a directory
    #[error("The source path must exist and must be a directory: {0}")]
    SourceNotDirectory(PathBuf),

    /// Digest algorithm name that cannot be resolved
    #[error("Unknown digest algorithm: {0}")]
    UnknownDigest(String),
}

/// Result type alias using aptrepo's Error type
pub type Result<T> = std::result::Result<T, Error>;
