// src/packages/mod.rs

//! Package format support for aptrepo
//!
//! Readers extract the control metadata that repository indices are built
//! from. Each format implements the `PackageArchive` trait.

pub mod deb;
pub mod traits;

pub use deb::DebPackage;
pub use traits::PackageArchive;
