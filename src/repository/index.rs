// src/repository/index.rs

//! In-memory package index, bucketed by component and architecture

use super::config::ComponentKey;
use crate::control::{ControlFile, PACKAGES_FIELDS};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::debug;

/// Architecture value of architecture-independent packages
pub const ARCHITECTURE_ALL: &str = "all";

/// One stanza of a Packages file
///
/// Holds the package's own control fields plus the fields computed while
/// building the repository (`Filename`, `Size` and the digests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    control: ControlFile,
}

impl PackageRecord {
    pub fn new(control: ControlFile) -> Self {
        Self { control }
    }

    pub fn name(&self) -> Option<&str> {
        self.control.get("Package")
    }

    pub fn architecture(&self) -> Option<&str> {
        self.control.get("Architecture")
    }

    /// Pool path relative to the repository root
    pub fn filename(&self) -> Option<&str> {
        self.control.get("Filename")
    }

    pub fn control(&self) -> &ControlFile {
        &self.control
    }

    /// Serialize as a Packages stanza
    pub fn to_stanza(&self) -> String {
        self.control.to_stanza(PACKAGES_FIELDS)
    }
}

type Buckets = BTreeMap<String, Vec<Rc<PackageRecord>>>;

/// Package records per (component, architecture), in registration order
#[derive(Debug, Default)]
pub struct PackageIndex {
    buckets: BTreeMap<ComponentKey, Buckets>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the bucket of `component` and `architecture`
    pub fn register(&mut self, component: &ComponentKey, architecture: &str, record: Rc<PackageRecord>) {
        self.buckets
            .entry(component.clone())
            .or_default()
            .entry(architecture.to_string())
            .or_default()
            .push(record);
    }

    /// Register a record under every architecture it applies to
    ///
    /// `all` packages go into every configured architecture; other packages
    /// only into their own one, and nowhere if it is not configured.
    /// Returns the number of buckets the record was added to.
    pub fn add(
        &mut self,
        component: &ComponentKey,
        record: PackageRecord,
        architectures: &BTreeSet<String>,
    ) -> usize {
        let record = Rc::new(record);

        match record.architecture() {
            Some(ARCHITECTURE_ALL) => {
                for arch in architectures {
                    self.register(component, arch, Rc::clone(&record));
                }
                architectures.len()
            }
            Some(arch) if architectures.contains(arch) => {
                let arch = arch.to_string();
                self.register(component, &arch, Rc::clone(&record));
                1
            }
            arch => {
                debug!(
                    "Not indexing {}: architecture {} is not configured",
                    record.name().unwrap_or("<unnamed>"),
                    arch.unwrap_or("<none>")
                );
                0
            }
        }
    }

    /// Records of one bucket in registration order
    pub fn bucket(&self, component: &ComponentKey, architecture: &str) -> &[Rc<PackageRecord>] {
        self.buckets
            .get(component)
            .and_then(|archs| archs.get(architecture))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of index entries over all buckets
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|archs| archs.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
