// src/repository/config.rs

//! Repository configuration: distributions, components and architectures

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Architectures used when none are configured explicitly
pub const DEFAULT_ARCHITECTURES: &[&str] = &["amd64", "i386"];

/// Validate a distribution, component or architecture identifier
///
/// Names end up as directory names and as space-separated list items in
/// Release files, so only `[A-Za-z0-9][A-Za-z0-9._+-]*` is accepted.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Identity of a component: owning distribution name plus component name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentKey {
    pub distribution: String,
    pub component: String,
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.distribution, self.component)
    }
}

/// A component of a distribution (e.g. "main")
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    label: String,
    distribution: Option<String>,
}

impl Component {
    /// Create a detached component; fails on an invalid name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("component", &name)?;
        Ok(Self {
            name,
            label: "Main component".to_string(),
            distribution: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name of the owning distribution, once attached
    pub fn distribution(&self) -> Option<&str> {
        self.distribution.as_deref()
    }

    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            distribution: self.distribution.clone().unwrap_or_default(),
            component: self.name.clone(),
        }
    }
}

impl Default for Component {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            label: "Main component".to_string(),
            distribution: None,
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.distribution == other.distribution && self.name == other.name
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.distribution.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A distribution (codename) with its components
#[derive(Debug, Clone)]
pub struct Distribution {
    name: String,
    label: String,
    origin: String,
    description: Option<String>,
    components: Vec<Component>,
}

impl Distribution {
    /// Create a distribution without components; fails on an invalid name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("distribution", &name)?;
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a component to this distribution
    ///
    /// The component is copied and bound to this distribution. A component
    /// with the same name is already part of the set and is left unchanged.
    pub fn add_component(&mut self, component: Component) {
        if self.components.iter().any(|c| c.name == component.name) {
            return;
        }

        let mut component = component;
        component.distribution = Some(self.name.clone());
        self.components.push(component);
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.add_component(component);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self {
            name: "devel".to_string(),
            label: "Development".to_string(),
            origin: "Unknown".to_string(),
            description: None,
            components: Vec::new(),
        }
    }
}

impl PartialEq for Distribution {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Distribution {}

impl Hash for Distribution {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Everything a repository build needs to know
///
/// The configuration is moved into the writer when a build starts, so it
/// cannot change while the build runs.
#[derive(Debug, Clone)]
pub struct Configuration {
    source_folder: PathBuf,
    target_folder: PathBuf,
    distributions: Vec<Distribution>,
    architectures: BTreeSet<String>,
}

impl Configuration {
    pub fn new(source_folder: impl Into<PathBuf>, target_folder: impl Into<PathBuf>) -> Self {
        Self {
            source_folder: source_folder.into(),
            target_folder: target_folder.into(),
            distributions: Vec::new(),
            architectures: DEFAULT_ARCHITECTURES.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Replace the architecture set
    pub fn with_architectures<I, S>(mut self, architectures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.architectures = architectures.into_iter().map(Into::into).collect();
        self
    }

    /// Add a distribution; a distribution with the same name is kept as is
    pub fn add_distribution(&mut self, distribution: Distribution) {
        if !self.distributions.contains(&distribution) {
            self.distributions.push(distribution);
        }
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.add_distribution(distribution);
        self
    }

    pub fn source_folder(&self) -> &Path {
        &self.source_folder
    }

    pub fn target_folder(&self) -> &Path {
        &self.target_folder
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn architectures(&self) -> &BTreeSet<String> {
        &self.architectures
    }

    /// Check the parts of the configuration that are not checked on construction
    pub fn validate(&self) -> Result<()> {
        if self.architectures.is_empty() {
            return Err(Error::InvalidConfiguration(
                "Architectures must be set".to_string(),
            ));
        }

        for arch in &self.architectures {
            validate_name("architecture", arch)?;
            // "all" is a package attribute, it has no binary-all index of its own
            if arch == "all" {
                return Err(Error::InvalidConfiguration(
                    "'all' cannot be configured as an architecture".to_string(),
                ));
            }
        }

        if self.distributions.is_empty() {
            return Err(Error::InvalidConfiguration(
                "At least one distribution is required".to_string(),
            ));
        }

        for dist in &self.distributions {
            if dist.components.is_empty() {
                return Err(Error::InvalidConfiguration(format!(
                    "Distribution '{}' has no components",
                    dist.name
                )));
            }
        }

        Ok(())
    }
}
