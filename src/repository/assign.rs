// src/repository/assign.rs

//! Routing of packages to a distribution component

use super::config::{Component, Configuration};
use crate::control::ControlFile;

/// Decides which component a package belongs to
///
/// This is the extension point for routing packages. Implementations must be
/// deterministic: the writer asks twice for every archive and aborts the
/// build if the answers differ. Returning `None` skips the package.
pub trait ComponentAssigner {
    fn assign<'c>(
        &self,
        configuration: &'c Configuration,
        control: &ControlFile,
    ) -> Option<&'c Component>;
}

/// Puts every package into the first component of the first distribution
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstComponent;

impl ComponentAssigner for FirstComponent {
    fn assign<'c>(
        &self,
        configuration: &'c Configuration,
        _control: &ControlFile,
    ) -> Option<&'c Component> {
        configuration
            .distributions()
            .first()
            .and_then(|dist| dist.components().first())
    }
}
