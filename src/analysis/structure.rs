//! Structural markers: files and directories that suggest a role.

use super::builtin_tables;
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Mapping role -> relative marker paths. A role matches when any of its
/// markers exists under the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureMarkers {
    markers: BTreeMap<String, Vec<String>>,
}

impl StructureMarkers {
    /// The built-in markers.
    pub fn builtin() -> Result<Self> {
        Ok(Self::from_table(builtin_tables()?.markers))
    }

    pub fn from_table(markers: BTreeMap<String, Vec<String>>) -> Self {
        Self { markers }
    }

    /// Replace the markers of every role named in `overrides`.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Vec<String>>) -> Self {
        for (role, paths) in overrides {
            self.markers.insert(role.clone(), paths.clone());
        }
        self
    }

    pub fn markers(&self, role: &str) -> Option<&[String]> {
        self.markers.get(role).map(Vec::as_slice)
    }

    /// The first marker of `role` present under `root`.
    pub fn found_marker(&self, role: &str, root: &Path) -> Option<&str> {
        self.markers(role)?
            .iter()
            .find(|m| root.join(m.as_str()).exists())
            .map(String::as_str)
    }

    /// Roles with at least one marker present under `root`.
    pub fn matching_roles(&self, root: &Path) -> BTreeSet<String> {
        self.markers
            .keys()
            .filter(|role| self.found_marker(role, root).is_some())
            .cloned()
            .collect()
    }
}
