//! Scene identifiers, authored scene groups and tracked membership
//!
//! ## Architecture
//!
//! ```text
//! GroupCatalog (authored data, TOML/RON)
//!      ↓
//! SceneGroup ──→ TransitionRequest
//!                     ↓
//!              TransitionEngine ──→ GroupState (settled membership)
//! ```
//!
//! The catalog only describes which scenes make up a named group. What is
//! actually loaded is tracked by [`GroupState`], which the transition engine
//! updates once a batch has settled.

mod group_state;

pub use group_state::{GroupState, StateSet};

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Opaque name of a loadable scene
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Create a scene identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Scene name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for SceneId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&SceneId> for SceneId {
    fn from(id: &SceneId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A named list of scenes that are loaded together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneGroup {
    /// Group name used for catalog lookup
    pub name: String,
    /// Member scenes, in load order
    #[serde(default)]
    pub scenes: Vec<SceneId>,
}

impl SceneGroup {
    /// Create a group from a name and its member scenes
    pub fn new<I, S>(name: impl Into<String>, scenes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SceneId>,
    {
        Self {
            name: name.into(),
            scenes: scenes.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a scene to the group
    pub fn add_scene(&mut self, scene: impl Into<SceneId>) {
        self.scenes.push(scene.into());
    }

    /// Append every scene from `scenes`
    pub fn add_all_scenes<I, S>(&mut self, scenes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<SceneId>,
    {
        self.scenes.extend(scenes.into_iter().map(Into::into));
    }

    /// Remove the first occurrence of `scene`, returning whether it was present
    pub fn remove_scene(&mut self, scene: &str) -> bool {
        if let Some(index) = self.scenes.iter().position(|s| s.as_str() == scene) {
            self.scenes.remove(index);
            true
        } else {
            false
        }
    }

    /// Whether `scene` is a member of this group
    pub fn contains_scene(&self, scene: &str) -> bool {
        self.scenes.iter().any(|s| s.as_str() == scene)
    }

    /// Whether the group has no scenes
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Catalog lookup errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No group with this name is defined
    #[error("Scene group not found: {0}")]
    GroupNotFound(String),

    /// Two groups share the same name
    #[error("Duplicate scene group: {0}")]
    DuplicateGroup(String),
}

/// Authored set of named scene groups
///
/// ```toml
/// [[groups]]
/// name = "main_menu"
/// scenes = ["MenuBackground", "MenuUi"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCatalog {
    /// All defined groups
    #[serde(default)]
    pub groups: Vec<SceneGroup>,
}

impl GroupCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group, rejecting duplicate names
    pub fn insert(&mut self, group: SceneGroup) -> Result<(), CatalogError> {
        if self.groups.iter().any(|g| g.name == group.name) {
            return Err(CatalogError::DuplicateGroup(group.name));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Look up a group by name
    pub fn get(&self, name: &str) -> Result<&SceneGroup, CatalogError> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| CatalogError::GroupNotFound(name.to_string()))
    }

    /// Names of every group, in authored order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }

    /// Check that group names are unique
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for group in &self.groups {
            if !seen.insert(group.name.as_str()) {
                return Err(CatalogError::DuplicateGroup(group.name.clone()));
            }
        }
        Ok(())
    }
}

impl Config for GroupCatalog {}
