//! Settled scene membership
//!
//! Only the transition engine writes to this state, and only after a batch has
//! fully settled. Readers therefore never observe a half-finished transition.

use super::SceneId;
use std::collections::HashSet;

/// Which tracked set an operation reads and commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSet {
    /// Scenes owned by the active group; replaced on every group switch
    CurrentGroup,
    /// Scenes that survive group switches
    Persistent,
}

/// In-memory record of which scenes are loaded and where they belong
///
/// A scene may appear in both sets. Group switches never unload a scene that is
/// also persistent, so dual membership keeps a scene alive across switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupState {
    current_group: HashSet<SceneId>,
    persistent_set: HashSet<SceneId>,
}

impl GroupState {
    /// Create empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Scenes in the current group
    pub fn current_group(&self) -> &HashSet<SceneId> {
        &self.current_group
    }

    /// Scenes in the persistent set
    pub fn persistent_set(&self) -> &HashSet<SceneId> {
        &self.persistent_set
    }

    /// Borrow one of the two sets
    pub fn set(&self, which: StateSet) -> &HashSet<SceneId> {
        match which {
            StateSet::CurrentGroup => &self.current_group,
            StateSet::Persistent => &self.persistent_set,
        }
    }

    /// Whether `scene` is a member of `which`
    pub fn contains(&self, which: StateSet, scene: &str) -> bool {
        self.set(which).contains(scene)
    }

    /// Whether `scene` is tracked in either set
    pub fn is_loaded(&self, scene: &str) -> bool {
        self.current_group.contains(scene) || self.persistent_set.contains(scene)
    }

    /// Current-group members that a group switch has to unload
    ///
    /// Sorted so unload calls are issued in a stable order.
    pub fn unload_candidates(&self) -> Vec<SceneId> {
        let mut scenes: Vec<SceneId> = self
            .current_group
            .iter()
            .filter(|scene| !self.persistent_set.contains(*scene))
            .cloned()
            .collect();
        scenes.sort();
        scenes
    }

    pub(crate) fn replace(&mut self, which: StateSet, scenes: impl IntoIterator<Item = SceneId>) {
        let set = self.set_mut(which);
        set.clear();
        set.extend(scenes);
    }

    pub(crate) fn extend(&mut self, which: StateSet, scenes: impl IntoIterator<Item = SceneId>) {
        self.set_mut(which).extend(scenes);
    }

    pub(crate) fn remove(&mut self, which: StateSet, scene: &str) -> bool {
        self.set_mut(which).remove(scene)
    }

    fn set_mut(&mut self, which: StateSet) -> &mut HashSet<SceneId> {
        match which {
            StateSet::CurrentGroup => &mut self.current_group,
            StateSet::Persistent => &mut self.persistent_set,
        }
    }
}
