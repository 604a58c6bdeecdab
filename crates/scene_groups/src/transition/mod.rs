//! Scene group transitions
//!
//! A transition is one caller-visible request: switch the current group, add
//! scenes to it, load persistent scenes, or unload a single scene. The
//! [`TransitionEngine`] turns each request into one or two batches of loader
//! operations, polls them every tick and commits the result to
//! [`GroupState`](crate::scene::GroupState) once everything has settled.

mod batch;
mod engine;

pub use engine::TransitionEngine;

use crate::progress::ProgressSink;
use crate::scene::{SceneGroup, SceneId, StateSet};
use std::fmt;

slotmap::new_key_type! {
    /// Identifier of a submitted transition
    pub struct TransitionId;
}

/// The five caller-facing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// Unload the current group, load a new one, replace the current group
    SwitchGroup,
    /// Load scenes and add them to the current group
    AddToCurrentGroup,
    /// Load scenes and add them to the persistent set
    AddPersistent,
    /// Unload one scene from the current group
    RemoveFromCurrentGroup,
    /// Unload one scene from the persistent set
    RemoveFromPersistent,
}

impl TransitionKind {
    /// The state set this transition commits to
    pub const fn state_set(self) -> StateSet {
        match self {
            Self::SwitchGroup | Self::AddToCurrentGroup | Self::RemoveFromCurrentGroup => {
                StateSet::CurrentGroup
            }
            Self::AddPersistent | Self::RemoveFromPersistent => StateSet::Persistent,
        }
    }

    /// Whether this transition brackets its work with loading notifications
    ///
    /// Single-scene removals are silent.
    pub const fn notifies(self) -> bool {
        matches!(
            self,
            Self::SwitchGroup | Self::AddToCurrentGroup | Self::AddPersistent
        )
    }
}

/// Why a submission did no work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing to load and nothing to unload
    EmptyRequest,
    /// Every target was already a member and `ignore_if_already_loaded` was set
    AlreadyLoaded,
    /// The scene to remove is not a member of the set
    NotAMember,
}

/// Immediate result of submitting a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Work has begun; loader operations for the first phase are in flight
    Started(TransitionId),
    /// Another transition owns the same state set; this one starts after it
    Queued(TransitionId),
    /// The request was a no-op
    Skipped(SkipReason),
}

impl Submission {
    /// Transition id, unless the request was skipped
    pub const fn id(&self) -> Option<TransitionId> {
        match self {
            Self::Started(id) | Self::Queued(id) => Some(*id),
            Self::Skipped(_) => None,
        }
    }

    /// Whether the request was a no-op
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Where a submitted transition currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    /// Waiting for an earlier transition on the same state set
    Queued,
    /// Unload phase in flight
    Unloading,
    /// Load phase in flight, activation still held
    Loading,
    /// Activation released; waiting for every handle to finish
    Activating,
}

/// How a transition ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// State was committed
    ///
    /// A removal whose unload the loader refuses still drops the scene from
    /// the state set, since the loader reports it as not loaded. That scene is
    /// then listed under both `committed` and `unavailable`.
    Committed {
        /// Scenes added to (or, for removals, removed from) the state set
        committed: Vec<SceneId>,
        /// Scenes the loader could not provide a handle for
        unavailable: Vec<SceneId>,
    },
    /// A queued transition turned out to be a no-op once it was its turn
    Skipped(SkipReason),
}

/// Emitted by [`TransitionEngine::tick`] for every transition that settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    /// Transition that settled
    pub id: TransitionId,
    /// Operation it performed
    pub kind: TransitionKind,
    /// Result
    pub outcome: TransitionOutcome,
}

impl TransitionReport {
    /// Scenes committed by this transition
    pub fn committed(&self) -> &[SceneId] {
        match &self.outcome {
            TransitionOutcome::Committed { committed, .. } => committed,
            TransitionOutcome::Skipped(_) => &[],
        }
    }

    /// Scenes dropped because the loader could not provide them
    pub fn unavailable(&self) -> &[SceneId] {
        match &self.outcome {
            TransitionOutcome::Committed { unavailable, .. } => unavailable,
            TransitionOutcome::Skipped(_) => &[],
        }
    }
}

/// Scenes to load plus load options
#[derive(Default)]
pub struct TransitionRequest {
    /// Scenes to load; duplicates are collapsed, first occurrence wins
    pub targets: Vec<SceneId>,
    /// Optional observer for aggregate progress
    pub progress_sink: Option<Box<dyn ProgressSink>>,
    /// Skip scenes that are already members of the target set
    pub ignore_if_already_loaded: bool,
}

impl TransitionRequest {
    /// Request loading `targets` with default options
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SceneId>,
    {
        Self::builder().targets(targets).build()
    }

    /// Request loading every scene of `group`
    pub fn from_group(group: &SceneGroup) -> Self {
        Self::builder().group(group).build()
    }

    /// Start building a request
    pub fn builder() -> TransitionRequestBuilder {
        TransitionRequestBuilder::default()
    }

    /// Targets with duplicates removed, preserving first-seen order
    pub(crate) fn unique_targets(&self) -> Vec<SceneId> {
        let mut seen = std::collections::HashSet::new();
        self.targets
            .iter()
            .filter(|scene| seen.insert(*scene))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for TransitionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRequest")
            .field("targets", &self.targets)
            .field("progress_sink", &self.progress_sink.is_some())
            .field("ignore_if_already_loaded", &self.ignore_if_already_loaded)
            .finish()
    }
}

/// Builder for [`TransitionRequest`]
#[derive(Default)]
pub struct TransitionRequestBuilder {
    targets: Vec<SceneId>,
    progress_sink: Option<Box<dyn ProgressSink>>,
    ignore_if_already_loaded: bool,
}

impl TransitionRequestBuilder {
    /// Append scenes to load
    #[must_use]
    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SceneId>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Append every scene of `group`
    #[must_use]
    pub fn group(mut self, group: &SceneGroup) -> Self {
        self.targets.extend(group.scenes.iter().cloned());
        self
    }

    /// Report aggregate progress to `sink`
    #[must_use]
    pub fn progress_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress_sink = Some(Box::new(sink));
        self
    }

    /// Skip targets that are already loaded into the target set
    #[must_use]
    pub fn ignore_if_already_loaded(mut self, ignore: bool) -> Self {
        self.ignore_if_already_loaded = ignore;
        self
    }

    /// Finish the request
    pub fn build(self) -> TransitionRequest {
        TransitionRequest {
            targets: self.targets,
            progress_sink: self.progress_sink,
            ignore_if_already_loaded: self.ignore_if_already_loaded,
        }
    }
}
