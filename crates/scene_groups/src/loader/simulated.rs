//! Deterministic in-process loader
//!
//! Operations advance by a fixed step every time [`SimulatedLoader::advance`]
//! is called, which stands in for the engine's background loading thread.
//! Loads stop at the activation hold (90% by default) until their handle is
//! released, then finish on the next advance. Every collaborator call is
//! recorded so callers can assert exactly what the engine asked for.

use super::{LoadHandle, LoaderError, SceneLoader};
use crate::scene::SceneId;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Progress at which a load waits for activation
pub const DEFAULT_ACTIVATION_HOLD: f32 = crate::config::MAX_ACTIVATION_THRESHOLD;

/// Progress added per [`SimulatedLoader::advance`]
pub const DEFAULT_STEP: f32 = 0.25;

/// A collaborator call observed by the simulated loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    /// `begin_load`
    Load(SceneId),
    /// `begin_unload`
    Unload(SceneId),
    /// `release_unused_assets`
    ReleaseUnused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Load,
    Unload,
}

#[derive(Debug)]
struct Operation {
    kind: OperationKind,
    scene: SceneId,
    progress: f32,
    step: f32,
    hold: f32,
    activation_allowed: bool,
    done: bool,
}

impl Operation {
    fn advance(&mut self) {
        if self.done {
            return;
        }
        match self.kind {
            OperationKind::Load => {
                if self.activation_allowed && self.progress >= self.hold {
                    self.progress = 1.0;
                    self.done = true;
                } else {
                    let next = (self.progress + self.step).min(self.hold);
                    self.progress = self.progress.max(next);
                }
            }
            OperationKind::Unload => {
                self.progress = (self.progress + self.step).min(1.0);
                self.done = self.progress >= 1.0;
            }
        }
    }
}

type SharedOperation = Rc<RefCell<Operation>>;

struct SimulatedHandle {
    operation: SharedOperation,
}

impl LoadHandle for SimulatedHandle {
    fn progress(&self) -> f32 {
        self.operation.borrow().progress
    }

    fn is_done(&self) -> bool {
        self.operation.borrow().done
    }

    fn set_activation_allowed(&mut self, allowed: bool) {
        self.operation.borrow_mut().activation_allowed = allowed;
    }
}

/// Scripted loader backend
pub struct SimulatedLoader {
    step: f32,
    hold: f32,
    scene_steps: HashMap<SceneId, f32>,
    unavailable: HashSet<SceneId>,
    in_flight: Vec<SharedOperation>,
    loaded: Vec<SceneId>,
    calls: Vec<LoaderCall>,
}

impl SimulatedLoader {
    /// Create a loader with the default step and activation hold
    pub fn new() -> Self {
        Self {
            step: DEFAULT_STEP,
            hold: DEFAULT_ACTIVATION_HOLD,
            scene_steps: HashMap::new(),
            unavailable: HashSet::new(),
            in_flight: Vec::new(),
            loaded: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Set the progress added per advance for every scene
    #[must_use]
    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    /// Set the progress at which loads wait for activation
    ///
    /// A hold below the engine's activation threshold keeps load batches from
    /// ever opening their gate.
    #[must_use]
    pub fn with_activation_hold(mut self, hold: f32) -> Self {
        self.hold = hold;
        self
    }

    /// Override the per-advance step for one scene
    #[must_use]
    pub fn with_scene_step(mut self, scene: impl Into<SceneId>, step: f32) -> Self {
        self.scene_steps.insert(scene.into(), step);
        self
    }

    /// Make `begin_load` fail for `scene`
    pub fn mark_unavailable(&mut self, scene: impl Into<SceneId>) {
        self.unavailable.insert(scene.into());
    }

    /// Pretend `scene` was loaded outside of any transition
    pub fn preload(&mut self, scene: impl Into<SceneId>) {
        let scene = scene.into();
        if !self.loaded.contains(&scene) {
            self.loaded.push(scene);
        }
    }

    /// Advance every in-flight operation by one step
    pub fn advance(&mut self) {
        for operation in &self.in_flight {
            operation.borrow_mut().advance();
        }

        let (finished, pending): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|operation| operation.borrow().done);
        self.in_flight = pending;

        for operation in finished {
            let operation = operation.borrow();
            match operation.kind {
                OperationKind::Load => {
                    if !self.loaded.contains(&operation.scene) {
                        self.loaded.push(operation.scene.clone());
                    }
                }
                OperationKind::Unload => self.loaded.retain(|s| s != &operation.scene),
            }
        }
    }

    /// Force the progress of the in-flight load of `scene`
    ///
    /// Returns `false` when no such load is running.
    pub fn set_progress(&mut self, scene: &str, progress: f32) -> bool {
        self.find_in_flight(OperationKind::Load, scene)
            .map(|operation| operation.borrow_mut().progress = progress.clamp(0.0, 1.0))
            .is_some()
    }

    /// Activation flag of the in-flight load of `scene`
    pub fn activation_allowed(&self, scene: &str) -> Option<bool> {
        self.find_in_flight(OperationKind::Load, scene)
            .map(|operation| operation.borrow().activation_allowed)
    }

    /// Every call the engine has made, in order
    pub fn calls(&self) -> &[LoaderCall] {
        &self.calls
    }

    /// Forget recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of operations that have not finished yet
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn find_in_flight(&self, kind: OperationKind, scene: &str) -> Option<&SharedOperation> {
        self.in_flight.iter().find(|operation| {
            let operation = operation.borrow();
            operation.kind == kind && operation.scene.as_str() == scene
        })
    }

    fn start(&mut self, kind: OperationKind, scene: &SceneId) -> Box<dyn LoadHandle> {
        let operation = Rc::new(RefCell::new(Operation {
            kind,
            scene: scene.clone(),
            progress: 0.0,
            step: self.scene_steps.get(scene).copied().unwrap_or(self.step),
            hold: self.hold,
            activation_allowed: true,
            done: false,
        }));
        self.in_flight.push(Rc::clone(&operation));
        Box::new(SimulatedHandle { operation })
    }
}

impl Default for SimulatedLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneLoader for SimulatedLoader {
    fn begin_load(&mut self, scene: &SceneId) -> Result<Box<dyn LoadHandle>, LoaderError> {
        self.calls.push(LoaderCall::Load(scene.clone()));
        if self.unavailable.contains(scene) {
            return Err(LoaderError::unavailable(scene, "scene is not registered"));
        }
        Ok(self.start(OperationKind::Load, scene))
    }

    fn begin_unload(&mut self, scene: &SceneId) -> Result<Box<dyn LoadHandle>, LoaderError> {
        self.calls.push(LoaderCall::Unload(scene.clone()));
        if !self.loaded.contains(scene) {
            return Err(LoaderError::unavailable(scene, "scene is not loaded"));
        }
        Ok(self.start(OperationKind::Unload, scene))
    }

    fn release_unused_assets(&mut self) {
        self.calls.push(LoaderCall::ReleaseUnused);
    }

    fn loaded_scenes(&self) -> Vec<SceneId> {
        self.loaded.clone()
    }
}
