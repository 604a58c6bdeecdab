//! Loader collaborator interface
//!
//! The transition engine never loads anything itself. It asks a [`SceneLoader`]
//! to begin operations and then polls the returned [`LoadHandle`]s once per
//! tick. Engines plug their own asynchronous loading backend in here; the
//! [`simulated`] loader is a deterministic stand-in for tests and demos.

pub mod simulated;

use crate::scene::SceneId;
use thiserror::Error;

/// Loader errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// The loader could not produce a handle for this scene
    #[error("Scene unavailable: {scene} ({reason})")]
    ResourceUnavailable {
        /// Scene that was requested
        scene: SceneId,
        /// Loader-provided explanation
        reason: String,
    },
}

impl LoaderError {
    /// Build a [`LoaderError::ResourceUnavailable`]
    pub fn unavailable(scene: &SceneId, reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            scene: scene.clone(),
            reason: reason.into(),
        }
    }
}

/// Live reference to an in-flight load or unload operation
pub trait LoadHandle {
    /// Fractional completion in `[0, 1]`
    fn progress(&self) -> f32;

    /// Whether the operation has fully finished, including activation
    fn is_done(&self) -> bool;

    /// Allow or hold back final activation of a substantially complete load
    ///
    /// Unload handles may ignore this.
    fn set_activation_allowed(&mut self, allowed: bool);
}

/// Engine-provided asynchronous scene loading backend
pub trait SceneLoader {
    /// Start loading `scene` additively
    fn begin_load(&mut self, scene: &SceneId) -> Result<Box<dyn LoadHandle>, LoaderError>;

    /// Start unloading `scene`
    fn begin_unload(&mut self, scene: &SceneId) -> Result<Box<dyn LoadHandle>, LoaderError>;

    /// Purge assets no longer referenced by any loaded scene
    fn release_unused_assets(&mut self) {}

    /// Scenes the backend currently has loaded, if it can report them
    fn loaded_scenes(&self) -> Vec<SceneId> {
        Vec::new()
    }
}

impl<L: SceneLoader + ?Sized> SceneLoader for Box<L> {
    fn begin_load(&mut self, scene: &SceneId) -> Result<Box<dyn LoadHandle>, LoaderError> {
        (**self).begin_load(scene)
    }

    fn begin_unload(&mut self, scene: &SceneId) -> Result<Box<dyn LoadHandle>, LoaderError> {
        (**self).begin_unload(scene)
    }

    fn release_unused_assets(&mut self) {
        (**self).release_unused_assets();
    }

    fn loaded_scenes(&self) -> Vec<SceneId> {
        (**self).loaded_scenes()
    }
}
