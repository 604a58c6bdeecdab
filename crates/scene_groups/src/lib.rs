//! # Scene Groups
//!
//! Group-based scene loading for game engines. Scenes are loaded and unloaded
//! in batches, progress from every in-flight operation is folded into a single
//! value, and activation is held back until the whole batch is close to done
//! so that scenes in the same group come online together.
//!
//! ## Features
//!
//! - **Group switching**: unload the current group, load a new one, commit atomically
//! - **Incremental and persistent loads**: grow the current group or load scenes
//!   that survive group switches
//! - **Progress aggregation**: one monotonic `[0, 1]` value per batch
//! - **Activation gating**: handles are released together once the batch crosses
//!   the activation threshold
//! - **Graceful degradation**: a scene the loader cannot provide is skipped, not fatal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_groups::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = TransitionEngine::new(SimulatedLoader::new());
//!     engine.set_on_loading_start(|| println!("loading screen up"));
//!     engine.set_on_loading_end(|| println!("loading screen down"));
//!
//!     let request = TransitionRequest::builder()
//!         .targets(["Level01", "Level01_Lighting"])
//!         .progress_sink(|value: f32| println!("{:.0}%", value * 100.0))
//!         .build();
//!     engine.switch_group(request);
//!
//!     while !engine.is_idle() {
//!         engine.loader_mut().advance();
//!         engine.tick();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod loader;
pub mod progress;
pub mod hooks;
pub mod transition;

pub use config::{Config, ConfigError, TransitionConfig};
pub use transition::{TransitionEngine, TransitionRequest};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, TransitionConfig},
        hooks::LoadingHooks,
        loader::{LoadHandle, LoaderError, SceneLoader, simulated::SimulatedLoader},
        progress::ProgressSink,
        scene::{GroupCatalog, GroupState, SceneGroup, SceneId, StateSet},
        transition::{
            SkipReason, Submission, TransitionEngine, TransitionId, TransitionKind,
            TransitionOutcome, TransitionReport, TransitionRequest, TransitionStatus,
        },
    };
}
