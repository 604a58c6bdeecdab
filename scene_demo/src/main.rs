//! Scene group demo
//!
//! Drives the transition engine from a fixed-rate frame loop using the
//! simulated loader: boots into the main menu with persistent HUD scenes,
//! switches to the first level, streams in an extra scene and unloads it again.

use scene_groups::config::{Config, ConfigError, TransitionConfig};
use scene_groups::foundation::logging;
use scene_groups::loader::simulated::SimulatedLoader;
use scene_groups::loader::SceneLoader;
use scene_groups::scene::{CatalogError, GroupCatalog};
use scene_groups::transition::{Submission, TransitionEngine, TransitionRequest};
use std::time::Duration;

const GROUPS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/groups.toml");
const TRANSITION_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/transition.toml");
const FRAME_TIME: Duration = Duration::from_millis(16);
const MAX_FRAMES: u32 = 600;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Transitions still pending after {0} frames")]
    Stalled(u32),
}

/// Run frames until the engine has nothing left to do
fn run_frames(engine: &mut TransitionEngine<SimulatedLoader>) -> Result<u32, DemoError> {
    for frame in 0..MAX_FRAMES {
        engine.loader_mut().advance();
        for report in engine.tick() {
            log::info!(
                "Frame {frame}: {:?} finished ({} committed, {} unavailable)",
                report.kind,
                report.committed().len(),
                report.unavailable().len()
            );
        }
        if engine.is_idle() {
            return Ok(frame + 1);
        }
        std::thread::sleep(FRAME_TIME);
    }
    Err(DemoError::Stalled(MAX_FRAMES))
}

fn load_config() -> Result<TransitionConfig, ConfigError> {
    match TransitionConfig::load_from_file(TRANSITION_PATH) {
        Ok(config) => Ok(config),
        Err(ConfigError::Io(err)) => {
            log::warn!("{TRANSITION_PATH} not readable ({err}), using defaults");
            Ok(TransitionConfig::default())
        }
        Err(err) => Err(err),
    }
}

fn main() -> Result<(), DemoError> {
    logging::init();

    let catalog = GroupCatalog::load_from_file(GROUPS_PATH)?;
    catalog.validate()?;
    let config = load_config()?;

    let mut loader = SimulatedLoader::new().with_scene_step("Level01_Terrain", 0.1);
    loader.mark_unavailable("Level01_Secrets");

    let mut engine = TransitionEngine::with_config(loader, config)?;
    engine.set_on_loading_start(|| log::info!(">> loading screen shown"));
    engine.set_on_loading_end(|| log::info!("<< loading screen hidden"));

    engine.add_persistent(TransitionRequest::from_group(catalog.get("persistent")?));
    engine.switch_group(TransitionRequest::from_group(catalog.get("main_menu")?));
    let frames = run_frames(&mut engine)?;
    log::info!("Main menu ready after {frames} frame(s): {:?}", engine.current_group());

    let level = TransitionRequest::builder()
        .group(catalog.get("level_01")?)
        .progress_sink(|value: f32| log::info!("Level 01: {:>3.0}%", value * 100.0))
        .build();
    engine.switch_group(level);
    let frames = run_frames(&mut engine)?;
    log::info!("Level 01 ready after {frames} frame(s): {:?}", engine.current_group());

    let extras = TransitionRequest::builder()
        .group(catalog.get("level_01_extras")?)
        .targets(["Level01_Props"])
        .ignore_if_already_loaded(true)
        .build();
    engine.add_to_current_group(extras);
    run_frames(&mut engine)?;

    if let Submission::Skipped(reason) = engine.remove_from_current_group("Level01_Secrets") {
        log::info!("Nothing to unload for Level01_Secrets: {reason:?}");
    }
    engine.remove_from_current_group("Level01_Props");
    run_frames(&mut engine)?;

    log::info!("Current group: {:?}", engine.current_group());
    log::info!("Persistent set: {:?}", engine.persistent_set());
    log::info!("Loader reports loaded: {:?}", engine.loader().loaded_scenes());
    Ok(())
}
