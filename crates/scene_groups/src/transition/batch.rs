//! Load and unload batches
//!
//! A batch starts one loader operation per scene up front and is then polled
//! once per tick until every handle reports done. Scenes the loader refuses are
//! logged and left out of the wait-set.
//!
//! Load batches additionally hold activation back: handles are created with
//! activation disabled and released all at once when the batch's mean progress
//! crosses the activation threshold, so scenes of one group finish together.

use crate::loader::{LoadHandle, LoaderError, SceneLoader};
use crate::progress::{average_progress, ProgressSink, ProgressTracker};
use crate::scene::SceneId;
use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchPoll {
    Pending,
    Settled,
}

/// What a settled batch produced
#[derive(Debug, Default)]
pub(crate) struct BatchOutcome {
    pub(crate) settled: Vec<SceneId>,
    pub(crate) unavailable: Vec<SceneId>,
}

struct Entry {
    scene: SceneId,
    handle: Box<dyn LoadHandle>,
}

fn start_all<L, F>(loader: &mut L, scenes: &[SceneId], mut begin: F) -> (Vec<Entry>, Vec<SceneId>)
where
    L: SceneLoader + ?Sized,
    F: FnMut(&mut L, &SceneId) -> Result<Box<dyn LoadHandle>, LoaderError>,
{
    let mut entries = Vec::with_capacity(scenes.len());
    let mut unavailable = Vec::new();
    for scene in scenes {
        match begin(loader, scene) {
            Ok(handle) => entries.push(Entry {
                scene: scene.clone(),
                handle,
            }),
            Err(err) => {
                warn!("Dropping '{scene}' from batch: {err}");
                unavailable.push(scene.clone());
            }
        }
    }
    (entries, unavailable)
}

fn all_done(entries: &[Entry]) -> bool {
    entries.iter().all(|entry| entry.handle.is_done())
}

fn mean_progress(entries: &[Entry]) -> f32 {
    average_progress(entries.iter().map(|entry| entry.handle.progress())).unwrap_or(1.0)
}

/// Concurrent loads with shared activation gating
pub(crate) struct LoadBatch {
    entries: Vec<Entry>,
    unavailable: Vec<SceneId>,
    threshold: f32,
    activation_open: bool,
    progress: ProgressTracker,
    log_progress: bool,
}

impl LoadBatch {
    /// Begin loading every scene, holding activation on all handles
    pub(crate) fn start<L: SceneLoader + ?Sized>(
        loader: &mut L,
        scenes: &[SceneId],
        threshold: f32,
        sink: Option<Box<dyn ProgressSink>>,
        log_progress: bool,
    ) -> Self {
        let (mut entries, unavailable) = start_all(loader, scenes, |loader, scene| loader.begin_load(scene));
        for entry in &mut entries {
            entry.handle.set_activation_allowed(false);
        }
        debug!(
            "Load batch started: {} scene(s), {} unavailable",
            entries.len(),
            unavailable.len()
        );

        Self {
            entries,
            unavailable,
            threshold,
            activation_open: false,
            progress: ProgressTracker::new(sink),
            log_progress,
        }
    }

    /// One scheduling tick
    pub(crate) fn poll(&mut self) -> BatchPoll {
        if all_done(&self.entries) {
            self.progress.finish();
            return BatchPoll::Settled;
        }

        if self.activation_open {
            debug_assert!(self.progress.is_finished());
            return BatchPoll::Pending;
        }

        let average = mean_progress(&self.entries);
        self.progress.report(average);
        if self.log_progress {
            trace!("Loading progress: {:.1}%", self.progress.last() * 100.0);
        }

        if average >= self.threshold {
            self.open_activation();
        }
        BatchPoll::Pending
    }

    fn open_activation(&mut self) {
        self.progress.finish();
        for entry in &mut self.entries {
            entry.handle.set_activation_allowed(true);
        }
        self.activation_open = true;
        debug!("Activation released for {} scene(s)", self.entries.len());
    }

    pub(crate) const fn activation_open(&self) -> bool {
        self.activation_open
    }

    pub(crate) fn into_outcome(self) -> BatchOutcome {
        BatchOutcome {
            settled: self.entries.into_iter().map(|entry| entry.scene).collect(),
            unavailable: self.unavailable,
        }
    }
}

/// Concurrent unloads; no gating, no progress sink
pub(crate) struct UnloadBatch {
    entries: Vec<Entry>,
    unavailable: Vec<SceneId>,
    log_progress: bool,
}

impl UnloadBatch {
    /// Begin unloading every scene
    pub(crate) fn start<L: SceneLoader + ?Sized>(
        loader: &mut L,
        scenes: &[SceneId],
        log_progress: bool,
    ) -> Self {
        let (entries, unavailable) = start_all(loader, scenes, |loader, scene| loader.begin_unload(scene));
        debug!(
            "Unload batch started: {} scene(s), {} unavailable",
            entries.len(),
            unavailable.len()
        );
        Self {
            entries,
            unavailable,
            log_progress,
        }
    }

    /// One scheduling tick
    pub(crate) fn poll(&mut self) -> BatchPoll {
        if all_done(&self.entries) {
            return BatchPoll::Settled;
        }
        if self.log_progress {
            trace!("Unloading progress: {:.1}%", mean_progress(&self.entries) * 100.0);
        }
        BatchPoll::Pending
    }

    /// Whether any handle was actually started
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_outcome(self) -> BatchOutcome {
        BatchOutcome {
            settled: self.entries.into_iter().map(|entry| entry.scene).collect(),
            unavailable: self.unavailable,
        }
    }
}
