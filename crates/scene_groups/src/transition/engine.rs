//! Transition Engine - drives scene group transitions tick by tick
//!
//! Every submitted request becomes a small state machine:
//!
//! ```text
//! Queued ──→ Unloading (switch only) ──→ Loading ──→ committed
//!    └─────────────→ Removing ──────────────────────→ committed
//! ```
//!
//! The decision steps (no-op checks, batch construction, commit) run
//! synchronously inside `submit`/`tick`; the only waiting happens between
//! ticks while batches are in flight.
//!
//! Each state set has its own lane. A lane runs one transition at a time and
//! queues the rest, so commits to the same set never interleave, while a
//! current-group transition and a persistent load progress side by side.

use super::batch::{BatchOutcome, BatchPoll, LoadBatch, UnloadBatch};
use super::{
    SkipReason, Submission, TransitionId, TransitionKind, TransitionOutcome, TransitionReport,
    TransitionRequest, TransitionStatus,
};
use crate::config::{ConfigError, TransitionConfig};
use crate::hooks::LoadingHooks;
use crate::loader::SceneLoader;
use crate::progress::ProgressSink;
use crate::scene::{GroupState, SceneId, StateSet};
use log::{debug, info};
use slotmap::SlotMap;
use std::collections::{HashSet, VecDeque};

/// Work a queued transition will do once its lane is free
enum Operation {
    Switch(TransitionRequest),
    Add(StateSet, TransitionRequest),
    Remove(StateSet, SceneId),
}

/// Load phase waiting behind an unload phase
struct LoadPlan {
    targets: Vec<SceneId>,
    sink: Option<Box<dyn ProgressSink>>,
}

enum Phase {
    Queued,
    Unloading {
        batch: UnloadBatch,
        next: LoadPlan,
    },
    Loading {
        batch: LoadBatch,
        replace: bool,
        unavailable: Vec<SceneId>,
    },
    Removing {
        batch: UnloadBatch,
        scene: SceneId,
    },
}

struct Transition {
    kind: TransitionKind,
    phase: Phase,
}

#[derive(Default)]
struct Lane {
    active: Option<TransitionId>,
    queued: VecDeque<(TransitionId, Operation)>,
}

/// Coordinates group-based scene loading on top of a [`SceneLoader`]
///
/// Call [`tick`](Self::tick) once per frame. Loading notifications fire from
/// inside the submit call or tick that starts or settles a transition.
pub struct TransitionEngine<L: SceneLoader> {
    loader: L,
    config: TransitionConfig,
    state: GroupState,
    hooks: LoadingHooks,
    transitions: SlotMap<TransitionId, Transition>,
    current_lane: Lane,
    persistent_lane: Lane,
}

impl<L: SceneLoader> TransitionEngine<L> {
    /// Create an engine with the default configuration
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            config: TransitionConfig::default(),
            state: GroupState::new(),
            hooks: LoadingHooks::new(),
            transitions: SlotMap::with_key(),
            current_lane: Lane::default(),
            persistent_lane: Lane::default(),
        }
    }

    /// Create an engine with a custom configuration
    pub fn with_config(loader: L, config: TransitionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut engine = Self::new(loader);
        engine.config = config;
        Ok(engine)
    }

    /// Active configuration
    pub const fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Loader backend
    pub const fn loader(&self) -> &L {
        &self.loader
    }

    /// Loader backend, mutably
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Settled scene membership
    pub const fn state(&self) -> &GroupState {
        &self.state
    }

    /// Scenes in the current group
    pub fn current_group(&self) -> &HashSet<SceneId> {
        self.state.current_group()
    }

    /// Scenes in the persistent set
    pub fn persistent_set(&self) -> &HashSet<SceneId> {
        self.state.persistent_set()
    }

    /// Whether `scene` is tracked in either set
    pub fn is_loaded(&self, scene: &str) -> bool {
        self.state.is_loaded(scene)
    }

    /// Loading notification callbacks
    pub fn hooks_mut(&mut self) -> &mut LoadingHooks {
        &mut self.hooks
    }

    /// Replace the "loading started" callback
    pub fn set_on_loading_start(&mut self, callback: impl FnMut() + 'static) {
        self.hooks.set_on_loading_start(callback);
    }

    /// Replace the "loading ended" callback
    pub fn set_on_loading_end(&mut self, callback: impl FnMut() + 'static) {
        self.hooks.set_on_loading_end(callback);
    }

    /// Unload the current group and load `request.targets` in its place
    ///
    /// Current-group members that are also persistent are left loaded.
    pub fn switch_group(&mut self, request: TransitionRequest) -> Submission {
        self.submit(TransitionKind::SwitchGroup, Operation::Switch(request))
    }

    /// Load `request.targets` and add them to the current group
    pub fn add_to_current_group(&mut self, request: TransitionRequest) -> Submission {
        self.submit(
            TransitionKind::AddToCurrentGroup,
            Operation::Add(StateSet::CurrentGroup, request),
        )
    }

    /// Load `request.targets` and add them to the persistent set
    pub fn add_persistent(&mut self, request: TransitionRequest) -> Submission {
        self.submit(
            TransitionKind::AddPersistent,
            Operation::Add(StateSet::Persistent, request),
        )
    }

    /// Unload `scene` and drop it from the current group
    pub fn remove_from_current_group(&mut self, scene: impl Into<SceneId>) -> Submission {
        self.submit(
            TransitionKind::RemoveFromCurrentGroup,
            Operation::Remove(StateSet::CurrentGroup, scene.into()),
        )
    }

    /// Unload `scene` and drop it from the persistent set
    pub fn remove_from_persistent(&mut self, scene: impl Into<SceneId>) -> Submission {
        self.submit(
            TransitionKind::RemoveFromPersistent,
            Operation::Remove(StateSet::Persistent, scene.into()),
        )
    }

    /// Advance every running transition by one scheduling tick
    ///
    /// Returns a report for each transition that settled during this tick,
    /// including queued transitions that turned out to be no-ops.
    pub fn tick(&mut self) -> Vec<TransitionReport> {
        let mut reports = Vec::new();
        for set in [StateSet::CurrentGroup, StateSet::Persistent] {
            self.tick_lane(set, &mut reports);
        }
        reports
    }

    /// Where a submitted transition is, or `None` once it has settled
    pub fn status(&self, id: TransitionId) -> Option<TransitionStatus> {
        self.transitions.get(id).map(|transition| match &transition.phase {
            Phase::Queued => TransitionStatus::Queued,
            Phase::Unloading { .. } | Phase::Removing { .. } => TransitionStatus::Unloading,
            Phase::Loading { batch, .. } if batch.activation_open() => TransitionStatus::Activating,
            Phase::Loading { .. } => TransitionStatus::Loading,
        })
    }

    /// Number of transitions that have not settled yet
    pub fn pending_count(&self) -> usize {
        self.transitions.len()
    }

    /// Whether no transition is running or queued
    pub fn is_idle(&self) -> bool {
        self.transitions.is_empty()
    }

    fn lane(&self, set: StateSet) -> &Lane {
        match set {
            StateSet::CurrentGroup => &self.current_lane,
            StateSet::Persistent => &self.persistent_lane,
        }
    }

    fn lane_mut(&mut self, set: StateSet) -> &mut Lane {
        match set {
            StateSet::CurrentGroup => &mut self.current_lane,
            StateSet::Persistent => &mut self.persistent_lane,
        }
    }

    fn submit(&mut self, kind: TransitionKind, operation: Operation) -> Submission {
        let set = kind.state_set();

        if self.lane(set).active.is_some() {
            let id = self.transitions.insert(Transition {
                kind,
                phase: Phase::Queued,
            });
            self.lane_mut(set).queued.push_back((id, operation));
            debug!("{kind:?} queued behind running {set:?} transition");
            return Submission::Queued(id);
        }

        match self.begin(kind, operation) {
            Ok(phase) => {
                let id = self.transitions.insert(Transition { kind, phase });
                self.lane_mut(set).active = Some(id);
                Submission::Started(id)
            }
            Err(reason) => {
                debug!("{kind:?} skipped: {reason:?}");
                Submission::Skipped(reason)
            }
        }
    }

    /// Run the synchronous decision steps and start the first batch
    fn begin(&mut self, kind: TransitionKind, operation: Operation) -> Result<Phase, SkipReason> {
        match operation {
            Operation::Switch(request) => self.begin_switch(request),
            Operation::Add(set, request) => self.begin_add(kind, set, request),
            Operation::Remove(set, scene) => self.begin_remove(set, scene),
        }
    }

    fn begin_switch(&mut self, request: TransitionRequest) -> Result<Phase, SkipReason> {
        let targets = request.unique_targets();
        let current = self.state.current_group();

        if targets.is_empty() && current.is_empty() {
            return Err(SkipReason::EmptyRequest);
        }
        if request.ignore_if_already_loaded
            && !targets.is_empty()
            && targets.len() == current.len()
            && targets.iter().all(|scene| current.contains(scene))
        {
            return Err(SkipReason::AlreadyLoaded);
        }

        let to_unload = self.state.unload_candidates();
        info!(
            "Switching scene group: unloading {} scene(s), loading {} scene(s)",
            to_unload.len(),
            targets.len()
        );
        self.hooks.loading_started();

        let next = LoadPlan {
            targets,
            sink: request.progress_sink,
        };
        if to_unload.is_empty() {
            return Ok(self.start_load(next, true, Vec::new()));
        }
        Ok(Phase::Unloading {
            batch: UnloadBatch::start(&mut self.loader, &to_unload, self.config.log_progress),
            next,
        })
    }

    fn begin_add(
        &mut self,
        kind: TransitionKind,
        set: StateSet,
        request: TransitionRequest,
    ) -> Result<Phase, SkipReason> {
        let mut targets = request.unique_targets();
        if targets.is_empty() {
            return Err(SkipReason::EmptyRequest);
        }
        if request.ignore_if_already_loaded {
            targets.retain(|scene| !self.state.contains(set, scene.as_str()));
            if targets.is_empty() {
                return Err(SkipReason::AlreadyLoaded);
            }
        }

        info!("{kind:?}: loading {} scene(s)", targets.len());
        self.hooks.loading_started();

        let plan = LoadPlan {
            targets,
            sink: request.progress_sink,
        };
        Ok(self.start_load(plan, false, Vec::new()))
    }

    fn begin_remove(&mut self, set: StateSet, scene: SceneId) -> Result<Phase, SkipReason> {
        if !self.state.contains(set, scene.as_str()) {
            return Err(SkipReason::NotAMember);
        }

        info!("Unloading '{scene}' from {set:?}");
        let batch = UnloadBatch::start(
            &mut self.loader,
            std::slice::from_ref(&scene),
            self.config.log_progress,
        );
        Ok(Phase::Removing { batch, scene })
    }

    fn start_load(&mut self, plan: LoadPlan, replace: bool, unavailable: Vec<SceneId>) -> Phase {
        let batch = LoadBatch::start(
            &mut self.loader,
            &plan.targets,
            self.config.activation_threshold,
            plan.sink,
            self.config.log_progress,
        );
        Phase::Loading {
            batch,
            replace,
            unavailable,
        }
    }

    fn tick_lane(&mut self, set: StateSet, reports: &mut Vec<TransitionReport>) {
        let Some(id) = self.lane(set).active else {
            return;
        };

        if let Some(report) = self.step(id) {
            self.transitions.remove(id);
            self.lane_mut(set).active = None;
            reports.push(report);
            self.promote(set, reports);
        }
    }

    /// Start the next queued transition on `set`, reporting any that are no-ops
    fn promote(&mut self, set: StateSet, reports: &mut Vec<TransitionReport>) {
        while let Some((id, operation)) = self.lane_mut(set).queued.pop_front() {
            let Some(kind) = self.transitions.get(id).map(|transition| transition.kind) else {
                continue;
            };

            match self.begin(kind, operation) {
                Ok(phase) => {
                    if let Some(transition) = self.transitions.get_mut(id) {
                        transition.phase = phase;
                    }
                    self.lane_mut(set).active = Some(id);
                    return;
                }
                Err(reason) => {
                    debug!("Queued {kind:?} skipped: {reason:?}");
                    self.transitions.remove(id);
                    reports.push(TransitionReport {
                        id,
                        kind,
                        outcome: TransitionOutcome::Skipped(reason),
                    });
                }
            }
        }
    }

    /// Poll the transition's current batch; returns a report once it commits
    fn step(&mut self, id: TransitionId) -> Option<TransitionReport> {
        let transition = self.transitions.get_mut(id)?;
        let poll = match &mut transition.phase {
            Phase::Queued => return None,
            Phase::Unloading { batch, .. } | Phase::Removing { batch, .. } => batch.poll(),
            Phase::Loading { batch, .. } => batch.poll(),
        };
        if poll == BatchPoll::Pending {
            return None;
        }

        let kind = transition.kind;
        match std::mem::replace(&mut transition.phase, Phase::Queued) {
            Phase::Queued => None,
            Phase::Unloading { batch, next } => {
                let unloaded_any = !batch.is_empty();
                let BatchOutcome {
                    settled,
                    unavailable,
                } = batch.into_outcome();
                debug!("Unload phase settled: {} scene(s) unloaded", settled.len());
                if unloaded_any {
                    self.release_unused();
                }

                let phase = self.start_load(next, true, unavailable);
                if let Some(transition) = self.transitions.get_mut(id) {
                    transition.phase = phase;
                }
                None
            }
            Phase::Loading {
                batch,
                replace,
                unavailable: mut skipped,
            } => {
                let BatchOutcome {
                    settled,
                    unavailable,
                } = batch.into_outcome();
                skipped.extend(unavailable);

                let set = kind.state_set();
                if replace {
                    self.state.replace(set, settled.iter().cloned());
                } else {
                    self.state.extend(set, settled.iter().cloned());
                }
                info!(
                    "{kind:?} settled: {} scene(s) committed, {} unavailable",
                    settled.len(),
                    skipped.len()
                );
                if kind.notifies() {
                    self.hooks.loading_ended();
                }

                Some(TransitionReport {
                    id,
                    kind,
                    outcome: TransitionOutcome::Committed {
                        committed: settled,
                        unavailable: skipped,
                    },
                })
            }
            Phase::Removing { batch, scene } => {
                let unloaded_any = !batch.is_empty();
                let BatchOutcome { unavailable, .. } = batch.into_outcome();
                if unloaded_any {
                    self.release_unused();
                }

                self.state.remove(kind.state_set(), scene.as_str());
                info!("'{scene}' unloaded from {:?}", kind.state_set());

                Some(TransitionReport {
                    id,
                    kind,
                    outcome: TransitionOutcome::Committed {
                        committed: vec![scene],
                        unavailable,
                    },
                })
            }
        }
    }

    fn release_unused(&mut self) {
        if self.config.release_unused_after_unload {
            self.loader.release_unused_assets();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::logging::capture;
    use crate::loader::simulated::{LoaderCall, SimulatedLoader};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Engine = TransitionEngine<SimulatedLoader>;

    struct HookCounts {
        started: Rc<Cell<u32>>,
        ended: Rc<Cell<u32>>,
    }

    impl HookCounts {
        fn get(&self) -> (u32, u32) {
            (self.started.get(), self.ended.get())
        }

        fn reset(&self) {
            self.started.set(0);
            self.ended.set(0);
        }
    }

    fn engine() -> (Engine, HookCounts) {
        capture::install();
        let mut engine = TransitionEngine::new(SimulatedLoader::new());
        let counts = HookCounts {
            started: Rc::new(Cell::new(0)),
            ended: Rc::new(Cell::new(0)),
        };
        let started = Rc::clone(&counts.started);
        engine.set_on_loading_start(move || started.set(started.get() + 1));
        let ended = Rc::clone(&counts.ended);
        engine.set_on_loading_end(move || ended.set(ended.get() + 1));
        (engine, counts)
    }

    fn run_until_idle(engine: &mut Engine) -> Vec<TransitionReport> {
        let mut reports = Vec::new();
        for _ in 0..200 {
            reports.extend(engine.tick());
            if engine.is_idle() {
                return reports;
            }
            engine.loader_mut().advance();
        }
        panic!("transitions did not settle");
    }

    fn ids(names: &[&str]) -> HashSet<SceneId> {
        names.iter().copied().map(SceneId::from).collect()
    }

    fn load(name: &str) -> LoaderCall {
        LoaderCall::Load(SceneId::from(name))
    }

    fn unload(name: &str) -> LoaderCall {
        LoaderCall::Unload(SceneId::from(name))
    }

    fn recording_request(targets: &[&str]) -> (TransitionRequest, Rc<RefCell<Vec<f32>>>) {
        let values = Rc::new(RefCell::new(Vec::new()));
        let sink_values = Rc::clone(&values);
        let request = TransitionRequest::builder()
            .targets(targets.iter().copied())
            .progress_sink(move |value: f32| sink_values.borrow_mut().push(value))
            .build();
        (request, values)
    }

    #[test]
    fn test_switch_from_empty_group() {
        let (mut engine, hooks) = engine();
        let submission = engine.switch_group(TransitionRequest::new(["A", "B"]));
        assert!(matches!(submission, Submission::Started(_)));
        assert_eq!(hooks.get(), (1, 0));

        let reports = run_until_idle(&mut engine);

        assert_eq!(engine.loader().calls(), &[load("A"), load("B")]);
        assert_eq!(engine.current_group(), &ids(&["A", "B"]));
        assert_eq!(hooks.get(), (1, 1));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, TransitionKind::SwitchGroup);
    }

    #[test]
    fn test_switch_unloads_every_previous_member() {
        let (mut engine, hooks) = engine();
        engine.switch_group(TransitionRequest::new(["A", "B"]));
        run_until_idle(&mut engine);
        engine.loader_mut().clear_calls();

        engine.switch_group(TransitionRequest::new(["B", "C"]));
        run_until_idle(&mut engine);

        assert_eq!(
            engine.loader().calls(),
            &[unload("A"), unload("B"), LoaderCall::ReleaseUnused, load("B"), load("C")]
        );
        assert_eq!(engine.current_group(), &ids(&["B", "C"]));
        assert_eq!(hooks.get(), (2, 2));
    }

    #[test]
    fn test_unload_phase_precedes_load_phase() {
        let (mut engine, _hooks) = engine();
        engine.switch_group(TransitionRequest::new(["A"]));
        run_until_idle(&mut engine);
        engine.loader_mut().clear_calls();

        let id = engine.switch_group(TransitionRequest::new(["B"])).id().unwrap();
        assert_eq!(engine.loader().calls(), &[unload("A")]);
        assert_eq!(engine.status(id), Some(TransitionStatus::Unloading));

        engine.tick();
        engine.loader_mut().advance();
        engine.tick();
        assert_eq!(engine.loader().calls(), &[unload("A")]);
        assert_eq!(engine.current_group(), &ids(&["A"]));

        run_until_idle(&mut engine);
        assert_eq!(engine.status(id), None);
        assert_eq!(engine.current_group(), &ids(&["B"]));
    }

    #[test]
    fn test_switch_target_order_is_irrelevant() {
        let (mut engine, _hooks) = engine();
        engine.switch_group(TransitionRequest::new(["C", "A", "B", "A"]));
        run_until_idle(&mut engine);
        assert_eq!(engine.current_group(), &ids(&["A", "B", "C"]));
        assert_eq!(engine.loader().calls().len(), 3);
    }

    #[test]
    fn test_switch_leaves_persistent_members_loaded() {
        let (mut engine, _hooks) = engine();
        engine.add_persistent(TransitionRequest::new(["Shared"]));
        engine.add_to_current_group(TransitionRequest::new(["Shared", "Level"]));
        run_until_idle(&mut engine);
        engine.loader_mut().clear_calls();

        engine.switch_group(TransitionRequest::new(["Next"]));
        run_until_idle(&mut engine);

        assert_eq!(
            engine.loader().calls(),
            &[unload("Level"), LoaderCall::ReleaseUnused, load("Next")]
        );
        assert_eq!(engine.current_group(), &ids(&["Next"]));
        assert_eq!(engine.persistent_set(), &ids(&["Shared"]));
        assert!(engine.is_loaded("Shared"));
    }

    #[test]
    fn test_ignore_if_already_loaded_skips_everything() {
        let (mut engine, hooks) = engine();
        engine.add_to_current_group(TransitionRequest::new(["A", "B"]));
        engine.add_persistent(TransitionRequest::new(["P"]));
        run_until_idle(&mut engine);
        engine.loader_mut().clear_calls();
        hooks.reset();

        let again = TransitionRequest::builder()
            .targets(["B", "A"])
            .ignore_if_already_loaded(true)
            .build();
        assert_eq!(
            engine.add_to_current_group(again),
            Submission::Skipped(SkipReason::AlreadyLoaded)
        );

        let persistent = TransitionRequest::builder()
            .targets(["P"])
            .ignore_if_already_loaded(true)
            .build();
        assert_eq!(
            engine.add_persistent(persistent),
            Submission::Skipped(SkipReason::AlreadyLoaded)
        );

        let switch = TransitionRequest::builder()
            .targets(["A", "B"])
            .ignore_if_already_loaded(true)
            .build();
        assert_eq!(engine.switch_group(switch), Submission::Skipped(SkipReason::AlreadyLoaded));

        assert!(engine.loader().calls().is_empty());
        assert_eq!(hooks.get(), (0, 0));
        assert!(engine.is_idle());
    }

    #[test]
    fn test_ignore_if_already_loaded_loads_only_missing_targets() {
        let (mut engine, _hooks) = engine();
        engine.add_to_current_group(TransitionRequest::new(["A"]));
        run_until_idle(&mut engine);
        engine.loader_mut().clear_calls();

        let request = TransitionRequest::builder()
            .targets(["A", "B"])
            .ignore_if_already_loaded(true)
            .build();
        engine.add_to_current_group(request);
        run_until_idle(&mut engine);

        assert_eq!(engine.loader().calls(), &[load("B")]);
        assert_eq!(engine.current_group(), &ids(&["A", "B"]));
    }

    #[test]
    fn test_empty_requests_are_noops() {
        let (mut engine, hooks) = engine();
        let empty = || TransitionRequest::new(Vec::<SceneId>::new());

        assert_eq!(
            engine.add_to_current_group(empty()),
            Submission::Skipped(SkipReason::EmptyRequest)
        );
        assert_eq!(engine.add_persistent(empty()), Submission::Skipped(SkipReason::EmptyRequest));
        assert_eq!(engine.switch_group(empty()), Submission::Skipped(SkipReason::EmptyRequest));

        assert!(engine.loader().calls().is_empty());
        assert_eq!(hooks.get(), (0, 0));
    }

    #[test]
    fn test_switch_to_empty_group_unloads_everything() {
        let (mut engine, hooks) = engine();
        engine.switch_group(TransitionRequest::new(["A"]));
        run_until_idle(&mut engine);
        engine.loader_mut().clear_calls();

        let submission = engine.switch_group(TransitionRequest::new(Vec::<SceneId>::new()));
        assert!(!submission.is_skipped());
        run_until_idle(&mut engine);

        assert_eq!(engine.loader().calls(), &[unload("A"), LoaderCall::ReleaseUnused]);
        assert!(engine.current_group().is_empty());
        assert_eq!(hooks.get(), (2, 2));
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_one() {
        let (mut engine, _hooks) = engine();
        let mut loader = SimulatedLoader::new().with_scene_step("Slow", 0.1);
        std::mem::swap(engine.loader_mut(), &mut loader);

        let (request, values) = recording_request(&["Fast", "Slow"]);
        engine.switch_group(request);
        run_until_idle(&mut engine);

        let values = values.borrow();
        assert!(values.len() > 2);
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(values.last().copied(), Some(1.0));
        assert!(values.iter().all(|value| (0.0..=1.0).contains(value)));
    }

    #[test]
    fn test_activation_released_for_whole_batch_at_threshold() {
        let (mut engine, _hooks) = engine();
        let (request, values) = recording_request(&["A", "B", "C"]);
        let id = engine.add_to_current_group(request).id().unwrap();

        engine.loader_mut().set_progress("A", 0.95);
        engine.loader_mut().set_progress("B", 0.88);
        engine.loader_mut().set_progress("C", 0.91);
        assert!(engine.tick().is_empty());

        for scene in ["A", "B", "C"] {
            assert_eq!(engine.loader().activation_allowed(scene), Some(true));
        }
        assert_eq!(values.borrow().last().copied(), Some(1.0));
        assert_eq!(engine.status(id), Some(TransitionStatus::Activating));
        assert!(engine.current_group().is_empty());

        run_until_idle(&mut engine);
        assert_eq!(engine.current_group(), &ids(&["A", "B", "C"]));
    }

    #[test]
    fn test_activation_held_below_threshold() {
        let (mut engine, _hooks) = engine();
        let id = engine.add_to_current_group(TransitionRequest::new(["A", "B"])).id().unwrap();

        engine.loader_mut().set_progress("A", 0.9);
        engine.loader_mut().set_progress("B", 0.7);
        engine.tick();

        assert_eq!(engine.loader().activation_allowed("A"), Some(false));
        assert_eq!(engine.status(id), Some(TransitionStatus::Loading));
    }

    #[test]
    fn test_custom_activation_threshold() {
        let config = TransitionConfig::default().with_activation_threshold(0.5);
        let mut engine = TransitionEngine::with_config(SimulatedLoader::new(), config).unwrap();
        engine.add_to_current_group(TransitionRequest::new(["A"]));

        engine.loader_mut().advance();
        engine.tick();
        assert_eq!(engine.loader().activation_allowed("A"), Some(false));

        engine.loader_mut().advance();
        engine.tick();
        assert_eq!(engine.loader().activation_allowed("A"), Some(true));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        for threshold in [1.5, 0.95] {
            let config = TransitionConfig::default().with_activation_threshold(threshold);
            let result = TransitionEngine::with_config(SimulatedLoader::new(), config);
            assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
        }
    }

    #[test]
    fn test_lower_hold_settles_with_matching_threshold() {
        let loader = SimulatedLoader::new().with_activation_hold(0.5);
        let config = TransitionConfig::default().with_activation_threshold(0.5);
        let mut engine = TransitionEngine::with_config(loader, config).unwrap();

        engine.switch_group(TransitionRequest::new(["A", "B", "C"]));
        run_until_idle(&mut engine);

        assert_eq!(engine.current_group(), &ids(&["A", "B", "C"]));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut engine, hooks) = engine();
        engine.add_to_current_group(TransitionRequest::new(["A", "B"]));
        run_until_idle(&mut engine);
        engine.loader_mut().clear_calls();
        hooks.reset();

        assert!(matches!(engine.remove_from_current_group("A"), Submission::Started(_)));
        let reports = run_until_idle(&mut engine);
        assert_eq!(engine.loader().calls(), &[unload("A"), LoaderCall::ReleaseUnused]);
        assert_eq!(engine.current_group(), &ids(&["B"]));
        assert_eq!(reports[0].committed(), &[SceneId::from("A")]);
        engine.loader_mut().clear_calls();

        assert_eq!(
            engine.remove_from_current_group("A"),
            Submission::Skipped(SkipReason::NotAMember)
        );
        assert!(engine.loader().calls().is_empty());
        assert_eq!(hooks.get(), (0, 0));
    }

    #[test]
    fn test_remove_of_scene_loader_no_longer_has() {
        let (mut engine, _hooks) = engine();
        engine.state.extend(StateSet::CurrentGroup, [SceneId::from("Ghost")]);

        assert!(matches!(engine.remove_from_current_group("Ghost"), Submission::Started(_)));
        let reports = run_until_idle(&mut engine);

        assert!(engine.current_group().is_empty());
        assert_eq!(engine.loader().calls(), &[unload("Ghost")]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].committed(), &[SceneId::from("Ghost")]);
        assert_eq!(reports[0].unavailable(), &[SceneId::from("Ghost")]);
    }

    #[test]
    fn test_remove_from_persistent() {
        let (mut engine, _hooks) = engine();
        engine.add_persistent(TransitionRequest::new(["Audio"]));
        engine.add_to_current_group(TransitionRequest::new(["Level"]));
        run_until_idle(&mut engine);

        assert_eq!(
            engine.remove_from_persistent("Level"),
            Submission::Skipped(SkipReason::NotAMember)
        );
        engine.remove_from_persistent("Audio");
        run_until_idle(&mut engine);

        assert!(engine.persistent_set().is_empty());
        assert_eq!(engine.current_group(), &ids(&["Level"]));
        assert!(!engine.loader().loaded_scenes().contains(&SceneId::from("Audio")));
    }

    #[test]
    fn test_failed_load_degrades_gracefully() {
        let (mut engine, hooks) = engine();
        engine.loader_mut().mark_unavailable("Broken");

        engine.switch_group(TransitionRequest::new(["Good", "Broken"]));
        let reports = run_until_idle(&mut engine);

        assert_eq!(engine.current_group(), &ids(&["Good"]));
        assert_eq!(reports[0].committed(), &[SceneId::from("Good")]);
        assert_eq!(reports[0].unavailable(), &[SceneId::from("Broken")]);
        assert_eq!(hooks.get(), (1, 1));
    }

    #[test]
    fn test_failed_load_emits_one_warning() {
        let (mut engine, _hooks) = engine();
        engine.loader_mut().mark_unavailable("Broken");
        capture::take();

        engine.switch_group(TransitionRequest::new(["Good", "Broken"]));
        run_until_idle(&mut engine);

        let warnings = capture::take_at(log::Level::Warn);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("Broken"));
        assert!(!warnings[0].contains("Good"));
    }

    #[test]
    fn test_batch_with_no_valid_targets_still_settles() {
        let (mut engine, hooks) = engine();
        engine.loader_mut().mark_unavailable("Broken");
        let (request, values) = recording_request(&["Broken"]);

        engine.add_to_current_group(request);
        let reports = engine.tick();

        assert_eq!(reports.len(), 1);
        assert!(engine.current_group().is_empty());
        assert_eq!(*values.borrow(), vec![1.0]);
        assert_eq!(hooks.get(), (1, 1));
    }

    #[test]
    fn test_same_set_requests_are_serialized() {
        let (mut engine, hooks) = engine();
        let first = engine.switch_group(TransitionRequest::new(["A"]));
        let second = engine.add_to_current_group(TransitionRequest::new(["B"]));
        assert!(matches!(first, Submission::Started(_)));
        assert!(matches!(second, Submission::Queued(_)));
        assert_eq!(engine.status(second.id().unwrap()), Some(TransitionStatus::Queued));
        assert_eq!(engine.loader().calls(), &[load("A")]);
        assert_eq!(hooks.get(), (1, 0));

        run_until_idle(&mut engine);

        assert_eq!(engine.loader().calls(), &[load("A"), load("B")]);
        assert_eq!(engine.current_group(), &ids(&["A", "B"]));
        assert_eq!(hooks.get(), (2, 2));
    }

    #[test]
    fn test_independent_sets_run_side_by_side() {
        let (mut engine, _hooks) = engine();
        let group = engine.switch_group(TransitionRequest::new(["Level"]));
        let persistent = engine.add_persistent(TransitionRequest::new(["Ui"]));
        assert!(matches!(group, Submission::Started(_)));
        assert!(matches!(persistent, Submission::Started(_)));
        assert_eq!(engine.pending_count(), 2);

        let reports = run_until_idle(&mut engine);
        assert_eq!(reports.len(), 2);
        assert_eq!(engine.current_group(), &ids(&["Level"]));
        assert_eq!(engine.persistent_set(), &ids(&["Ui"]));
    }

    #[test]
    fn test_queued_request_rechecked_when_started() {
        let (mut engine, hooks) = engine();
        engine.add_to_current_group(TransitionRequest::new(["A"]));
        let duplicate = TransitionRequest::builder()
            .targets(["A"])
            .ignore_if_already_loaded(true)
            .build();
        let queued = engine.add_to_current_group(duplicate);
        assert!(matches!(queued, Submission::Queued(_)));

        let reports = run_until_idle(&mut engine);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].id, queued.id().unwrap());
        assert_eq!(reports[1].outcome, TransitionOutcome::Skipped(SkipReason::AlreadyLoaded));
        assert_eq!(engine.loader().calls(), &[load("A")]);
        assert_eq!(hooks.get(), (1, 1));
    }

    #[test]
    fn test_release_unused_can_be_disabled() {
        let config = TransitionConfig::default().with_release_unused_after_unload(false);
        let mut engine = TransitionEngine::with_config(SimulatedLoader::new(), config).unwrap();
        engine.switch_group(TransitionRequest::new(["A"]));
        run_until_idle(&mut engine);
        engine.switch_group(TransitionRequest::new(["B"]));
        run_until_idle(&mut engine);

        assert!(!engine.loader().calls().contains(&LoaderCall::ReleaseUnused));
    }

    #[test]
    fn test_removal_does_not_fire_loading_hooks() {
        let (mut engine, hooks) = engine();
        engine.add_to_current_group(TransitionRequest::new(["A"]));
        run_until_idle(&mut engine);
        hooks.reset();

        engine.remove_from_current_group("A");
        run_until_idle(&mut engine);
        assert_eq!(hooks.get(), (0, 0));
    }
}
