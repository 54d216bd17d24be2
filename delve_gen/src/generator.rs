// The generation run: placement engine, backtracking controller, and the
// top-level phase state machine.
//
// `DungeonGenerator` is the single source of truth for a run. It owns the
// tile arena, the PRNG, the config and catalog, the step queue, and the
// frontier bookkeeping. The run is a pure function:
// `(state, commands) -> (new_state, events)`; the only external effects go
// through the `SceneHooks` collaborator passed into `step()`.
//
// ## Build loop
//
// Construction schedules the first step at tick 0. Each processed step
// performs one unit of work for the current phase and schedules the next
// step `step_delay_ticks` later — the pacing/suspension points of the
// cooperative loop. Phases advance strictly forward:
//
//   Inactive            place the start tile (random template, random
//                       quarter-turn yaw, at the origin)
//   GeneratingMain      one committed placement per step until the path
//                       has `main_length` tiles; the last draw comes from
//                       the exit pool
//   GeneratingBranches  collect the main path's unconnected connectors
//                       into the available pool, then grow `num_branches`
//                       branches of `branch_length - 1` tiles, each rooted
//                       at a random pool draw
//   Cleanup             seal dead ends with random blocker templates, bake
//                       navigation, place the boundary
//   Completed / Failed  terminal
//
// ## Placement
//
// A placement is a two-phase commit. `place_next` draws a template, picks
// a free connector on the frontier (reserved as a side effect of
// selection) and one on the new tile, poses the tile so the connectors
// mate with a 180° facing flip, and registers the instance provisionally
// — appended to the arena so backtracking can address it by identity, but
// invisible to collaborators. Validation then queries the arena for
// interpenetration with anything but the tile's origin. Only a clean
// placement is committed and materialized through the hooks; a colliding
// one stays provisional and is handed to the backtracking controller.
//
// ## Backtracking
//
// Repeated failure at one frontier is a signal to retreat, not replan.
// Every collision discards the provisional tile and bumps the consecutive
// `attempts` counter; below `max_attempts` the engine immediately retries
// another template/connector draw from the same frontier. At the bound,
// the frontier itself is judged unreachable: it is destroyed (connector
// released, pool entries purged, scene told synchronously) and generation
// rewinds to its origin — or, when the rewind reaches the path root, the
// main path fails fatally while a branch redraws a fresh root from the
// available pool or is abandoned. Retries and rewinds happen inside one
// step; only committed placements consume a suspension point.
//
// See also: `layout.rs` for the arena and the overlap query, `event.rs`
// for the step queue and the narrative events, `command.rs` for the
// `Cancel`/`Restart` inputs, `hooks.rs` for the collaborator seam.
//
// **Critical constraint: determinism.** All randomness flows through the
// run's `GenRng`; all mutation happens in `step()`. Identical seed,
// config, catalog, and command stream reproduce the run event for event.

use crate::catalog::TileCatalog;
use crate::command::{GenAction, GenCommand};
use crate::config::GenerationConfig;
use crate::event::{GenEvent, GenEventKind, StepQueue};
use crate::geometry::{Pose, WorldVec, attachment_pose};
use crate::hooks::{DeadEnd, SceneHooks};
use crate::layout::DungeonLayout;
use crate::types::{ConnectorRef, DungeonState, PathKind, TileId};
use delve_prng::GenRng;
use std::f32::consts::FRAC_PI_2;
use thiserror::Error;

/// A fatal generation outcome. Recoverable failures (collisions, exhausted
/// connectors, curtailed branches) are resolved inside the backtracking
/// controller and never surface here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Backtracking rewound past the path root with no alternative left;
    /// a dungeon without a complete main path is unusable.
    #[error("main path exhausted: backtracking rewound past the path root")]
    MainPathExhausted,
}

/// Why a single placement attempt failed. Internal to the engine/controller
/// loop; exposed for tests and embedders that observe placement directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlacementFailure {
    /// No unconnected slot left on the frontier (`on_frontier`), or the
    /// drawn template declares no connectors at all — a catalog defect.
    #[error("no free connector left to attach through")]
    NoFreeConnector { on_frontier: bool },
    /// The provisional tile interpenetrates a live tile other than its
    /// origin. The tile is still registered; the controller removes it.
    #[error("placement of {tile} collides with an existing tile")]
    Collision { tile: TileId },
}

/// What the backtracking controller decided after a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BacktrackOutcome {
    /// Below the attempt bound: try another draw from the same frontier.
    RetryFromSameFrontier,
    /// The frontier was rewound; continue from this tile.
    RewindTo(TileId),
    /// No frontier left: fatal for the main path, curtails a branch.
    Abort,
}

/// Progress through the currently growing branch.
#[derive(Clone, Copy, Debug)]
struct BranchRun {
    index: u32,
    remaining: u32,
}

/// The result of applying commands and advancing the run.
pub struct StepResult {
    /// Narrative events emitted during this step, for observers.
    pub events: Vec<GenEvent>,
}

/// Top-level generation run state.
#[derive(Debug)]
pub struct DungeonGenerator {
    /// Current generator tick.
    pub tick: u64,
    /// The run's deterministic PRNG.
    pub rng: GenRng,
    /// Run parameters (immutable after construction).
    pub config: GenerationConfig,
    /// Template pools (immutable after construction).
    pub catalog: TileCatalog,
    /// Current phase.
    pub state: DungeonState,
    /// The live tile arena.
    pub layout: DungeonLayout,
    /// Pending suspension points.
    pub steps: StepQueue,
    /// Which path placements currently belong to.
    pub path: PathKind,
    /// The tile the next placement attaches to.
    pub tile_from: Option<TileId>,
    /// The most recently committed tile of the active path.
    pub tile_to: Option<TileId>,
    /// Root of the active path.
    pub tile_root: Option<TileId>,
    /// Consecutive failed placements at the current frontier.
    pub attempts: u32,
    /// Main-path connectors still open after the main phase; branch roots
    /// are drawn from here.
    pub available: Vec<ConnectorRef>,
    branch: Option<BranchRun>,
    next_branch_index: u32,
    cancelled: bool,
    /// Set when the run terminated with `DungeonState::Failed`.
    pub failure: Option<GenerationError>,
}

impl DungeonGenerator {
    /// Create a run. The first step is scheduled at tick 0, so the start
    /// tile appears as soon as `step()` is driven past it.
    pub fn new(seed: u64, config: GenerationConfig, catalog: TileCatalog) -> Self {
        let mut steps = StepQueue::new();
        steps.schedule(0);
        Self {
            tick: 0,
            rng: GenRng::new(seed),
            config,
            catalog,
            state: DungeonState::Inactive,
            layout: DungeonLayout::new(),
            steps,
            path: PathKind::Main,
            tile_from: None,
            tile_to: None,
            tile_root: None,
            attempts: 0,
            available: Vec::new(),
            branch: None,
            next_branch_index: 0,
            cancelled: false,
            failure: None,
        }
    }

    /// True once the run can make no further progress: completed, failed,
    /// or cancelled.
    pub fn is_finished(&self) -> bool {
        self.cancelled
            || matches!(self.state, DungeonState::Completed | DungeonState::Failed)
    }

    /// Apply a batch of commands and advance the run to the target tick,
    /// processing all scheduled steps up to that point.
    ///
    /// Commands must be sorted by tick. Commands with tick > `target_tick`
    /// are ignored (caller error).
    pub fn step(
        &mut self,
        commands: &[GenCommand],
        target_tick: u64,
        hooks: &mut dyn SceneHooks,
    ) -> StepResult {
        let mut events = Vec::new();

        // Index into the sorted command slice.
        let mut cmd_idx = 0;

        while self.tick < target_tick {
            // Determine the next thing to process: the next scheduled step
            // or the next command, whichever comes first.
            let next_step_tick = self.steps.peek_tick();
            let next_cmd_tick = commands
                .get(cmd_idx)
                .filter(|c| c.tick <= target_tick)
                .map(|c| c.tick);

            let next_tick = match (next_step_tick, next_cmd_tick) {
                (Some(st), Some(ct)) => st.min(ct).min(target_tick),
                (Some(st), None) => st.min(target_tick),
                (None, Some(ct)) => ct.min(target_tick),
                (None, None) => target_tick,
            };

            self.tick = next_tick;

            // Apply commands at this tick.
            while cmd_idx < commands.len() && commands[cmd_idx].tick <= self.tick {
                let cmd = commands[cmd_idx];
                cmd_idx += 1;
                self.apply_command(&cmd, hooks, &mut events);
            }

            // Process scheduled steps at this tick.
            while self.steps.pop_if_ready(self.tick).is_some() {
                self.process_step(hooks, &mut events);
            }
        }

        self.tick = target_tick;
        StepResult { events }
    }

    /// Drive the run to a terminal state with no external pacing or
    /// commands. Convenience for headless embedders, tests, and benches.
    pub fn run_to_completion(
        &mut self,
        hooks: &mut dyn SceneHooks,
    ) -> Result<(), GenerationError> {
        while !self.is_finished() {
            let target = self.tick + self.config.step_delay_ticks.max(1);
            self.step(&[], target, hooks);
        }
        match self.failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn apply_command(
        &mut self,
        cmd: &GenCommand,
        hooks: &mut dyn SceneHooks,
        events: &mut Vec<GenEvent>,
    ) {
        match cmd.action {
            GenAction::Cancel => {
                if self.is_finished() {
                    return;
                }
                self.cancelled = true;
                self.steps.clear();
                log::info!("generation cancelled at tick {}", self.tick);
                self.emit(events, GenEventKind::RunCancelled);
            }
            GenAction::Restart { seed } => {
                // Tear down the scene before the arena forgets the handles.
                let handles: Vec<_> =
                    self.layout.live().filter_map(|t| t.handle).collect();
                for handle in handles {
                    hooks.destroy_tile(handle);
                }
                self.layout.clear();
                self.steps.clear();
                self.rng = GenRng::new(seed);
                self.path = PathKind::Main;
                self.tile_from = None;
                self.tile_to = None;
                self.tile_root = None;
                self.attempts = 0;
                self.available.clear();
                self.branch = None;
                self.next_branch_index = 0;
                self.cancelled = false;
                self.failure = None;
                log::info!("generation restarting with seed {seed}");
                self.emit(events, GenEventKind::RunRestarted { seed });
                self.set_state(DungeonState::Inactive, hooks, events);
                self.steps.schedule(self.tick);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase state machine
    // -----------------------------------------------------------------------

    fn process_step(&mut self, hooks: &mut dyn SceneHooks, events: &mut Vec<GenEvent>) {
        if self.is_finished() {
            return;
        }
        match self.state {
            DungeonState::Inactive => self.begin_run(hooks, events),
            DungeonState::GeneratingMain => self.main_step(hooks, events),
            DungeonState::GeneratingBranches => self.branch_step(hooks, events),
            DungeonState::Cleanup => self.cleanup(hooks, events),
            DungeonState::Completed | DungeonState::Failed => {}
        }
    }

    fn set_state(
        &mut self,
        state: DungeonState,
        hooks: &mut dyn SceneHooks,
        events: &mut Vec<GenEvent>,
    ) {
        self.state = state;
        log::debug!("state -> {state:?} at tick {}", self.tick);
        hooks.on_state_changed(state);
        self.emit(events, GenEventKind::StateChanged { state });
    }

    fn schedule_next(&mut self) {
        self.steps.schedule(self.tick + self.config.step_delay_ticks.max(1));
    }

    fn emit(&self, events: &mut Vec<GenEvent>, kind: GenEventKind) {
        events.push(GenEvent { tick: self.tick, kind });
    }

    /// Place the start tile and open the main phase.
    fn begin_run(&mut self, hooks: &mut dyn SceneHooks, events: &mut Vec<GenEvent>) {
        let template = self.catalog.random_start(&mut self.rng).clone();
        // Random quarter-turn orientation at the world origin.
        let yaw = self.rng.range_u64(0, 4) as f32 * FRAC_PI_2;
        let pose = Pose::new(WorldVec::ZERO, yaw);

        let id = self.layout.insert_root(&template, pose, PathKind::Main);
        let handle = hooks.instantiate_tile(&template, pose);
        if let Some(tile) = self.layout.get_mut(id) {
            tile.handle = Some(handle);
        }
        self.tile_root = Some(id);
        self.tile_to = Some(id);
        self.emit(
            events,
            GenEventKind::TilePlaced {
                tile: id,
                template: template.name,
                path: PathKind::Main,
            },
        );
        self.set_state(DungeonState::GeneratingMain, hooks, events);
        self.schedule_next();
    }

    /// One main-phase step: a committed placement, or the transition to
    /// branch generation once the path is long enough.
    fn main_step(&mut self, hooks: &mut dyn SceneHooks, events: &mut Vec<GenEvent>) {
        if self.layout.len() >= self.config.main_length as usize {
            // Main path complete: its open connectors seed branch roots.
            self.available = self.layout.unconnected_connectors(Some(PathKind::Main));
            log::debug!(
                "main path complete: {} tiles, {} open connectors",
                self.layout.len(),
                self.available.len()
            );
            self.set_state(DungeonState::GeneratingBranches, hooks, events);
            self.schedule_next();
            return;
        }

        self.tile_from = self.tile_to;
        match self.generate_one(hooks, events) {
            Ok(Some(id)) => {
                self.tile_to = Some(id);
                self.schedule_next();
            }
            // A main-path abort is always fatal; `generate_one` reports it
            // as the error, so this arm is unreachable in the main phase.
            Ok(None) | Err(GenerationError::MainPathExhausted) => {
                self.fail(GenerationError::MainPathExhausted, hooks, events);
            }
        }
    }

    /// One branch-phase step: start the next branch, or grow the active
    /// one by a tile.
    fn branch_step(&mut self, hooks: &mut dyn SceneHooks, events: &mut Vec<GenEvent>) {
        let Some(run) = self.branch else {
            // Between branches: start the next one or move to cleanup.
            if self.next_branch_index >= self.config.num_branches || self.available.is_empty() {
                self.set_state(DungeonState::Cleanup, hooks, events);
                self.schedule_next();
                return;
            }
            let index = self.next_branch_index;
            self.next_branch_index += 1;

            let draw = self.rng.pick_index(self.available.len());
            let root = self.available.remove(draw).tile;
            self.path = PathKind::Branch(index);
            self.tile_root = Some(root);
            self.tile_to = Some(root);
            self.attempts = 0;
            self.emit(events, GenEventKind::BranchStarted { index, root });
            log::debug!("branch {} rooted at {root}", index + 1);

            if self.config.branch_length > 1 {
                self.branch = Some(BranchRun {
                    index,
                    remaining: self.config.branch_length - 1,
                });
            }
            self.schedule_next();
            return;
        };

        self.tile_from = self.tile_to;
        match self.generate_one(hooks, events) {
            Ok(Some(id)) => {
                self.tile_to = Some(id);
                let remaining = run.remaining - 1;
                self.branch = (remaining > 0).then_some(BranchRun {
                    index: run.index,
                    remaining,
                });
                self.schedule_next();
            }
            Ok(None) => {
                // No connectors and no origin to rewind to: the branch is
                // simply shorter. Not a run error.
                self.emit(events, GenEventKind::BranchAbandoned { index: run.index });
                log::debug!("branch {} abandoned", run.index + 1);
                self.branch = None;
                self.schedule_next();
            }
            Err(error) => self.fail(error, hooks, events),
        }
    }

    /// Cleanup phase: hand the finished layout to the collaborators, then
    /// complete.
    fn cleanup(&mut self, hooks: &mut dyn SceneHooks, events: &mut Vec<GenEvent>) {
        let open = self.layout.unconnected_connectors(None);
        let dead_ends: Vec<DeadEnd> = open
            .into_iter()
            .filter_map(|connector| {
                let pose = self.layout.connector_world_pose(connector)?;
                let blocker = self.catalog.random_blocker(&mut self.rng).name.clone();
                Some(DeadEnd { connector, pose, blocker })
            })
            .collect();
        hooks.block_dead_ends(&dead_ends);
        self.emit(events, GenEventKind::DeadEndsBlocked { count: dead_ends.len() });

        hooks.build_navigation(&self.layout);
        hooks.place_boundary(self.config.boundary.as_vec());

        self.set_state(DungeonState::Completed, hooks, events);
        self.emit(events, GenEventKind::RunCompleted);
        log::info!(
            "generation completed: {} tiles, {} dead ends sealed",
            self.layout.len(),
            dead_ends.len()
        );
    }

    fn fail(
        &mut self,
        error: GenerationError,
        hooks: &mut dyn SceneHooks,
        events: &mut Vec<GenEvent>,
    ) {
        self.failure = Some(error);
        self.set_state(DungeonState::Failed, hooks, events);
        self.emit(events, GenEventKind::RunFailed { reason: error.to_string() });
        log::warn!("generation failed: {error}");
    }

    // -----------------------------------------------------------------------
    // Placement engine
    // -----------------------------------------------------------------------

    /// Place exactly one tile from the current frontier, retrying and
    /// rewinding synchronously until a placement commits, the active
    /// branch aborts (`Ok(None)`), or the main path is exhausted.
    fn generate_one(
        &mut self,
        hooks: &mut dyn SceneHooks,
        events: &mut Vec<GenEvent>,
    ) -> Result<Option<TileId>, GenerationError> {
        loop {
            let Some(frontier) = self.tile_from else {
                return self.abort_outcome();
            };
            let is_final = self.path == PathKind::Main
                && self.layout.len() + 1 == self.config.main_length as usize;

            let outcome = match self.place_next(frontier, is_final) {
                Ok(tile) => {
                    // Commit: materialize through the collaborator.
                    let (template, pose) = {
                        let instance = self.layout.tile(tile);
                        (instance.template.clone(), instance.pose)
                    };
                    let handle = hooks.instantiate_tile(&template, pose);
                    if let Some(instance) = self.layout.get_mut(tile) {
                        instance.handle = Some(handle);
                    }
                    self.attempts = 0;
                    self.emit(
                        events,
                        GenEventKind::TilePlaced {
                            tile,
                            template: template.name,
                            path: self.path,
                        },
                    );
                    return Ok(Some(tile));
                }
                Err(PlacementFailure::Collision { tile }) => self.on_collision(tile, hooks, events),
                Err(PlacementFailure::NoFreeConnector { on_frontier: true }) => {
                    // An exhausted frontier cannot succeed on retry; go
                    // straight to the rewind ladder.
                    self.rewind(hooks, events)
                }
                Err(PlacementFailure::NoFreeConnector { on_frontier: false }) => {
                    // Catalog defect on the drawn template; another draw
                    // may attach, bounded like any other failed attempt.
                    self.attempts += 1;
                    if self.attempts < self.config.max_attempts {
                        BacktrackOutcome::RetryFromSameFrontier
                    } else {
                        self.rewind(hooks, events)
                    }
                }
            };

            match outcome {
                BacktrackOutcome::RetryFromSameFrontier => {}
                BacktrackOutcome::RewindTo(tile) => self.tile_from = Some(tile),
                BacktrackOutcome::Abort => return self.abort_outcome(),
            }
        }
    }

    /// Map an abort to its phase meaning: fatal on the main path, a
    /// curtailed branch otherwise.
    fn abort_outcome(&self) -> Result<Option<TileId>, GenerationError> {
        match self.path {
            PathKind::Main => Err(GenerationError::MainPathExhausted),
            PathKind::Branch(_) => Ok(None),
        }
    }

    /// One placement attempt: draw, attach, validate. On `Ok` the tile is
    /// provisional-registered and overlap-free; on `Collision` it is still
    /// registered so the controller can address it by identity.
    fn place_next(&mut self, frontier: TileId, is_final: bool) -> Result<TileId, PlacementFailure> {
        let template = if is_final {
            self.catalog.random_exit(&mut self.rng).clone()
        } else {
            self.catalog.random_normal(&mut self.rng).clone()
        };

        let Some(from_slot) = self.layout.pick_free_connector(frontier, &mut self.rng) else {
            return Err(PlacementFailure::NoFreeConnector { on_frontier: true });
        };
        let incoming = ConnectorRef { tile: frontier, slot: from_slot };

        if template.connectors.is_empty() {
            self.layout.release_connector(incoming);
            return Err(PlacementFailure::NoFreeConnector { on_frontier: false });
        }
        let own_slot = self.rng.pick_index(template.connectors.len());

        let target = self.layout.tile(frontier).connector_world_pose(from_slot);
        let spec = template.connectors[own_slot];
        let pose = attachment_pose(target, spec.position, spec.yaw);

        let tile = self
            .layout
            .insert_attached(&template, pose, frontier, incoming, own_slot, self.path);

        if self.layout.blocking_overlap(tile, Some(frontier)) {
            return Err(PlacementFailure::Collision { tile });
        }
        Ok(tile)
    }

    // -----------------------------------------------------------------------
    // Backtracking controller
    // -----------------------------------------------------------------------

    /// Handle a collision: always discard the provisional tile, then
    /// either retry from the same frontier or rewind at the bound.
    fn on_collision(
        &mut self,
        tile: TileId,
        hooks: &mut dyn SceneHooks,
        events: &mut Vec<GenEvent>,
    ) -> BacktrackOutcome {
        self.attempts += 1;
        if let Some(removed) = self.layout.remove(tile) {
            if let Some(incoming) = removed.incoming {
                self.layout.release_connector(incoming);
            }
            self.emit(
                events,
                GenEventKind::TileDiscarded {
                    template: removed.template.name,
                    attempts: self.attempts,
                },
            );
        }
        if self.attempts < self.config.max_attempts {
            BacktrackOutcome::RetryFromSameFrontier
        } else {
            self.rewind(hooks, events)
        }
    }

    /// The bounded-failure escape: the current frontier is judged
    /// unreachable and generation retreats.
    fn rewind(
        &mut self,
        hooks: &mut dyn SceneHooks,
        events: &mut Vec<GenEvent>,
    ) -> BacktrackOutcome {
        let (Some(frontier), Some(root)) = (self.tile_from, self.tile_root) else {
            return BacktrackOutcome::Abort;
        };

        if frontier != root {
            // Destroy the frontier and step back to its origin.
            let candidate = match self.destroy_tile(frontier, hooks, events) {
                Some(origin) => origin,
                None => return BacktrackOutcome::Abort,
            };
            log::debug!("rewind: destroyed frontier {frontier}, retreating");
            match candidate {
                Some(origin) if origin != root => {
                    self.attempts = 0;
                    BacktrackOutcome::RewindTo(origin)
                }
                Some(origin) => match self.path {
                    PathKind::Main => {
                        // The origin is the path root; the root absorbs it
                        // and the path regrows from there.
                        self.tile_root = Some(origin);
                        self.attempts = 0;
                        BacktrackOutcome::RewindTo(origin)
                    }
                    PathKind::Branch(_) => self.redraw_branch_root(),
                },
                None => BacktrackOutcome::Abort,
            }
        } else {
            // The frontier is the path root itself; nothing is destroyed.
            match self.path {
                PathKind::Main => match self.layout.get(root).and_then(|t| t.origin) {
                    Some(origin) => {
                        self.tile_root = Some(origin);
                        self.attempts = 0;
                        BacktrackOutcome::RewindTo(origin)
                    }
                    // Rewound past the path root with no alternative.
                    None => BacktrackOutcome::Abort,
                },
                PathKind::Branch(_) => self.redraw_branch_root(),
            }
        }
    }

    /// Draw a fresh branch root from the available pool, if any remains.
    fn redraw_branch_root(&mut self) -> BacktrackOutcome {
        if self.available.is_empty() {
            return BacktrackOutcome::Abort;
        }
        let draw = self.rng.pick_index(self.available.len());
        let root = self.available.remove(draw).tile;
        self.tile_root = Some(root);
        self.attempts = 0;
        log::debug!("rewind: branch re-rooted at {root}");
        BacktrackOutcome::RewindTo(root)
    }

    /// Destroy a committed tile during a rewind: release the connector it
    /// came in through, purge its pool entries, remove it from the arena,
    /// and tell the scene synchronously. Returns the tile's origin.
    fn destroy_tile(
        &mut self,
        id: TileId,
        hooks: &mut dyn SceneHooks,
        events: &mut Vec<GenEvent>,
    ) -> Option<Option<TileId>> {
        let removed = self.layout.remove(id)?;
        if let Some(incoming) = removed.incoming {
            self.layout.release_connector(incoming);
        }
        self.available.retain(|c| c.tile != id);
        if let Some(handle) = removed.handle {
            hooks.destroy_tile(handle);
        }
        self.emit(events, GenEventKind::TileRemoved { tile: id });
        Some(removed.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TileKind;

    /// Records collaborator calls so tests can assert what the run showed
    /// the outside world.
    #[derive(Default)]
    struct RecordingHooks {
        next_handle: u64,
        instantiated: Vec<String>,
        destroyed: Vec<crate::types::TileHandle>,
        states: Vec<DungeonState>,
        dead_ends: usize,
        boundary_placed: bool,
        navigation_built: bool,
    }

    impl SceneHooks for RecordingHooks {
        fn instantiate_tile(
            &mut self,
            template: &crate::catalog::TileTemplate,
            _pose: Pose,
        ) -> crate::types::TileHandle {
            self.next_handle += 1;
            self.instantiated.push(template.name.clone());
            crate::types::TileHandle(self.next_handle)
        }

        fn destroy_tile(&mut self, handle: crate::types::TileHandle) {
            self.destroyed.push(handle);
        }

        fn on_state_changed(&mut self, state: DungeonState) {
            self.states.push(state);
        }

        fn build_navigation(&mut self, _layout: &DungeonLayout) {
            self.navigation_built = true;
        }

        fn block_dead_ends(&mut self, dead_ends: &[DeadEnd]) {
            self.dead_ends = dead_ends.len();
        }

        fn place_boundary(&mut self, _extents: WorldVec) {
            self.boundary_placed = true;
        }
    }

    fn quick_config() -> GenerationConfig {
        GenerationConfig {
            main_length: 5,
            branch_length: 3,
            num_branches: 2,
            step_delay_ticks: 1,
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn first_step_places_the_start_tile() {
        let config = GenerationConfig {
            step_delay_ticks: 5,
            ..quick_config()
        };
        let mut generator = DungeonGenerator::new(42, config, TileCatalog::standard());
        let mut hooks = RecordingHooks::default();

        let result = generator.step(&[], 1, &mut hooks);

        assert_eq!(generator.layout.len(), 1);
        assert_eq!(generator.state, DungeonState::GeneratingMain);
        assert_eq!(hooks.instantiated.len(), 1);
        assert!(result.events.iter().any(|e| matches!(
            e.kind,
            GenEventKind::StateChanged { state: DungeonState::GeneratingMain }
        )));
        let root = generator.layout.live().next().unwrap();
        assert_eq!(root.template.kind, TileKind::Start);
        assert!(root.origin.is_none());
    }

    #[test]
    fn run_completes_with_exit_on_main_path() {
        let mut generator =
            DungeonGenerator::new(7, quick_config(), TileCatalog::standard());
        let mut hooks = RecordingHooks::default();

        generator.run_to_completion(&mut hooks).unwrap();

        assert_eq!(generator.state, DungeonState::Completed);
        let main_tiles: Vec<_> = generator
            .layout
            .live()
            .filter(|t| t.path == PathKind::Main)
            .collect();
        assert_eq!(main_tiles.len(), 5);
        assert_eq!(main_tiles.last().unwrap().template.kind, TileKind::Exit);
        // Phases were announced in order, with no back-transitions.
        assert_eq!(
            hooks.states,
            vec![
                DungeonState::GeneratingMain,
                DungeonState::GeneratingBranches,
                DungeonState::Cleanup,
                DungeonState::Completed,
            ]
        );
        assert!(hooks.navigation_built);
        assert!(hooks.boundary_placed);
    }

    #[test]
    fn collaborator_sees_only_committed_tiles() {
        // Every instantiate call must correspond to a live or
        // later-destroyed tile; discarded provisional tiles never reach
        // the collaborator.
        let mut generator =
            DungeonGenerator::new(1234, quick_config(), TileCatalog::catacombs());
        let mut hooks = RecordingHooks::default();

        let _ = generator.run_to_completion(&mut hooks);

        let live = generator.layout.len();
        assert_eq!(hooks.instantiated.len(), live + hooks.destroyed.len());
    }

    #[test]
    fn bounded_retries_per_frontier() {
        // The discard counter in the event stream must never exceed
        // max_attempts, across several adversarial seeds.
        for seed in [3, 5, 8, 13, 21] {
            let config = GenerationConfig {
                max_attempts: 10,
                ..quick_config()
            };
            let mut generator =
                DungeonGenerator::new(seed, config, TileCatalog::catacombs());
            let mut events = Vec::new();
            let mut hooks = RecordingHooks::default();
            while !generator.is_finished() {
                let target = generator.tick + 1;
                events.extend(generator.step(&[], target, &mut hooks).events);
            }
            for event in &events {
                if let GenEventKind::TileDiscarded { attempts, .. } = &event.kind {
                    assert!(*attempts <= 10, "seed {seed}: {attempts} attempts");
                }
            }
        }
    }

    #[test]
    fn identical_seeds_reproduce_identical_runs() {
        let run = |seed| {
            let mut generator =
                DungeonGenerator::new(seed, quick_config(), TileCatalog::standard());
            let mut hooks = RecordingHooks::default();
            let mut events = Vec::new();
            while !generator.is_finished() {
                let target = generator.tick + 1;
                events.extend(generator.step(&[], target, &mut hooks).events);
            }
            (
                serde_json::to_string(&events).unwrap(),
                generator.layout.order().to_vec(),
            )
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn cancel_stops_the_run_at_a_suspension_point() {
        let mut generator =
            DungeonGenerator::new(42, quick_config(), TileCatalog::standard());
        let mut hooks = RecordingHooks::default();

        generator.step(&[], 2, &mut hooks);
        let placed_before = generator.layout.len();

        let cancel = GenCommand { tick: 3, action: GenAction::Cancel };
        let result = generator.step(&[cancel], 100, &mut hooks);

        assert!(generator.is_finished());
        assert!(result.events.iter().any(|e| matches!(e.kind, GenEventKind::RunCancelled)));
        // Nothing placed after the cancel tick.
        assert!(generator.layout.len() <= placed_before + 1);
        assert_ne!(generator.state, DungeonState::Completed);
    }

    #[test]
    fn restart_tears_down_and_rebuilds() {
        let mut generator =
            DungeonGenerator::new(42, quick_config(), TileCatalog::standard());
        let mut hooks = RecordingHooks::default();
        generator.run_to_completion(&mut hooks).unwrap();
        let first_layout = generator.layout.order().to_vec();
        let live_before = generator.layout.len();
        let destroyed_before = hooks.destroyed.len();

        let restart = GenCommand {
            tick: generator.tick + 1,
            action: GenAction::Restart { seed: 43 },
        };
        generator.step(&[restart], generator.tick + 2, &mut hooks);
        assert_eq!(hooks.destroyed.len() - destroyed_before, live_before);
        assert_eq!(generator.failure, None);

        generator.run_to_completion(&mut hooks).unwrap();
        assert_eq!(generator.state, DungeonState::Completed);
        // The second run is complete in its own right.
        let main_tiles = generator
            .layout
            .live()
            .filter(|t| t.path == PathKind::Main)
            .count();
        assert_eq!(main_tiles, 5);
        // Ids restart from zero for the fresh run.
        assert_eq!(generator.layout.order().first(), first_layout.first());
    }

    #[test]
    fn main_path_exhaustion_is_fatal_not_completed() {
        // A start tile with no connectors: the first placement finds no
        // frontier slot, the rewind ladder reaches the root, and the root
        // has no origin to fall back to.
        let mut catalog = TileCatalog::standard();
        catalog.start[0].connectors.clear();

        let mut generator = DungeonGenerator::new(42, quick_config(), catalog);
        let mut hooks = RecordingHooks::default();

        let result = generator.run_to_completion(&mut hooks);

        assert_eq!(result, Err(GenerationError::MainPathExhausted));
        assert_eq!(generator.state, DungeonState::Failed);
        assert_eq!(generator.failure, Some(GenerationError::MainPathExhausted));
        assert!(hooks.states.contains(&DungeonState::Failed));
        assert!(!hooks.states.contains(&DungeonState::Completed));
    }

    #[test]
    fn rollback_restores_connector_state() {
        // Drive a run on the collision-prone catalog and verify that at
        // completion every reserved slot belongs to a live mutual pair —
        // i.e. every rollback released what it had reserved.
        let mut generator =
            DungeonGenerator::new(17, quick_config(), TileCatalog::catacombs());
        let mut hooks = RecordingHooks::default();
        let _ = generator.run_to_completion(&mut hooks);

        let mut incoming_per_tile: Vec<(TileId, ConnectorRef)> = Vec::new();
        for tile in generator.layout.live() {
            if let Some(incoming) = tile.incoming {
                incoming_per_tile.push((tile.id, incoming));
            }
        }
        for (tile, incoming) in incoming_per_tile {
            let origin = generator.layout.get(incoming.tile).unwrap();
            assert!(
                origin.connectors[incoming.slot].connected,
                "{tile}: incoming slot on {} not marked connected",
                incoming.tile
            );
        }
    }
}
