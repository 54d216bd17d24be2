// Test harness for end-to-end generation runs.
//
// Provides `RecordingHooks`, a scene collaborator that records every call
// the generator makes (instantiations, destructions, state transitions,
// cleanup), plus helpers to drive a run tick by tick and purpose-built
// catalogs for the failure scenarios. All generation logic under test is
// the real code path — the only test-specific code here is the recording.
//
// See also: `tests/full_generation.rs` for the scenarios.

use delve_gen::catalog::{ConnectorSpec, TileCatalog, TileTemplate};
use delve_gen::event::GenEvent;
use delve_gen::generator::DungeonGenerator;
use delve_gen::geometry::{Pose, WorldVec};
use delve_gen::hooks::{DeadEnd, SceneHooks};
use delve_gen::layout::DungeonLayout;
use delve_gen::types::{DungeonState, TileHandle, TileKind};
use std::f32::consts::PI;

/// Records every collaborator call a run makes.
#[derive(Default)]
pub struct RecordingHooks {
    next_handle: u64,
    /// Template names in instantiation order.
    pub instantiated: Vec<String>,
    /// Handles destroyed by backtracking or restart, in order.
    pub destroyed: Vec<TileHandle>,
    /// Every state transition announced, in order.
    pub states: Vec<DungeonState>,
    /// Dead ends handed to `block_dead_ends` during cleanup.
    pub dead_ends: Vec<DeadEnd>,
    /// Extents handed to `place_boundary`, if cleanup ran.
    pub boundary: Option<WorldVec>,
    /// Tile count at the time `build_navigation` was called.
    pub navigation_tiles: Option<usize>,
}

impl SceneHooks for RecordingHooks {
    fn instantiate_tile(&mut self, template: &TileTemplate, _pose: Pose) -> TileHandle {
        self.next_handle += 1;
        self.instantiated.push(template.name.clone());
        TileHandle(self.next_handle)
    }

    fn destroy_tile(&mut self, handle: TileHandle) {
        self.destroyed.push(handle);
    }

    fn on_state_changed(&mut self, state: DungeonState) {
        self.states.push(state);
    }

    fn build_navigation(&mut self, layout: &DungeonLayout) {
        self.navigation_tiles = Some(layout.len());
    }

    fn block_dead_ends(&mut self, dead_ends: &[DeadEnd]) {
        self.dead_ends = dead_ends.to_vec();
    }

    fn place_boundary(&mut self, extents: WorldVec) {
        self.boundary = Some(extents);
    }
}

/// Drive a run to a terminal state one tick at a time, collecting every
/// event. Ticking singly keeps command injection points fine-grained.
pub fn drive(generator: &mut DungeonGenerator, hooks: &mut RecordingHooks) -> Vec<GenEvent> {
    let mut events = Vec::new();
    while !generator.is_finished() {
        let target = generator.tick + 1;
        events.extend(generator.step(&[], target, hooks).events);
    }
    events
}

/// A catalog whose start room has exactly two connectors and whose main
/// chain consumes all but one of them — after the main path, exactly one
/// connector remains available for branching.
pub fn narrow_catalog() -> TileCatalog {
    TileCatalog {
        start: vec![TileTemplate {
            name: "cul_de_sac".into(),
            kind: TileKind::Start,
            extents: WorldVec::new(8.0, 4.0, 8.0),
            bounds_center: WorldVec::new(0.0, 2.0, 0.0),
            connectors: vec![
                ConnectorSpec { position: WorldVec::new(0.0, 0.0, 4.0), yaw: 0.0 },
                ConnectorSpec { position: WorldVec::new(0.0, 0.0, -4.0), yaw: PI },
            ],
        }],
        normal: vec![TileTemplate {
            name: "passage".into(),
            kind: TileKind::Normal,
            extents: WorldVec::new(4.0, 4.0, 10.0),
            bounds_center: WorldVec::new(0.0, 2.0, 0.0),
            connectors: vec![
                ConnectorSpec { position: WorldVec::new(0.0, 0.0, 5.0), yaw: 0.0 },
                ConnectorSpec { position: WorldVec::new(0.0, 0.0, -5.0), yaw: PI },
            ],
        }],
        exit: vec![TileTemplate {
            name: "deep_gate".into(),
            kind: TileKind::Exit,
            extents: WorldVec::new(8.0, 5.0, 8.0),
            bounds_center: WorldVec::new(0.0, 2.5, 0.0),
            connectors: vec![ConnectorSpec {
                position: WorldVec::new(0.0, 0.0, -4.0),
                yaw: PI,
            }],
        }],
        blockers: vec![TileTemplate {
            name: "barricade".into(),
            kind: TileKind::Blocker,
            extents: WorldVec::new(4.0, 4.0, 0.5),
            bounds_center: WorldVec::new(0.0, 2.0, 0.0),
            connectors: Vec::new(),
        }],
    }
}

/// A deliberately defective catalog: the start room declares no connectors
/// at all, so the very first placement finds no frontier slot and the
/// rewind ladder falls off the path root. (`TileCatalog::validate` rejects
/// this catalog; the tests bypass validation on purpose.)
pub fn sealed_start_catalog() -> TileCatalog {
    let mut catalog = narrow_catalog();
    catalog.start[0].connectors.clear();
    catalog
}
