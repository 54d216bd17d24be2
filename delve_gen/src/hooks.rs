// The collaborator seam: everything the generator asks of its embedding.
//
// The core computes the layout; materializing tiles in a scene, baking
// navigation, walling off dead ends, and erecting the world boundary are
// collaborator concerns behind this one narrow trait. The generator calls
// these methods at well-defined points and never inspects their results
// beyond the returned tile handle.
//
// Contract points the generator relies on:
// - `instantiate_tile` is called only for committed placements — a
//   provisional tile that fails validation is never visible out here.
// - `destroy_tile` must take effect synchronously: the generator removes
//   the instance from its own arena in the same call sequence, so a
//   deferred destruction would let a later spatial query disagree with
//   the scene.
// - `on_state_changed` fires on every phase transition, fire-and-forget.
// - The cleanup methods are invoked once per run, with the final sets.
//
// Every method has a no-op default so embeddings implement only what they
// render; `NullHooks` is the all-defaults instance used by headless runs
// and tests.
//
// See also: `generator.rs` for the call sites, `types.rs` for
// `TileHandle`.

use crate::catalog::TileTemplate;
use crate::geometry::{Pose, WorldVec};
use crate::layout::DungeonLayout;
use crate::types::{ConnectorRef, DungeonState, TileHandle};

/// An open connector the cleanup phase wants sealed, paired with the
/// blocker template drawn for it.
#[derive(Clone, Debug)]
pub struct DeadEnd {
    pub connector: ConnectorRef,
    /// World pose of the opening; the blocker is materialized here,
    /// facing back into the tile.
    pub pose: Pose,
    /// Name of the blocker template drawn from the catalog.
    pub blocker: String,
}

/// Scene/engine collaborator interface.
pub trait SceneHooks {
    /// Materialize a tile at a pose. The returned handle is stored on the
    /// tile instance and passed back on destruction.
    fn instantiate_tile(&mut self, template: &TileTemplate, pose: Pose) -> TileHandle {
        let _ = (template, pose);
        TileHandle::default()
    }

    /// Remove a previously materialized tile. Must take effect before the
    /// call returns.
    fn destroy_tile(&mut self, handle: TileHandle) {
        let _ = handle;
    }

    /// Phase-transition notification. Fire-and-forget.
    fn on_state_changed(&mut self, state: DungeonState) {
        let _ = state;
    }

    /// Cleanup: bake navigation over the finished layout.
    fn build_navigation(&mut self, layout: &DungeonLayout) {
        let _ = layout;
    }

    /// Cleanup: seal the run's remaining open connectors.
    fn block_dead_ends(&mut self, dead_ends: &[DeadEnd]) {
        let _ = dead_ends;
    }

    /// Cleanup: erect the bounding volume around the dungeon.
    fn place_boundary(&mut self, extents: WorldVec) {
        let _ = extents;
    }
}

/// A collaborator that does nothing — headless generation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHooks;

impl SceneHooks for NullHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TileCatalog;

    #[test]
    fn null_hooks_accepts_every_call() {
        let mut hooks = NullHooks;
        let catalog = TileCatalog::standard();
        let handle = hooks.instantiate_tile(&catalog.start[0], Pose::default());
        hooks.destroy_tile(handle);
        hooks.on_state_changed(DungeonState::Completed);
        hooks.build_navigation(&DungeonLayout::new());
        hooks.block_dead_ends(&[]);
        hooks.place_boundary(WorldVec::new(10.0, 10.0, 10.0));
    }
}
