// The live tile arena: instances, connector bookkeeping, overlap queries.
//
// Storage is a slot vector indexed by `TileId` — ids are assigned
// sequentially at insertion and never reused, so a removed tile leaves a
// `None` hole and iteration over the creation-order list stays
// deterministic. Backtracking removes tiles by id constantly, which is
// exactly what this layout makes O(1). No `HashMap`.
//
// Three concerns live here because they share this state:
// the arena itself, the connector registry (random free-slot selection
// with reservation-on-read, release on rollback, unconnected-slot
// collection), and the spatial validator (`blocking_overlap`), a pure
// query over the cached world AABBs of all live tiles.
//
// See also: `types.rs` for `TileId`/`ConnectorRef`, `geometry.rs` for the
// AABB math, `generator.rs` for the placement and backtracking logic that
// drives every mutation in here.
//
// **Critical constraint: determinism.** Free-connector selection draws
// from the caller's `GenRng` over slot indices in declared template
// order. Iteration follows creation order everywhere.

use crate::catalog::{ConnectorSpec, TileTemplate};
use crate::geometry::{Aabb, Pose};
use crate::types::{ConnectorRef, PathKind, TileHandle, TileId};
use delve_prng::GenRng;
use smallvec::SmallVec;

/// One connector slot on a placed tile: the template's declared spec plus
/// the consumed/free flag.
#[derive(Clone, Debug)]
pub struct ConnectorSlot {
    pub spec: ConnectorSpec,
    pub connected: bool,
}

/// A placed tile. Created provisionally by the placement engine; destroyed
/// by the backtracking controller when a placement is rolled back.
#[derive(Clone, Debug)]
pub struct TileInstance {
    pub id: TileId,
    pub template: TileTemplate,
    pub pose: Pose,
    /// World bounding box, cached at insertion (pose and footprint are
    /// immutable afterwards).
    pub aabb: Aabb,
    /// The tile this one was generated from; `None` only for a path root
    /// placed directly (the start tile).
    pub origin: Option<TileId>,
    /// The slot on `origin` this tile attached through.
    pub incoming: Option<ConnectorRef>,
    pub connectors: SmallVec<[ConnectorSlot; 4]>,
    pub path: PathKind,
    /// Scene-collaborator handle, present once the placement committed.
    pub handle: Option<TileHandle>,
}

impl TileInstance {
    /// World pose of one of this tile's connector slots.
    pub fn connector_world_pose(&self, slot: usize) -> Pose {
        let spec = self.connectors[slot].spec;
        self.pose.compose(spec.position, spec.yaw)
    }

    /// Number of slots still free.
    pub fn free_connector_count(&self) -> usize {
        self.connectors.iter().filter(|s| !s.connected).count()
    }
}

/// The arena of live tiles plus their creation order.
#[derive(Clone, Debug, Default)]
pub struct DungeonLayout {
    slots: Vec<Option<TileInstance>>,
    order: Vec<TileId>,
}

impl DungeonLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a path-root tile (no origin). Returns its id.
    pub fn insert_root(&mut self, template: &TileTemplate, pose: Pose, path: PathKind) -> TileId {
        self.insert_inner(template, pose, None, None, None, path)
    }

    /// Place a tile attached through `incoming` (a slot on `origin`) using
    /// the new tile's own slot `own_slot`, which is marked connected
    /// immediately — selection and reservation are one step.
    pub fn insert_attached(
        &mut self,
        template: &TileTemplate,
        pose: Pose,
        origin: TileId,
        incoming: ConnectorRef,
        own_slot: usize,
        path: PathKind,
    ) -> TileId {
        self.insert_inner(template, pose, Some(origin), Some(incoming), Some(own_slot), path)
    }

    fn insert_inner(
        &mut self,
        template: &TileTemplate,
        pose: Pose,
        origin: Option<TileId>,
        incoming: Option<ConnectorRef>,
        own_slot: Option<usize>,
        path: PathKind,
    ) -> TileId {
        let id = TileId(self.slots.len() as u32);
        let mut connectors: SmallVec<[ConnectorSlot; 4]> = template
            .connectors
            .iter()
            .map(|&spec| ConnectorSlot { spec, connected: false })
            .collect();
        if let Some(slot) = own_slot {
            connectors[slot].connected = true;
        }
        let aabb = Aabb::of_footprint(pose, template.extents, template.bounds_center);
        self.slots.push(Some(TileInstance {
            id,
            template: template.clone(),
            pose,
            aabb,
            origin,
            incoming,
            connectors,
            path,
            handle: None,
        }));
        self.order.push(id);
        id
    }

    /// Remove a tile from the arena, returning the instance. Its id is
    /// retired, never reused.
    pub fn remove(&mut self, id: TileId) -> Option<TileInstance> {
        let instance = self.slots.get_mut(id.0 as usize)?.take()?;
        self.order.retain(|&t| t != id);
        Some(instance)
    }

    pub fn get(&self, id: TileId) -> Option<&TileInstance> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    /// Get a live tile by id. Panics on a dead or unknown id; use `get`
    /// where liveness is in question.
    pub fn tile(&self, id: TileId) -> &TileInstance {
        match self.slots[id.0 as usize].as_ref() {
            Some(instance) => instance,
            None => panic!("{id} is not live"),
        }
    }

    pub fn get_mut(&mut self, id: TileId) -> Option<&mut TileInstance> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }

    /// Live tiles in creation order.
    pub fn live(&self) -> impl Iterator<Item = &TileInstance> {
        self.order.iter().filter_map(|&id| self.get(id))
    }

    /// Number of live tiles.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids of live tiles in creation order.
    pub fn order(&self) -> &[TileId] {
        &self.order
    }

    /// Drop every tile. Used by `Restart` after the scene collaborator has
    /// been told to destroy the instances.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }

    // -----------------------------------------------------------------------
    // Connector registry
    // -----------------------------------------------------------------------

    /// Pick a uniform random free connector slot on `tile` and reserve it
    /// (`connected = true`) in the same step. Returns `None` when the tile
    /// has no free slot left — the caller must fail the placement attempt.
    pub fn pick_free_connector(&mut self, tile: TileId, rng: &mut GenRng) -> Option<usize> {
        let instance = self.get_mut(tile)?;
        let free: SmallVec<[usize; 4]> = instance
            .connectors
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.connected)
            .map(|(i, _)| i)
            .collect();
        if free.is_empty() {
            return None;
        }
        let slot = free[rng.pick_index(free.len())];
        instance.connectors[slot].connected = true;
        Some(slot)
    }

    /// Reverse a reservation made by `pick_free_connector`. Only the
    /// backtracking controller calls this.
    pub fn release_connector(&mut self, connector: ConnectorRef) {
        if let Some(instance) = self.get_mut(connector.tile) {
            instance.connectors[connector.slot].connected = false;
        }
    }

    /// All unconnected slots on live tiles of the given path, in creation
    /// order. With `path = None`, every live tile is scanned (the cleanup
    /// pass sealing dead ends).
    pub fn unconnected_connectors(&self, path: Option<PathKind>) -> Vec<ConnectorRef> {
        let mut result = Vec::new();
        for instance in self.live() {
            if path.is_some_and(|p| instance.path != p) {
                continue;
            }
            for (slot, state) in instance.connectors.iter().enumerate() {
                if !state.connected {
                    result.push(ConnectorRef { tile: instance.id, slot });
                }
            }
        }
        result
    }

    /// World pose of a connector slot, if its tile is live.
    pub fn connector_world_pose(&self, connector: ConnectorRef) -> Option<Pose> {
        self.get(connector.tile)
            .map(|t| t.connector_world_pose(connector.slot))
    }

    // -----------------------------------------------------------------------
    // Spatial validator
    // -----------------------------------------------------------------------

    /// True when `tile`'s world box interpenetrates any live tile other
    /// than itself and `ignore` (its immediate predecessor — contact at
    /// the shared connector junction is expected there). Pure query.
    pub fn blocking_overlap(&self, tile: TileId, ignore: Option<TileId>) -> bool {
        let Some(candidate) = self.get(tile) else {
            return false;
        };
        self.live().any(|other| {
            other.id != tile && Some(other.id) != ignore && candidate.aabb.overlaps(&other.aabb)
        })
    }
}
