// Core types shared across the generator.
//
// Defines the compact entity identifiers (`TileId`, `ConnectorRef`), the
// opaque scene-collaborator handle (`TileHandle`), and the foundational
// enums (`DungeonState`, `PathKind`, `TileKind`). All types derive
// `Serialize`/`Deserialize` so commands and events built from them can
// cross the embedding boundary.
//
// Tile IDs are plain `u32` indices into the layout arena rather than
// UUIDs: backtracking removes tiles by id constantly, and an index into a
// slot vector makes removal O(1) with deterministic iteration order.
//
// **Critical constraint: determinism.** IDs are sequential integers
// assigned in creation order. No OS entropy, no hashing.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Entity IDs — compact arena indices
// ---------------------------------------------------------------------------

/// Identifier for a placed tile instance — an index into the layout arena.
///
/// IDs are assigned sequentially in creation order and are never reused
/// within a run, so a smaller `TileId` always means an earlier placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileId({})", self.0)
    }
}

/// A specific connector slot on a specific tile instance.
///
/// `slot` indexes into the owning tile's connector list, which preserves
/// the template's declared connector order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorRef {
    pub tile: TileId,
    pub slot: usize,
}

impl fmt::Display for ConnectorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tile, self.slot)
    }
}

/// Opaque handle to a tile materialized by the scene collaborator.
///
/// The generator stores the handle returned by
/// `SceneHooks::instantiate_tile` and passes it back to
/// `SceneHooks::destroy_tile` during backtracking. The core never
/// interprets the value.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileHandle(pub u64);

// ---------------------------------------------------------------------------
// Generation enums
// ---------------------------------------------------------------------------

/// Phase of a generation run. Advances strictly forward within a run;
/// `Completed` and `Failed` are terminal. A `Restart` command begins a
/// fresh run back at `Inactive`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DungeonState {
    Inactive,
    GeneratingMain,
    GeneratingBranches,
    Cleanup,
    Completed,
    Failed,
}

/// Which path a tile belongs to: the main start-to-exit path, or one of
/// the numbered side branches. Drives the backtracking controller's
/// rewind rules (a main-path rewind can replace the path root; a branch
/// rewind redraws a root from the available-connector pool).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathKind {
    Main,
    Branch(u32),
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::Main => write!(f, "main path"),
            PathKind::Branch(i) => write!(f, "branch {}", i + 1),
        }
    }
}

/// The role a tile template plays in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    Start,
    Normal,
    Exit,
    Blocker,
}
