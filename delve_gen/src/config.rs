// Data-driven generation configuration.
//
// All tunable run parameters live in `GenerationConfig`, loaded from JSON
// at startup. The generator never uses magic numbers — it reads from the
// config. This enables layout tuning without recompilation, and a recorded
// (seed, config, catalog) triple reproduces a run exactly.
//
// Lengths count tiles, not gaps: a main path of length 5 is five tiles
// including the start and exit rooms. A branch of length 4 adds three
// tiles to its root (the root is an existing main-path tile).
//
// See also: `generator.rs` which owns the config for the duration of a
// run, `catalog.rs` for the tile set the run draws from.
//
// **Critical constraint: determinism.** Config values feed directly into
// generation logic. Identical configs are required for identical layouts.

use crate::geometry::WorldVec;
use serde::{Deserialize, Serialize};

/// Extents of the rectangular boundary the cleanup phase asks the scene
/// collaborator to erect around the finished dungeon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryExtents {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl BoundaryExtents {
    pub fn as_vec(self) -> WorldVec {
        WorldVec::new(self.width, self.height, self.depth)
    }
}

/// Tunable parameters of a generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Tiles on the main path, start and exit included.
    pub main_length: u32,
    /// Nominal tiles per branch, shared root included — each branch adds
    /// up to `branch_length - 1` tiles.
    pub branch_length: u32,
    /// Number of branches to attempt off the main path.
    pub num_branches: u32,
    /// Consecutive failed placements tolerated at one frontier before the
    /// backtracking controller rewinds.
    pub max_attempts: u32,
    /// Ticks between committed placements — the pacing delay of the
    /// cooperative generation loop. 0 places a tile every tick.
    pub step_delay_ticks: u64,
    /// Boundary volume handed to the scene collaborator during cleanup.
    pub boundary: BoundaryExtents,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            main_length: 10,
            branch_length: 4,
            num_branches: 3,
            max_attempts: 50,
            step_delay_ticks: 1,
            boundary: BoundaryExtents {
                width: 120.0,
                height: 20.0,
                depth: 120.0,
            },
        }
    }
}

impl GenerationConfig {
    /// Load a config from its JSON representation. Missing fields fall
    /// back to their defaults, so config files can be sparse.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the config to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
