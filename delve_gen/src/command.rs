// Commands that control a generation run from outside.
//
// All external control of the generator goes through `GenCommand` — the
// generator is otherwise a pure function `(state, commands) -> (new_state,
// events)`, and commands are the input. An embedding constructs commands
// from its own control surface (a debug key, an editor button, a retry
// policy) and passes them to `DungeonGenerator::step()`.
//
// A `GenCommand` carries a `tick` (when to apply) and a `GenAction`:
// - `Cancel` — stop the run at the next suspension point. This is the
//   cancellation signal of the cooperative loop; nothing mid-placement is
//   interrupted, the run simply never takes another step.
// - `Restart` — tear down every placed tile (through the scene hooks) and
//   begin a fresh run from a new seed. This is how surrounding tooling
//   retries a run that failed with an exhausted main path.
//
// See also: `generator.rs` for `apply_command()` which dispatches these,
// `event.rs` for the events a command's effects emit.
//
// **Critical constraint: determinism.** Commands are the sole external
// input to a run. Replaying the same command stream against the same seed
// reproduces the run exactly.

use serde::{Deserialize, Serialize};

/// An externally-issued command targeting a specific generator tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GenCommand {
    pub tick: u64,
    pub action: GenAction,
}

/// The specific action a command performs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum GenAction {
    /// Stop the run at the next suspension point.
    Cancel,
    /// Destroy the current layout and start over with the given seed.
    Restart { seed: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serialization_roundtrip() {
        let cmd = GenCommand {
            tick: 100,
            action: GenAction::Restart { seed: 7 },
        };
        let json = serde_json::to_string(&cmd).unwrap();
        let restored: GenCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.tick, 100);
        assert!(matches!(restored.action, GenAction::Restart { seed: 7 }));
    }

    #[test]
    fn command_binary_roundtrip() {
        // Command streams get recorded for replay; the binary encoding
        // must round-trip as faithfully as JSON.
        let cmd = GenCommand { tick: 5, action: GenAction::Cancel };
        let bytes = bincode::serialize(&cmd).unwrap();
        let restored: GenCommand = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.tick, 5);
        assert!(matches!(restored.action, GenAction::Cancel));
    }
}
