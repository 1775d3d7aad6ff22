// Callbacks into subsystems that live outside the simulation core.
//
// Three completion paths hand off to collaborators the core does not own:
// entering a sublevel (level generation and the map swap), lighting up the
// mycelial network after magic fungi are mined, and holding a conversation
// with a character (the dialogue subsystem). The game loop passes an
// implementation of `WorldHooks` into `SimState::tick()`; headless runs and
// most tests pass `NoopHooks`.
//
// Hooks are called synchronously from inside the tick, after the handler has
// committed its own effects. They must not assume the dwarf is still in its
// working state.

use crate::agent::Character;
use crate::types::{AgentId, TileCoord};

pub trait WorldHooks {
    /// A dwarf finished entering the sublevel entrance `entrance` at `at`.
    /// Typically the implementation generates the sublevel and calls
    /// `SimState::change_level()` before the next tick.
    fn enter_sublevel(&mut self, _agent: AgentId, _entrance: &str, _at: TileCoord) {}

    /// Magic fungi were mined at `from` with colony spore exposure at or
    /// above the threshold.
    fn illuminate_network(&mut self, _from: TileCoord) {}

    /// A dwarf reached a character for a talk task. Returns `true` if a
    /// conversation was started.
    fn talk(&mut self, _agent: AgentId, _character: &Character) -> bool {
        false
    }
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl WorldHooks for NoopHooks {}
