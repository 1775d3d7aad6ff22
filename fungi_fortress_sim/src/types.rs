// Core types shared across the simulation.
//
// Defines tile coordinates (`TileCoord`), the neighbour offset tables used by
// pathfinding and occupancy resolution, and the compact integer identifiers
// for dwarves, animals and characters. All types derive `Serialize` and
// `Deserialize` so snapshots can be handed to a display layer or saved.
//
// **Critical constraint: determinism.** Identifiers are handed out
// sequentially by `SimState` in spawn order. Neighbour tables are fixed
// arrays, never derived from hash iteration.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A cell on the 2D tile grid.
///
/// - X: east (positive) / west (negative)
/// - Y: south (positive) / north (negative), so row 0 is the top of the map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

/// The four cardinal steps, in the order A* expands them.
pub const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// The eight surrounding cells in row-major order, top-left to bottom-right.
pub const SURROUNDING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two coordinates.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Cardinal neighbours in A* expansion order.
    pub fn cardinal_neighbors(self) -> [TileCoord; 4] {
        CARDINAL_OFFSETS.map(|(dx, dy)| self.offset(dx, dy))
    }

    /// All eight surrounding cells in row-major scan order.
    pub fn surrounding(self) -> [TileCoord; 8] {
        SURROUNDING_OFFSETS.map(|(dx, dy)| self.offset(dx, dy))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Actor IDs
// ---------------------------------------------------------------------------

macro_rules! actor_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

actor_id!(/// Identifier for a dwarf (a task-executing agent).
AgentId);
actor_id!(/// Identifier for a wandering animal.
AnimalId);
actor_id!(/// Identifier for a named non-player character.
CharacterId);
