// fungi_fortress_sim: task scheduling and dwarf action engine.
//
// This crate contains the simulation core of Fungi Fortress: the tile grid,
// the task queue and designation tracker, A* pathfinding, the dwarf state
// machine and the completion handlers that turn finished work into changes
// to the map and inventory. It has no rendering, input or terminal
// dependencies and runs headless in tests and benchmarks.
//
// Module overview:
// - `sim.rs`:         Top-level SimState, tick loop, assignment, dwarf FSM, designation.
// - `actions.rs`:     Per-kind working state / duration table and completion handlers.
// - `occupancy.rs`:   De-stacking of actors that share a tile.
// - `task.rs`:        Task records and the bounded FIFO TaskManager.
// - `agent.rs`:       Dwarf, Animal and Character actors.
// - `pathfinding.rs`: A* over the tile grid, exact and adjacent modes.
// - `grid.rs`:        Dense 2D TileMap.
// - `entity.rs`:      Entity definitions and the name-keyed registry.
// - `inventory.rs`:   Colony resources and special items.
// - `event.rs`:       Narrative SimEvents and the bounded MessageLog.
// - `hooks.rs`:       WorldHooks trait for level generation, network and dialogue.
// - `config.rs`:      GameConfig, every tunable, loadable from JSON.
// - `types.rs`:       TileCoord, neighbour tables, actor IDs.
//
// Terrain generation, rendering, input handling, dialogue and persistence
// live outside this crate and talk to it through `SimState`'s public API
// and `WorldHooks`.
//
// **Critical constraint: determinism.** Given the same config, map, seed and
// sequence of submissions, the simulation produces the same events. All
// randomness comes from the `SmallRng` owned by `SimState`; iterated
// collections are `Vec`s or `BTreeMap`s.

pub mod actions;
pub mod agent;
pub mod config;
pub mod entity;
pub mod event;
pub mod grid;
pub mod hooks;
pub mod inventory;
pub mod occupancy;
pub mod pathfinding;
pub mod sim;
pub mod task;
pub mod types;
