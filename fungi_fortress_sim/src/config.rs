// Data-driven game configuration.
//
// Every tunable the simulation reads lives in `GameConfig`: task queue
// capacity, per-kind action durations, combat and fishing yields, bridge
// and structure costs, spore mechanics, starting stock and the entity
// registry itself. The sim never uses magic numbers; it reads from the
// config. `Default` reproduces the stock game values, and JSON overrides
// may be partial since every struct here is `#[serde(default)]`.
//
// Structure definitions (`BuildingDef`) are keyed by the same string as the
// structure's entity in the registry, so a completed build can place the
// matching tile.
//
// See also: `sim.rs` which owns the `GameConfig` as part of `SimState`,
// `entity.rs` for the registry embedded here, `actions.rs` for the handlers
// that consume durations and costs.
//
// **Critical constraint: determinism.** Config values feed directly into
// simulation logic. The same config and seed give the same run.

use crate::entity::EntityRegistry;
use crate::event::DEFAULT_MESSAGE_LOG_CAPACITY;
use crate::task::DEFAULT_TASK_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ticks spent in each working state before the completion handler runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionDurations {
    /// Shared by mining and bridge building.
    pub base_mining_ticks: u32,
    pub chopping_ticks: u32,
    /// Used when the structure's `BuildingDef` has no `ticks` of its own.
    pub building_ticks: u32,
    pub fishing_ticks: u32,
    pub fighting_ticks: u32,
    pub entering_ticks: u32,
}

impl Default for ActionDurations {
    fn default() -> Self {
        Self {
            base_mining_ticks: 5,
            chopping_ticks: 5,
            building_ticks: 10,
            fishing_ticks: 10,
            fighting_ticks: 10,
            entering_ticks: 1,
        }
    }
}

/// A constructible structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingDef {
    /// Resources and special items consumed on completion.
    pub cost: Vec<(String, u32)>,
    /// Overrides `ActionDurations::building_ticks`.
    #[serde(default)]
    pub ticks: Option<u32>,
}

fn items(lines: &[(&str, u32)]) -> Vec<(String, u32)> {
    lines.iter().map(|(n, q)| (n.to_string(), *q)).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub task_capacity: usize,
    pub max_dwarves: usize,
    pub durations: ActionDurations,

    /// Health removed from a character per completed fight.
    pub fight_damage: i32,
    pub character_health: i32,
    pub animal_food_yield: u32,
    /// Inventory key credited by fishing and hunting.
    pub food_resource: String,
    pub fish_yield: u32,

    pub bridge_cost: Vec<(String, u32)>,
    pub buildings: BTreeMap<String, BuildingDef>,

    /// Abandonments a task survives before it expires.
    pub max_unreachable_attempts: u32,
    /// Per-tick chance that each surface animal takes a random step.
    pub animal_move_chance: f64,

    pub starting_spore_exposure: u32,
    /// Exposure at which mined magic fungi light up the network.
    pub spore_exposure_threshold: u32,
    /// Per-tile conversion chance per point of spore yield.
    pub spore_spread_chance: f64,
    /// Multiplier when an adjacent tile is already mycelium.
    pub spore_spread_adjacency_multiplier: f64,

    pub starting_resources: BTreeMap<String, u32>,
    pub starting_special_items: BTreeMap<String, u32>,

    /// Floor left behind by harvesting at depth 0.
    pub surface_floor: String,
    /// Floor left behind by harvesting below the surface.
    pub underground_floor: String,
    pub mycelium_floor: String,
    pub water: String,
    pub bridge: String,

    pub message_log_capacity: usize,
    pub entities: EntityRegistry,
}

impl Default for GameConfig {
    fn default() -> Self {
        let buildings = [
            (
                "Mycelial Nexus",
                BuildingDef {
                    cost: items(&[("wood", 10), ("fungi", 5), ("Sclerotium", 1)]),
                    ticks: Some(20),
                },
            ),
            (
                "Dwarven Sporeforge",
                BuildingDef {
                    cost: items(&[("stone", 15), ("wood", 5)]),
                    ticks: Some(15),
                },
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let starting_resources = [
            ("food", 2),
            ("wood", 10),
            ("stone", 5),
            ("gold", 0),
            ("crystals", 0),
            ("fungi", 5),
            ("magic_fungi", 0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let starting_special_items = [("Sclerotium", 1), ("Map Fragment", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            task_capacity: DEFAULT_TASK_CAPACITY,
            max_dwarves: 3,
            durations: ActionDurations::default(),
            fight_damage: 10,
            character_health: 100,
            animal_food_yield: 2,
            food_resource: "food".to_string(),
            fish_yield: 1,
            bridge_cost: items(&[("wood", 1)]),
            buildings,
            max_unreachable_attempts: 5,
            animal_move_chance: 0.2,
            starting_spore_exposure: 50,
            spore_exposure_threshold: 20,
            spore_spread_chance: 0.01,
            spore_spread_adjacency_multiplier: 5.0,
            starting_resources,
            starting_special_items,
            surface_floor: "grass".to_string(),
            underground_floor: "stone_floor".to_string(),
            mycelium_floor: "mycelium_floor".to_string(),
            water: "water".to_string(),
            bridge: "bridge".to_string(),
            message_log_capacity: DEFAULT_MESSAGE_LOG_CAPACITY,
            entities: EntityRegistry::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Floor key for harvested tiles at `depth`.
    pub fn floor_for_depth(&self, depth: i32) -> &str {
        if depth == 0 {
            &self.surface_floor
        } else {
            &self.underground_floor
        }
    }

    /// Build duration for `building`, falling back to the shared default.
    pub fn building_ticks(&self, building: Option<&str>) -> u32 {
        building
            .and_then(|name| self.buildings.get(name))
            .and_then(|def| def.ticks)
            .unwrap_or(self.durations.building_ticks)
    }
}
