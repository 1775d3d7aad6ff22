// Entity definitions and the name-keyed entity registry.
//
// Every tile on the map holds exactly one entity: a terrain type (grass,
// water), a harvestable resource (stone wall, tree, fungi), a constructed
// structure (Mycelial Nexus) or a sublevel entrance. The registry maps the
// entity's key to an `EntityDef` describing its walkability and, for
// resources, what harvesting it yields.
//
// Tiles store a compact `EntityId` (the def's index in the registry) rather
// than a string, so the grid stays `Copy`. The registry serializes as a plain
// list of defs; the key index is rebuilt on load.
//
// See also: `grid.rs` for the tile storage, `config.rs` which carries the
// registry as part of `GameConfig`, `actions.rs` whose completion handlers
// read resource yields from here.

use crate::grid::Tile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Index of an `EntityDef` inside an `EntityRegistry`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u16);

/// What kind of thing an entity is, with any class-specific data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EntityClass {
    Terrain,
    Resource {
        /// Inventory key credited when harvested ("stone", "wood", ...).
        resource: String,
        yield_amount: u32,
        /// Added to colony spore exposure when harvested.
        #[serde(default)]
        spore_yield: u32,
        /// Magic resources light up the mycelial network when mined.
        #[serde(default)]
        magic: bool,
    },
    Structure,
    Sublevel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub key: String,
    pub walkable: bool,
    pub class: EntityClass,
}

impl EntityDef {
    fn terrain(key: &str, walkable: bool) -> Self {
        Self {
            key: key.to_string(),
            walkable,
            class: EntityClass::Terrain,
        }
    }

    fn resource(key: &str, walkable: bool, resource: &str, spore_yield: u32, magic: bool) -> Self {
        Self {
            key: key.to_string(),
            walkable,
            class: EntityClass::Resource {
                resource: resource.to_string(),
                yield_amount: 1,
                spore_yield,
                magic,
            },
        }
    }

    fn structure(key: &str, walkable: bool) -> Self {
        Self {
            key: key.to_string(),
            walkable,
            class: EntityClass::Structure,
        }
    }

    /// The resource this entity yields, if it is harvestable.
    pub fn resource_type(&self) -> Option<&str> {
        match &self.class {
            EntityClass::Resource { resource, .. } => Some(resource),
            _ => None,
        }
    }

    pub fn is_sublevel(&self) -> bool {
        matches!(self.class, EntityClass::Sublevel)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{count} entity defs do not fit in a 16-bit entity id")]
    TooManyDefs { count: usize },
}

/// Name-keyed lookup of every entity that can occupy a tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EntityDef>", into = "Vec<EntityDef>")]
pub struct EntityRegistry {
    defs: Vec<EntityDef>,
    by_key: BTreeMap<String, EntityId>,
}

impl EntityRegistry {
    /// Build a registry from a list of defs. A later def with a duplicate key
    /// shadows the earlier one for key lookups. Fails if an index would not
    /// fit in an `EntityId`.
    pub fn new(defs: Vec<EntityDef>) -> Result<Self, RegistryError> {
        let by_key = defs
            .iter()
            .enumerate()
            .map(|(i, def)| u16::try_from(i).map(|i| (def.key.clone(), EntityId(i))))
            .collect::<Result<_, _>>()
            .map_err(|_| RegistryError::TooManyDefs { count: defs.len() })?;
        Ok(Self { defs, by_key })
    }

    pub fn id(&self, key: &str) -> Option<EntityId> {
        self.by_key.get(key).copied()
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn def(&self, key: &str) -> Option<&EntityDef> {
        self.id(key).and_then(|id| self.get(id))
    }

    /// A fresh tile holding the keyed entity, with the def's walkability.
    pub fn tile(&self, key: &str) -> Option<Tile> {
        let id = self.id(key)?;
        self.tile_for(id)
    }

    pub fn tile_for(&self, id: EntityId) -> Option<Tile> {
        self.get(id).map(|def| Tile {
            entity: id,
            walkable: def.walkable,
        })
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityDef)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, def)| (EntityId(i as u16), def))
    }
}

impl TryFrom<Vec<EntityDef>> for EntityRegistry {
    type Error = RegistryError;

    fn try_from(defs: Vec<EntityDef>) -> Result<Self, Self::Error> {
        Self::new(defs)
    }
}

impl From<EntityRegistry> for Vec<EntityDef> {
    fn from(registry: EntityRegistry) -> Self {
        registry.defs
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        let defs = vec![
            EntityDef::terrain("grass", true),
            EntityDef::terrain("stone_floor", true),
            EntityDef::terrain("water", false),
            EntityDef::terrain("bridge", true),
            EntityDef::terrain("mycelium_floor", true),
            EntityDef::structure("mycelium_wall", false),
            EntityDef::resource("stone_wall", false, "stone", 0, false),
            EntityDef::resource("tree", false, "wood", 0, false),
            EntityDef::resource("fungi", true, "fungi", 1, false),
            EntityDef::resource("magic_fungi", true, "magic_fungi", 5, true),
            EntityDef::structure("Mycelial Nexus", true),
            EntityDef::structure("Dwarven Sporeforge", true),
            EntityDef {
                key: "Shadowed Grotto".to_string(),
                walkable: true,
                class: EntityClass::Sublevel,
            },
        ];
        let by_key = defs
            .iter()
            .zip(0..=u16::MAX)
            .map(|(def, i)| (def.key.clone(), EntityId(i)))
            .collect();
        Self { defs, by_key }
    }
}
