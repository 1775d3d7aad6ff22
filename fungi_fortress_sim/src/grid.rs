// Dense 2D tile grid for one level of the fortress.
//
// The map is stored as a flat `Vec<Tile>` indexed by `x + y * width`, giving
// O(1) read/write access. Each tile records the entity occupying it and
// whether dwarves can stand on it. Out-of-bounds reads return `None` and are
// never walkable; out-of-bounds writes are no-ops.
//
// Walkability is cached on the tile rather than looked up through the
// registry on every A* expansion. Callers that replace an entity should build
// the new tile through `EntityRegistry::tile()` so the flag stays in sync.
//
// See also: `entity.rs` for the registry that gives `EntityId`s meaning,
// `pathfinding.rs` which searches this grid, `sim.rs` which owns the active
// `TileMap` as part of `SimState`.

use crate::entity::EntityId;
use crate::types::TileCoord;
use serde::{Deserialize, Serialize};

/// One cell of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub entity: EntityId,
    pub walkable: bool,
}

/// Dense 2D tile grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    /// Flat storage: index = x + y * width.
    tiles: Vec<Tile>,
    pub width: u32,
    pub height: u32,
}

impl TileMap {
    /// Create a map with every cell set to `fill`.
    pub fn filled(width: u32, height: u32, fill: Tile) -> Self {
        Self {
            tiles: vec![fill; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Wrap pre-built rows (row-major, `width * height` tiles). Returns
    /// `None` if the tile count does not match the dimensions.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Option<Self> {
        (tiles.len() == width as usize * height as usize).then_some(Self {
            tiles,
            width,
            height,
        })
    }

    pub fn in_bounds(&self, coord: TileCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }

    /// Convert a coordinate to a flat index. Returns `None` if out of bounds.
    pub fn index(&self, coord: TileCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| coord.x as usize + coord.y as usize * self.width as usize)
    }

    /// Inverse of `index()`. The caller guarantees `index < self.len()`.
    pub fn coord_of(&self, index: usize) -> TileCoord {
        let width = self.width as usize;
        TileCoord::new((index % width) as i32, (index / width) as i32)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, coord: TileCoord) -> Option<Tile> {
        self.index(coord).map(|i| self.tiles[i])
    }

    /// Write a tile. No-op for out-of-bounds coordinates.
    pub fn set(&mut self, coord: TileCoord, tile: Tile) {
        if let Some(i) = self.index(coord) {
            self.tiles[i] = tile;
        }
    }

    pub fn entity_at(&self, coord: TileCoord) -> Option<EntityId> {
        self.get(coord).map(|tile| tile.entity)
    }

    /// `false` for out-of-bounds coordinates.
    pub fn is_walkable(&self, coord: TileCoord) -> bool {
        self.get(coord).is_some_and(|tile| tile.walkable)
    }

    /// Returns `true` if any of the 8 surrounding cells holds `entity`.
    pub fn has_surrounding_entity(&self, coord: TileCoord, entity: EntityId) -> bool {
        coord
            .surrounding()
            .iter()
            .any(|&n| self.entity_at(n) == Some(entity))
    }

    /// Every coordinate in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.tiles.len()).map(|i| self.coord_of(i))
    }

    pub fn count_entity(&self, entity: EntityId) -> usize {
        self.tiles.iter().filter(|t| t.entity == entity).count()
    }
}
