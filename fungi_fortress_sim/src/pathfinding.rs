// A* pathfinding over the tile grid.
//
// Standard A* using a `BinaryHeap` (min-heap via reversed ordering). Scores,
// came-from links and the closed set are `Vec`s indexed by the map's flat
// tile index for O(1) access and deterministic behavior (no `HashMap`).
//
// Movement is 4-directional with unit step cost and the heuristic is
// Manhattan distance to the goal, which is admissible. Two modes:
//
// - `PathMode::Exact` stops when the goal itself is popped. `start == goal`
//   yields an empty path.
// - `PathMode::Adjacent` stops at the first popped walkable cell at Manhattan
//   distance 1 from the goal. This is how dwarves approach things they cannot
//   stand on (walls, trees, water). If the start already qualifies the path
//   is `[start]`.
//
// Paths exclude the start cell and include the destination. There are no
// partial paths; callers re-invoke on failure.
//
// See also: `sim.rs` which calls this from the assignment loop, the movement
// update and the personal queue; `occupancy.rs` which re-plans after
// displacing a moving dwarf.
//
// **Critical constraint: determinism.** A* is a pure function of the map and
// the endpoints. Heap ties break on the flat tile index.

use crate::grid::TileMap;
use crate::types::TileCoord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// How the search decides it has arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMode {
    /// Arrive on the goal cell.
    Exact,
    /// Arrive on any walkable cell orthogonally next to the goal.
    Adjacent,
}

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    index: usize,
    f_score: u32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score == other.f_score && self.index == other.index
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score is "greatest".
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Find the shortest 4-directional path from `start` toward `goal`.
///
/// Returns `None` if `start` is out of bounds or unwalkable, or if no cell
/// satisfying `mode` is reachable.
pub fn find_path(
    map: &TileMap,
    start: TileCoord,
    goal: TileCoord,
    mode: PathMode,
) -> Option<Vec<TileCoord>> {
    if !map.is_walkable(start) {
        return None;
    }
    match mode {
        PathMode::Exact if start == goal => return Some(Vec::new()),
        PathMode::Adjacent if start.manhattan_distance(goal) == 1 => return Some(vec![start]),
        _ => {}
    }

    let start_index = map.index(start)?;
    let n = map.len();
    let mut g_score = vec![u32::MAX; n];
    let mut came_from: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];

    g_score[start_index] = 0;
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        index: start_index,
        f_score: start.manhattan_distance(goal),
    });

    while let Some(OpenEntry { index, .. }) = open.pop() {
        if closed[index] {
            continue;
        }
        let current = map.coord_of(index);
        let arrived = match mode {
            PathMode::Exact => current == goal,
            PathMode::Adjacent => current.manhattan_distance(goal) == 1,
        };
        if arrived {
            return Some(reconstruct(map, &came_from, index));
        }
        closed[index] = true;

        let tentative_g = g_score[index] + 1;
        for neighbor in current.cardinal_neighbors() {
            if !map.is_walkable(neighbor) {
                continue;
            }
            let Some(ni) = map.index(neighbor) else {
                continue;
            };
            if closed[ni] || tentative_g >= g_score[ni] {
                continue;
            }
            g_score[ni] = tentative_g;
            came_from[ni] = Some(index);
            open.push(OpenEntry {
                index: ni,
                f_score: tentative_g + neighbor.manhattan_distance(goal),
            });
        }
    }

    None
}

/// Walk came-from links back to the start. The start cell (the one with no
/// predecessor) is excluded.
fn reconstruct(map: &TileMap, came_from: &[Option<usize>], end: usize) -> Vec<TileCoord> {
    let mut path = Vec::new();
    let mut current = end;
    while let Some(prev) = came_from[current] {
        path.push(map.coord_of(current));
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRegistry;

    /// Open grass field of the given size.
    fn field(width: u32, height: u32) -> (TileMap, EntityRegistry) {
        let registry = EntityRegistry::default();
        let grass = registry.tile("grass").unwrap();
        (TileMap::filled(width, height, grass), registry)
    }

    fn wall(map: &mut TileMap, registry: &EntityRegistry, cells: &[(i32, i32)]) {
        let stone = registry.tile("stone_wall").unwrap();
        for &(x, y) in cells {
            map.set(TileCoord::new(x, y), stone);
        }
    }

    fn is_connected(start: TileCoord, path: &[TileCoord]) -> bool {
        let mut prev = start;
        path.iter().all(|&c| {
            let ok = prev.manhattan_distance(c) == 1;
            prev = c;
            ok
        })
    }

    #[test]
    fn straight_corridor_exact_path() {
        let (map, _) = field(6, 1);
        let start = TileCoord::new(0, 0);
        let goal = TileCoord::new(5, 0);
        let path = find_path(&map, start, goal, PathMode::Exact).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&goal));
        assert!(!path.contains(&start));
        assert!(is_connected(start, &path));
    }

    #[test]
    fn exact_start_equals_goal_is_empty() {
        let (map, _) = field(3, 3);
        let c = TileCoord::new(1, 1);
        assert_eq!(find_path(&map, c, c, PathMode::Exact), Some(Vec::new()));
    }

    #[test]
    fn walled_off_goal_is_unreachable() {
        let (mut map, registry) = field(5, 5);
        wall(&mut map, &registry, &[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);
        let path = find_path(
            &map,
            TileCoord::new(0, 2),
            TileCoord::new(4, 2),
            PathMode::Exact,
        );
        assert_eq!(path, None);
    }

    #[test]
    fn unwalkable_or_out_of_bounds_start() {
        let (mut map, registry) = field(3, 3);
        wall(&mut map, &registry, &[(0, 0)]);
        let goal = TileCoord::new(2, 2);
        assert_eq!(find_path(&map, TileCoord::new(0, 0), goal, PathMode::Exact), None);
        assert_eq!(find_path(&map, TileCoord::new(-1, 0), goal, PathMode::Exact), None);
        assert_eq!(find_path(&map, TileCoord::new(3, 0), goal, PathMode::Adjacent), None);
    }

    #[test]
    fn exact_path_routes_around_walls() {
        let (mut map, registry) = field(5, 5);
        wall(&mut map, &registry, &[(2, 0), (2, 1), (2, 2), (2, 3)]);
        let start = TileCoord::new(0, 0);
        let goal = TileCoord::new(4, 0);
        let path = find_path(&map, start, goal, PathMode::Exact).unwrap();
        // Down to row 4, across, back up.
        assert_eq!(path.len(), 12);
        assert!(is_connected(start, &path));
        assert!(path.iter().all(|&c| map.is_walkable(c)));
    }

    #[test]
    fn adjacent_single_open_neighbor() {
        let (mut map, registry) = field(5, 5);
        // Goal (2, 2) is a tree boxed in on three sides.
        wall(&mut map, &registry, &[(2, 2), (1, 2), (3, 2), (2, 3)]);
        let goal = TileCoord::new(2, 2);
        let start = TileCoord::new(0, 4);
        let path = find_path(&map, start, goal, PathMode::Adjacent).unwrap();
        assert_eq!(path.last(), Some(&TileCoord::new(2, 1)));
        assert!(is_connected(start, &path));
    }

    #[test]
    fn adjacent_no_open_neighbor_is_unreachable() {
        let (mut map, registry) = field(5, 5);
        wall(&mut map, &registry, &[(2, 2), (1, 2), (3, 2), (2, 3), (2, 1)]);
        let path = find_path(
            &map,
            TileCoord::new(0, 0),
            TileCoord::new(2, 2),
            PathMode::Adjacent,
        );
        assert_eq!(path, None);
    }

    #[test]
    fn adjacent_start_already_qualifies() {
        let (mut map, registry) = field(3, 3);
        wall(&mut map, &registry, &[(1, 1)]);
        let start = TileCoord::new(1, 0);
        assert_eq!(
            find_path(&map, start, TileCoord::new(1, 1), PathMode::Adjacent),
            Some(vec![start])
        );
    }

    #[test]
    fn adjacent_diagonal_start_takes_one_step() {
        let (mut map, registry) = field(3, 3);
        wall(&mut map, &registry, &[(1, 1)]);
        let path = find_path(
            &map,
            TileCoord::new(0, 0),
            TileCoord::new(1, 1),
            PathMode::Adjacent,
        )
        .unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].manhattan_distance(TileCoord::new(1, 1)), 1);
    }

    #[test]
    fn search_is_deterministic() {
        let (map, _) = field(8, 8);
        let a = find_path(&map, TileCoord::new(0, 0), TileCoord::new(7, 7), PathMode::Exact);
        let b = find_path(&map, TileCoord::new(0, 0), TileCoord::new(7, 7), PathMode::Exact);
        assert_eq!(a, b);
        assert_eq!(a.unwrap().len(), 14);
    }
}
