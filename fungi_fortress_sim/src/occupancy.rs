// Occupancy resolution: one actor per tile.
//
// Dwarves walk precomputed paths without checking for each other, and
// animals wander freely, so actors regularly end a tick stacked on the same
// tile. At the start of each tick (before assignment) the resolver groups
// live actors by position and pushes all but the first occupant of each
// crowded tile onto the first free walkable cell in the fixed row-major scan
// of the 8 surrounding cells. Cells are claimed as they are handed out, so
// two displaced actors never land together. An actor with no free neighbour
// stays put and is retried next tick.
//
// Within a tile, dwarves come first (population order), then animals, then
// characters. Among dwarves only population order counts: a lower-id dwarf
// walking onto a busy work tile keeps it and the working dwarf is pushed
// aside. It carries on working from the new cell, since handlers act on the
// task's target rather than the dwarf's position.
//
// A displaced dwarf that is `Moving` re-plans from its new cell. Its old path
// starts next to the old cell, so it is never kept: if no new path exists
// the task is abandoned the same way a blocked step abandons it (re-queued,
// or expired after too many attempts).
//
// **Critical constraint: determinism.** Groups are collected into a
// `BTreeMap` keyed by coordinate. The claimed-cell set is only ever probed,
// never iterated, so a hash set is fine there.

use crate::agent::AgentState;
use crate::event::{ActorRef, SimEvent, SimEventKind};
use crate::pathfinding::{PathMode, find_path};
use crate::sim::SimState;
use crate::types::TileCoord;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::debug;

impl SimState {
    /// Spread stacked actors onto free neighbouring cells.
    pub fn resolve_occupancy(&mut self, events: &mut Vec<SimEvent>) {
        let mut groups: BTreeMap<TileCoord, SmallVec<[ActorRef; 4]>> = BTreeMap::new();
        for dwarf in &self.dwarves {
            groups
                .entry(dwarf.position)
                .or_default()
                .push(ActorRef::Dwarf(dwarf.id));
        }
        for animal in self.animals.iter().filter(|a| a.alive) {
            groups
                .entry(animal.position)
                .or_default()
                .push(ActorRef::Animal(animal.id));
        }
        for character in self.characters.iter().filter(|c| c.alive) {
            groups
                .entry(character.position)
                .or_default()
                .push(ActorRef::Character(character.id));
        }

        let mut claimed: FxHashSet<TileCoord> = groups.keys().copied().collect();
        for (&coord, occupants) in &groups {
            for &actor in occupants.iter().skip(1) {
                let free = coord
                    .surrounding()
                    .into_iter()
                    .find(|c| self.map.is_walkable(*c) && !claimed.contains(c));
                let Some(free) = free else {
                    debug!(actor = ?actor, at = %coord, "no_free_neighbor");
                    continue;
                };
                claimed.insert(free);
                self.emit(events, SimEventKind::ActorDisplaced {
                    actor,
                    from: coord,
                    to: free,
                });
                self.relocate(actor, free, events);
            }
        }
    }

    fn relocate(&mut self, actor: ActorRef, to: TileCoord, events: &mut Vec<SimEvent>) {
        match actor {
            ActorRef::Dwarf(id) => {
                let Some(dwarf) = self.dwarves.iter_mut().find(|d| d.id == id) else {
                    return;
                };
                dwarf.position = to;
                if dwarf.state != AgentState::Moving {
                    return;
                }
                let Some(anchor) = dwarf.task.as_ref().map(|t| t.anchor) else {
                    return;
                };
                match find_path(&self.map, to, anchor, PathMode::Exact) {
                    Some(path) => dwarf.path = path.into(),
                    None => {
                        debug!(agent = %id, at = %to, "displaced_dwarf_cannot_replan");
                        if let Some(task) = dwarf.finish() {
                            self.abandon(id, task, events);
                        }
                    }
                }
            }
            ActorRef::Animal(id) => {
                if let Some(animal) = self.animals.iter_mut().find(|a| a.id == id) {
                    animal.position = to;
                }
            }
            ActorRef::Character(id) => {
                if let Some(character) = self.characters.iter_mut().find(|c| c.id == id) {
                    character.position = to;
                }
            }
        }
    }
}
