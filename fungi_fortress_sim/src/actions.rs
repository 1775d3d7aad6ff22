// Per-kind action table and completion handlers.
//
// Each `TaskKind` maps to at most one working state and a duration. `Move`
// and `Talk` have no working state: they resolve the moment the dwarf
// arrives. Every other kind puts the dwarf into its working state, counts
// `action_progress` up to the duration, then runs the kind's handler here.
// Both mappings are exhaustive matches, so adding a kind without a handler
// does not compile.
//
// Handlers are two-phase. The validation phase resolves the target, looks up
// definitions and checks costs without touching state; any failure emits
// `ActionFailed` and returns. Only then does the commit phase spend
// inventory, rewrite tiles and call hooks. Whatever a handler returns, the
// caller has already put the dwarf back to idle.
//
// See also: `sim.rs` for the FSM that calls into this module, `config.rs`
// for durations and costs, `hooks.rs` for the external procedures invoked
// on entering, illumination and conversation.

use crate::agent::AgentState;
use crate::config::GameConfig;
use crate::entity::EntityClass;
use crate::event::{FailureReason, SimEvent, SimEventKind};
use crate::hooks::WorldHooks;
use crate::sim::SimState;
use crate::task::{Task, TaskKind};
use crate::types::{AgentId, TileCoord};
use rand::Rng;
use tracing::{debug, info};

/// Working state entered on arrival, or `None` for kinds that resolve on
/// arrival.
pub fn working_state(kind: TaskKind) -> Option<AgentState> {
    match kind {
        TaskKind::Move | TaskKind::Talk => None,
        TaskKind::Mine => Some(AgentState::Mining),
        TaskKind::Chop => Some(AgentState::Chopping),
        TaskKind::Build => Some(AgentState::Building),
        TaskKind::Fish => Some(AgentState::Fishing),
        TaskKind::Fight => Some(AgentState::Fighting),
        TaskKind::Enter => Some(AgentState::Entering),
        TaskKind::BuildBridge => Some(AgentState::BuildingBridge),
    }
}

/// Ticks of work before `task` completes.
pub fn action_duration(task: &Task, config: &GameConfig) -> u32 {
    let durations = &config.durations;
    match task.kind {
        TaskKind::Move | TaskKind::Talk => 0,
        TaskKind::Mine | TaskKind::BuildBridge => durations.base_mining_ticks,
        TaskKind::Chop => durations.chopping_ticks,
        TaskKind::Build => config.building_ticks(task.building.as_deref()),
        TaskKind::Fish => durations.fishing_ticks,
        TaskKind::Fight => durations.fighting_ticks,
        TaskKind::Enter => durations.entering_ticks,
    }
}

impl SimState {
    /// Run the completion handler for `task`. Returns `true` if it took
    /// effect.
    pub(crate) fn complete_task(
        &mut self,
        agent: AgentId,
        task: &Task,
        hooks: &mut dyn WorldHooks,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        match task.kind {
            TaskKind::Mine => self.complete_harvest(agent, task, false, hooks, events),
            TaskKind::Chop => self.complete_harvest(agent, task, true, hooks, events),
            TaskKind::Build => self.complete_build(agent, task, events),
            TaskKind::Fish => self.complete_fish(agent, events),
            TaskKind::Fight => self.complete_fight(agent, task, events),
            TaskKind::Enter => self.complete_enter(agent, task, hooks, events),
            TaskKind::BuildBridge => self.complete_bridge(agent, task, events),
            TaskKind::Talk => self.converse(agent, task, hooks, events),
            TaskKind::Move => true,
        }
    }

    fn fail(
        &self,
        agent: AgentId,
        kind: TaskKind,
        reason: FailureReason,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        debug!(agent = %agent, kind = %kind, reason = ?reason, "action_failed");
        self.emit(events, SimEventKind::ActionFailed {
            agent,
            kind,
            reason,
        });
        false
    }

    /// The target tile, if the task has one on the map.
    fn target_in_bounds(&self, task: &Task) -> Option<TileCoord> {
        task.target.filter(|&t| self.map.in_bounds(t))
    }

    fn entity_key_at(&self, coord: TileCoord) -> String {
        self.map
            .entity_at(coord)
            .and_then(|id| self.config.entities.get(id))
            .map(|def| def.key.clone())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Mine / chop
    // -----------------------------------------------------------------------

    fn complete_harvest(
        &mut self,
        agent: AgentId,
        task: &Task,
        wood_only: bool,
        hooks: &mut dyn WorldHooks,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        let Some(target) = self.target_in_bounds(task) else {
            return self.fail(agent, task.kind, FailureReason::MissingTarget, events);
        };
        let Some(def) = self
            .map
            .entity_at(target)
            .and_then(|id| self.config.entities.get(id))
        else {
            return self.fail(agent, task.kind, FailureReason::MissingTarget, events);
        };
        let EntityClass::Resource {
            resource,
            yield_amount,
            spore_yield,
            magic,
        } = &def.class
        else {
            let found = def.key.clone();
            return self.fail(agent, task.kind, FailureReason::NotAResource { found }, events);
        };
        if wood_only && resource != "wood" {
            let found = def.key.clone();
            return self.fail(agent, task.kind, FailureReason::NotWood { found }, events);
        }
        let floor_key = self.config.floor_for_depth(self.depth);
        let Some(floor) = self.config.entities.tile(floor_key) else {
            let key = floor_key.to_string();
            return self.fail(agent, task.kind, FailureReason::MissingEntity { key }, events);
        };
        let (resource, amount, spore_yield, magic) =
            (resource.clone(), *yield_amount, *spore_yield, *magic);

        self.inventory.add(&resource, amount);
        self.map.set(target, floor);
        info!(agent = %agent, resource = %resource, amount, at = %target, "resource_harvested");
        self.emit(events, SimEventKind::ResourceHarvested {
            agent,
            resource,
            amount,
            at: target,
        });

        if spore_yield > 0 {
            self.expose_to_spores(spore_yield, events);
        }
        if magic {
            if self.spore_exposure >= self.config.spore_exposure_threshold {
                hooks.illuminate_network(task.anchor);
                self.emit(events, SimEventKind::NetworkIlluminated { from: task.anchor });
            } else {
                debug!(
                    exposure = self.spore_exposure,
                    threshold = self.config.spore_exposure_threshold,
                    "illumination_below_threshold"
                );
            }
        }
        true
    }

    /// Raise colony spore exposure by `intensity`, then let mycelium creep
    /// over bare floor. Each grass or stone-floor tile converts with chance
    /// `spore_spread_chance * intensity`, multiplied when a surrounding tile
    /// is already mycelium. The scan is row-major and in place, so a tile
    /// converted early boosts its later neighbours.
    pub(crate) fn expose_to_spores(&mut self, intensity: u32, events: &mut Vec<SimEvent>) {
        self.spore_exposure = self.spore_exposure.saturating_add(intensity);
        self.emit(events, SimEventKind::SporeExposure {
            gained: intensity,
            total: self.spore_exposure,
        });

        let registry = &self.config.entities;
        let (Some(mycelium), Some(surface), Some(underground)) = (
            registry.tile(&self.config.mycelium_floor),
            registry.id(&self.config.surface_floor),
            registry.id(&self.config.underground_floor),
        ) else {
            debug!("spore_spread_skipped_missing_floor");
            return;
        };
        let base = (self.config.spore_spread_chance * f64::from(intensity)).clamp(0.0, 1.0);
        let boosted = (base * self.config.spore_spread_adjacency_multiplier).clamp(0.0, 1.0);

        let mut converted = 0;
        for index in 0..self.map.len() {
            let coord = self.map.coord_of(index);
            let Some(entity) = self.map.entity_at(coord) else {
                continue;
            };
            if entity != surface && entity != underground {
                continue;
            }
            let chance = if self.map.has_surrounding_entity(coord, mycelium.entity) {
                boosted
            } else {
                base
            };
            if self.rng.gen_bool(chance) {
                self.map.set(coord, mycelium);
                converted += 1;
            }
        }
        if converted > 0 {
            debug!(tiles = converted, "spores_spread");
            self.emit(events, SimEventKind::SporesSpread { tiles: converted });
        }
    }

    // -----------------------------------------------------------------------
    // Build / bridge
    // -----------------------------------------------------------------------

    fn complete_build(&mut self, agent: AgentId, task: &Task, events: &mut Vec<SimEvent>) -> bool {
        let Some(name) = task.building.as_deref() else {
            return self.fail(agent, task.kind, FailureReason::MissingBuilding, events);
        };
        let (Some(def), Some(tile)) = (
            self.config.buildings.get(name),
            self.config.entities.tile(name),
        ) else {
            let name = name.to_string();
            return self.fail(agent, task.kind, FailureReason::UnknownStructure { name }, events);
        };
        if !self.map.in_bounds(task.anchor) {
            return self.fail(agent, task.kind, FailureReason::MissingTarget, events);
        }
        let cost = def.cost.clone();
        if let Err(error) = self.inventory.spend(&cost) {
            debug!(agent = %agent, building = name, error = %error, "build_unaffordable");
            let missing = self.inventory.missing(&cost);
            return self.fail(agent, task.kind, FailureReason::Unaffordable { missing }, events);
        }

        self.map.set(task.anchor, tile);
        info!(agent = %agent, building = name, at = %task.anchor, "structure_built");
        self.emit(events, SimEventKind::StructureBuilt {
            agent,
            building: name.to_string(),
            at: task.anchor,
        });
        true
    }

    fn complete_bridge(&mut self, agent: AgentId, task: &Task, events: &mut Vec<SimEvent>) -> bool {
        let Some(target) = self.target_in_bounds(task) else {
            return self.fail(agent, task.kind, FailureReason::MissingTarget, events);
        };
        let water = self.config.entities.id(&self.config.water);
        if water.is_none() || self.map.entity_at(target) != water {
            let found = self.entity_key_at(target);
            return self.fail(agent, task.kind, FailureReason::NotWater { found }, events);
        }
        if task.anchor.manhattan_distance(target) != 1 {
            return self.fail(agent, task.kind, FailureReason::NotAdjacent, events);
        }
        let Some(bridge) = self.config.entities.tile(&self.config.bridge) else {
            let key = self.config.bridge.clone();
            return self.fail(agent, task.kind, FailureReason::MissingEntity { key }, events);
        };
        let cost = self.config.bridge_cost.clone();
        if self.inventory.spend(&cost).is_err() {
            let missing = self.inventory.missing(&cost);
            return self.fail(agent, task.kind, FailureReason::Unaffordable { missing }, events);
        }

        self.map.set(target, bridge);
        info!(agent = %agent, at = %target, "bridge_built");
        self.emit(events, SimEventKind::BridgeBuilt { agent, at: target });
        true
    }

    // -----------------------------------------------------------------------
    // Fish / fight
    // -----------------------------------------------------------------------

    fn complete_fish(&mut self, agent: AgentId, events: &mut Vec<SimEvent>) -> bool {
        let resource = self.config.food_resource.clone();
        let amount = self.config.fish_yield;
        self.inventory.add(&resource, amount);
        self.emit(events, SimEventKind::FishCaught {
            agent,
            resource,
            amount,
        });
        true
    }

    /// Damage the character on the target tile, or failing that hunt the
    /// animal there.
    fn complete_fight(&mut self, agent: AgentId, task: &Task, events: &mut Vec<SimEvent>) -> bool {
        let at = task.target.unwrap_or(task.anchor);
        let damage = self.config.fight_damage;

        if let Some(character) = self
            .characters
            .iter_mut()
            .find(|c| c.alive && c.position == at)
        {
            character.health -= damage;
            let kind = if character.health <= 0 {
                character.alive = false;
                info!(agent = %agent, character = %character.name, "character_defeated");
                SimEventKind::CharacterDefeated {
                    agent,
                    character: character.id,
                }
            } else {
                SimEventKind::CharacterDamaged {
                    agent,
                    character: character.id,
                    remaining_health: character.health,
                }
            };
            self.emit(events, kind);
            return true;
        }

        if let Some(animal) = self
            .animals
            .iter_mut()
            .find(|a| a.alive && a.position == at)
        {
            animal.alive = false;
            let (animal, food) = (animal.id, animal.food_yield);
            let resource = self.config.food_resource.clone();
            self.inventory.add(&resource, food);
            self.emit(events, SimEventKind::AnimalHunted {
                agent,
                animal,
                food,
            });
            return true;
        }

        self.fail(agent, task.kind, FailureReason::NoCombatant, events)
    }

    // -----------------------------------------------------------------------
    // Enter / talk
    // -----------------------------------------------------------------------

    fn complete_enter(
        &mut self,
        agent: AgentId,
        task: &Task,
        hooks: &mut dyn WorldHooks,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        let Some(target) = self.target_in_bounds(task) else {
            return self.fail(agent, task.kind, FailureReason::MissingTarget, events);
        };
        let is_sublevel = self
            .map
            .entity_at(target)
            .and_then(|id| self.config.entities.get(id))
            .is_some_and(|def| def.is_sublevel());
        let entrance = self.entity_key_at(target);
        if !is_sublevel {
            return self.fail(
                agent,
                task.kind,
                FailureReason::NotASublevel { found: entrance },
                events,
            );
        }

        info!(agent = %agent, entrance = %entrance, "sublevel_entered");
        hooks.enter_sublevel(agent, &entrance, target);
        self.emit(events, SimEventKind::SublevelEntered {
            agent,
            entrance,
            at: target,
        });
        true
    }

    /// Resolve a talk task on arrival: find the character on the target tile
    /// and hand it to the dialogue hook.
    pub(crate) fn converse(
        &mut self,
        agent: AgentId,
        task: &Task,
        hooks: &mut dyn WorldHooks,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        let at = task.target.unwrap_or(task.anchor);
        let Some(character) = self.characters.iter().find(|c| c.alive && c.position == at) else {
            return self.fail(agent, task.kind, FailureReason::NoCharacter, events);
        };
        let handled = hooks.talk(agent, character);
        if !handled {
            debug!(agent = %agent, character = %character.name, "talk_unhandled");
        }
        let character = character.id;
        self.emit(events, SimEventKind::Conversation {
            agent,
            character,
            handled,
        });
        true
    }
}
