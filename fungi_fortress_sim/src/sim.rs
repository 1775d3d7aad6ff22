// Core simulation state and tick loop.
//
// `SimState` is the single source of truth for one running fortress. It owns
// the active tile map, the task manager, every dwarf, animal and character,
// the colony inventory and spore exposure, the seeded PRNG and the game
// config. Collaborators outside the core (level generation, the mycelial
// network, dialogue) are reached only through the `WorldHooks` passed into
// `tick()`.
//
// ## Tick order
//
// Each call to `tick()` runs these passes synchronously, in order:
//
//   1. **Animal wander.** On the surface (`depth == 0`) each live animal
//      steps to a random free cardinal neighbour with probability
//      `animal_move_chance`.
//   2. **Occupancy resolution** (`occupancy.rs`). Stacked actors are spread
//      onto free neighbouring cells.
//   3. **Assignment** (`assign_pending_tasks`). Pending tasks are matched to
//      idle dwarves in FIFO order.
//   4. **Agent update** (`update_agents`). Each dwarf advances one step along
//      its path or one tick of work; finished work runs the completion
//      handler (`actions.rs`). A dwarf left idle starts the head of its
//      personal queue.
//
// ## Assignment
//
// For each pending task, oldest first, the loop looks for the first dwarf
// (population order) that is idle and holds no task, and asks A* for an
// exact path from that dwarf to the task's anchor. If no path exists it tries
// the next idle dwarf. The first dwarf with a path takes the task (even when
// the path is empty because it is already standing on the anchor) and
// becomes `Moving`; it is no longer idle, so it cannot take a second task in
// the same pass. A task no dwarf can reach stays pending, untouched.
//
// ## Movement and abandonment
//
// A moving dwarf checks the next cell of its path. If the cell is still
// walkable it steps onto it, and if that empties the path it arrives in the
// same tick. If the cell has become unwalkable (someone built on it) the
// dwarf re-plans from where it stands, spending the tick. If re-planning
// fails the task is abandoned: its `unreachable_ticks` counter goes up and
// it goes back to the end of the task manager's queue, unless it has used up
// `max_unreachable_attempts` or the queue is full, in which case it expires.
//
// ## Personal queues
//
// `push_personal_task()` hands a task straight to one dwarf. Personal tasks
// never pass through the task manager and are never designated. Whenever a
// dwarf ends its update idle, it pops the head of its queue and starts
// moving toward it; a queued task whose anchor is unreachable is dropped.
//
// See also: `task.rs` for the task manager, `agent.rs` for the dwarf FSM
// states, `actions.rs` for durations and completion handlers,
// `occupancy.rs` for the de-stacking pass, `pathfinding.rs` for A*.
//
// **Critical constraint: determinism.** All randomness comes from the
// seeded `SmallRng` owned here. Every collection that is iterated is a `Vec`
// in population order or a `BTreeMap`/`BTreeSet`.

use crate::actions;
use crate::agent::{AgentState, Animal, Character, Dwarf};
use crate::config::GameConfig;
use crate::event::{MessageLog, SimEvent, SimEventKind};
use crate::grid::TileMap;
use crate::hooks::WorldHooks;
use crate::inventory::Inventory;
use crate::pathfinding::{PathMode, find_path};
use crate::task::{Task, TaskKind, TaskManager};
use crate::types::{AgentId, AnimalId, CARDINAL_OFFSETS, CharacterId, TileCoord};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why `SimState::designate()` refused to create a task.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DesignateError {
    #[error("tile {0} is outside the map")]
    OutOfBounds(TileCoord),
    #[error("tile {0} is already designated")]
    AlreadyDesignated(TileCoord),
    #[error("tile {0} cannot be stood on")]
    NotWalkable(TileCoord),
    #[error("build tasks need a structure name")]
    MissingBuilding,
    #[error("no dwarf is available to plan a route")]
    NoDwarves,
    #[error("no reachable tile next to {0}")]
    Unreachable(TileCoord),
    #[error("the task queue is full")]
    QueueFull,
}

/// The result of advancing the simulation by one tick.
#[derive(Clone, Debug, Default)]
pub struct StepResult {
    /// Narrative events emitted during this tick, for the UI / event log.
    pub events: Vec<SimEvent>,
}

/// Display view of one dwarf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: TileCoord,
    pub state: AgentState,
    pub task: Option<TaskKind>,
    pub task_anchor: Option<TileCoord>,
    pub path: Vec<TileCoord>,
    pub queued_tasks: usize,
    pub action_progress: u32,
    /// Ticks the current working state needs; 0 when not working.
    pub action_duration: u32,
}

#[derive(Clone, Debug)]
pub struct SimState {
    /// Number of completed ticks.
    pub tick: u64,
    pub config: GameConfig,
    pub map: TileMap,
    /// 0 on the surface, nonzero below it.
    pub depth: i32,
    pub task_manager: TaskManager,
    pub dwarves: Vec<Dwarf>,
    pub animals: Vec<Animal>,
    pub characters: Vec<Character>,
    pub inventory: Inventory,
    pub spore_exposure: u32,
    pub message_log: MessageLog,
    pub(crate) rng: SmallRng,
    next_agent_id: u32,
    next_animal_id: u32,
    next_character_id: u32,
}

impl SimState {
    /// Create a simulation on `map` with the default config.
    pub fn new(seed: u64, map: TileMap) -> Self {
        Self::with_config(seed, GameConfig::default(), map)
    }

    pub fn with_config(seed: u64, config: GameConfig, map: TileMap) -> Self {
        let inventory = Inventory::new(
            config.starting_resources.clone(),
            config.starting_special_items.clone(),
        );
        Self {
            tick: 0,
            task_manager: TaskManager::new(config.task_capacity),
            message_log: MessageLog::new(config.message_log_capacity),
            spore_exposure: config.starting_spore_exposure,
            map,
            depth: 0,
            dwarves: Vec::new(),
            animals: Vec::new(),
            characters: Vec::new(),
            inventory,
            rng: SmallRng::seed_from_u64(seed),
            next_agent_id: 0,
            next_animal_id: 0,
            next_character_id: 0,
            config,
        }
    }

    pub(crate) fn emit(&self, events: &mut Vec<SimEvent>, kind: SimEventKind) {
        events.push(SimEvent {
            tick: self.tick,
            kind,
        });
    }

    // -----------------------------------------------------------------------
    // Population
    // -----------------------------------------------------------------------

    /// Add a dwarf at `position`. Returns `None` if the colony is at
    /// `max_dwarves` or the tile cannot be stood on.
    pub fn spawn_dwarf(&mut self, position: TileCoord) -> Option<AgentId> {
        if self.dwarves.len() >= self.config.max_dwarves {
            warn!(max = self.config.max_dwarves, "dwarf_limit_reached");
            return None;
        }
        if !self.map.is_walkable(position) {
            warn!(at = %position, "dwarf_spawn_unwalkable");
            return None;
        }
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        let mining_skill = self.rng.gen_range(1..=3);
        self.dwarves.push(Dwarf::new(id, position, mining_skill));
        debug!(agent = %id, at = %position, mining_skill, "dwarf_spawned");
        Some(id)
    }

    pub fn spawn_animal(&mut self, position: TileCoord) -> AnimalId {
        let id = AnimalId(self.next_animal_id);
        self.next_animal_id += 1;
        self.animals.push(Animal {
            id,
            position,
            alive: true,
            food_yield: self.config.animal_food_yield,
        });
        id
    }

    pub fn spawn_character(&mut self, name: impl Into<String>, position: TileCoord) -> CharacterId {
        let id = CharacterId(self.next_character_id);
        self.next_character_id += 1;
        self.characters.push(Character {
            id,
            name: name.into(),
            position,
            health: self.config.character_health,
            alive: true,
        });
        id
    }

    pub fn dwarf(&self, id: AgentId) -> Option<&Dwarf> {
        self.dwarves.iter().find(|d| d.id == id)
    }

    /// `true` if any live actor stands on `coord`.
    pub fn is_occupied(&self, coord: TileCoord) -> bool {
        self.dwarves.iter().any(|d| d.position == coord)
            || self.animals.iter().any(|a| a.alive && a.position == coord)
            || self.characters.iter().any(|c| c.alive && c.position == coord)
    }

    // -----------------------------------------------------------------------
    // Task submission
    // -----------------------------------------------------------------------

    /// Queue a task for any dwarf. Returns `false` if the queue is full.
    pub fn submit(&mut self, task: Task) -> bool {
        let kind = task.kind;
        let accepted = self.task_manager.add(task);
        if !accepted {
            warn!(kind = %kind, capacity = self.task_manager.capacity(), "task_queue_full");
        }
        accepted
    }

    /// Build and queue a task aimed at `target`, choosing where the dwarf
    /// will stand.
    ///
    /// `Move` and `Build` anchor on the target itself, which must be
    /// walkable. Every other kind anchors on the end of an adjacent-mode path
    /// from the first dwarf, i.e. the closest reachable cell next to the
    /// target.
    pub fn designate(
        &mut self,
        kind: TaskKind,
        target: TileCoord,
        building: Option<String>,
    ) -> Result<Task, DesignateError> {
        if !self.map.in_bounds(target) {
            return Err(DesignateError::OutOfBounds(target));
        }
        if kind != TaskKind::Move && self.task_manager.is_designated(target) {
            return Err(DesignateError::AlreadyDesignated(target));
        }
        if self.task_manager.is_full() {
            return Err(DesignateError::QueueFull);
        }

        let task = match kind {
            TaskKind::Move => {
                if !self.map.is_walkable(target) {
                    return Err(DesignateError::NotWalkable(target));
                }
                Task::new(target, kind)
            }
            TaskKind::Build => {
                let building = building.ok_or(DesignateError::MissingBuilding)?;
                if !self.map.is_walkable(target) {
                    return Err(DesignateError::NotWalkable(target));
                }
                Task::build(target, building)
            }
            _ => {
                let origin = self
                    .dwarves
                    .first()
                    .ok_or(DesignateError::NoDwarves)?
                    .position;
                let path = find_path(&self.map, origin, target, PathMode::Adjacent)
                    .ok_or(DesignateError::Unreachable(target))?;
                let anchor = path.last().copied().unwrap_or(origin);
                Task::with_target(anchor, kind, target)
            }
        };

        if !self.submit(task.clone()) {
            return Err(DesignateError::QueueFull);
        }
        info!(kind = %kind, target = %target, anchor = %task.anchor, "task_designated");
        Ok(task)
    }

    /// Give `task` directly to one dwarf, bypassing the task manager.
    /// Returns `false` if no such dwarf exists.
    pub fn push_personal_task(&mut self, agent: AgentId, task: Task) -> bool {
        match self.dwarves.iter_mut().find(|d| d.id == agent) {
            Some(dwarf) => {
                dwarf.task_queue.push_back(task);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Level transitions
    // -----------------------------------------------------------------------

    /// Swap in the map for another level.
    ///
    /// Pending tasks are discarded and every dwarf drops its task, path and
    /// personal queue. Animals and characters belong to the old map and are
    /// removed; the caller spawns the new level's population and places the
    /// dwarves.
    pub fn change_level(&mut self, map: TileMap, depth: i32) {
        info!(from = self.depth, to = depth, "level_changed");
        self.map = map;
        self.depth = depth;
        self.task_manager.clear();
        for dwarf in &mut self.dwarves {
            dwarf.finish();
            dwarf.task_queue.clear();
        }
        self.animals.clear();
        self.characters.clear();
        self.message_log.push(SimEvent {
            tick: self.tick,
            kind: SimEventKind::LevelChanged { depth },
        });
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    pub fn agent_snapshots(&self) -> Vec<AgentSnapshot> {
        self.dwarves
            .iter()
            .map(|d| AgentSnapshot {
                id: d.id,
                position: d.position,
                state: d.state,
                task: d.task_kind(),
                task_anchor: d.task.as_ref().map(|t| t.anchor),
                path: d.path.iter().copied().collect(),
                queued_tasks: d.task_queue.len(),
                action_progress: d.action_progress,
                action_duration: match &d.task {
                    Some(task) if d.state.is_working() => {
                        actions::action_duration(task, &self.config)
                    }
                    _ => 0,
                },
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn tick(&mut self, hooks: &mut dyn WorldHooks) -> StepResult {
        self.tick += 1;
        let mut events = Vec::new();

        self.wander_animals();
        self.resolve_occupancy(&mut events);
        self.assign_pending_tasks(&mut events);
        self.update_agents(hooks, &mut events);

        self.message_log.extend(events.iter().cloned());
        StepResult { events }
    }

    /// Run `ticks` ticks, collecting every event.
    pub fn advance(&mut self, ticks: u64, hooks: &mut dyn WorldHooks) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(self.tick(hooks).events);
        }
        events
    }

    fn wander_animals(&mut self) {
        if self.depth != 0 {
            return;
        }
        let chance = self.config.animal_move_chance.clamp(0.0, 1.0);
        for index in 0..self.animals.len() {
            if !self.animals[index].alive || !self.rng.gen_bool(chance) {
                continue;
            }
            let (dx, dy) = CARDINAL_OFFSETS[self.rng.gen_range(0..CARDINAL_OFFSETS.len())];
            let dest = self.animals[index].position.offset(dx, dy);
            if self.map.is_walkable(dest) && !self.is_occupied(dest) {
                self.animals[index].position = dest;
            }
        }
    }

    /// Match pending tasks to idle dwarves, oldest task first.
    pub fn assign_pending_tasks(&mut self, events: &mut Vec<SimEvent>) {
        let mut index = 0;
        while let Some(task) = self.task_manager.get(index) {
            if !self.dwarves.iter().any(Dwarf::is_available) {
                break;
            }
            let anchor = task.anchor;
            let claim = self
                .dwarves
                .iter()
                .enumerate()
                .filter(|(_, d)| d.is_available())
                .find_map(|(i, d)| {
                    find_path(&self.map, d.position, anchor, PathMode::Exact).map(|path| (i, path))
                });

            let Some((dwarf_index, path)) = claim else {
                index += 1;
                continue;
            };
            let Some(task) = self.task_manager.take(index) else {
                break;
            };
            let dwarf = &mut self.dwarves[dwarf_index];
            let (agent, kind) = (dwarf.id, task.kind);
            debug!(agent = %agent, kind = %kind, anchor = %anchor, steps = path.len(), "task_assigned");
            dwarf.begin(task, path);
            self.emit(events, SimEventKind::TaskAssigned {
                agent,
                kind,
                anchor,
            });
        }
    }

    /// Advance every dwarf by one tick of movement or work.
    pub fn update_agents(&mut self, hooks: &mut dyn WorldHooks, events: &mut Vec<SimEvent>) {
        for index in 0..self.dwarves.len() {
            match self.dwarves[index].state {
                AgentState::Idle => {}
                AgentState::Moving => self.advance_movement(index, hooks, events),
                _ => self.advance_work(index, hooks, events),
            }
            if self.dwarves[index].is_available() {
                self.start_personal_task(index, events);
            }
        }
    }

    fn advance_movement(
        &mut self,
        index: usize,
        hooks: &mut dyn WorldHooks,
        events: &mut Vec<SimEvent>,
    ) {
        let dwarf = &mut self.dwarves[index];
        if let Some(&next) = dwarf.path.front() {
            if !self.map.is_walkable(next) {
                self.replan(index, events);
                return;
            }
            dwarf.path.pop_front();
            dwarf.position = next;
        }
        if self.dwarves[index].path.is_empty() {
            self.arrive(index, hooks, events);
        }
    }

    fn replan(&mut self, index: usize, events: &mut Vec<SimEvent>) {
        let dwarf = &mut self.dwarves[index];
        let Some(anchor) = dwarf.task.as_ref().map(|t| t.anchor) else {
            dwarf.finish();
            return;
        };
        match find_path(&self.map, dwarf.position, anchor, PathMode::Exact) {
            Some(path) => {
                debug!(agent = %dwarf.id, steps = path.len(), "path_replanned");
                dwarf.path = path.into();
            }
            None => {
                let agent = dwarf.id;
                if let Some(task) = dwarf.finish() {
                    self.abandon(agent, task, events);
                }
            }
        }
    }

    /// Put an unreachable task back in the queue, or expire it.
    pub(crate) fn abandon(&mut self, agent: AgentId, mut task: Task, events: &mut Vec<SimEvent>) {
        task.unreachable_ticks += 1;
        let requeued = task.unreachable_ticks < self.config.max_unreachable_attempts
            && self.task_manager.add(task.clone());
        warn!(
            agent = %agent,
            kind = %task.kind,
            anchor = %task.anchor,
            attempts = task.unreachable_ticks,
            requeued,
            "task_abandoned"
        );
        self.emit(events, SimEventKind::TaskAbandoned {
            agent,
            task: task.clone(),
            requeued,
        });
        if !requeued {
            self.emit(events, SimEventKind::TaskExpired { task });
        }
    }

    fn arrive(&mut self, index: usize, hooks: &mut dyn WorldHooks, events: &mut Vec<SimEvent>) {
        let dwarf = &mut self.dwarves[index];
        let agent = dwarf.id;
        let Some(kind) = dwarf.task_kind() else {
            dwarf.finish();
            return;
        };
        match actions::working_state(kind) {
            Some(state) => {
                dwarf.state = state;
                dwarf.action_progress = 0;
                self.emit(events, SimEventKind::ActionStarted { agent, state });
            }
            None => {
                let Some(task) = dwarf.finish() else {
                    return;
                };
                if self.complete_task(agent, &task, hooks, events) {
                    self.emit(events, SimEventKind::TaskCompleted {
                        agent,
                        kind,
                        anchor: task.anchor,
                    });
                }
            }
        }
    }

    fn advance_work(&mut self, index: usize, hooks: &mut dyn WorldHooks, events: &mut Vec<SimEvent>) {
        let dwarf = &mut self.dwarves[index];
        dwarf.action_progress += 1;
        let Some(task) = dwarf.task.as_ref() else {
            dwarf.finish();
            return;
        };
        if dwarf.action_progress < actions::action_duration(task, &self.config) {
            return;
        }
        let agent = dwarf.id;
        let Some(task) = dwarf.finish() else {
            return;
        };
        if self.complete_task(agent, &task, hooks, events) {
            self.emit(events, SimEventKind::TaskCompleted {
                agent,
                kind: task.kind,
                anchor: task.anchor,
            });
        }
    }

    fn start_personal_task(&mut self, index: usize, events: &mut Vec<SimEvent>) {
        let dwarf = &mut self.dwarves[index];
        let Some(task) = dwarf.task_queue.pop_front() else {
            return;
        };
        let agent = dwarf.id;
        match find_path(&self.map, dwarf.position, task.anchor, PathMode::Exact) {
            Some(path) => {
                let kind = task.kind;
                dwarf.begin(task, path);
                self.emit(events, SimEventKind::QueuedTaskStarted { agent, kind });
            }
            None => {
                debug!(agent = %agent, kind = %task.kind, anchor = %task.anchor, "queued_task_dropped");
                self.emit(events, SimEventKind::QueuedTaskDropped { agent, task });
            }
        }
    }
}
