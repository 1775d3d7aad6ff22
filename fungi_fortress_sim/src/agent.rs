// Dwarves and the other actors that share the map with them.
//
// A `Dwarf` is a finite-state machine: `Idle` until the assignment loop (or
// its personal queue) gives it a task, `Moving` along a precomputed path to
// the task's anchor, then one of the working states until
// `action_progress` reaches the kind's duration. Whatever the completion
// handler decides, the dwarf then drops the task and returns to `Idle`.
//
// Invariants kept by the helpers below:
// - a working state implies `task.is_some()`;
// - `Idle` implies an empty `path`.
//
// Animals and characters carry no tasks. They only matter to occupancy
// resolution and as targets of fight and talk tasks.
//
// See also: `sim.rs` for the per-tick FSM update, `actions.rs` for the
// per-kind working state and duration table.

use crate::task::{Task, TaskKind};
use crate::types::{AgentId, AnimalId, CharacterId, TileCoord};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    #[default]
    Idle,
    Moving,
    Mining,
    Chopping,
    Building,
    Fishing,
    Fighting,
    Entering,
    BuildingBridge,
}

impl AgentState {
    /// `true` for the states that accumulate `action_progress`.
    pub fn is_working(self) -> bool {
        !matches!(self, AgentState::Idle | AgentState::Moving)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dwarf {
    pub id: AgentId,
    pub position: TileCoord,
    pub state: AgentState,
    /// Remaining cells to walk, next step first.
    pub path: VecDeque<TileCoord>,
    pub task: Option<Task>,
    /// Tasks given directly to this dwarf, started whenever it goes idle.
    pub task_queue: VecDeque<Task>,
    pub action_progress: u32,
    /// Rolled at spawn; does not affect action timing.
    pub mining_skill: u8,
}

impl Dwarf {
    pub fn new(id: AgentId, position: TileCoord, mining_skill: u8) -> Self {
        Self {
            id,
            position,
            state: AgentState::Idle,
            path: VecDeque::new(),
            task: None,
            task_queue: VecDeque::new(),
            action_progress: 0,
            mining_skill,
        }
    }

    /// Idle and holding no task: eligible for assignment.
    pub fn is_available(&self) -> bool {
        self.state == AgentState::Idle && self.task.is_none()
    }

    /// Take ownership of `task` and start walking `path` toward its anchor.
    pub fn begin(&mut self, task: Task, path: Vec<TileCoord>) {
        self.task = Some(task);
        self.path = path.into();
        self.state = AgentState::Moving;
        self.action_progress = 0;
    }

    /// Return to `Idle`, handing back whatever task was held.
    pub fn finish(&mut self) -> Option<Task> {
        self.state = AgentState::Idle;
        self.path.clear();
        self.action_progress = 0;
        self.task.take()
    }

    pub fn task_kind(&self) -> Option<TaskKind> {
        self.task.as_ref().map(|t| t.kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub position: TileCoord,
    pub alive: bool,
    /// Food credited when hunted.
    pub food_yield: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub position: TileCoord,
    pub health: i32,
    pub alive: bool,
}
