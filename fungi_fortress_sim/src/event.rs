// Player-visible narrative events and the bounded message log.
//
// Every observable outcome of a tick (a task assigned, a wall mined, a build
// declined for lack of stone) is reported as a `SimEvent` in the tick's
// `StepResult`. The display layer renders them; tests assert on them. The
// most recent events are also kept in a bounded `MessageLog` owned by
// `SimState` for a scrolling debug panel.
//
// Developer diagnostics go through `tracing` instead; events are the
// player-facing channel.
//
// See also: `sim.rs` for the tick loop that collects events, `actions.rs`
// for the completion handlers that emit most of them.

use crate::agent::AgentState;
use crate::task::{Task, TaskKind};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of events retained by `MessageLog`.
pub const DEFAULT_MESSAGE_LOG_CAPACITY: usize = 32;

/// A narrative event emitted by the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: u64,
    pub kind: SimEventKind,
}

/// Any actor that can occupy a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorRef {
    Dwarf(AgentId),
    Animal(AnimalId),
    Character(CharacterId),
}

/// Why a completion handler declined to act.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The task has no target tile, or it lies off the map.
    MissingTarget,
    /// The target holds something that cannot be harvested.
    NotAResource { found: String },
    /// Chop tasks need a wood-yielding target.
    NotWood { found: String },
    MissingBuilding,
    UnknownStructure { name: String },
    Unaffordable { missing: Vec<(String, u32)> },
    NotWater { found: String },
    NotAdjacent,
    NotASublevel { found: String },
    NoCombatant,
    NoCharacter,
    /// A registry key named in the config does not exist.
    MissingEntity { key: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    /// A pending task was handed to a dwarf.
    TaskAssigned {
        agent: AgentId,
        kind: TaskKind,
        anchor: TileCoord,
    },
    /// A dwarf started the next task from its personal queue.
    QueuedTaskStarted { agent: AgentId, kind: TaskKind },
    /// A personal-queue task was discarded because its anchor is unreachable.
    QueuedTaskDropped { agent: AgentId, task: Task },
    /// A dwarf arrived and started working.
    ActionStarted { agent: AgentId, state: AgentState },
    /// A dwarf's path was blocked and could not be re-planned.
    TaskAbandoned {
        agent: AgentId,
        task: Task,
        requeued: bool,
    },
    /// An abandoned task ran out of attempts (or room) and was discarded.
    TaskExpired { task: Task },
    TaskCompleted {
        agent: AgentId,
        kind: TaskKind,
        anchor: TileCoord,
    },
    ActionFailed {
        agent: AgentId,
        kind: TaskKind,
        reason: FailureReason,
    },
    ResourceHarvested {
        agent: AgentId,
        resource: String,
        amount: u32,
        at: TileCoord,
    },
    SporeExposure { gained: u32, total: u32 },
    SporesSpread { tiles: u32 },
    NetworkIlluminated { from: TileCoord },
    StructureBuilt {
        agent: AgentId,
        building: String,
        at: TileCoord,
    },
    BridgeBuilt { agent: AgentId, at: TileCoord },
    FishCaught {
        agent: AgentId,
        resource: String,
        amount: u32,
    },
    CharacterDamaged {
        agent: AgentId,
        character: CharacterId,
        remaining_health: i32,
    },
    CharacterDefeated {
        agent: AgentId,
        character: CharacterId,
    },
    AnimalHunted {
        agent: AgentId,
        animal: AnimalId,
        food: u32,
    },
    SublevelEntered {
        agent: AgentId,
        entrance: String,
        at: TileCoord,
    },
    Conversation {
        agent: AgentId,
        character: CharacterId,
        handled: bool,
    },
    /// The occupancy resolver moved an actor off a crowded tile.
    ActorDisplaced {
        actor: ActorRef,
        from: TileCoord,
        to: TileCoord,
    },
    LevelChanged { depth: i32 },
}

/// The last `capacity` events, oldest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    entries: VecDeque<SimEvent>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_LOG_CAPACITY)
    }
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: SimEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn extend<I: IntoIterator<Item = SimEvent>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
