// Task records and the colony-wide pending task queue.
//
// A `Task` is an immutable intent: "stand on `anchor` and do `kind` to
// `target`". The interaction layer creates tasks and submits them to the
// `TaskManager`; the assignment loop in `sim.rs` pulls them in FIFO order and
// hands ownership to an idle dwarf. Dwarves also carry a personal queue of
// tasks that bypasses the manager entirely (see `agent.rs`).
//
// The manager keeps a derived `designated` set of every target coordinate
// referenced by a pending task, so the display layer can highlight
// designated tiles and the interaction layer can refuse double designation.
// The set is maintained incrementally on add/remove/take and always equals
// `{ t.target | t in pending, t.target is Some }`.
//
// Tasks have no identity beyond their value. `remove()` deletes the first
// pending task equal to the argument.
//
// See also: `sim.rs` for the assignment loop, `actions.rs` for what each
// `TaskKind` does on completion.

use crate::types::TileCoord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Default number of tasks the manager will hold.
pub const DEFAULT_TASK_CAPACITY: usize = 100;

/// What a task asks a dwarf to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    Move,
    Mine,
    Chop,
    Build,
    Fish,
    /// Fight a character, or hunt an animal if no character is present.
    Fight,
    Enter,
    BuildBridge,
    Talk,
}

impl TaskKind {
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Move => "move",
            TaskKind::Mine => "mine",
            TaskKind::Chop => "chop",
            TaskKind::Build => "build",
            TaskKind::Fish => "fish",
            TaskKind::Fight => "fight",
            TaskKind::Enter => "enter",
            TaskKind::BuildBridge => "build_bridge",
            TaskKind::Talk => "talk",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// The tile the dwarf stands on to act.
    pub anchor: TileCoord,
    pub kind: TaskKind,
    /// The tile acted on (resource, water, entrance, character), if any.
    pub target: Option<TileCoord>,
    /// Structure key, for build tasks.
    pub building: Option<String>,
    /// How many times a dwarf has given up on this task mid-route.
    pub unreachable_ticks: u32,
}

impl Task {
    pub fn new(anchor: TileCoord, kind: TaskKind) -> Self {
        Self {
            anchor,
            kind,
            target: None,
            building: None,
            unreachable_ticks: 0,
        }
    }

    pub fn with_target(anchor: TileCoord, kind: TaskKind, target: TileCoord) -> Self {
        Self {
            target: Some(target),
            ..Self::new(anchor, kind)
        }
    }

    /// A build task: the dwarf stands on `site` and the structure replaces it.
    pub fn build(site: TileCoord, building: impl Into<String>) -> Self {
        Self {
            target: Some(site),
            building: Some(building.into()),
            ..Self::new(site, TaskKind::Build)
        }
    }
}

/// Bounded FIFO of tasks waiting for a dwarf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskManager {
    pending: Vec<Task>,
    designated: BTreeSet<TileCoord>,
    capacity: usize,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_CAPACITY)
    }
}

impl TaskManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Vec::new(),
            designated: BTreeSet::new(),
            capacity,
        }
    }

    /// Append a task. Returns `false` (and stores nothing) at capacity.
    pub fn add(&mut self, task: Task) -> bool {
        if self.pending.len() >= self.capacity {
            return false;
        }
        if let Some(target) = task.target {
            self.designated.insert(target);
        }
        self.pending.push(task);
        true
    }

    /// Delete the first pending task equal to `task`. Returns whether one was
    /// found; removing an absent task is a no-op.
    pub fn remove(&mut self, task: &Task) -> bool {
        match self.pending.iter().position(|t| t == task) {
            Some(index) => self.take(index).is_some(),
            None => false,
        }
    }

    /// Dequeue the task at `index`, releasing its designation if no other
    /// pending task shares the target.
    pub fn take(&mut self, index: usize) -> Option<Task> {
        if index >= self.pending.len() {
            return None;
        }
        let task = self.pending.remove(index);
        if let Some(target) = task.target {
            self.release(target);
        }
        Some(task)
    }

    fn release(&mut self, target: TileCoord) {
        if !self.pending.iter().any(|t| t.target == Some(target)) {
            self.designated.remove(&target);
        }
    }

    /// Drop everything, e.g. on a level change.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.designated.clear();
    }

    pub fn is_designated(&self, coord: TileCoord) -> bool {
        self.designated.contains(&coord)
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.pending.get(index)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.pending.iter()
    }

    pub fn designated(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.designated.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mine(x: i32, y: i32) -> Task {
        Task::with_target(TileCoord::new(x, y - 1), TaskKind::Mine, TileCoord::new(x, y))
    }

    /// The designated set must always equal the targets of pending tasks.
    fn assert_designation_consistent(tm: &TaskManager) {
        let expected: BTreeSet<TileCoord> = tm.pending().filter_map(|t| t.target).collect();
        let actual: BTreeSet<TileCoord> = tm.designated().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn add_designates_target() {
        let mut tm = TaskManager::default();
        assert!(tm.add(mine(3, 3)));
        assert!(tm.add(Task::new(TileCoord::new(0, 0), TaskKind::Move)));
        assert!(tm.is_designated(TileCoord::new(3, 3)));
        assert!(!tm.is_designated(TileCoord::new(0, 0)));
        assert_eq!(tm.len(), 2);
        assert_designation_consistent(&tm);
    }

    #[test]
    fn capacity_two_rejects_third() {
        let mut tm = TaskManager::new(2);
        assert!(tm.add(mine(1, 1)));
        assert!(tm.add(mine(2, 2)));
        let before: Vec<Task> = tm.pending().cloned().collect();
        assert!(!tm.add(mine(3, 3)));
        assert_eq!(tm.len(), 2);
        assert_eq!(tm.pending().cloned().collect::<Vec<_>>(), before);
        assert!(!tm.is_designated(TileCoord::new(3, 3)));
        assert_designation_consistent(&tm);

        assert!(tm.remove(&mine(1, 1)));
        assert!(tm.add(mine(3, 3)));
        assert_designation_consistent(&tm);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut tm = TaskManager::default();
        tm.add(mine(1, 1));
        tm.add(mine(2, 2));
        assert!(tm.remove(&mine(1, 1)));
        assert!(!tm.remove(&mine(1, 1)));
        assert_eq!(tm.pending().cloned().collect::<Vec<_>>(), vec![mine(2, 2)]);
        assert_designation_consistent(&tm);
    }

    #[test]
    fn shared_target_stays_designated_until_last_removal() {
        let mut tm = TaskManager::default();
        let target = TileCoord::new(5, 5);
        let from_north = Task::with_target(TileCoord::new(5, 4), TaskKind::Mine, target);
        let from_west = Task::with_target(TileCoord::new(4, 5), TaskKind::Mine, target);
        tm.add(from_north.clone());
        tm.add(from_west.clone());

        tm.remove(&from_north);
        assert!(tm.is_designated(target));
        assert_designation_consistent(&tm);

        tm.remove(&from_west);
        assert!(!tm.is_designated(target));
        assert_designation_consistent(&tm);
    }

    #[test]
    fn add_then_remove_restores_designation() {
        let mut tm = TaskManager::default();
        tm.add(mine(1, 1));
        let before: BTreeSet<TileCoord> = tm.designated().collect();
        tm.add(mine(7, 7));
        tm.remove(&mine(7, 7));
        assert_eq!(tm.designated().collect::<BTreeSet<_>>(), before);
    }

    #[test]
    fn take_preserves_fifo_and_designation() {
        let mut tm = TaskManager::default();
        tm.add(mine(1, 1));
        tm.add(mine(2, 2));
        tm.add(mine(3, 3));
        assert_eq!(tm.take(1), Some(mine(2, 2)));
        assert_eq!(tm.take(5), None);
        assert_eq!(
            tm.pending().map(|t| t.target).collect::<Vec<_>>(),
            vec![Some(TileCoord::new(1, 1)), Some(TileCoord::new(3, 3))]
        );
        assert_designation_consistent(&tm);
    }

    #[test]
    fn clear_empties_both() {
        let mut tm = TaskManager::default();
        tm.add(mine(1, 1));
        tm.clear();
        assert!(tm.is_empty());
        assert_eq!(tm.designated().count(), 0);
    }

    #[test]
    fn build_task_targets_its_site() {
        let site = TileCoord::new(4, 4);
        let task = Task::build(site, "Mycelial Nexus");
        assert_eq!(task.anchor, site);
        assert_eq!(task.target, Some(site));
        assert_eq!(task.building.as_deref(), Some("Mycelial Nexus"));
        assert_eq!(task.kind.to_string(), "build");
    }
}
