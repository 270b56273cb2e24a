use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info, trace, warn};

use crate::task::Task;

/// Source of the timestamp that new task ids are derived from.
pub type Clock = fn() -> u64;

fn wall_clock_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Ordered in-memory task collection.
///
/// Every operation is total: unknown ids and blank text are no-ops, never errors.
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: Vec<Task>,
    clock: Clock,
    last_issued: u64,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::with_clock(wall_clock_millis)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            tasks: Vec::new(),
            clock,
            last_issued: 0,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Prefers the clock, bumped past the highest and last issued ids. When
    /// that lands on a taken id (or overflows) it falls through to the next
    /// free one, wrapping to 1.
    fn next_id(&mut self) -> Option<u64> {
        let taken: HashSet<u64> = self.tasks.iter().map(|t| t.id).collect();
        let after_highest = taken
            .iter()
            .max()
            .and_then(|highest| highest.checked_add(1))
            .unwrap_or(0);
        let preferred = (self.clock)()
            .max(after_highest)
            .max(self.last_issued.saturating_add(1));

        let id = (preferred..=u64::MAX)
            .chain(1..preferred)
            .find(|candidate| !taken.contains(candidate))?;
        self.last_issued = id;
        Some(id)
    }

    /// Appends a pending task, returning its id. Blank text is ignored.
    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub fn add(&mut self, text: &str) -> Option<u64> {
        if text.trim().is_empty() {
            debug!("ignoring blank task text");
            return None;
        }

        let Some(id) = self.next_id() else {
            warn!("no free task id left");
            return None;
        };
        self.tasks.push(Task::new_pending(id, text.to_string()));
        debug!(id, count = self.tasks.len(), "task added");
        Some(id)
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self, id: u64) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            trace!("toggle target not found");
            return false;
        };
        task.completed = !task.completed;
        debug!(completed = task.completed, "task toggled");
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: u64) -> bool {
        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            trace!("delete target not found");
            return false;
        };
        self.tasks.remove(idx);
        debug!(count = self.tasks.len(), "task deleted");
        true
    }

    /// Discards the current collection and installs `tasks` in the given order.
    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        info!(
            before = self.tasks.len(),
            after = tasks.len(),
            "replacing task collection"
        );
        self.tasks = tasks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen_clock() -> u64 {
        1_700_000_000_000
    }

    fn seeded() -> TaskStore {
        let mut store = TaskStore::with_clock(frozen_clock);
        store.replace_all(vec![
            Task::new_pending(1, "A".to_string()),
            Task {
                id: 2,
                text: "B".to_string(),
                completed: true,
                owner: Some(9),
            },
        ]);
        store
    }

    #[test]
    fn adds_in_the_same_millisecond_get_distinct_ids() {
        let mut store = TaskStore::with_clock(frozen_clock);
        let ids: Vec<u64> = ["one", "two", "three"]
            .iter()
            .filter_map(|text| store.add(text))
            .collect();

        assert_eq!(store.len(), 3);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);
        assert_eq!(ids[0], frozen_clock());
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut store = seeded();
        let before = store.tasks().to_vec();

        assert_eq!(store.add(""), None);
        assert_eq!(store.add("   "), None);
        assert_eq!(store.add("\t\n"), None);
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn text_is_kept_as_entered() {
        let mut store = TaskStore::with_clock(frozen_clock);
        let id = store.add("  padded ").expect("added");
        assert_eq!(store.get(id).map(|t| t.text.as_str()), Some("  padded "));
    }

    #[test]
    fn toggle_flips_only_the_target_and_is_self_inverse() {
        let mut store = seeded();
        let original = store.tasks().to_vec();

        assert!(store.toggle(1));
        assert!(store.get(1).is_some_and(|t| t.completed));
        assert_eq!(store.get(2), original.get(1));

        assert!(store.toggle(1));
        assert_eq!(store.tasks(), original.as_slice());
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut store = seeded();
        let before = store.tasks().to_vec();

        assert!(!store.toggle(42));
        assert!(!store.delete(42));
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn delete_removes_exactly_one() {
        let mut store = seeded();
        assert!(store.delete(1));
        assert_eq!(store.len(), 1);
        assert!(store.get(1).is_none());
        assert_eq!(store.tasks()[0].id, 2);
    }

    #[test]
    fn ids_never_collide_with_installed_tasks() {
        fn early_clock() -> u64 {
            3
        }
        let mut store = TaskStore::with_clock(early_clock);
        store.replace_all(vec![
            Task::new_pending(3, "x".to_string()),
            Task::new_pending(10, "y".to_string()),
        ]);

        assert_eq!(store.add("z"), Some(11));
    }

    #[test]
    fn max_id_in_collection_does_not_cause_duplicates() {
        let mut store = TaskStore::with_clock(frozen_clock);
        store.replace_all(vec![Task::new_pending(u64::MAX, "remote".to_string())]);

        let first = store.add("local").expect("added");
        let second = store.add("another").expect("added");

        assert_ne!(first, u64::MAX);
        assert_ne!(second, u64::MAX);
        assert_ne!(first, second);
        let ids: HashSet<u64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 3);

        assert!(store.toggle(first));
        assert!(store.get(u64::MAX).is_some_and(|t| !t.completed));
    }

    #[test]
    fn ids_wrap_past_the_top_of_the_range() {
        fn late_clock() -> u64 {
            u64::MAX - 1
        }
        let mut store = TaskStore::with_clock(late_clock);

        assert_eq!(store.add("a"), Some(u64::MAX - 1));
        assert_eq!(store.add("b"), Some(u64::MAX));
        assert_eq!(store.add("c"), Some(1));
    }

    #[test]
    fn deleted_ids_are_not_reissued() {
        let mut store = TaskStore::with_clock(frozen_clock);
        let first = store.add("first").expect("added");
        store.delete(first);
        let second = store.add("second").expect("added");
        assert_ne!(first, second);
    }

    #[test]
    fn add_toggle_delete_restores_previous_state() {
        let mut store = seeded();
        let before = store.tasks().to_vec();

        let id = store.add("Buy milk").expect("added");
        assert!(store.toggle(id));
        assert!(store.delete(id));

        assert_eq!(store.tasks(), before.as_slice());
    }
}
