//! Continuation tokens and the task/progress collaborator.
//!
//! A chunked render is a restartable continuation: the drawer keeps the
//! cursor and the offscreen buffer, the host keeps a [`RenderTicket`] and
//! polls with it. Starting a new render invalidates the outstanding ticket,
//! and a stale ticket never touches a surface.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Handle for one chunked render
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTicket {
    pub generation: u64,
}

/// Result of polling a chunked render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The ticket no longer names the current render. Nothing was drawn.
    Stale,
    /// One chunk was drawn into the offscreen buffer.
    Pending { cursor: usize, total: usize },
    /// The buffer was copied to the visible surface.
    Done,
}

/// External progress signal raised around long renders.
pub trait TaskRegistry: Send + Sync {
    fn add_task_count(&self, plot_id: &str, task_id: &str);
    fn remove_task_count(&self, plot_id: &str, task_id: &str);
}

/// In-memory [`TaskRegistry`] keeping the set of open tasks per plot.
#[derive(Debug, Default)]
pub struct TaskCounter {
    open: Mutex<BTreeMap<String, BTreeSet<String>>>,
}

impl TaskCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open tasks for one plot
    pub fn count(&self, plot_id: &str) -> usize {
        self.open
            .lock()
            .map(|open| open.get(plot_id).map_or(0, BTreeSet::len))
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.open
            .lock()
            .map(|open| open.values().map(BTreeSet::len).sum())
            .unwrap_or(0)
    }
}

impl TaskRegistry for TaskCounter {
    fn add_task_count(&self, plot_id: &str, task_id: &str) {
        if let Ok(mut open) = self.open.lock() {
            open.entry(plot_id.to_string())
                .or_default()
                .insert(task_id.to_string());
        }
    }

    fn remove_task_count(&self, plot_id: &str, task_id: &str) {
        if let Ok(mut open) = self.open.lock() {
            if let Some(tasks) = open.get_mut(plot_id) {
                tasks.remove(task_id);
                if tasks.is_empty() {
                    open.remove(plot_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_tracks_open_tasks() {
        let tasks = TaskCounter::new();
        tasks.add_task_count("p1", "a");
        tasks.add_task_count("p1", "b");
        tasks.add_task_count("p2", "a");
        assert_eq!(tasks.count("p1"), 2);
        tasks.remove_task_count("p1", "a");
        tasks.remove_task_count("p1", "missing");
        assert_eq!(tasks.count("p1"), 1);
        assert_eq!(tasks.total(), 2);
    }
}
