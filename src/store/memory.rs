//! In-process task store.
//!
//! Clones share state, so a test (or the `--demo` dashboard) can keep a
//! handle after moving a clone into a [`Schedule`](crate::schedule::Schedule).

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::TaskStore;
use crate::task::{Task, TaskStatus};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    unavailable: bool,
    revision: u64,
    queries: usize,
    saved: Vec<Task>,
    stopped: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        let store = Self::default();
        store.set_tasks(tasks);
        store
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        let mut state = self.state.borrow_mut();
        state.tasks = tasks;
        state.revision += 1;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    /// While set, every query fails with `BackendUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.borrow_mut().unavailable = unavailable;
    }

    pub fn query_count(&self) -> usize {
        self.state.borrow().queries
    }

    pub fn saved(&self) -> Vec<Task> {
        self.state.borrow().saved.clone()
    }

    pub fn stopped(&self) -> Vec<Uuid> {
        self.state.borrow().stopped.clone()
    }
}

/// A small day of work on `day`, used by `--demo`.
pub fn sample_tasks(day: NaiveDate) -> Vec<Task> {
    let entries: [(&str, Option<&str>, u32, u32, Option<i64>, Option<u32>); 6] = [
        ("Plan the day", None, 8, 30, Some(15), None),
        ("Write release notes", Some("docs"), 9, 0, Some(71), Some(3)),
        ("Review pull requests", Some("core"), 11, 0, Some(45), Some(2)),
        ("Lunch", None, 12, 30, None, None),
        ("Pair on the scheduler", Some("core"), 14, 0, Some(120), Some(4)),
        ("Inbox zero", None, 16, 10, Some(24), None),
    ];

    entries
        .iter()
        .enumerate()
        .map(|(index, &(description, project, hour, minute, minutes, timeboxes))| Task {
            id: Some(index as u32 + 1),
            uuid: Uuid::new_v4(),
            description: description.to_string(),
            project: project.map(str::to_string),
            scheduled: day.and_hms_opt(hour, minute, 0),
            estimate: minutes.map(chrono::Duration::minutes),
            timebox_estimate: timeboxes,
            ..Task::default()
        })
        .collect()
}

impl TaskStore for MemoryStore {
    fn query(
        &self,
        after: NaiveDateTime,
        before: NaiveDateTime,
        include_completed: bool,
    ) -> Result<Vec<Task>> {
        let mut state = self.state.borrow_mut();
        state.queries += 1;
        if state.unavailable {
            return Err(Error::BackendUnavailable("memory store offline".to_string()));
        }
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Deleted)
            .filter(|t| include_completed || !t.is_completed())
            .filter(|t| t.scheduled.map_or(true, |s| after <= s && s <= before))
            .cloned()
            .collect())
    }

    fn save(&mut self, task: &Task) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(existing) = state.tasks.iter_mut().find(|t| t.uuid == task.uuid) {
            *existing = task.clone();
        } else {
            state.tasks.push(task.clone());
        }
        state.saved.push(task.clone());
        state.revision += 1;
        Ok(())
    }

    fn stop(&mut self, task: &Task) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(existing) = state.tasks.iter_mut().find(|t| t.uuid == task.uuid) {
            existing.active_start = None;
        }
        state.stopped.push(task.uuid);
        state.revision += 1;
        Ok(())
    }

    fn last_modified(&self) -> Option<SystemTime> {
        Some(UNIX_EPOCH + Duration::from_nanos(self.state.borrow().revision))
    }
}
