//! Task Store collaborator.
//!
//! The core only ever reads through [`TaskStore::query`]; `save` and `stop`
//! exist for timebox bookkeeping.

pub mod memory;
pub mod taskwarrior;

use std::time::SystemTime;

use chrono::NaiveDateTime;

use crate::task::Task;
use crate::Result;

pub use memory::{sample_tasks, MemoryStore};
pub use taskwarrior::TaskwarriorStore;

pub trait TaskStore {
    /// Tasks scheduled within `after..before`, in backend order.
    ///
    /// Deleted tasks are never returned; completed ones only when
    /// `include_completed` is set.
    fn query(
        &self,
        after: NaiveDateTime,
        before: NaiveDateTime,
        include_completed: bool,
    ) -> Result<Vec<Task>>;

    fn save(&mut self, task: &Task) -> Result<()>;

    /// Clear the task's active start.
    fn stop(&mut self, task: &Task) -> Result<()>;

    /// Modification stamp of the underlying data, if the store can tell.
    /// `None` means every refresh must re-query.
    fn last_modified(&self) -> Option<SystemTime> {
        None
    }
}
