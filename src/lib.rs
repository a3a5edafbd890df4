pub mod config;
pub mod dates;
pub mod error;
pub mod hooks;
pub mod log;
pub mod store;
pub mod task;

// Schedule pipeline: bucketing, derived state, layout, buffer, paint
pub mod layout;
pub mod paint;
pub mod render;
pub mod schedule;
pub mod timeslot;

// Terminal front end and refresh loop
pub mod app;
pub mod ui;

pub use error::{Error, Result};
pub use schedule::Schedule;
pub use task::{Task, TaskStatus};
