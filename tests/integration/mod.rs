//! Integration test suite for tasksched.
//!
//! These tests drive the schedule pipeline end to end: store query,
//! bucketing, layout, buffer building, painting and the refresh loop.
//!
//! # Test Categories
//!
//! - `schedule_buckets`: Day/hour bucketing over a store
//! - `render_pipeline`: Buffer building and incremental painting
//! - `refresh_loop`: Key handling, reloads, hooks and timeboxes
//!
//! # CI Compatibility
//!
//! No Taskwarrior install or real terminal is needed; the store, renderer
//! and hook runner are in-memory fakes.


mod render_pipeline;
mod refresh_loop;
