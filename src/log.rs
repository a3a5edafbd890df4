//! File logging.
//!
//! The renderer owns the terminal while the dashboard runs, so log lines go
//! to `~/.tasksched/tasksched.log` instead. The file is truncated at startup.
//! `--debug` or `TASKSCHED_DEBUG=1` lowers the threshold to debug.
//!
//! Until [`init_with_debug`] runs (unit tests, early argument errors) every
//! message is dropped.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Local;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }
}

struct Sink {
    path: PathBuf,
    threshold: Level,
}

static SINK: OnceLock<Sink> = OnceLock::new();

/// Open the log file. Only the first call has any effect.
pub fn init_with_debug(debug: bool) {
    let env = std::env::var("TASKSCHED_DEBUG").ok();
    let threshold = if debug || debug_requested(env.as_deref()) {
        Level::Debug
    } else {
        Level::Info
    };

    let Ok(dir) = Config::app_dir() else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let path = dir.join("tasksched.log");
    if File::create(&path).is_err() {
        return;
    }
    let _ = SINK.set(Sink { path, threshold });
}

fn debug_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Backing function for the `tlog*` macros.
#[doc(hidden)]
pub fn emit(level: Level, target: &str, args: fmt::Arguments<'_>) {
    let Some(sink) = SINK.get() else {
        return;
    };
    if level > sink.threshold {
        return;
    }
    if let Ok(mut file) = OpenOptions::new().append(true).open(&sink.path) {
        let stamp = Local::now().format("%H:%M:%S%.3f").to_string();
        let _ = writeln!(file, "{}", format_line(&stamp, level, target, args));
    }
}

fn format_line(stamp: &str, level: Level, target: &str, message: impl fmt::Display) -> String {
    let target = target.strip_prefix("tasksched::").unwrap_or(target);
    format!("{stamp} {:<5} {target}: {message}", level.label())
}

#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::Level::Info, module_path!(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! tlog_error {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::Level::Error, module_path!(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! tlog_warn {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::Level::Warn, module_path!(), format_args!($($arg)*))
    };
}

/// Only written when debug logging is on.
#[macro_export]
macro_rules! tlog_debug {
    ($($arg:tt)*) => {
        $crate::log::emit($crate::log::Level::Debug, module_path!(), format_args!($($arg)*))
    };
}
