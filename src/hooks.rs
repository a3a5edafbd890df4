//! Hook dispatch.
//!
//! Hooks are executables in the hooks directory named `<event>-<anything>`.
//! Each receives a JSON [`TaskSnapshot`] on stdin and runs detached; the
//! refresh loop never waits on them.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use serde::Serialize;
use uuid::Uuid;

use crate::task::{format_duration, Task};
use crate::{tlog, tlog_debug, tlog_warn, Result};

/// Fired when the task that should be in progress changes.
pub const ON_PROGRESS: &str = "on-progress";

/// Serializable view of a task handed to hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub id: Option<u32>,
    pub uuid: Uuid,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tb_estimate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tb_real: Option<u32>,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        let stamp = |dt: chrono::NaiveDateTime| dt.format("%Y-%m-%dT%H:%M:%S").to_string();
        Self {
            id: task.id,
            uuid: task.uuid,
            description: task.description.clone(),
            project: task.project.clone(),
            status: task.status.to_string(),
            scheduled: task.scheduled.map(stamp),
            estimate: task.estimate.map(format_duration),
            start: task.active_start.map(stamp),
            tb_estimate: task.timebox_estimate,
            tb_real: task.timebox_real,
        }
    }
}

pub trait HookRunner {
    /// Fire-and-forget; failures are the runner's to log.
    fn dispatch(&mut self, event: &str, payload: &TaskSnapshot);
}

/// Runs hook scripts from a directory.
pub struct ScriptHooks {
    dir: PathBuf,
    children: Vec<Child>,
}

impl ScriptHooks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            children: Vec::new(),
        }
    }

    /// Executables in the hooks directory for `event`, sorted by name.
    pub fn scripts_for(&self, event: &str) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}-", event);
        let mut scripts = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix));
            if matches && is_executable(&path) {
                scripts.push(path);
            }
        }
        scripts.sort();
        Ok(scripts)
    }

    fn spawn(&mut self, script: &Path, payload: &[u8]) -> Result<()> {
        let mut child = Command::new(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload)?;
        }
        self.children.push(child);
        Ok(())
    }

    /// Drop handles of hooks that have exited.
    fn reap(&mut self) {
        self.children
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl HookRunner for ScriptHooks {
    fn dispatch(&mut self, event: &str, payload: &TaskSnapshot) {
        self.reap();

        let scripts = match self.scripts_for(event) {
            Ok(scripts) => scripts,
            Err(e) => {
                tlog_warn!("Failed to list hooks in {}: {}", self.dir.display(), e);
                return;
            }
        };
        if scripts.is_empty() {
            tlog_debug!("No {} hooks in {}", event, self.dir.display());
            return;
        }

        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => {
                tlog_warn!("Failed to serialize hook payload: {}", e);
                return;
            }
        };

        for script in scripts {
            match self.spawn(&script, &body) {
                Ok(()) => tlog!("Dispatched {} to {}", event, script.display()),
                Err(e) => tlog_warn!("Hook {} failed to start: {}", script.display(), e),
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
