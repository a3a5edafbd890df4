use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::TaskStore;
use crate::task::{format_duration, parse_duration, Task};
use crate::{tlog_debug, tlog_warn, Error, Result};

const TW_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const QUERY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Fields the core models; everything else lands in `Task::extra`.
const MODELED_FIELDS: [&str; 10] = [
    "id",
    "uuid",
    "description",
    "project",
    "status",
    "scheduled",
    "estimate",
    "start",
    "tb_estimate",
    "tb_real",
];

/// Taskwarrior backend driven through the `task` command line.
pub struct TaskwarriorStore {
    binary: PathBuf,
    data_location: PathBuf,
    taskrc_location: PathBuf,
}

impl TaskwarriorStore {
    /// Validates the installation before anything is queried.
    pub fn new(data_location: &Path, taskrc_location: &Path) -> Result<Self> {
        let binary = which::which("task").map_err(|_| {
            Error::ConfigInvalid("the `task` executable was not found on PATH".to_string())
        })?;
        check_files(data_location, taskrc_location)?;
        tlog_debug!(
            "TaskwarriorStore::new binary={} data={} taskrc={}",
            binary.display(),
            data_location.display(),
            taskrc_location.display()
        );
        Ok(Self {
            binary,
            data_location: data_location.to_path_buf(),
            taskrc_location: taskrc_location.to_path_buf(),
        })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.env("TASKRC", &self.taskrc_location)
            .arg(format!("rc.data.location={}", self.data_location.display()))
            .arg("rc.confirmation=off")
            .arg("rc.verbose=nothing")
            .arg("rc.hooks=off")
            .arg("rc._forcecolor=off");
        cmd
    }

    fn run(&self, mut cmd: Command) -> Result<Output> {
        let output = cmd
            .output()
            .map_err(|e| Error::BackendUnavailable(format!("failed to run task: {e}")))?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tlog_warn!("task exited with {}: {}", output.status, err);
            return Err(Error::BackendUnavailable(format!(
                "task exited with {}: {}",
                output.status, err
            )));
        }
        Ok(output)
    }
}

impl TaskStore for TaskwarriorStore {
    fn query(
        &self,
        after: NaiveDateTime,
        before: NaiveDateTime,
        include_completed: bool,
    ) -> Result<Vec<Task>> {
        let mut cmd = self.command();
        cmd.arg("status.not:deleted")
            .arg(format!("scheduled.after:{}", after.format(QUERY_DATE_FORMAT)))
            .arg(format!("scheduled.before:{}", before.format(QUERY_DATE_FORMAT)));
        if !include_completed {
            cmd.arg("status.not:completed");
        }
        cmd.arg("export");

        let output = self.run(cmd)?;
        let tasks = parse_export(&String::from_utf8_lossy(&output.stdout)).map_err(|e| match e {
            Error::Json(e) => Error::BackendUnavailable(format!("unreadable export: {e}")),
            other => other,
        })?;
        tlog_debug!("TaskwarriorStore::query returned {} tasks", tasks.len());
        Ok(tasks)
    }

    fn save(&mut self, task: &Task) -> Result<()> {
        let payload = serde_json::to_string(&to_export_json(task))?;
        let mut cmd = self.command();
        cmd.arg("import")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::BackendUnavailable(format!("failed to run task import: {e}")))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::BackendUnavailable(format!(
                "task import exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        tlog_debug!("TaskwarriorStore::save uuid={}", task.uuid);
        Ok(())
    }

    fn stop(&mut self, task: &Task) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg(task.uuid.to_string()).arg("stop");
        self.run(cmd)?;
        tlog_debug!("TaskwarriorStore::stop uuid={}", task.uuid);
        Ok(())
    }

    fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(self.data_location.join("pending.data"))
            .and_then(|m| m.modified())
            .ok()
    }
}

/// Check the data directory, the taskrc and the required `estimate` UDA.
pub fn check_files(data_location: &Path, taskrc_location: &Path) -> Result<()> {
    if !data_location.is_dir() {
        return Err(Error::ConfigInvalid(format!(
            "task data directory {} not found",
            data_location.display()
        )));
    }
    if !taskrc_location.is_file() {
        return Err(Error::ConfigInvalid(format!(
            "taskrc {} not found",
            taskrc_location.display()
        )));
    }

    let taskrc = fs::read_to_string(taskrc_location)?;
    for key in ["uda.estimate.type", "uda.estimate.label"] {
        let declared = taskrc
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .any(|line| {
                line.split_once('=')
                    .is_some_and(|(k, v)| k.trim() == key && !v.trim().is_empty())
            });
        if !declared {
            return Err(Error::ConfigInvalid(format!(
                "{key} does not exist in {}",
                taskrc_location.display()
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ExportedTask {
    #[serde(default)]
    id: Option<u32>,
    uuid: Uuid,
    #[serde(default)]
    description: String,
    #[serde(default)]
    project: Option<String>,
    status: String,
    #[serde(default)]
    scheduled: Option<String>,
    #[serde(default)]
    estimate: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    tb_estimate: Option<f64>,
    #[serde(default)]
    tb_real: Option<f64>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Decode `task export` output (a JSON array, or one object per line).
pub fn parse_export(raw: &str) -> Result<Vec<Task>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let exported: Vec<ExportedTask> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .map(|line| line.trim().trim_end_matches(','))
            .filter(|line| !line.is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?
    };

    exported.into_iter().map(into_task).collect()
}

fn into_task(raw: ExportedTask) -> Result<Task> {
    Ok(Task {
        id: raw.id,
        uuid: raw.uuid,
        description: raw.description,
        project: raw.project.filter(|p| !p.is_empty()),
        status: raw.status.parse()?,
        scheduled: raw.scheduled.as_deref().map(parse_tw_date).transpose()?,
        estimate: raw.estimate.as_deref().map(parse_duration).transpose()?,
        active_start: raw.start.as_deref().map(parse_tw_date).transpose()?,
        timebox_estimate: raw.tb_estimate.map(|v| v.max(0.0) as u32),
        timebox_real: raw.tb_real.map(|v| v.max(0.0) as u32),
        extra: raw.extra,
    })
}

/// `20191012T090000Z` (UTC) to local wall-clock time.
pub fn parse_tw_date(raw: &str) -> Result<NaiveDateTime> {
    let utc = NaiveDateTime::parse_from_str(raw, TW_DATE_FORMAT)
        .map_err(|e| Error::InvalidTaskRecord(format!("invalid date '{raw}': {e}")))?;
    Ok(Utc.from_utc_datetime(&utc).with_timezone(&Local).naive_local())
}

pub fn format_tw_date(local: NaiveDateTime) -> String {
    let utc: DateTime<Utc> = match Local.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&local),
    };
    utc.format(TW_DATE_FORMAT).to_string()
}

/// The inverse of `into_task`, in the shape `task import` accepts.
pub fn to_export_json(task: &Task) -> Value {
    let mut obj: Map<String, Value> = task
        .extra
        .iter()
        .filter(|(k, _)| !MODELED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    obj.insert("uuid".into(), json!(task.uuid.to_string()));
    obj.insert("description".into(), json!(task.description));
    obj.insert("status".into(), json!(task.status.as_str()));
    if let Some(project) = &task.project {
        obj.insert("project".into(), json!(project));
    }
    if let Some(scheduled) = task.scheduled {
        obj.insert("scheduled".into(), json!(format_tw_date(scheduled)));
    }
    if let Some(estimate) = task.estimate {
        obj.insert("estimate".into(), json!(format_duration(estimate)));
    }
    if let Some(start) = task.active_start {
        obj.insert("start".into(), json!(format_tw_date(start)));
    }
    if let Some(n) = task.timebox_estimate {
        obj.insert("tb_estimate".into(), json!(n));
    }
    if let Some(n) = task.timebox_real {
        obj.insert("tb_real".into(), json!(n));
    }
    Value::Object(obj)
}
