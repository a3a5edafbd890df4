use std::process;

use chrono::{Local, NaiveDateTime};
use clap::Parser;

use tasksched::app::App;
use tasksched::config::Config;
use tasksched::hooks::{HookRunner, ScriptHooks};
use tasksched::paint::Renderer;
use tasksched::render::BufferOptions;
use tasksched::schedule::Schedule;
use tasksched::store::{sample_tasks, MemoryStore, TaskStore, TaskwarriorStore};
use tasksched::ui::CrosstermRenderer;
use tasksched::{dates, tlog, tlog_error, Error, Result};

/// tasksched - scheduled Taskwarrior tasks on an hourly terminal grid
#[derive(Parser, Debug)]
#[command(name = "tasksched")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    TASKSCHED_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Seconds between refreshes
    #[arg(short = 'r', long = "refresh")]
    pub refresh: Option<u64>,

    /// Start of the date range (e.g. today, yesterday, monday, 2019-10-12)
    #[arg(long)]
    pub from: Option<String>,

    /// End of the date range
    #[arg(long = "to", visible_alias = "until")]
    pub to: Option<String>,

    /// Taskwarrior data directory
    #[arg(short = 'd', long = "data-location")]
    pub data_location: Option<String>,

    /// Taskwarrior rc file
    #[arg(short = 't', long = "taskrc-location")]
    pub taskrc_location: Option<String>,

    /// Show hours without tasks
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Hide completed tasks
    #[arg(short = 'c', long = "completed")]
    pub hide_completed: bool,

    /// Hide the project column
    #[arg(short = 'p', long = "project")]
    pub hide_projects: bool,

    /// Do not run hooks
    #[arg(long)]
    pub no_notifications: bool,

    /// Show sample tasks instead of reading Taskwarrior
    #[arg(long)]
    pub demo: bool,

    /// Enable debug logging (writes to ~/.tasksched/tasksched.log)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Command line flags win over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(refresh) = self.refresh {
            config.refresh_rate = refresh;
        }
        if let Some(data) = &self.data_location {
            config.data_location = data.clone();
        }
        if let Some(taskrc) = &self.taskrc_location {
            config.taskrc_location = taskrc.clone();
        }
        if self.all {
            config.hide_empty = false;
        }
        if self.hide_completed {
            config.show_completed = false;
        }
        if self.hide_projects {
            config.hide_projects = true;
        }
        if self.no_notifications {
            config.notifications = false;
        }
    }

    /// The scheduled range to show. Defaults to `today-1s .. eod`: the
    /// backend's `scheduled.after` is strict, and date-only tasks sit at
    /// midnight.
    pub fn range(&self, now: NaiveDateTime) -> Result<(NaiveDateTime, NaiveDateTime)> {
        let (after, before) = match (&self.from, &self.to) {
            (Some(from), Some(to)) => (dates::parse(from, now)?, dates::parse(to, now)?),
            (None, None) => (dates::parse("today-1s", now)?, dates::parse("eod", now)?),
            _ => {
                return Err(Error::ConfigInvalid(
                    "--from and --to must be given together".to_string(),
                ))
            }
        };
        if after > before {
            return Err(Error::ConfigInvalid(format!(
                "range starts after it ends ({} > {})",
                after, before
            )));
        }
        Ok((after, before))
    }
}

fn main() {
    let cli = Cli::parse();

    tasksched::log::init_with_debug(cli.debug);

    if let Err(e) = run(cli) {
        tlog_error!("Fatal: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    cli.apply(&mut config);

    let now = Local::now().naive_local();
    let (after, before) = cli.range(now)?;

    let store: Box<dyn TaskStore> = if cli.demo {
        tlog!("Demo mode, serving sample tasks");
        Box::new(MemoryStore::new(sample_tasks(now.date())))
    } else {
        Box::new(TaskwarriorStore::new(
            &config.data_path(),
            &config.taskrc_path(),
        )?)
    };

    Config::ensure_dirs()?;
    Config::write_default_if_missing(&Config::config_path()?)?;
    let hooks: Option<Box<dyn HookRunner>> = if config.notifications {
        Some(Box::new(ScriptHooks::new(Config::hooks_dir()?)))
    } else {
        None
    };

    let schedule = Schedule::new(store, after, before, config.show_completed);
    let options = BufferOptions {
        hide_empty: config.hide_empty,
        hide_projects: config.hide_projects,
        timebox: config.timebox.clone(),
    };
    let mut app = App::new(schedule, options, config.refresh_interval(), hooks);

    let mut renderer = CrosstermRenderer::acquire()?;
    let result = app.run(&mut renderer);
    renderer.teardown();
    result
}
