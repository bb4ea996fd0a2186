//! CLI definitions and dispatch for `reclaim-all` and `reclaim-project`.

#![allow(missing_docs)]

use std::path::PathBuf;

use clap::{Args, Parser};
use colored::control;
use thiserror::Error;

use crate::cli::reporter::Reporter;
use crate::cli::session::run_session;
use crate::core::config::{Config, DEFAULT_POOL, ExecutionMode, OutputOptions, RunConfig};
use crate::core::errors::VrcError;
use crate::guard::lock::{RunLock, holder_pid};
use crate::guard::signals::{FORCED_EXIT_CODE, ShutdownFlag};
use crate::logger::jsonl::ActivityLog;
use crate::platform::virsh::VirshHypervisor;
use crate::reclaim::project::{ProjectContext, TeardownOutcome, orchestrator_teardown};
use crate::reclaim::scope::ScopeRule;

/// Flags shared by both operations.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Actually delete. Without this flag the run only reports what it would do.
    #[arg(long)]
    pub force: bool,
    /// Suppress normal output (errors are still printed).
    #[arg(short, long)]
    pub quiet: bool,
    /// Storage pool whose volumes are considered.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_POOL)]
    pub pool: String,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Print the run report as one JSON object instead of the transcript.
    #[arg(long)]
    pub json: bool,
    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,
}

/// Destroy every libvirt domain and every non-protected volume in the pool.
///
/// Base box images and ISO files are always kept.
#[derive(Debug, Parser)]
#[command(name = "reclaim-all", version, about, long_about = None)]
pub struct ReclaimAllCli {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Destroy the current Vagrant project's libvirt domains and volumes only.
///
/// Must be run from the project directory (the one holding the Vagrantfile);
/// only names starting with `<directory-name>_` are touched.
#[derive(Debug, Parser)]
#[command(name = "reclaim-project", version, about, long_about = None)]
pub struct ReclaimProjectCli {
    #[command(flatten)]
    pub common: CommonArgs,
    /// libvirt connection URI.
    #[arg(long, value_name = "URI")]
    pub uri: Option<String>,
    /// Do not attempt `vagrant destroy -f` before cleaning up.
    #[arg(long)]
    pub skip_vagrant: bool,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// A precondition failed before anything was changed.
    #[error("{0}")]
    Precondition(VrcError),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(VrcError),
    /// The run was interrupted before the end of the plan.
    #[error("interrupted; {remaining} planned action(s) were not attempted")]
    Interrupted { remaining: usize },
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Precondition(_) | Self::Runtime(_) => 1,
            Self::Interrupted { .. } => FORCED_EXIT_CODE,
        }
    }
}

impl From<VrcError> for CliError {
    fn from(value: VrcError) -> Self {
        if value.is_fatal_precondition() {
            Self::Precondition(value)
        } else {
            Self::Runtime(value)
        }
    }
}

enum Target {
    All,
    Project { skip_vagrant: bool },
}

/// Run the global-exclusion operation.
pub fn run_all(cli: &ReclaimAllCli) -> Result<(), CliError> {
    execute(&cli.common, None, &Target::All)
}

/// Run the project-prefix operation from the current directory.
pub fn run_project(cli: &ReclaimProjectCli) -> Result<(), CliError> {
    execute(
        &cli.common,
        cli.uri.as_deref(),
        &Target::Project {
            skip_vagrant: cli.skip_vagrant,
        },
    )
}

impl CommonArgs {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            quiet: self.quiet,
            json: self.json,
            color: !self.no_color,
        }
    }
}

fn execute(common: &CommonArgs, uri: Option<&str>, target: &Target) -> Result<(), CliError> {
    let output = common.output();
    if !output.color {
        control::set_override(false);
    }
    let result = Config::load(common.config.as_deref())
        .map_err(CliError::from)
        .and_then(|config| {
            let mode = ExecutionMode::from_force(common.force);
            let run = RunConfig::new(config, mode, &common.pool, uri, output);
            let mut reporter = Reporter::stdio(run.output);
            execute_with(&run, target, &mut reporter)
        });
    if let Err(err) = &result {
        Reporter::stdio(output).fatal(&err.to_string());
    }
    result
}

fn execute_with(
    run: &RunConfig,
    target: &Target,
    reporter: &mut Reporter<std::io::Stdout, std::io::Stderr>,
) -> Result<(), CliError> {
    let (scope, project) = match target {
        Target::All => (ScopeRule::global(&run.config.scope)?, None),
        Target::Project { .. } => {
            let cwd = std::env::current_dir().map_err(|e| VrcError::io(".", e))?;
            let project = ProjectContext::detect(&cwd, &run.config.scope.project_marker)?;
            (ScopeRule::prefix(project.prefix.clone()), Some(project))
        }
    };

    let hypervisor = VirshHypervisor::from_config(&run.config.virsh, &run.uri);
    hypervisor.ensure_available()?;

    let lock_path = run.config.lock_path();
    let _lock = RunLock::acquire(&lock_path).map_err(|err| {
        if let (VrcError::LockContention { .. }, Some(pid)) = (&err, holder_pid(&lock_path)) {
            reporter.note(&format!("Lock holder PID: {pid}"));
        }
        err
    })?;

    let shutdown = ShutdownFlag::new();
    shutdown.install()?;

    if let (Some(project), Target::Project { skip_vagrant }) = (&project, target) {
        if !skip_vagrant {
            match orchestrator_teardown(&run.config.orchestrator, project, run.mode.is_dry_run()) {
                TeardownOutcome::Disabled => {}
                TeardownOutcome::Planned(cmd) => {
                    reporter.note(&format!("[dry-run] would run `{cmd}`"));
                }
                TeardownOutcome::Completed => reporter.note("Orchestrator teardown completed."),
                TeardownOutcome::Ignored(reason) => {
                    reporter.note(&format!("Orchestrator teardown ignored: {reason}"));
                }
            }
        }
    }

    let mut activity = run.config.logging.activity_log.as_deref().map(ActivityLog::open);
    let stop = || shutdown.is_requested();
    let should_stop: &dyn Fn() -> bool = &stop;
    let session = run_session(
        run,
        &scope,
        &hypervisor,
        reporter,
        activity.as_mut(),
        Some(should_stop),
    )?;

    if run.output.json {
        reporter.json_document(&session.to_json(&scope.describe()));
    }

    if session.report.completed {
        Ok(())
    } else {
        Err(CliError::Interrupted {
            remaining: session.report.skipped(),
        })
    }
}
