//! Main CLI application structure

use std::io::IsTerminal;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{query, shift, timeline};
use crate::domain::{Actor, ActorRole, Period, ResourceId};
use crate::storage::{Config, Project, ShiftStore};
use crate::workflow::{Workflow, WorkflowError};

#[derive(Parser)]
#[command(name = "shifts")]
#[command(author, version, about = "Shift scheduling with approval workflow and timeline layout")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub actor: ActorArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who is acting; falls back to config, then `$USER` as staff
#[derive(Args, Debug, Clone, Default)]
pub struct ActorArgs {
    /// Acting resource ID
    #[arg(long, global = true, env = "SHIFTS_ACTOR")]
    pub actor: Option<String>,

    /// Acting role (staff, privileged, system)
    #[arg(long, global = true, env = "SHIFTS_ROLE")]
    pub role: Option<ActorRole>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new shift-board project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage shifts
    #[command(subcommand)]
    Shift(shift::ShiftCommands),

    /// Show shifts awaiting approval
    Pending,

    /// Lay out one day's shifts per resource
    Timeline {
        /// Day to lay out (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Only this resource
        #[arg(long)]
        resource: Option<ResourceId>,
    },

    /// Complete approved shifts that have already ended
    CompleteElapsed {
        /// Reference instant (YYYY-MM-DDTHH:MM, defaults to now)
        #[arg(long, value_parser = shift::parse_instant)]
        at: Option<chrono::NaiveDateTime>,
    },

    /// Show shift counts per status
    Status {
        /// Month to count (YYYY-MM, defaults to all)
        #[arg(long)]
        month: Option<Period>,
    },

    /// Rewrite the store, moving invalid lines to quarantine.jsonl
    Compact,
}

/// An open project with the resolved actor
pub(crate) struct Session {
    pub project: Project,
    pub actor: Actor,
}

impl Session {
    pub fn open(args: &ActorArgs, output: &Output) -> Result<Self> {
        let project = Project::open_current()?;
        output.verbose(&format!("Opened project at: {}", project.root().display()));

        let actor = project
            .config()
            .current_actor(args.actor.as_deref(), args.role)?;
        output.verbose(&format!("Acting as {} ({})", actor.id, actor.role));

        Ok(Self { project, actor })
    }

    pub fn store(&self) -> ShiftStore {
        self.project.store()
    }

    /// Runs `f` with a workflow over the project store
    pub fn workflow<T>(
        &self,
        f: impl FnOnce(&Workflow<'_, ShiftStore>) -> Result<T, WorkflowError>,
    ) -> Result<T> {
        let store = self.store();
        let workflow = Workflow::new(&store)
            .with_conflict_retries(self.project.config().project.store.conflict_retries);
        f(&workflow).map_err(with_kind)
    }
}

/// Prefixes the error with its kind, e.g. `not_found: Shift not found: ...`
pub(crate) fn with_kind(error: WorkflowError) -> anyhow::Error {
    let kind = error.kind();
    anyhow::Error::new(error).context(kind.to_string())
}

/// Installs the tracing subscriber; `RUST_LOG` overrides the level
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = Config::load()?;
    let output = Output::new(config.output_format(cli.format), cli.verbose);

    output.verbose("shift-board starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .shifts directory at: {}", project.shifts_dir().display()),
            );
            output.success(&format!(
                "Initialized shift-board project at {}",
                project.root().display()
            ));
        }

        Commands::Shift(cmd) => shift::run(cmd, &cli.actor, &output)?,

        Commands::Pending => query::pending(&cli.actor, &output)?,

        Commands::Timeline { date, resource } => {
            output.verbose_ctx("timeline", &format!("Laying out {}, resource filter: {:?}", date, resource));
            timeline::show(&cli.actor, &output, date, resource.as_ref())?
        }

        Commands::CompleteElapsed { at } => shift::complete_elapsed(&cli.actor, &output, at)?,

        Commands::Status { month } => query::status(&cli.actor, &output, month)?,

        Commands::Compact => {
            let project = Project::open_current()?;
            let store = project.store();
            let kept = store.compact().context("Failed to compact shift store")?;
            if output.is_json() {
                output.data(&serde_json::json!({ "kept": kept }));
            } else {
                output.success(&format!("Compacted {}: {} shift(s) kept", store.path().display(), kept));
            }
        }
    }

    output.verbose("Command completed successfully");
    Ok(())
}
