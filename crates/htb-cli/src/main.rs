//! htb-cli - command-line client for the Hack The Box labs API
//!
//! ## Commands
//!
//! - `start`: start a machine (the release-arena machine by default)
//! - `stop` / `reset`: act on the machine currently running
//! - `info`: composite records for machines, challenges, users,
//!   fortresses and prolabs
//! - `submit`: submit a flag
//! - `update`: check for a newer release

mod notify;
mod prompt;
mod render;
mod spinner;
mod update;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use htb_api::{ClientConfig, HttpTransport};
use htb_core::{
    aggregate, dispatch, probe, release_arena_machine, reset_active, resolve, start_machine,
    stop_active, submit, CommandSpan, CompositeRecord, Context, DispatchOutcome, IntervalTicker,
    LabError, Progress, Prompter, ResourceKind, SubmitMode, Ticker, METRICS, POLL_INTERVAL,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

use crate::notify::Notifier;
use crate::prompt::TerminalPrompter;
use crate::spinner::Spinner;

const NO_MACHINE_RUNNING: &str = "No machine is running";
const INFO_CANCELLED: &str = "Info cancelled";
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "htb-cli")]
#[command(author = "GoToolSharing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the Hack The Box labs API", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and JSON records
    #[arg(long, global = true)]
    json: bool,

    /// Answer yes to every confirmation prompt
    #[arg(long, global = true)]
    batch: bool,

    /// Proxy URL for API traffic
    #[arg(long, global = true, env = "HTB_PROXY")]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a machine and print its address
    Start {
        /// Machine name (default: the release-arena machine)
        #[arg(short, long)]
        machine: Option<String>,
    },

    /// Stop the running machine
    Stop,

    /// Reset the running machine
    Reset,

    /// Show information about one or more targets
    Info {
        /// Machine name
        #[arg(short, long)]
        machine: Vec<String>,

        /// Challenge name
        #[arg(short, long)]
        challenge: Vec<String>,

        /// Username
        #[arg(short, long)]
        user: Vec<String>,

        /// Fortress name
        #[arg(short, long)]
        fortress: Vec<String>,

        /// Prolab name
        #[arg(short, long)]
        prolab: Vec<String>,
    },

    /// Submit a flag
    Submit {
        #[command(subcommand)]
        action: SubmitAction,
    },

    /// Check whether a newer release exists
    Update,
}

#[derive(Subcommand)]
enum SubmitAction {
    /// Challenge flag
    Challenge {
        name: String,

        /// Difficulty rating from 1 to 10
        #[arg(short, long)]
        difficulty: Option<u8>,
    },
    /// Machine user or root flag
    Machine { name: String },
    /// Fortress flag
    Fortress { name: String },
    /// Prolab flag
    Prolab { name: String },
    /// Flag for the running machine
    Active,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Start { .. } => "start",
            Commands::Stop => "stop",
            Commands::Reset => "reset",
            Commands::Info { .. } => "info",
            Commands::Submit { .. } => "submit",
            Commands::Update => "update",
        }
    }
}

impl From<SubmitAction> for SubmitMode {
    fn from(action: SubmitAction) -> Self {
        match action {
            SubmitAction::Challenge { name, difficulty } => {
                SubmitMode::Challenge { name, difficulty }
            }
            SubmitAction::Machine { name } => SubmitMode::Machine { name },
            SubmitAction::Fortress { name } => SubmitMode::Fortress { name },
            SubmitAction::Prolab { name } => SubmitMode::Prolab { name },
            SubmitAction::Active => SubmitMode::ActiveMachine,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    htb_core::init_tracing(cli.json, level);

    let _span = CommandSpan::enter(cli.command.name());

    let result = match cli.command {
        Commands::Update => cmd_update().await,
        command => {
            let ctx = connect(cli.proxy.as_deref(), cli.batch)?;
            run(&ctx, command, cli.json).await
        }
    };

    METRICS.flush();
    result
}

/// Build the per-invocation context from the environment and flags.
fn connect(proxy: Option<&str>, batch: bool) -> Result<Context> {
    let config = ClientConfig::from_env().with_proxy(proxy);
    let transport =
        HttpTransport::new(&config).context("Failed to build the API client (is HTB_TOKEN set?)")?;
    Ok(Context::new(Arc::new(transport)).with_batch(batch))
}

async fn run(ctx: &Context, command: Commands, json: bool) -> Result<()> {
    let notifier = Notifier::from_env();
    let prompter = TerminalPrompter;

    match command {
        Commands::Start { machine } => {
            let spinner = Arc::new(Spinner::new());
            let cancel = CancellationToken::new();
            watch_ctrl_c(cancel.clone(), spinner.clone());
            let mut ticker = IntervalTicker::with_token(POLL_INTERVAL, cancel);
            let output = cmd_start(ctx, machine.as_deref(), spinner.as_ref(), &mut ticker).await;
            report(&notifier, "start", output).await
        }
        Commands::Stop => cmd_stop(ctx).await.map(|out| println!("{out}")),
        Commands::Reset => cmd_reset(ctx).await.map(|out| println!("{out}")),
        Commands::Info {
            machine,
            challenge,
            user,
            fortress,
            prolab,
        } => {
            let subjects = subjects(&[
                (ResourceKind::Machine, machine),
                (ResourceKind::Challenge, challenge),
                (ResourceKind::User, user),
                (ResourceKind::Fortress, fortress),
                (ResourceKind::Prolab, prolab),
            ]);
            cmd_info(ctx, &subjects, json, &prompter)
                .await
                .map(|out| println!("{out}"))
        }
        Commands::Submit { action } => {
            let output = cmd_submit(ctx, action.into(), &prompter).await;
            report(&notifier, "submit", output).await
        }
        Commands::Update => cmd_update().await,
    }
}

/// First Ctrl-C cancels the start: nothing is sent if the request has not
/// gone out yet, otherwise the provisioning wait ends. A second one exits.
fn watch_ctrl_c(cancel: CancellationToken, progress: Arc<dyn Progress>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling start");
            cancel.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(abandon(progress.as_ref()));
        }
    });
}

/// Release the progress indicator and return the interrupted exit status.
fn abandon(progress: &dyn Progress) -> i32 {
    progress.stop();
    EXIT_INTERRUPTED
}

/// Print a successful result and forward it to the webhook.
async fn report(notifier: &Notifier, command: &str, output: Result<String>) -> Result<()> {
    let output = output?;
    println!("{output}");
    notifier.send(command, &output).await;
    Ok(())
}

fn subjects(groups: &[(ResourceKind, Vec<String>)]) -> Vec<(ResourceKind, String)> {
    groups
        .iter()
        .flat_map(|(kind, names)| names.iter().map(move |name| (*kind, name.clone())))
        .collect()
}

// ========== Machine lifecycle ==========

/// Start a machine by name, or the release-arena machine
async fn cmd_start(
    ctx: &Context,
    machine: Option<&str>,
    progress: &dyn Progress,
    ticker: &mut dyn Ticker,
) -> Result<String> {
    let target = match machine {
        Some(name) => resolve(ctx, name, ResourceKind::Machine).await?,
        None => release_arena_machine(ctx)
            .await
            .context("Failed to look up the release-arena machine")?,
    };

    let outcome = start_machine(ctx, &target, progress, ticker)
        .await
        .with_context(|| format!("Failed to start {}", target.name))?;
    Ok(outcome.summary())
}

/// Stop the running machine
async fn cmd_stop(ctx: &Context) -> Result<String> {
    match stop_active(ctx).await {
        Ok((_, message)) => Ok(message),
        Err(LabError::NoActiveMachine) => Ok(NO_MACHINE_RUNNING.to_string()),
        Err(err) => Err(err).context("Failed to stop the machine"),
    }
}

/// Reset the running machine
async fn cmd_reset(ctx: &Context) -> Result<String> {
    match reset_active(ctx).await {
        Ok((_, message)) => Ok(message),
        Err(LabError::NoActiveMachine) => Ok(NO_MACHINE_RUNNING.to_string()),
        Err(err) => Err(err).context("Failed to reset the machine"),
    }
}

// ========== Info ==========

/// Resolve and aggregate each subject; with none, offer the active machine
async fn cmd_info(
    ctx: &Context,
    subjects: &[(ResourceKind, String)],
    json: bool,
    prompter: &dyn Prompter,
) -> Result<String> {
    let mut records: Vec<CompositeRecord> = Vec::new();

    if subjects.is_empty() {
        let Some(active) = probe::active_machine(ctx).await? else {
            return Ok(NO_MACHINE_RUNNING.to_string());
        };
        let question = format!("The machine {} is running. Show its information?", active.name);
        if !ctx.batch() && !prompter.confirm(&question) {
            return Ok(INFO_CANCELLED.to_string());
        }
        records.push(aggregate(ctx, &active).await?);
    }

    for (kind, name) in subjects {
        let target = resolve(ctx, name, *kind).await?;
        let record = aggregate(ctx, &target)
            .await
            .with_context(|| format!("Failed to fetch {target}"))?;
        records.push(record);
    }

    if json {
        Ok(render::records_json(&records)?)
    } else {
        Ok(render::render_records(&records))
    }
}

// ========== Submission ==========

/// Dispatch and send a flag submission
async fn cmd_submit(ctx: &Context, mode: SubmitMode, prompter: &dyn Prompter) -> Result<String> {
    match dispatch(ctx, &mode, prompter).await? {
        DispatchOutcome::Ready(request) => Ok(submit(ctx, request)
            .await
            .context("Failed to submit the flag")?),
        DispatchOutcome::AlreadyOwned { id } => Ok(format!(
            "The user and root flags of machine #{id} are already owned"
        )),
        DispatchOutcome::Cancelled => Ok("Submission cancelled".to_string()),
    }
}

// ========== Update ==========

async fn cmd_update() -> Result<()> {
    let client = reqwest::Client::new();
    let latest = update::latest_release(&client, update::RELEASES_URL)
        .await
        .context("Failed to check for updates")?;
    let current = htb_core::VERSION;
    println!("{}", update::compare(current, &latest).message(current));
    Ok(())
}
